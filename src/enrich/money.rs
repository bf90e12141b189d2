use crate::row::CellValue;

/// Non-breaking space used between thousands groups and before the glyph.
pub const NBSP: char = '\u{a0}';

/// Parse an amount cell: native numbers pass through; strings may use a
/// comma decimal separator and contain grouping whitespace. Anything
/// unparsable coerces to 0.
pub fn parse_amount(value: &CellValue) -> f64 {
    match value {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(|c| if c == ',' { '.' } else { c })
                .collect();
            cleaned.parse::<f64>().unwrap_or(0.0)
        }
        _ => 0.0,
    }
}

/// Locale-correct currency string: NBSP thousands groups, comma decimal
/// separator, two decimal digits, trailing ruble glyph. `12 345,67 ₽`
pub fn format_rub(amount: f64) -> String {
    let kopecks = (amount * 100.0).round() as i64;
    let sign = if kopecks < 0 { "-" } else { "" };
    let kopecks = kopecks.abs();
    format!(
        "{}{},{:02}{}₽",
        sign,
        group_thousands(kopecks / 100),
        kopecks % 100,
        NBSP
    )
}

fn group_thousands(n: i64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(NBSP);
        }
        out.push(ch);
    }
    out
}
