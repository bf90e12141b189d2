use crate::row::CellValue;

/// Best-effort normalization to `DD.MM.YYYY`. Native dates and ISO-like or
/// already-local text prefixes normalize; anything else passes through
/// unchanged.
pub fn to_local(value: &CellValue) -> String {
    match value {
        CellValue::Date(d) => d.format("%d.%m.%Y").to_string(),
        CellValue::Empty => String::new(),
        other => normalize_text(&other.render()),
    }
}

fn normalize_text(s: &str) -> String {
    let s = s.trim();
    if let Some(local) = iso_prefix(s) {
        return local;
    }
    if let Some(local) = local_prefix(s) {
        return local;
    }
    s.to_string()
}

/// `YYYY-MM-DD…` → `DD.MM.YYYY`
fn iso_prefix(s: &str) -> Option<String> {
    let b = s.as_bytes();
    if b.len() < 10 || b[4] != b'-' || b[7] != b'-' {
        return None;
    }
    let digits = b[..4].iter().chain(&b[5..7]).chain(&b[8..10]);
    if !digits.into_iter().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}.{}.{}", &s[8..10], &s[5..7], &s[..4]))
}

/// `DD.MM.YYYY…` → its first ten characters
fn local_prefix(s: &str) -> Option<String> {
    let b = s.as_bytes();
    if b.len() < 10 || b[2] != b'.' || b[5] != b'.' {
        return None;
    }
    let digits = b[..2].iter().chain(&b[3..5]).chain(&b[6..10]);
    if !digits.into_iter().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(s[..10].to_string())
}
