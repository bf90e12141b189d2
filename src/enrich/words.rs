//! Spelled-out ruble amounts: "одна тысяча двести тридцать четыре рубля
//! 56 копеек". Integer part decomposes into triads spelled independently;
//! the thousands scale takes feminine numeral forms, millions and billions
//! masculine.

const UNITS: [&str; 10] = [
    "", "один", "два", "три", "четыре", "пять", "шесть", "семь", "восемь", "девять",
];
const UNITS_FEM: [&str; 10] = [
    "", "одна", "две", "три", "четыре", "пять", "шесть", "семь", "восемь", "девять",
];
const TEENS: [&str; 10] = [
    "десять",
    "одиннадцать",
    "двенадцать",
    "тринадцать",
    "четырнадцать",
    "пятнадцать",
    "шестнадцать",
    "семнадцать",
    "восемнадцать",
    "девятнадцать",
];
const TENS: [&str; 10] = [
    "",
    "десять",
    "двадцать",
    "тридцать",
    "сорок",
    "пятьдесят",
    "шестьдесят",
    "семьдесят",
    "восемьдесят",
    "девяносто",
];
const HUNDREDS: [&str; 10] = [
    "",
    "сто",
    "двести",
    "триста",
    "четыреста",
    "пятьсот",
    "шестьсот",
    "семьсот",
    "восемьсот",
    "девятьсот",
];

const RUB_FORMS: [&str; 3] = ["рубль", "рубля", "рублей"];
const KOP_FORMS: [&str; 3] = ["копейка", "копейки", "копеек"];
const THOUSAND_FORMS: [&str; 3] = ["тысяча", "тысячи", "тысяч"];
const MILLION_FORMS: [&str; 3] = ["миллион", "миллиона", "миллионов"];
const BILLION_FORMS: [&str; 3] = ["миллиард", "миллиарда", "миллиардов"];

/// Standard one/few/many agreement: the 11–14 exception looks at the last
/// two digits, then 1 → one, 2–4 → few, everything else → many.
fn plural_index(n: u64) -> usize {
    if (11..=14).contains(&(n % 100)) {
        return 2;
    }
    match n % 10 {
        1 => 0,
        2..=4 => 1,
        _ => 2,
    }
}

pub fn plural_form(n: u64, forms: &[&'static str; 3]) -> &'static str {
    forms[plural_index(n)]
}

fn spell_triad(n: u64, feminine: bool, out: &mut Vec<&'static str>) {
    let units = if feminine { &UNITS_FEM } else { &UNITS };
    let h = (n / 100 % 10) as usize;
    let t = (n / 10 % 10) as usize;
    let u = (n % 10) as usize;
    if h > 0 {
        out.push(HUNDREDS[h]);
    }
    if t == 1 {
        out.push(TEENS[u]);
    } else {
        if t > 1 {
            out.push(TENS[t]);
        }
        if u > 0 {
            out.push(units[u]);
        }
    }
}

/// Spell a non-negative integer; 0 → "ноль".
pub fn spell_int(n: u64) -> String {
    if n == 0 {
        return "ноль".to_string();
    }
    let mut parts: Vec<&'static str> = Vec::new();
    let scales: [(u64, Option<&[&'static str; 3]>, bool); 4] = [
        (n / 1_000_000_000 % 1000, Some(&BILLION_FORMS), false),
        (n / 1_000_000 % 1000, Some(&MILLION_FORMS), false),
        (n / 1000 % 1000, Some(&THOUSAND_FORMS), true),
        (n % 1000, None, false),
    ];
    for (triad, forms, feminine) in scales {
        if triad == 0 {
            continue;
        }
        spell_triad(triad, feminine, &mut parts);
        if let Some(forms) = forms {
            parts.push(plural_form(triad, forms));
        }
    }
    parts.join(" ")
}

/// Full spelled-out amount: `<spelled rubles> <рубль form> <NN> <копейка
/// form>`. Kopecks stay numeric with two digits. Negative amounts spell
/// their absolute value.
pub fn rubles_in_words(amount: f64) -> String {
    let kopecks = (amount.abs() * 100.0).round() as u64;
    let rub = kopecks / 100;
    let kop = kopecks % 100;
    format!(
        "{} {} {:02} {}",
        spell_int(rub),
        plural_form(rub, &RUB_FORMS),
        kop,
        plural_form(kop, &KOP_FORMS)
    )
}
