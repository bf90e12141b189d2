use chrono::NaiveDateTime;

/// A single decoded spreadsheet cell, as delivered by the workbook decoder.
/// Numbers and dates keep their native typing.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
    #[default]
    Empty,
}

impl CellValue {
    /// Blank means empty, or text that trims to nothing.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Shared value-formatting rule: dates render as local calendar date
    /// text, numbers as their shortest decimal string, text as-is.
    pub fn render(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Date(d) => d.format("%d.%m.%Y").to_string(),
            CellValue::Empty => String::new(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// Ordered key→value mapping backing every pipeline stage. Keys are header
/// strings or positional letter codes. Insertion order is preserved and
/// positional access stays meaningful; `set` on an existing key overwrites
/// in place, so later writes win on merge.
#[derive(Debug, Clone, Default)]
pub struct Row {
    fields: Vec<(String, CellValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: CellValue) {
        let key = key.into();
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.fields.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Exact match first, then the first case-insensitive match.
    pub fn get_ci(&self, key: &str) -> Option<&CellValue> {
        if let Some(v) = self.get(key) {
            return Some(v);
        }
        let wanted = key.to_lowercase();
        self.fields
            .iter()
            .find(|(k, _)| k.to_lowercase() == wanted)
            .map(|(_, v)| v)
    }

    /// Rendered text of a key, or the empty string.
    pub fn text(&self, key: &str) -> String {
        self.get(key).map(CellValue::render).unwrap_or_default()
    }

    /// Value in positional column `idx`, in insertion order.
    pub fn value_at(&self, idx: usize) -> Option<&CellValue> {
        self.fields.get(idx).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
