// src/enrich/mod.rs
//! Derives the computed presentation fields per row: invoice numbering,
//! local date, currency formatting, the spelled-out amount and the
//! composed service description. Every derivation is best-effort with
//! numeric/text fallbacks; this stage never fails.

use crate::layout::{keys, AliasedRow};
use crate::row::{CellValue, Row};
use serde::{Deserialize, Serialize};
use tracing::trace;

pub mod dates;
pub mod money;
pub mod words;

/// `AliasedRow` plus the computed keys. Ephemeral: rebuilt per export run
/// because numbering depends on caller-chosen parameters.
pub type EnrichedRow = Row;

pub const KEY_DATE_RU: &str = "дата_ру";
pub const KEY_AMOUNT_FMT: &str = "сумма_формат";
pub const KEY_AMOUNT_WORDS: &str = "сумма_пропись";
pub const KEY_BASIS: &str = "основание";

const VEHICLE_MARKER: &str = "а/м";
const DRIVER_MARKER: &str = "водитель";
const DRIVER_ABBREVIATIONS: [&str; 2] = ["водитель", "вод."];
const BASIS_CLAUSE: &str = "Договор-заявка на организацию перевозки груза";

/// Invoice numbering parameters chosen at export time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumberingOptions {
    /// Prepended verbatim to every synthesized number.
    pub prefix: String,
    /// Running number of the dataset's first row.
    pub start: u32,
}

impl Default for NumberingOptions {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            start: 1,
        }
    }
}

/// Enrich one aliased row. `index` is the row's 0-based position within
/// the full loaded dataset, not within any filtered subset.
pub fn enrich(aliased: &AliasedRow, index: usize, numbering: &NumberingOptions) -> EnrichedRow {
    let mut row = aliased.row.clone();

    // synthesized only when the source carries no number
    if row.text(keys::INVOICE_NO).trim().is_empty() {
        let running = numbering.start as u64 + index as u64;
        row.set(
            keys::INVOICE_NO,
            CellValue::Text(format!("{}{:04}", numbering.prefix, running)),
        );
    }

    let date_ru = row.get(keys::DATE).map(dates::to_local).unwrap_or_default();
    row.set(KEY_DATE_RU, CellValue::Text(date_ru));

    let amount = row.get(keys::AMOUNT).map(money::parse_amount).unwrap_or(0.0);
    row.set(KEY_AMOUNT_FMT, CellValue::Text(money::format_rub(amount)));
    row.set(
        KEY_AMOUNT_WORDS,
        CellValue::Text(words::rubles_in_words(amount)),
    );

    row.set(keys::SERVICE, CellValue::Text(compose_service(&row)));
    row.set(KEY_BASIS, CellValue::Text(BASIS_CLAUSE.to_string()));

    trace!(index, number = %row.text(keys::INVOICE_NO), "enriched row");
    row
}

/// Three-line service block: description with an opening quote, then
/// route / vehicle / driver-role markers, then the driver's name with any
/// leading role abbreviation stripped. Empty lines are omitted.
fn compose_service(row: &Row) -> String {
    let description = row.text(keys::DESCRIPTION).trim().to_string();
    let route = row.text(keys::ROUTE).trim().to_string();
    let plate = row.text(keys::PLATE).trim().to_string();
    let driver = strip_driver_role(row.text(keys::DRIVER).trim());

    let mut lines: Vec<String> = Vec::new();
    if !description.is_empty() {
        lines.push(format!("{} «", description));
    }
    let mut middle: Vec<String> = Vec::new();
    if !route.is_empty() {
        middle.push(route);
    }
    if !plate.is_empty() {
        middle.push(format!("{} {}", VEHICLE_MARKER, plate));
    }
    if !driver.is_empty() {
        middle.push(DRIVER_MARKER.to_string());
    }
    if !middle.is_empty() {
        lines.push(middle.join(" "));
    }
    if !driver.is_empty() {
        lines.push(driver);
    }
    lines.join("\n")
}

fn strip_driver_role(name: &str) -> String {
    let lower = name.to_lowercase();
    for abbr in DRIVER_ABBREVIATIONS {
        if let Some(rest) = lower.strip_prefix(abbr) {
            // only a standalone role word is stripped: the next character
            // must end the word, unless the abbreviation carries its own
            // trailing dot ("водительница" is part of the name)
            let boundary = abbr.ends_with('.')
                || rest
                    .chars()
                    .next()
                    .map_or(true, |c| c == ' ' || c == '.' || c == ':');
            if boundary {
                // Cyrillic case pairs share UTF-8 length, so the byte
                // offset into the original string is valid
                return name[abbr.len()..]
                    .trim_start_matches([' ', '.', ':'])
                    .to_string();
            }
        }
    }
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{alias, Layout};
    use crate::row::Row;

    fn aliased_with(pairs: &[(&str, &str)]) -> AliasedRow {
        let mut row = Row::new();
        for (k, v) in pairs {
            row.set(*k, CellValue::from(*v));
        }
        AliasedRow {
            row,
            layout: Layout::Legacy,
        }
    }

    fn numbering(prefix: &str, start: u32) -> NumberingOptions {
        NumberingOptions {
            prefix: prefix.to_string(),
            start,
        }
    }

    #[test]
    fn invoice_number_is_synthesized_from_position() {
        let aliased = aliased_with(&[(keys::DESCRIPTION, "перевозка")]);
        let row = enrich(&aliased, 0, &numbering("ТУ-", 1));
        assert_eq!(row.text(keys::INVOICE_NO), "ТУ-0001");
        let row = enrich(&aliased, 6, &numbering("ТУ-", 1));
        assert_eq!(row.text(keys::INVOICE_NO), "ТУ-0007");
        let row = enrich(&aliased, 6, &numbering("", 120));
        assert_eq!(row.text(keys::INVOICE_NO), "0126");
    }

    #[test]
    fn synthesis_is_stable_under_re_export() {
        let aliased = aliased_with(&[(keys::DESCRIPTION, "перевозка")]);
        let a = enrich(&aliased, 3, &numbering("С-", 10));
        let b = enrich(&aliased, 3, &numbering("С-", 10));
        assert_eq!(a.text(keys::INVOICE_NO), b.text(keys::INVOICE_NO));
        assert_eq!(a.text(keys::INVOICE_NO), "С-0013");
    }

    #[test]
    fn source_invoice_number_is_kept_verbatim() {
        let aliased = aliased_with(&[(keys::INVOICE_NO, "125/а")]);
        let row = enrich(&aliased, 0, &numbering("ТУ-", 1));
        assert_eq!(row.text(keys::INVOICE_NO), "125/а");
    }

    #[test]
    fn computed_keys_are_attached() {
        let aliased = aliased_with(&[
            (keys::AMOUNT, "12 500,75"),
            (keys::DATE, "2024-03-07"),
        ]);
        let row = enrich(&aliased, 0, &NumberingOptions::default());
        assert_eq!(row.text(KEY_DATE_RU), "07.03.2024");
        assert_eq!(row.text(KEY_AMOUNT_FMT), "12\u{a0}500,75\u{a0}₽");
        assert_eq!(
            row.text(KEY_AMOUNT_WORDS),
            "двенадцать тысяч пятьсот рублей 75 копеек"
        );
        assert_eq!(row.text(KEY_BASIS), BASIS_CLAUSE);
    }

    #[test]
    fn service_block_composes_three_lines() {
        let aliased = aliased_with(&[
            (keys::DESCRIPTION, "Транспортные услуги"),
            (keys::ROUTE, "Москва — Тверь"),
            (keys::PLATE, "А123БВ77"),
            (keys::DRIVER, "водитель Иванов И.И."),
        ]);
        let row = enrich(&aliased, 0, &NumberingOptions::default());
        assert_eq!(
            row.text(keys::SERVICE),
            "Транспортные услуги «\nМосква — Тверь а/м А123БВ77 водитель\nИванов И.И."
        );
    }

    #[test]
    fn empty_service_lines_are_omitted() {
        let aliased = aliased_with(&[(keys::DESCRIPTION, "Перевозка")]);
        let row = enrich(&aliased, 0, &NumberingOptions::default());
        assert_eq!(row.text(keys::SERVICE), "Перевозка «");
    }

    #[test]
    fn driver_role_abbreviation_is_stripped() {
        assert_eq!(strip_driver_role("водитель Иванов"), "Иванов");
        assert_eq!(strip_driver_role("Вод. Петров"), "Петров");
        assert_eq!(strip_driver_role("вод.Петров"), "Петров");
        assert_eq!(strip_driver_role("Сидоров С.С."), "Сидоров С.С.");
    }

    #[test]
    fn longer_words_starting_with_the_role_are_left_alone() {
        assert_eq!(
            strip_driver_role("водительница Иванова"),
            "водительница Иванова"
        );
    }

    #[test]
    fn enrichment_over_a_full_aliased_row_round_trips() {
        let mut raw = Row::new();
        for (i, v) in [
            "Перевозка груза",
            "Тверь — Москва",
            "ГАЗель",
            "В456ГД69",
            "Петров П.П.",
            "15000",
            "",
            "2024-03-07",
        ]
        .iter()
        .enumerate()
        {
            raw.set(crate::ingest::column_letter(i), CellValue::from(*v));
        }
        let row = enrich(&alias(&raw), 0, &numbering("№ ", 1));
        assert_eq!(row.text(keys::INVOICE_NO), "№ 0001");
        assert_eq!(row.text(KEY_DATE_RU), "07.03.2024");
        assert_eq!(row.text(KEY_AMOUNT_FMT), "15\u{a0}000,00\u{a0}₽");
    }
}
