// src/layout/mod.rs
//! Maps raw columns onto the fixed semantic field set, disambiguating
//! between the two historical column orderings of the source table. The
//! choice is made independently per row: two rows of one dataset may
//! resolve differently.

use crate::ingest::RawRow;
use crate::row::{CellValue, Row};
use serde::Serialize;

/// Semantic business keys merged over the raw columns. Semantic keys win
/// on collision with a raw key of the same name.
pub mod keys {
    pub const DESCRIPTION: &str = "описание";
    pub const ROUTE: &str = "маршрут";
    pub const VEHICLE_MAKE: &str = "марка";
    pub const PLATE: &str = "госномер";
    pub const DRIVER: &str = "водитель";
    pub const AMOUNT: &str = "сумма";
    pub const DATE: &str = "дата";
    pub const INVOICE_NO: &str = "номер счёта";
    /// Full vehicle string: make + plate.
    pub const VEHICLE: &str = "тс";
    /// Provisional at aliasing time; superseded by enrichment.
    pub const SERVICE: &str = "услуга";
}

/// Which historical column ordering a row resolved under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Layout {
    /// Column A holds the free-text description; no invoice number column.
    Legacy,
    /// Column A holds the invoice number, description shifted to column B.
    Current,
}

/// `RawRow` extended with the semantic keys, tagged with the layout the
/// resolver picked for it.
#[derive(Debug, Clone)]
pub struct AliasedRow {
    pub row: Row,
    pub layout: Layout,
}

/// Marker identifying column B as a transport-service description under
/// the current layout. Matched case-insensitively as a substring, so it
/// covers the inflected forms too.
const SERVICE_MARKER: &str = "транспортн";

/// Positional source columns for each semantic field under one layout.
struct Slots {
    description: usize,
    route: usize,
    make: usize,
    plate: usize,
    driver: usize,
    amount: usize,
    date: usize,
    invoice: Option<usize>,
}

impl Layout {
    fn slots(self) -> Slots {
        match self {
            Layout::Current => Slots {
                description: 1,
                route: 2,
                make: 3,
                plate: 4,
                driver: 5,
                amount: 6,
                date: 8,
                invoice: Some(0),
            },
            Layout::Legacy => Slots {
                description: 0,
                route: 1,
                make: 2,
                plate: 3,
                driver: 4,
                amount: 5,
                date: 7,
                invoice: None,
            },
        }
    }
}

/// Short numeric invoice identifier: an integer cell, or a digits-only
/// string no longer than 10 characters.
fn is_short_invoice_id(cell: &CellValue) -> bool {
    match cell {
        CellValue::Number(n) => n.fract() == 0.0 && *n >= 0.0,
        CellValue::Text(s) => {
            let t = s.trim();
            !t.is_empty() && t.len() <= 10 && t.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

/// Pick the layout for one row. Total: every row maps to exactly one
/// variant.
pub fn detect(raw: &RawRow) -> Layout {
    let a_is_id = raw.value_at(0).is_some_and(is_short_invoice_id);
    let b_text = raw
        .value_at(1)
        .map(CellValue::render)
        .unwrap_or_default()
        .to_lowercase();
    if a_is_id && b_text.contains(SERVICE_MARKER) {
        Layout::Current
    } else {
        Layout::Legacy
    }
}

/// Resolve one `RawRow` into an `AliasedRow`. No error path: unmapped or
/// missing source columns yield empty strings.
pub fn alias(raw: &RawRow) -> AliasedRow {
    let layout = detect(raw);
    let slots = layout.slots();

    let text_at = |i: usize| {
        raw.value_at(i)
            .map(|c| c.render().trim().to_string())
            .unwrap_or_default()
    };
    let cell_at = |i: usize| raw.value_at(i).cloned().unwrap_or(CellValue::Empty);

    let mut row = raw.clone();
    row.set(keys::DESCRIPTION, CellValue::Text(text_at(slots.description)));
    row.set(keys::ROUTE, CellValue::Text(text_at(slots.route)));
    row.set(keys::VEHICLE_MAKE, CellValue::Text(text_at(slots.make)));
    row.set(keys::PLATE, CellValue::Text(text_at(slots.plate)));
    row.set(keys::DRIVER, CellValue::Text(text_at(slots.driver)));
    // amount and date keep native typing for enrichment
    row.set(keys::AMOUNT, cell_at(slots.amount));
    row.set(keys::DATE, cell_at(slots.date));
    if let Some(i) = slots.invoice {
        row.set(keys::INVOICE_NO, CellValue::Text(text_at(i)));
    }

    let vehicle = format!("{} {}", text_at(slots.make), text_at(slots.plate))
        .trim()
        .to_string();
    row.set(keys::VEHICLE, CellValue::Text(vehicle));
    let service = format!("{} {}", text_at(slots.description), text_at(slots.route))
        .trim()
        .to_string();
    row.set(keys::SERVICE, CellValue::Text(service));

    AliasedRow { row, layout }
}
