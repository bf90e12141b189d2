// src/export/mod.rs
//! Batch export: render an invoice and an act per row and package them as
//! either one ZIP of per-row PDF pairs or two combined multi-page PDFs.
//! Rows are processed strictly in input order; the first rendering failure
//! aborts the whole batch.

use crate::enrich::{self, EnrichedRow, NumberingOptions};
use crate::layout::{keys, AliasedRow};
use crate::render::{PageOptions, PdfRenderer};
use crate::template::{substitute, Escape, Template};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Write};
use tokio::sync::mpsc;
use tracing::{info, instrument};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Longest sanitized file name kept for archive entries.
const MAX_NAME_LEN: usize = 140;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportMode {
    /// One archive with an `invoice/<name>.pdf` + `act/<name>.pdf` pair
    /// per row.
    PerRowZip,
    /// Two multi-page documents, one page per row each.
    Combined,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
    pub mode: ExportMode,
    /// Column whose value names each per-row output file; falls back to
    /// the invoice number, then to a positional `row_NNNN` code.
    pub name_column: Option<String>,
    pub numbering: NumberingOptions,
    pub page: PageOptions,
}

impl ExportOptions {
    pub fn new(mode: ExportMode) -> Self {
        Self {
            mode,
            name_column: None,
            numbering: NumberingOptions::default(),
            page: PageOptions::default(),
        }
    }
}

/// Incremental status reported while the batch runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportProgress {
    /// Row `index` (0-based) out of `total` has been processed.
    Row { index: usize, total: usize },
    Done { total: usize },
}

/// What an export run produced.
#[derive(Debug)]
pub enum ExportOutput {
    /// ZIP archive bytes (per-row mode).
    Archive(Vec<u8>),
    /// `invoices.pdf` and `acts.pdf` byte blobs (combined mode).
    Combined { invoices: Vec<u8>, acts: Vec<u8> },
}

/// Run one export over the full ordered row set. Enriched rows are
/// recomputed here because numbering parameters are chosen per run.
#[instrument(level = "info", skip_all, fields(rows = rows.len(), mode = ?options.mode))]
pub async fn export<R: PdfRenderer>(
    rows: &[AliasedRow],
    invoice: &Template,
    act: &Template,
    renderer: &R,
    options: &ExportOptions,
    progress: Option<&mpsc::Sender<ExportProgress>>,
) -> Result<ExportOutput> {
    renderer
        .ensure_available()
        .context("PDF renderer is not available")?;
    anyhow::ensure!(!rows.is_empty(), "nothing to export: no data rows loaded");

    match options.mode {
        ExportMode::PerRowZip => export_zip(rows, invoice, act, renderer, options, progress).await,
        ExportMode::Combined => {
            export_combined(rows, invoice, act, renderer, options, progress).await
        }
    }
}

async fn export_zip<R: PdfRenderer>(
    rows: &[AliasedRow],
    invoice: &Template,
    act: &Template,
    renderer: &R,
    options: &ExportOptions,
    progress: Option<&mpsc::Sender<ExportProgress>>,
) -> Result<ExportOutput> {
    let total = rows.len();
    // insertion-ordered name → (invoice, act) pairs; a colliding name
    // silently replaces the earlier row's pair, so the archive keeps
    // last-wins semantics instead of rejecting the duplicate entry
    let mut artifacts: Vec<(String, (Vec<u8>, Vec<u8>))> = Vec::with_capacity(total);

    for (index, aliased) in rows.iter().enumerate() {
        let row = enrich::enrich(aliased, index, &options.numbering);
        let name = file_name(&row, index, options.name_column.as_deref());

        let invoice_pdf = renderer
            .render(&invoice.page(&row), &options.page)
            .await
            .with_context(|| format!("rendering invoice for row {}", index + 1))?;
        let act_pdf = renderer
            .render(&act.page(&row), &options.page)
            .await
            .with_context(|| format!("rendering act for row {}", index + 1))?;

        if let Some(slot) = artifacts.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = (invoice_pdf, act_pdf);
        } else {
            artifacts.push((name, (invoice_pdf, act_pdf)));
        }

        report(progress, ExportProgress::Row { index, total }).await;
        tokio::task::yield_now().await;
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let zip_opts = SimpleFileOptions::default();
    for (name, (invoice_pdf, act_pdf)) in &artifacts {
        writer.start_file(format!("invoice/{}.pdf", name), zip_opts)?;
        writer.write_all(invoice_pdf)?;
        writer.start_file(format!("act/{}.pdf", name), zip_opts)?;
        writer.write_all(act_pdf)?;
    }

    let cursor = writer.finish().context("finalizing archive")?;
    report(progress, ExportProgress::Done { total }).await;
    info!(total, "per-row export complete");
    Ok(ExportOutput::Archive(cursor.into_inner()))
}

async fn export_combined<R: PdfRenderer>(
    rows: &[AliasedRow],
    invoice: &Template,
    act: &Template,
    renderer: &R,
    options: &ExportOptions,
    progress: Option<&mpsc::Sender<ExportProgress>>,
) -> Result<ExportOutput> {
    let total = rows.len();
    let mut invoice_pages = Vec::with_capacity(total);
    let mut act_pages = Vec::with_capacity(total);

    for (index, aliased) in rows.iter().enumerate() {
        let row = enrich::enrich(aliased, index, &options.numbering);
        invoice_pages.push(substitute(&invoice.body, &row, Escape::Html));
        act_pages.push(substitute(&act.body, &row, Escape::Html));
        report(progress, ExportProgress::Row { index, total }).await;
        tokio::task::yield_now().await;
    }

    let invoices = renderer
        .render(&combined_document(&invoice.style, &invoice_pages), &options.page)
        .await
        .context("rendering combined invoices")?;
    let acts = renderer
        .render(&combined_document(&act.style, &act_pages), &options.page)
        .await
        .context("rendering combined acts")?;

    report(progress, ExportProgress::Done { total }).await;
    info!(total, "combined export complete");
    Ok(ExportOutput::Combined { invoices, acts })
}

/// One document holding every row's fragment as a page. Every page except
/// the last forces a break after it.
fn combined_document(style: &str, pages: &[String]) -> String {
    let mut html = String::new();
    html.push_str("<style>");
    html.push_str(style);
    html.push_str(
        ".doc-page{page-break-after:always}.doc-page:last-child{page-break-after:auto}",
    );
    html.push_str("</style>");
    for page in pages {
        html.push_str("<div class=\"doc-page\">");
        html.push_str(page);
        html.push_str("</div>");
    }
    html
}

/// Resolve the output name for one row: the designated name column, else
/// the row's invoice number, else a zero-padded positional code.
fn file_name(row: &EnrichedRow, index: usize, name_column: Option<&str>) -> String {
    let preferred = name_column
        .and_then(|c| row.get_ci(c))
        .map(crate::row::CellValue::render)
        .unwrap_or_default();
    let raw = if !preferred.trim().is_empty() {
        preferred
    } else {
        let number = row.text(keys::INVOICE_NO);
        if !number.trim().is_empty() {
            number
        } else {
            format!("row_{:04}", index + 1)
        }
    };
    sanitize_file_name(&raw)
}

/// Replace filesystem-unsafe and control characters with `_`, collapse
/// whitespace runs, and cap the length.
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let capped: String = collapsed.chars().take(MAX_NAME_LEN).collect();
    let capped = capped.trim().to_string();
    if capped.is_empty() {
        "_".to_string()
    } else {
        capped
    }
}

async fn report(progress: Option<&mpsc::Sender<ExportProgress>>, event: ExportProgress) {
    if let Some(tx) = progress {
        let _ = tx.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Layout;
    use crate::row::{CellValue, Row};
    use anyhow::anyhow;
    use std::collections::BTreeSet;
    use std::io::Read;
    use std::sync::Mutex;
    use zip::ZipArchive;

    /// Records every rendered document; can be told to fail from a given
    /// call onward.
    struct FakeRenderer {
        calls: Mutex<Vec<String>>,
        fail_from: Option<usize>,
        available: bool,
    }

    impl FakeRenderer {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_from: None,
                available: true,
            }
        }

        fn failing_from(call: usize) -> Self {
            Self {
                fail_from: Some(call),
                ..Self::new()
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl PdfRenderer for FakeRenderer {
        fn ensure_available(&self) -> Result<()> {
            if self.available {
                Ok(())
            } else {
                Err(anyhow!("html2pdf engine is missing"))
            }
        }

        async fn render(&self, html: &str, _options: &PageOptions) -> Result<Vec<u8>> {
            let mut calls = self.calls.lock().unwrap();
            if let Some(limit) = self.fail_from {
                if calls.len() >= limit {
                    return Err(anyhow!("renderer crashed"));
                }
            }
            calls.push(html.to_string());
            Ok(format!("%PDF {}", calls.len()).into_bytes())
        }
    }

    fn aliased(pairs: &[(&str, &str)]) -> AliasedRow {
        let mut row = Row::new();
        for (k, v) in pairs {
            row.set(*k, CellValue::from(*v));
        }
        AliasedRow {
            row,
            layout: Layout::Legacy,
        }
    }

    fn dataset() -> Vec<AliasedRow> {
        vec![
            aliased(&[(keys::DESCRIPTION, "перевозка"), (keys::AMOUNT, "100")]),
            aliased(&[(keys::DESCRIPTION, "доставка"), (keys::AMOUNT, "200")]),
            aliased(&[(keys::DESCRIPTION, "экспедирование"), (keys::AMOUNT, "300")]),
        ]
    }

    fn templates() -> (Template, Template) {
        (
            Template::parse("<style>td{border:0}</style><body>Счёт {номер счёта}</body>"),
            Template::parse("<body>Акт {номер счёта} на {сумма_формат}</body>"),
        )
    }

    fn archive_names(bytes: Vec<u8>) -> BTreeSet<String> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[tokio::test]
    async fn per_row_mode_packs_invoice_and_act_folders() {
        let rows = dataset();
        let (invoice, act) = templates();
        let renderer = FakeRenderer::new();
        let options = ExportOptions::new(ExportMode::PerRowZip);

        let out = export(&rows, &invoice, &act, &renderer, &options, None)
            .await
            .unwrap();
        let ExportOutput::Archive(bytes) = out else {
            panic!("expected archive output");
        };
        let names = archive_names(bytes);
        assert_eq!(
            names,
            BTreeSet::from([
                "invoice/0001.pdf".to_string(),
                "act/0001.pdf".to_string(),
                "invoice/0002.pdf".to_string(),
                "act/0002.pdf".to_string(),
                "invoice/0003.pdf".to_string(),
                "act/0003.pdf".to_string(),
            ])
        );
        // two renders per row
        assert_eq!(renderer.call_count(), 6);
    }

    #[tokio::test]
    async fn archive_entries_contain_rendered_pdfs() {
        let rows = dataset();
        let (invoice, act) = templates();
        let renderer = FakeRenderer::new();
        let options = ExportOptions::new(ExportMode::PerRowZip);

        let ExportOutput::Archive(bytes) =
            export(&rows, &invoice, &act, &renderer, &options, None)
                .await
                .unwrap()
        else {
            panic!("expected archive output");
        };
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut entry = archive.by_name("invoice/0001.pdf").unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert!(content.starts_with("%PDF"));
    }

    #[tokio::test]
    async fn combined_mode_renders_two_documents_with_one_page_per_row() {
        let rows = dataset();
        let (invoice, act) = templates();
        let renderer = FakeRenderer::new();
        let options = ExportOptions::new(ExportMode::Combined);

        let out = export(&rows, &invoice, &act, &renderer, &options, None)
            .await
            .unwrap();
        assert!(matches!(out, ExportOutput::Combined { .. }));
        assert_eq!(renderer.call_count(), 2);

        let calls = renderer.calls.lock().unwrap();
        // same total page count as per-row mode: 2 × row count
        let pages: usize = calls
            .iter()
            .map(|html| html.matches("class=\"doc-page\"").count())
            .sum();
        assert_eq!(pages, 2 * rows.len());
        // hoisted template style plus the shared page-break rule
        assert!(calls[0].contains("td{border:0}"));
        assert!(calls[0].contains("page-break-after:always"));
        assert!(calls[0].contains("Счёт 0001"));
        assert!(calls[0].contains("Счёт 0003"));
    }

    #[tokio::test]
    async fn name_column_wins_then_invoice_number_then_positional() {
        let rows = vec![
            aliased(&[("Контрагент", "ООО Ромашка"), (keys::DESCRIPTION, "а")]),
            aliased(&[(keys::DESCRIPTION, "б"), (keys::INVOICE_NO, "З-17")]),
        ];
        let (invoice, act) = templates();
        let renderer = FakeRenderer::new();
        let mut options = ExportOptions::new(ExportMode::PerRowZip);
        options.name_column = Some("контрагент".to_string());

        let ExportOutput::Archive(bytes) =
            export(&rows, &invoice, &act, &renderer, &options, None)
                .await
                .unwrap()
        else {
            panic!("expected archive output");
        };
        let names = archive_names(bytes);
        assert!(names.contains("invoice/ООО Ромашка.pdf"));
        // source invoice number kept verbatim beats the synthesized one
        assert!(names.contains("invoice/З-17.pdf"));
    }

    #[tokio::test]
    async fn positional_fallback_is_used_when_nothing_else_names_the_row() {
        // blank numbering prefix and an empty source number would still
        // synthesize, so force an all-blank invoice number via a name
        // column pointing nowhere and a whitespace source number
        let rows = vec![aliased(&[(keys::INVOICE_NO, "   ")])];
        let row = enrich::enrich(&rows[0], 6, &NumberingOptions::default());
        assert_eq!(file_name(&row, 6, None), "0007");
        // with no synthesized number at all the positional code applies
        let bare = Row::new();
        assert_eq!(file_name(&bare, 6, None), "row_0007");
    }

    #[tokio::test]
    async fn colliding_names_overwrite_silently() {
        // both rows resolve to the same name column value; the archive
        // keeps a single pair (documented open behavior, not corrected)
        let rows = vec![
            aliased(&[("имя", "дубль"), (keys::DESCRIPTION, "а")]),
            aliased(&[("имя", "дубль"), (keys::DESCRIPTION, "б")]),
        ];
        let (invoice, act) = templates();
        let renderer = FakeRenderer::new();
        let mut options = ExportOptions::new(ExportMode::PerRowZip);
        options.name_column = Some("имя".to_string());

        let ExportOutput::Archive(bytes) =
            export(&rows, &invoice, &act, &renderer, &options, None)
                .await
                .unwrap()
        else {
            panic!("expected archive output");
        };
        let names = archive_names(bytes.clone());
        assert_eq!(names.len(), 2);
        assert!(names.contains("invoice/дубль.pdf"));
        // all four renders still happened
        assert_eq!(renderer.call_count(), 4);

        // the later row's pair won: its invoice was render call 3
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut entry = archive.by_name("invoice/дубль.pdf").unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert_eq!(content, "%PDF 3");
    }

    #[tokio::test]
    async fn progress_reports_each_row_then_done() {
        let rows = dataset();
        let (invoice, act) = templates();
        let renderer = FakeRenderer::new();
        let options = ExportOptions::new(ExportMode::PerRowZip);
        let (tx, mut rx) = mpsc::channel(16);

        export(&rows, &invoice, &act, &renderer, &options, Some(&tx))
            .await
            .unwrap();
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                ExportProgress::Row { index: 0, total: 3 },
                ExportProgress::Row { index: 1, total: 3 },
                ExportProgress::Row { index: 2, total: 3 },
                ExportProgress::Done { total: 3 },
            ]
        );
    }

    #[tokio::test]
    async fn first_row_failure_aborts_the_whole_batch() {
        let rows = dataset();
        let (invoice, act) = templates();
        // fail on the second row's invoice render
        let renderer = FakeRenderer::failing_from(2);
        let options = ExportOptions::new(ExportMode::PerRowZip);
        let (tx, mut rx) = mpsc::channel(16);

        let err = export(&rows, &invoice, &act, &renderer, &options, Some(&tx))
            .await
            .unwrap_err();
        drop(tx);
        assert!(err.to_string().contains("rendering invoice for row 2"));
        assert!(format!("{:#}", err).contains("renderer crashed"));

        // only the first row was reported; no Done event
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events, vec![ExportProgress::Row { index: 0, total: 3 }]);
    }

    #[tokio::test]
    async fn missing_renderer_is_detected_before_any_work() {
        let rows = dataset();
        let (invoice, act) = templates();
        let renderer = FakeRenderer {
            available: false,
            ..FakeRenderer::new()
        };
        let options = ExportOptions::new(ExportMode::Combined);

        let err = export(&rows, &invoice, &act, &renderer, &options, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("renderer is not available"));
        assert_eq!(renderer.call_count(), 0);
    }

    #[test]
    fn sanitizing_replaces_unsafe_characters_and_caps_length() {
        assert_eq!(
            sanitize_file_name("ООО \"Ромашка\" / счёт: март?"),
            "ООО _Ромашка_ _ счёт_ март_"
        );
        // control characters are replaced before whitespace collapses,
        // so a tab becomes an underscore, not a space
        assert_eq!(sanitize_file_name("a\u{0}b\tc"), "a_b_c");
        assert_eq!(sanitize_file_name("  много   пробелов  "), "много пробелов");
        let long = "н".repeat(300);
        assert_eq!(sanitize_file_name(&long).chars().count(), 140);
        assert_eq!(sanitize_file_name("///"), "___");
    }
}
