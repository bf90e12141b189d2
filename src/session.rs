//! Stateful load/preview/export/reset surface. One `Session` owns the
//! aliased row set created at load time and the parsed template cache;
//! export-time failures leave both intact, so a failed batch can simply be
//! re-run.

use crate::error::{LoadError, TemplateError};
use crate::export::{self, ExportOptions, ExportOutput, ExportProgress};
use crate::ingest::{self, Sheet};
use crate::layout::{self, AliasedRow};
use crate::render::PdfRenderer;
use crate::template::{Template, TemplateCache, TemplateKind};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Debug, Default)]
pub struct Session {
    rows: Vec<AliasedRow>,
    templates: TemplateCache,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest the first sheet and alias every row. Replaces any previously
    /// loaded dataset.
    pub fn load(&mut self, sheet: &Sheet) -> Result<usize, LoadError> {
        let raw = ingest::ingest(sheet)?;
        self.rows = raw.iter().map(layout::alias).collect();
        info!(rows = self.rows.len(), "dataset loaded");
        Ok(self.rows.len())
    }

    pub fn rows(&self) -> &[AliasedRow] {
        &self.rows
    }

    pub fn is_loaded(&self) -> bool {
        !self.rows.is_empty()
    }

    /// Column keys of the first loaded row, for the name-column selector.
    pub fn columns(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|r| r.row.keys().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn set_template(&mut self, kind: TemplateKind, template: Template) {
        self.templates.put(kind, template);
    }

    /// Load a template from disk unless one is already cached.
    pub fn load_template(
        &mut self,
        kind: TemplateKind,
        path: impl AsRef<Path>,
    ) -> Result<(), TemplateError> {
        self.templates.get_or_load(kind, path)?;
        Ok(())
    }

    pub fn template(&self, kind: TemplateKind) -> Option<Arc<Template>> {
        self.templates.get(kind)
    }

    /// Substitute one loaded row into a cached template, without
    /// enrichment. Used for on-screen preview before an export run.
    pub fn preview(&self, index: usize, kind: TemplateKind) -> Result<String> {
        let aliased = self
            .rows
            .get(index)
            .with_context(|| format!("row {} is not loaded", index))?;
        let template = self
            .templates
            .get(kind)
            .with_context(|| format!("{} template is not loaded", kind.as_str()))?;
        Ok(template.page(&aliased.row))
    }

    /// Run one export over the loaded dataset with both cached templates.
    pub async fn export<R: PdfRenderer>(
        &self,
        renderer: &R,
        options: &ExportOptions,
        progress: Option<&mpsc::Sender<ExportProgress>>,
    ) -> Result<ExportOutput> {
        let invoice = self
            .templates
            .get(TemplateKind::Invoice)
            .context("invoice template is not loaded")?;
        let act = self
            .templates
            .get(TemplateKind::Act)
            .context("act template is not loaded")?;
        export::export(&self.rows, &invoice, &act, renderer, options, progress).await
    }

    /// Drop the dataset and invalidate the template cache.
    pub fn reset(&mut self) {
        self.rows.clear();
        self.templates.clear();
        info!("session reset");
    }
}
