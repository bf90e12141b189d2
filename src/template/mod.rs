// src/template/mod.rs
//! Placeholder substitution over HTML template fragments. Tokens come in
//! two equivalent syntaxes, `{{Key}}` and `{Key}`, resolved in one pass
//! with the double-brace alternative first. The token body excludes
//! braces, `:`, `;` and newlines, so CSS declarations and rule blocks in
//! the same markup are never mistaken for placeholders.

use crate::error::TemplateError;
use crate::row::{CellValue, Row};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^{}:;\r\n]+)\}\}|\{([^{}:;\r\n]+)\}").unwrap());

static STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style[^>]*>(.*?)</style>").unwrap());
static BODY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<body[^>]*>(.*?)</body>").unwrap());

/// The two documents produced per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    Invoice,
    Act,
}

impl TemplateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateKind::Invoice => "invoice",
            TemplateKind::Act => "act",
        }
    }
}

/// How substituted values are written into the target content. Cell
/// content takes plain strings; HTML output must escape data values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    Html,
    None,
}

/// An HTML template: the `<style>` block hoisted verbatim plus the body
/// fragment carrying placeholder tokens. Parsed once, cached for the
/// session.
#[derive(Debug, Clone)]
pub struct Template {
    pub style: String,
    pub body: String,
}

impl Template {
    /// Split a full HTML document into its style block and body fragment.
    /// Documents without a `<body>` element use everything outside the
    /// style blocks.
    pub fn parse(document: &str) -> Self {
        let style = STYLE_RE
            .captures(document)
            .map(|c| c[1].to_string())
            .unwrap_or_default();
        let body = BODY_RE
            .captures(document)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| STYLE_RE.replace_all(document, "").into_owned());
        Template { style, body }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| TemplateError::Unreachable {
            path: path.to_path_buf(),
            source,
        })?;
        let template = Self::parse(&text);
        if template.body.trim().is_empty() {
            return Err(TemplateError::EmptyBody(path.display().to_string()));
        }
        debug!(path = %path.display(), "template loaded");
        Ok(template)
    }

    /// Standalone HTML for one rendered document page: hoisted style plus
    /// the substituted body.
    pub fn page(&self, row: &Row) -> String {
        format!(
            "<style>{}</style>{}",
            self.style,
            substitute(&self.body, row, Escape::Html)
        )
    }
}

/// Fill every placeholder token in `fragment` from `row`. Lookup is
/// case-insensitive; unmatched tokens resolve to the empty string.
pub fn substitute(fragment: &str, row: &Row, escape: Escape) -> String {
    TOKEN_RE
        .replace_all(fragment, |caps: &regex::Captures| {
            let key = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().trim())
                .unwrap_or("");
            let value = row.get_ci(key).map(CellValue::render).unwrap_or_default();
            match escape {
                Escape::Html => escape_html(&value),
                Escape::None => value,
            }
        })
        .into_owned()
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Session-scoped template cache: one slot per document kind, reused for
/// every row and every export run until an explicit reset.
#[derive(Debug, Default)]
pub struct TemplateCache {
    invoice: Option<Arc<Template>>,
    act: Option<Arc<Template>>,
}

impl TemplateCache {
    fn slot(&mut self, kind: TemplateKind) -> &mut Option<Arc<Template>> {
        match kind {
            TemplateKind::Invoice => &mut self.invoice,
            TemplateKind::Act => &mut self.act,
        }
    }

    pub fn get(&self, kind: TemplateKind) -> Option<Arc<Template>> {
        match kind {
            TemplateKind::Invoice => self.invoice.clone(),
            TemplateKind::Act => self.act.clone(),
        }
    }

    pub fn put(&mut self, kind: TemplateKind, template: Template) -> Arc<Template> {
        let template = Arc::new(template);
        *self.slot(kind) = Some(Arc::clone(&template));
        template
    }

    /// Cached template, or parse it from `path` and cache the result.
    pub fn get_or_load(
        &mut self,
        kind: TemplateKind,
        path: impl AsRef<Path>,
    ) -> Result<Arc<Template>, TemplateError> {
        if let Some(cached) = self.get(kind) {
            return Ok(cached);
        }
        let template = Template::load(path)?;
        Ok(self.put(kind, template))
    }

    pub fn clear(&mut self) {
        self.invoice = None;
        self.act = None;
    }
}
