//! Seam for the external HTML-to-PDF collaborator. The engine itself is
//! out of process; implementations wrap whatever is available on the host
//! and hand back PDF byte blobs.

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageFormat {
    A4,
    Letter,
}

/// Page geometry handed to the renderer per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOptions {
    pub format: PageFormat,
    pub landscape: bool,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            format: PageFormat::A4,
            landscape: false,
        }
    }
}

/// External HTML-to-PDF renderer.
pub trait PdfRenderer {
    /// Cheap probe that the underlying engine is present. Checked before
    /// any batch work starts.
    fn ensure_available(&self) -> Result<()> {
        Ok(())
    }

    /// Render one HTML document into a PDF byte blob.
    fn render(
        &self,
        html: &str,
        options: &PageOptions,
    ) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
}
