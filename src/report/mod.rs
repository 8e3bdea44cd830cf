//! Report rendering and export.
//!
//! This module handles:
//! - Rendering a [`Document`] as a styled HTML page
//! - Laying a Document out on fixed-size pages and serializing it as PDF
//! - Rendering a Document as Markdown with pipe tables
//! - Naming, sequencing and writing the three artifacts of one export
//!
//! # Module Organization
//!
//! - `html` - Styled-document renderer
//! - `pdf` - Paginated-document renderer (layout engine and PDF writer)
//! - `text` - Plain-text renderer
//! - `export` - Export orchestrator and manifest

pub mod export;
pub mod html;
pub mod pdf;
pub mod text;

use crate::error::RenderError;
use crate::model::Document;

pub use html::HtmlRenderer;
pub use pdf::PdfRenderer;
pub use text::TextRenderer;

/// The three synchronized artifacts of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OutputFormat {
    Styled,
    Printable,
    PlainText,
}

impl OutputFormat {
    /// File extension, also the manifest key for the artifact.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Styled => "html",
            OutputFormat::Printable => "pdf",
            OutputFormat::PlainText => "md",
        }
    }
}

/// Turns a finished Document into the bytes of one output format.
pub trait Renderer {
    fn format(&self) -> OutputFormat;

    fn render(&self, doc: &Document) -> Result<Vec<u8>, RenderError>;
}
