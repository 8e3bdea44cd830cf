//! Error types for the export pipeline.
//!
//! Recoverable field problems never show up here: the payload layer
//! substitutes defaults. Everything below stops an export (or, with renderer
//! isolation, one output format).

use std::io;
use std::path::PathBuf;

/// Top-level failure of one export run. Every variant maps to exit code 1.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Invalid payload in {}: {detail}", path.display())]
    InvalidPayload { path: PathBuf, detail: String },

    #[error("Invalid classification rules: {0}")]
    Rules(#[from] RulesError),

    #[error("Report model error: {0}")]
    Model(#[from] ModelError),

    #[error("{format} renderer failed: {source}")]
    Render {
        format: &'static str,
        #[source]
        source: RenderError,
    },

    #[error("Failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Problems loading or validating a rule book.
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse {origin}: {detail}")]
    Parse { origin: String, detail: String },

    #[error("'{value}' is not a #RRGGBB colour")]
    Color { value: String },

    #[error("score scale '{name}' has no bands")]
    EmptyScale { name: String },

    #[error("score scale '{name}' has a non-finite threshold")]
    NonFiniteThreshold { name: String },

    #[error("enum scale '{name}' falls back to '{fallback}', which is not one of its entries")]
    UnknownFallback { name: String, fallback: String },

    #[error("enum scale '{name}' defines '{key}' more than once")]
    DuplicateKey { name: String, key: String },

    #[error("no rules defined for report kind '{0}'")]
    MissingKind(String),

    #[error("report kind '{kind}' has no {what} scale named '{name}'")]
    MissingScale { kind: String, what: &'static str, name: String },
}

/// Violations of the report model's structural invariants.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("table row has {found} cells but the table has {expected} columns")]
    RowWidth { expected: usize, found: usize },
}

/// Failure inside one renderer.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("formatting failed")]
    Fmt(#[from] std::fmt::Error),
}

/// Fatal paginated-layout failures, found before any page is emitted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("{what} needs {height:.1} mm but a page only has {available:.1} mm of body space")]
    RowTooTall { what: &'static str, height: f64, available: f64 },
}
