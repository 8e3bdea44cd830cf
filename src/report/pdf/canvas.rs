//! Drawing primitives collected per page before serialization.

use super::metrics::Font;
use crate::model::Rgb;

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f64,
    /// Baseline position.
    pub y: f64,
    pub font: Font,
    pub size: f64,
    pub color: Rgb,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Rect { x: f64, y: f64, w: f64, h: f64, fill: Option<Rgb>, stroke: Option<Rgb> },
    Line { x1: f64, y1: f64, x2: f64, y2: f64, color: Rgb, width: f64 },
    Text(TextRun),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// One-based page number.
    pub number: usize,
    pub ops: Vec<DrawOp>,
    /// Footer text, completed by the finalize pass once the page count is known.
    pub footer: Option<TextRun>,
}

impl Page {
    pub fn new(number: usize) -> Self {
        Self { number, ops: Vec::new(), footer: None }
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: Option<Rgb>, stroke: Option<Rgb>) {
        self.ops.push(DrawOp::Rect { x, y, w, h, fill, stroke });
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, color: Rgb, width: f64) {
        self.ops.push(DrawOp::Line { x1, y1, x2, y2, color, width });
    }

    pub fn text(&mut self, x: f64, y: f64, font: Font, size: f64, color: Rgb, text: impl Into<String>) {
        let text = text.into();
        if !text.is_empty() {
            self.ops.push(DrawOp::Text(TextRun { x, y, font, size, color, text }));
        }
    }

    /// Text runs on the page body, in drawing order.
    #[cfg(test)]
    pub fn texts(&self) -> impl Iterator<Item = &TextRun> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text(run) => Some(run),
            _ => None,
        })
    }
}
