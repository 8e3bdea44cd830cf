//! Page geometry, text fitting and the pagination state.
//!
//! All coordinates are millimetres with the origin at the top-left corner of
//! the page; the writer flips them into PDF user space.

use clap::ValueEnum;

use super::metrics::{Font, text_width};
use crate::model::Rgb;

/// Tolerance for floating-point comparisons against the bottom margin.
const EPSILON: f64 = 1e-6;

pub const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PageSize {
    Letter,
    A4,
}

impl PageSize {
    /// (width, height) in millimetres.
    pub fn dimensions(self) -> (f64, f64) {
        match self {
            PageSize::Letter => (215.9, 279.4),
            PageSize::A4 => (210.0, 297.0),
        }
    }
}

/// Fixed page layout: running header band, body area and footer band.
#[derive(Debug, Clone, PartialEq)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
    pub margin_x: f64,
    /// Height of the coloured running header at the top of every page.
    pub header_band: f64,
    pub body_top: f64,
    pub body_bottom: f64,
    /// Baseline of the footer text.
    pub footer_y: f64,
}

impl PageGeometry {
    pub fn new(size: PageSize) -> Self {
        let (width, height) = size.dimensions();
        Self {
            width,
            height,
            margin_x: 15.0,
            header_band: 30.0,
            body_top: 38.0,
            body_bottom: height - 20.0,
            footer_y: height - 10.0,
        }
    }

    /// Same page with the body area shortened to `body_height` millimetres.
    #[cfg(test)]
    pub fn with_body_height(size: PageSize, body_height: f64) -> Self {
        let mut geometry = Self::new(size);
        geometry.body_bottom = geometry.body_top + body_height;
        geometry
    }

    pub fn usable_width(&self) -> f64 {
        self.width - 2.0 * self.margin_x
    }

    pub fn usable_height(&self) -> f64 {
        self.body_bottom - self.body_top
    }

    pub fn right(&self) -> f64 {
        self.width - self.margin_x
    }

    /// Whether a block of `height` starting at `cursor_y` crosses the bottom margin.
    pub fn overflows(&self, cursor_y: f64, height: f64) -> bool {
        cursor_y + height > self.body_bottom + EPSILON
    }
}

/// Whether the paginator is drawing on a page or between two pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    OnPage,
    AtBreak,
}

/// Mutable layout state, owned by exactly one paginator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutState {
    pub phase: Phase,
    pub cursor_y: f64,
    /// Zero-based index of the current page.
    pub page_index: usize,
    /// Zebra parity of the next table row; reset at table start and on every new page.
    pub fill_parity: bool,
    /// Fill of the row being drawn.
    pub active_fill: Rgb,
}

impl LayoutState {
    pub fn start(geometry: &PageGeometry) -> Self {
        Self {
            phase: Phase::OnPage,
            cursor_y: geometry.body_top,
            page_index: 0,
            fill_parity: false,
            active_fill: Rgb::WHITE,
        }
    }

    /// Pick the zebra fill for the next row and flip the parity.
    pub fn next_row_fill(&mut self) -> Rgb {
        self.active_fill = if self.fill_parity { Rgb::WHITE } else { Rgb::ZEBRA };
        self.fill_parity = !self.fill_parity;
        self.active_fill
    }

    pub fn reset_parity(&mut self) {
        self.fill_parity = false;
    }
}

/// Scale width hints to the usable width. The result never sums past `usable`.
pub fn allocate_widths(hints: &[f64], usable: f64) -> Vec<f64> {
    if hints.is_empty() {
        return Vec::new();
    }
    let cleaned: Vec<f64> = hints.iter().map(|h| if h.is_finite() && *h > 0.0 { *h } else { 1.0 }).collect();
    let total: f64 = cleaned.iter().sum();
    cleaned.iter().map(|h| h / total * usable).collect()
}

/// Truncate `text` with a trailing [`ELLIPSIS`] so it fits in `max_width`.
pub fn fit_text(text: &str, font: Font, size: f64, max_width: f64) -> String {
    if text_width(text, font, size) <= max_width {
        return text.to_string();
    }
    let marker = text_width(ELLIPSIS, font, size);
    if marker > max_width {
        return String::new();
    }
    let mut fitted = String::new();
    let mut used = marker;
    for c in text.chars() {
        let w = text_width(c.encode_utf8(&mut [0u8; 4]), font, size);
        if used + w > max_width {
            break;
        }
        used += w;
        fitted.push(c);
    }
    format!("{}{}", fitted.trim_end(), ELLIPSIS)
}

/// Greedy word wrap. Words wider than a line are broken between characters.
/// Explicit newlines start a new line. A run of blank lines between two
/// paragraphs becomes one empty line; blank input yields no lines.
pub fn wrap_text(text: &str, font: Font, size: f64, max_width: f64) -> Vec<String> {
    let space = text_width(" ", font, size);
    let mut lines: Vec<String> = Vec::new();

    for paragraph in text.lines() {
        if paragraph.trim().is_empty() {
            if lines.last().is_some_and(|last| !last.is_empty()) {
                lines.push(String::new());
            }
            continue;
        }
        let mut line = String::new();
        let mut line_width = 0.0;
        for word in paragraph.split_whitespace() {
            let word_width = text_width(word, font, size);
            if !line.is_empty() && line_width + space + word_width <= max_width {
                line.push(' ');
                line.push_str(word);
                line_width += space + word_width;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                line_width = 0.0;
            }
            if word_width <= max_width {
                line.push_str(word);
                line_width = word_width;
                continue;
            }
            for c in word.chars() {
                let w = text_width(c.encode_utf8(&mut [0u8; 4]), font, size);
                if !line.is_empty() && line_width + w > max_width {
                    lines.push(std::mem::take(&mut line));
                    line_width = 0.0;
                }
                line.push(c);
                line_width += w;
            }
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    if lines.last().is_some_and(|last| last.is_empty()) {
        lines.pop();
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_widths_is_proportional_and_bounded() {
        let widths = allocate_widths(&[10.0, 30.0, 60.0], 180.0);
        assert!((widths[0] - 18.0).abs() < 1e-9);
        assert!((widths[2] - 108.0).abs() < 1e-9);
        assert!(widths.iter().sum::<f64>() <= 180.0 + 1e-9);

        let degenerate = allocate_widths(&[0.0, f64::NAN], 100.0);
        assert_eq!(degenerate, vec![50.0, 50.0]);
    }

    #[test]
    fn test_fit_text_truncates_with_marker() {
        let long = "An exceptionally long opportunity name that cannot fit";
        let fitted = fit_text(long, Font::Regular, 8.0, 30.0);
        assert!(fitted.ends_with(ELLIPSIS));
        assert!(text_width(&fitted, Font::Regular, 8.0) <= 30.0);
        assert_eq!(fit_text("short", Font::Regular, 8.0, 30.0), "short");
        assert_eq!(fit_text("anything", Font::Regular, 8.0, 0.5), "");
    }

    #[test]
    fn test_wrap_text_respects_width() {
        let text = "The quick brown fox jumps over the lazy dog and keeps running far away";
        let lines = wrap_text(text, Font::Regular, 10.0, 40.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, Font::Regular, 10.0) <= 40.0 + 1e-9, "line too wide: {}", line);
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_wrap_text_breaks_long_words_and_keeps_newlines() {
        let lines = wrap_text(&"W".repeat(60), Font::Bold, 10.0, 30.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), "W".repeat(60));

        assert_eq!(wrap_text("one\ntwo", Font::Regular, 10.0, 100.0), vec!["one", "two"]);
        assert!(wrap_text("   ", Font::Regular, 10.0, 100.0).is_empty());
    }

    #[test]
    fn test_wrap_text_keeps_paragraph_breaks() {
        let lines = wrap_text("First paragraph.\n\n\nSecond paragraph.\n\n", Font::Regular, 10.0, 100.0);
        assert_eq!(lines, vec!["First paragraph.", "", "Second paragraph."]);
        assert_eq!(wrap_text("\n\nonly\n", Font::Regular, 10.0, 100.0), vec!["only"]);
    }

    #[test]
    fn test_geometry() {
        let letter = PageGeometry::new(PageSize::Letter);
        assert!((letter.usable_width() - 185.9).abs() < 1e-9);
        let short = PageGeometry::with_body_height(PageSize::A4, 42.0);
        assert!((short.usable_height() - 42.0).abs() < 1e-9);
        assert!(!short.overflows(short.body_top, 42.0));
        assert!(short.overflows(short.body_top + 36.5, 6.0));
    }
}
