//! Paginated-document renderer.
//!
//! Layout runs in three steps:
//! 1. `validate` rejects any atomic unit taller than the page body, before
//!    a single page exists.
//! 2. The paginator walks the Document, threading one [`LayoutState`]
//!    through every draw call and emitting each page as it fills up.
//! 3. `finalize` substitutes the total page count into every footer.
//!
//! The finished pages are then serialized by [`writer::write_pdf`].

pub mod canvas;
pub mod layout;
pub mod metrics;
pub mod writer;

use log::debug;

use super::{OutputFormat, Renderer};
use crate::classify::ClassificationBand;
use crate::error::{LayoutError, RenderError};
use crate::model::{Align, Badge, Block, Cell, Document, Rgb, Section, Table};
use crate::payload::format_number;
use canvas::{Page, TextRun};
use layout::{LayoutState, PageGeometry, Phase, allocate_widths, fit_text, wrap_text};
use metrics::{Font, PT_PER_MM, text_width, to_latin1};

/// Written into footers during layout, replaced once the page count is known.
pub const TOTAL_PAGES_TOKEN: &str = "{nb}";

const ROW_HEIGHT: f64 = 6.0;
const HEADER_ROW_HEIGHT: f64 = 6.0;
const CELL_PADDING: f64 = 1.5;
const TABLE_FONT_SIZE: f64 = 7.5;
const HEADER_FONT_SIZE: f64 = 8.0;

const HEADING_HEIGHT: f64 = 10.0;
const HEADING_FONT_SIZE: f64 = 12.5;

const BODY_FONT_SIZE: f64 = 9.5;
const LINE_HEIGHT: f64 = 4.8;
const LIST_INDENT: f64 = 6.0;
const BLOCK_GAP: f64 = 3.0;

const BADGE_HEIGHT: f64 = 5.0;
const BADGE_LINE_HEIGHT: f64 = 7.0;
const BADGE_PADDING: f64 = 6.0;
const BADGE_GAP: f64 = 3.0;
const BADGE_FONT_SIZE: f64 = 8.0;

const BAR_ROW_HEIGHT: f64 = 7.0;
const BAR_HEIGHT: f64 = 4.0;
const BAR_LABEL_WIDTH: f64 = 60.0;
const BAR_VALUE_WIDTH: f64 = 34.0;
const BAR_MIN_FILL: f64 = 2.0;

pub struct PdfRenderer {
    geometry: PageGeometry,
}

impl PdfRenderer {
    pub fn new(geometry: PageGeometry) -> Self {
        Self { geometry }
    }
}

impl Renderer for PdfRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Printable
    }

    fn render(&self, doc: &Document) -> Result<Vec<u8>, RenderError> {
        let pages = paginate(doc, &self.geometry)?;
        debug!("laid out {} page(s) for '{}'", pages.len(), doc.title);
        Ok(writer::write_pdf(&pages, &self.geometry, &doc.title)?)
    }
}

/// Lay the Document out on pages. Always returns at least one page.
pub fn paginate(doc: &Document, geometry: &PageGeometry) -> Result<Vec<Page>, LayoutError> {
    validate(doc, geometry)?;

    let mut paginator = Paginator::new(doc, geometry);
    let mut state = LayoutState::start(geometry);
    for section in &doc.sections {
        paginator.section(&mut state, section);
    }
    let mut pages = paginator.finish();
    finalize(&mut pages);
    Ok(pages)
}

/// Substitute the total page count into every footer.
pub fn finalize(pages: &mut [Page]) {
    let total = pages.len().to_string();
    for page in pages.iter_mut() {
        if let Some(footer) = page.footer.as_mut() {
            footer.text = footer.text.replace(TOTAL_PAGES_TOKEN, &total);
        }
    }
}

/// Height of the first unit of a block that must not be split from what precedes it.
fn lead_height(block: &Block) -> f64 {
    match block {
        Block::Narrative(_) | Block::List { .. } => LINE_HEIGHT,
        Block::Table(table) if table.is_empty() => HEADER_ROW_HEIGHT,
        Block::Table(_) => HEADER_ROW_HEIGHT + ROW_HEIGHT,
        Block::BadgeRow(_) => BADGE_LINE_HEIGHT,
        Block::ScoreBar { .. } => BAR_ROW_HEIGHT,
    }
}

fn validate(doc: &Document, geometry: &PageGeometry) -> Result<(), LayoutError> {
    let available = geometry.usable_height();
    let check = |what: &'static str, height: f64| {
        if height > available + 1e-6 { Err(LayoutError::RowTooTall { what, height, available }) } else { Ok(()) }
    };

    for section in &doc.sections {
        let lead = section.blocks.first().map(lead_height).unwrap_or(0.0);
        if !section.heading.is_empty() {
            check("section heading", HEADING_HEIGHT + lead)?;
        }
        for block in &section.blocks {
            let what = match block {
                Block::Table(_) => "table row",
                Block::Narrative(_) | Block::List { .. } => "text line",
                Block::BadgeRow(_) => "badge row",
                Block::ScoreBar { .. } => "score bar",
            };
            check(what, lead_height(block))?;
        }
    }
    Ok(())
}

/// Vertical offset of a text baseline inside a box of `height`.
fn baseline(top: f64, height: f64, size: f64) -> f64 {
    top + (height + 0.7 * size / PT_PER_MM) / 2.0
}

#[derive(Debug, Clone, Copy)]
struct TextStyle {
    font: Font,
    size: f64,
    color: Rgb,
}

struct Paginator<'a> {
    doc: &'a Document,
    geometry: &'a PageGeometry,
    pages: Vec<Page>,
    current: Page,
}

impl<'a> Paginator<'a> {
    fn new(doc: &'a Document, geometry: &'a PageGeometry) -> Self {
        let mut paginator = Self { doc, geometry, pages: Vec::new(), current: Page::new(1) };
        paginator.decorate();
        paginator
    }

    fn finish(mut self) -> Vec<Page> {
        let last = std::mem::replace(&mut self.current, Page::new(0));
        self.emit(last);
        self.pages
    }

    fn emit(&mut self, page: Page) {
        self.pages.push(page);
    }

    /// Running header and footer of the current page.
    fn decorate(&mut self) {
        let g = self.geometry;
        let doc = self.doc;
        let usable = g.usable_width();
        let page = &mut self.current;

        page.rect(0.0, 0.0, g.width, g.header_band, Some(doc.accent), None);
        let title = fit_text(&to_latin1(&doc.title), Font::Bold, 15.0, usable);
        page.text(g.margin_x, 11.0, Font::Bold, 15.0, Rgb::WHITE, title);
        if !doc.subtitle.is_empty() {
            let subtitle = fit_text(&to_latin1(&doc.subtitle), Font::Regular, 9.5, usable);
            page.text(g.margin_x, 18.0, Font::Regular, 9.5, Rgb::WHITE, subtitle);
        }
        if !doc.metadata.is_empty() {
            let meta: Vec<String> = doc.metadata.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
            let meta = fit_text(&to_latin1(&meta.join("  |  ")), Font::Regular, 8.0, usable);
            page.text(g.margin_x, 25.0, Font::Regular, 8.0, Rgb::WHITE, meta);
        }

        page.line(g.margin_x, g.footer_y - 4.5, g.right(), g.footer_y - 4.5, Rgb::BORDER, 0.3);
        let label = format!("Page {} of {}", page.number, TOTAL_PAGES_TOKEN);
        let text = if doc.footer.is_empty() { label } else { format!("{}  |  {}", to_latin1(&doc.footer), label) };
        page.footer = Some(TextRun {
            x: g.margin_x,
            y: g.footer_y,
            font: Font::Oblique,
            size: 8.0,
            color: Rgb::MUTED,
            text,
        });
    }

    /// Start a new page if `height` does not fit below the cursor.
    /// Returns whether a break happened.
    fn ensure_space(&mut self, state: &mut LayoutState, height: f64) -> bool {
        if !self.geometry.overflows(state.cursor_y, height) {
            return false;
        }
        state.phase = Phase::AtBreak;
        let next = Page::new(self.current.number + 1);
        let finished = std::mem::replace(&mut self.current, next);
        self.emit(finished);
        self.decorate();
        state.page_index += 1;
        state.cursor_y = self.geometry.body_top;
        state.reset_parity();
        state.phase = Phase::OnPage;
        true
    }

    fn section(&mut self, state: &mut LayoutState, section: &Section) {
        if !section.heading.is_empty() {
            let lead = section.blocks.first().map(lead_height).unwrap_or(0.0);
            self.ensure_space(state, HEADING_HEIGHT + lead);
            self.heading(state, &section.heading);
        }
        for block in &section.blocks {
            match block {
                Block::Narrative(text) => self.narrative(state, text),
                Block::Table(table) => self.table(state, table),
                Block::BadgeRow(badges) => self.badges(state, badges),
                Block::ScoreBar { label, score, band } => self.score_bar(state, label, *score, band),
                Block::List { items, numbered } => self.list(state, items, *numbered),
            }
        }
    }

    fn heading(&mut self, state: &mut LayoutState, heading: &str) {
        let g = self.geometry;
        let text = fit_text(&to_latin1(heading), Font::Bold, HEADING_FONT_SIZE, g.usable_width());
        let y = state.cursor_y;
        self.current.text(g.margin_x, y + 6.5, Font::Bold, HEADING_FONT_SIZE, self.doc.accent, text);
        self.current.line(g.margin_x, y + 8.5, g.right(), y + 8.5, self.doc.accent, 0.4);
        state.cursor_y += HEADING_HEIGHT;
    }

    fn text_lines(&mut self, state: &mut LayoutState, x: f64, lines: &[String], font: Font) {
        for line in lines {
            self.ensure_space(state, LINE_HEIGHT);
            let y = state.cursor_y + LINE_HEIGHT * 0.75;
            self.current.text(x, y, font, BODY_FONT_SIZE, Rgb::SLATE, line.clone());
            state.cursor_y += LINE_HEIGHT;
        }
    }

    fn narrative(&mut self, state: &mut LayoutState, text: &str) {
        let g = self.geometry;
        let mapped: Vec<String> = text.lines().map(to_latin1).collect();
        let lines = wrap_text(&mapped.join("\n"), Font::Regular, BODY_FONT_SIZE, g.usable_width());
        self.text_lines(state, g.margin_x, &lines, Font::Regular);
        state.cursor_y += BLOCK_GAP;
    }

    fn list(&mut self, state: &mut LayoutState, items: &[String], numbered: bool) {
        let g = self.geometry;
        for (i, item) in items.iter().enumerate() {
            let marker = if numbered { format!("{}.", i + 1) } else { "-".to_string() };
            let lines = wrap_text(&to_latin1(item), Font::Regular, BODY_FONT_SIZE, g.usable_width() - LIST_INDENT);
            if lines.is_empty() {
                continue;
            }
            // The marker belongs to the first line, so the page break must happen first.
            self.ensure_space(state, LINE_HEIGHT);
            let y = state.cursor_y + LINE_HEIGHT * 0.75;
            self.current.text(g.margin_x, y, Font::Bold, BODY_FONT_SIZE, self.doc.accent, marker);
            self.text_lines(state, g.margin_x + LIST_INDENT, &lines, Font::Regular);
        }
        state.cursor_y += BLOCK_GAP;
    }

    fn table(&mut self, state: &mut LayoutState, table: &Table) {
        let hints: Vec<f64> = table.columns().iter().map(|c| c.width_hint).collect();
        let widths = allocate_widths(&hints, self.geometry.usable_width());

        let lead = if table.is_empty() { HEADER_ROW_HEIGHT } else { HEADER_ROW_HEIGHT + ROW_HEIGHT };
        self.ensure_space(state, lead);
        self.table_header(state, table, &widths);
        state.reset_parity();

        for row in table.rows() {
            if self.ensure_space(state, ROW_HEIGHT) {
                // Continuation header on the new page.
                self.table_header(state, table, &widths);
            }
            let fill = state.next_row_fill();
            self.table_row(state, table, row, &widths, fill);
        }
        state.cursor_y += BLOCK_GAP;
    }

    fn table_header(&mut self, state: &mut LayoutState, table: &Table, widths: &[f64]) {
        let mut x = self.geometry.margin_x;
        let y = state.cursor_y;
        for (column, width) in table.columns().iter().zip(widths) {
            self.current.rect(x, y, *width, HEADER_ROW_HEIGHT, Some(self.doc.accent), Some(Rgb::BORDER));
            let label = fit_text(&to_latin1(&column.label), Font::Bold, HEADER_FONT_SIZE, width - 2.0 * CELL_PADDING);
            let style = TextStyle { font: Font::Bold, size: HEADER_FONT_SIZE, color: Rgb::WHITE };
            self.cell_text(x, y, *width, HEADER_ROW_HEIGHT, column.align, style, label);
            x += width;
        }
        state.cursor_y += HEADER_ROW_HEIGHT;
    }

    fn table_row(&mut self, state: &mut LayoutState, table: &Table, row: &[Cell], widths: &[f64], fill: Rgb) {
        let mut x = self.geometry.margin_x;
        let y = state.cursor_y;
        for ((cell, column), width) in row.iter().zip(table.columns()).zip(widths) {
            let (background, color, font) = match &cell.band {
                Some(band) => (band.background, band.text, Font::Bold),
                None => (fill, Rgb::SLATE, Font::Regular),
            };
            self.current.rect(x, y, *width, ROW_HEIGHT, Some(background), Some(Rgb::BORDER));
            let text = fit_text(&to_latin1(&cell.text), font, TABLE_FONT_SIZE, width - 2.0 * CELL_PADDING);
            let style = TextStyle { font, size: TABLE_FONT_SIZE, color };
            self.cell_text(x, y, *width, ROW_HEIGHT, column.align, style, text);
            x += width;
        }
        state.cursor_y += ROW_HEIGHT;
    }

    /// Draw `text` inside the box at (x, y, w, h), vertically centred.
    fn cell_text(&mut self, x: f64, y: f64, w: f64, h: f64, align: Align, style: TextStyle, text: String) {
        let text_w = text_width(&text, style.font, style.size);
        let tx = match align {
            Align::Left => x + CELL_PADDING,
            Align::Center => x + (w - text_w) / 2.0,
            Align::Right => x + w - CELL_PADDING - text_w,
        };
        self.current.text(tx, baseline(y, h, style.size), style.font, style.size, style.color, text);
    }

    fn badges(&mut self, state: &mut LayoutState, badges: &[Badge]) {
        let g = self.geometry;
        let mut x = g.margin_x;
        self.ensure_space(state, BADGE_LINE_HEIGHT);
        for badge in badges {
            let max_label = g.usable_width() - BADGE_PADDING;
            let label = fit_text(&to_latin1(&badge.label), Font::Bold, BADGE_FONT_SIZE, max_label);
            let w = text_width(&label, Font::Bold, BADGE_FONT_SIZE) + BADGE_PADDING;
            if x > g.margin_x && x + w > g.right() {
                state.cursor_y += BADGE_LINE_HEIGHT;
                self.ensure_space(state, BADGE_LINE_HEIGHT);
                x = g.margin_x;
            }
            let y = state.cursor_y;
            self.current.rect(x, y, w, BADGE_HEIGHT, Some(badge.band.background), None);
            let style = TextStyle { font: Font::Bold, size: BADGE_FONT_SIZE, color: badge.band.text };
            self.cell_text(x, y, w, BADGE_HEIGHT, Align::Center, style, label);
            x += w + BADGE_GAP;
        }
        state.cursor_y += BADGE_LINE_HEIGHT + BLOCK_GAP;
    }

    fn score_bar(&mut self, state: &mut LayoutState, label: &str, score: f64, band: &ClassificationBand) {
        let g = self.geometry;
        self.ensure_space(state, BAR_ROW_HEIGHT);
        let y = state.cursor_y;

        let label = fit_text(&to_latin1(label), Font::Regular, BODY_FONT_SIZE, BAR_LABEL_WIDTH - 2.0);
        let text_y = baseline(y, BAR_ROW_HEIGHT, BODY_FONT_SIZE);
        self.current.text(g.margin_x, text_y, Font::Regular, BODY_FONT_SIZE, Rgb::SLATE, label);

        let track_x = g.margin_x + BAR_LABEL_WIDTH;
        let track_w = (g.usable_width() - BAR_LABEL_WIDTH - BAR_VALUE_WIDTH).max(BAR_MIN_FILL);
        let bar_y = y + (BAR_ROW_HEIGHT - BAR_HEIGHT) / 2.0;
        let fill_w = (track_w * score.clamp(0.0, 100.0) / 100.0).clamp(BAR_MIN_FILL, track_w);
        let strong = band.strong();
        self.current.rect(track_x, bar_y, track_w, BAR_HEIGHT, Some(Rgb::TRACK), None);
        self.current.rect(track_x, bar_y, fill_w, BAR_HEIGHT, Some(strong), None);

        let value = format!("{}/100 {}", format_number(score), band.label);
        let value = fit_text(&to_latin1(&value), Font::Bold, BODY_FONT_SIZE, BAR_VALUE_WIDTH - 3.0);
        let value_x = track_x + track_w + 3.0;
        self.current.text(value_x, text_y, Font::Bold, BODY_FONT_SIZE, strong, value);
        state.cursor_y += BAR_ROW_HEIGHT;
    }
}

#[cfg(test)]
#[path = "pagination_test.rs"]
mod pagination_test;
