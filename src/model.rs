//! Format-agnostic report model.
//!
//! Adapters build a [`Document`] once per export; the three renderers then
//! read it independently and never mutate it.

use crate::classify::ClassificationBand;
use crate::error::ModelError;

/// 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const SLATE: Rgb = Rgb(51, 65, 85);
    pub const MUTED: Rgb = Rgb(100, 116, 139);
    pub const BORDER: Rgb = Rgb(226, 232, 240);
    pub const ZEBRA: Rgb = Rgb(248, 250, 252);
    pub const TRACK: Rgb = Rgb(241, 245, 249);

    /// Parse `#RRGGBB` (the leading `#` is optional).
    pub fn from_hex(s: &str) -> Option<Rgb> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }

    /// Relative luminance in [0, 1], good enough to pick the darker of two colours.
    pub fn luminance(self) -> f64 {
        (0.2126 * self.0 as f64 + 0.7152 * self.1 as f64 + 0.0722 * self.2 as f64) / 255.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// A column header plus a relative width hint used by the printable layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub label: String,
    pub width_hint: f64,
    pub align: Align,
}

impl ColumnDef {
    pub fn new(label: impl Into<String>, width_hint: f64) -> Self {
        Self { label: label.into(), width_hint, align: Align::Left }
    }

    pub fn centered(mut self) -> Self {
        self.align = Align::Center;
        self
    }

    pub fn right(mut self) -> Self {
        self.align = Align::Right;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub text: String,
    pub band: Option<ClassificationBand>,
}

impl Cell {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), band: None }
    }

    pub fn banded(text: impl Into<String>, band: &ClassificationBand) -> Self {
        Self { text: text.into(), band: Some(band.clone()) }
    }
}

impl From<String> for Cell {
    fn from(text: String) -> Self {
        Cell::plain(text)
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Cell::plain(text)
    }
}

/// A table whose rows always have exactly one cell per column.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<ColumnDef>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), ModelError> {
        if row.len() != self.columns.len() {
            return Err(ModelError::RowWidth { expected: self.columns.len(), found: row.len() });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Badge {
    pub label: String,
    pub band: ClassificationBand,
}

impl Badge {
    /// Badge showing the band's own label.
    pub fn from_band(band: &ClassificationBand) -> Self {
        Self { label: band.label.clone(), band: band.clone() }
    }

    pub fn new(label: impl Into<String>, band: &ClassificationBand) -> Self {
        Self { label: label.into(), band: band.clone() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Narrative(String),
    Table(Table),
    BadgeRow(Vec<Badge>),
    ScoreBar { label: String, score: f64, band: ClassificationBand },
    List { items: Vec<String>, numbered: bool },
}

/// A heading plus its blocks. An empty heading is not drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub heading: String,
    pub blocks: Vec<Block>,
}

impl Section {
    pub fn new(heading: impl Into<String>) -> Self {
        Self { heading: heading.into(), blocks: Vec::new() }
    }

    pub fn push(&mut self, block: Block) -> &mut Self {
        self.blocks.push(block);
        self
    }

    /// Add a paragraph, skipping blank text.
    pub fn narrative(&mut self, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        if !text.trim().is_empty() {
            self.blocks.push(Block::Narrative(text));
        }
        self
    }

    /// Add a list, skipping it when there are no items.
    pub fn list(&mut self, items: Vec<String>, numbered: bool) -> &mut Self {
        if !items.is_empty() {
            self.blocks.push(Block::List { items, numbered });
        }
        self
    }

    pub fn table(&mut self, table: Table) -> &mut Self {
        self.blocks.push(Block::Table(table));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub title: String,
    pub subtitle: String,
    pub kind_label: String,
    pub accent: Rgb,
    pub metadata: Vec<(String, String)>,
    pub sections: Vec<Section>,
    pub footer: String,
}

impl Document {
    pub fn new(title: impl Into<String>, kind_label: impl Into<String>, accent: Rgb) -> Self {
        Self {
            title: title.into(),
            subtitle: String::new(),
            kind_label: kind_label.into(),
            accent,
            metadata: Vec::new(),
            sections: Vec::new(),
            footer: String::new(),
        }
    }

    pub fn meta(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    /// Append a section unless it ended up with no blocks.
    pub fn push_section(&mut self, section: Section) {
        if !section.is_empty() {
            self.sections.push(section);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        assert_eq!(Rgb::from_hex("#0D9488"), Some(Rgb(13, 148, 136)));
        assert_eq!(Rgb::from_hex("312e81"), Some(Rgb(49, 46, 129)));
        assert_eq!(Rgb(5, 150, 105).to_hex(), "#059669");
        assert_eq!(Rgb::from_hex("#12345"), None);
        assert_eq!(Rgb::from_hex("#GG0000"), None);
    }

    #[test]
    fn test_push_row_rejects_wrong_width() {
        let mut table = Table::new(vec![ColumnDef::new("A", 1.0), ColumnDef::new("B", 1.0)]);
        assert!(table.push_row(vec!["1".into(), "2".into()]).is_ok());
        let err = table.push_row(vec!["only".into()]).unwrap_err();
        assert_eq!(err, ModelError::RowWidth { expected: 2, found: 1 });
        assert_eq!(table.rows().len(), 1);
    }

    #[test]
    fn test_empty_sections_are_dropped() {
        let mut doc = Document::new("T", "kind", Rgb::WHITE);
        let mut section = Section::new("Nothing");
        section.narrative("   ").list(Vec::new(), false);
        doc.push_section(section);
        assert!(doc.sections.is_empty());
    }
}
