//! Plain-text renderer producing Markdown.
//!
//! Tables are pipe tables padded to equal display width. Cell text escapes
//! `|` as `\|` and flattens newlines, so splitting a row on unescaped pipes
//! gives back the original cells.

use std::fmt::Write;
use unicode_width::UnicodeWidthStr;

use super::{OutputFormat, Renderer};
use crate::error::RenderError;
use crate::model::{Align, Block, Document, Section, Table};
use crate::payload::format_number;

/// Width of the textual score bar, in characters.
const BAR_CELLS: usize = 10;

pub struct TextRenderer;

impl Renderer for TextRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::PlainText
    }

    fn render(&self, doc: &Document) -> Result<Vec<u8>, RenderError> {
        Ok(render_markdown(doc)?.into_bytes())
    }
}

pub fn render_markdown(doc: &Document) -> Result<String, std::fmt::Error> {
    let mut out = String::new();

    writeln!(out, "---")?;
    writeln!(out, "title: {}", yaml_string(&doc.title))?;
    writeln!(out, "kind: {}", doc.kind_label)?;
    for (key, value) in &doc.metadata {
        writeln!(out, "{}: {}", yaml_key(key), yaml_string(value))?;
    }
    writeln!(out, "---")?;
    writeln!(out)?;

    writeln!(out, "# {}", single_line(&doc.title))?;
    writeln!(out)?;
    if !doc.subtitle.is_empty() {
        writeln!(out, "_{}_", single_line(&doc.subtitle))?;
        writeln!(out)?;
    }
    if !doc.metadata.is_empty() {
        let parts: Vec<String> =
            doc.metadata.iter().map(|(k, v)| format!("**{}**: {}", single_line(k), single_line(v))).collect();
        writeln!(out, "{}", parts.join("  |  "))?;
        writeln!(out)?;
    }

    for section in &doc.sections {
        write_section(&mut out, section)?;
    }

    if !doc.footer.is_empty() {
        writeln!(out, "---")?;
        writeln!(out)?;
        writeln!(out, "_{}_", single_line(&doc.footer))?;
    }
    Ok(out)
}

fn write_section(out: &mut String, section: &Section) -> std::fmt::Result {
    if !section.heading.is_empty() {
        writeln!(out, "## {}", single_line(&section.heading))?;
        writeln!(out)?;
    }
    for block in &section.blocks {
        match block {
            Block::Narrative(text) => writeln!(out, "{}", text.trim_end())?,
            Block::Table(table) => write_table(out, table)?,
            Block::BadgeRow(badges) => {
                let labels: Vec<String> = badges.iter().map(|b| format!("`[{}]`", single_line(&b.label))).collect();
                writeln!(out, "{}", labels.join(" "))?;
            }
            Block::ScoreBar { label, score, band } => {
                writeln!(
                    out,
                    "- **{}**: {}/100 `{}` {}",
                    single_line(label),
                    format_number(*score),
                    text_bar(*score),
                    band.label
                )?;
            }
            Block::List { items, numbered } => {
                for (i, item) in items.iter().enumerate() {
                    if *numbered {
                        writeln!(out, "{}. {}", i + 1, single_line(item))?;
                    } else {
                        writeln!(out, "- {}", single_line(item))?;
                    }
                }
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

/// `[#######---]` for a score of 70.
fn text_bar(score: f64) -> String {
    let filled = ((score.clamp(0.0, 100.0) / 100.0) * BAR_CELLS as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_CELLS - filled))
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cell text safe for a pipe table.
pub fn escape_cell(text: &str) -> String {
    single_line(text).replace('|', "\\|")
}

fn pad(text: &str, width: usize, align: Align) -> String {
    let gap = width.saturating_sub(text.width());
    match align {
        Align::Left => format!("{}{}", text, " ".repeat(gap)),
        Align::Right => format!("{}{}", " ".repeat(gap), text),
        Align::Center => format!("{}{}{}", " ".repeat(gap / 2), text, " ".repeat(gap - gap / 2)),
    }
}

fn write_table(out: &mut String, table: &Table) -> std::fmt::Result {
    let header: Vec<String> = table.columns().iter().map(|c| escape_cell(&c.label)).collect();
    let rows: Vec<Vec<String>> =
        table.rows().iter().map(|row| row.iter().map(|cell| escape_cell(&cell.text)).collect()).collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.width().max(3)).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.width());
        }
    }

    let line = |cells: &[String]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .zip(table.columns())
            .map(|((cell, width), column)| pad(cell, *width, column.align))
            .collect();
        format!("| {} |", padded.join(" | "))
    };

    writeln!(out, "{}", line(&header))?;
    let separators: Vec<String> = widths
        .iter()
        .zip(table.columns())
        .map(|(width, column)| match column.align {
            Align::Left => "-".repeat(*width),
            Align::Center => format!(":{}:", "-".repeat(width.saturating_sub(2))),
            Align::Right => format!("{}:", "-".repeat(width.saturating_sub(1))),
        })
        .collect();
    writeln!(out, "| {} |", separators.join(" | "))?;
    for row in &rows {
        writeln!(out, "{}", line(row))?;
    }
    Ok(())
}

fn yaml_key(key: &str) -> String {
    let key: String = key.to_lowercase().chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect();
    key.trim_matches('_').to_string()
}

fn yaml_string(value: &str) -> String {
    format!("\"{}\"", single_line(value).replace('\\', "\\\\").replace('"', "\\\""))
}
