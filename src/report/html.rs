//! Styled-document renderer: one self-contained HTML page per Document.
//!
//! Every piece of payload text passes through [`escape_html`] before it is
//! written. No timestamps are embedded, so identical Documents produce
//! identical bytes.

use std::fmt::Write;

use super::{OutputFormat, Renderer};
use crate::classify::ClassificationBand;
use crate::error::RenderError;
use crate::model::{Align, Badge, Block, Document, Rgb, Section, Table};

/// Narrowest visible bar fill, in percent.
const MIN_BAR_PERCENT: f64 = 5.0;

const STYLESHEET: &str = r#"
  * { margin: 0; padding: 0; box-sizing: border-box; }
  body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Helvetica, Arial, sans-serif;
         color: #334155; background: #F8FAFC; line-height: 1.6; }
  .header { color: #FFFFFF; padding: 32px 40px; }
  .header h1 { font-size: 26px; font-weight: 800; }
  .header .subtitle { font-size: 14px; opacity: 0.9; margin-top: 4px; }
  .meta { display: flex; flex-wrap: wrap; gap: 18px; margin-top: 14px; font-size: 13px; }
  main { max-width: 1100px; margin: 0 auto; padding: 24px 40px; }
  section.content { background: #FFFFFF; border: 1px solid #E2E8F0; border-radius: 10px;
                    padding: 22px 26px; margin-bottom: 20px; }
  h2 { font-size: 19px; margin-bottom: 12px; }
  p.text-block { margin: 8px 0; }
  table { width: 100%; border-collapse: collapse; margin: 12px 0; font-size: 13px; }
  th { color: #FFFFFF; padding: 8px 10px; font-weight: 700; }
  td { padding: 7px 10px; border-bottom: 1px solid #E2E8F0; }
  tbody tr:nth-child(even) { background: #F8FAFC; }
  .band { display: inline-block; padding: 2px 8px; border-radius: 8px; font-weight: 700; font-size: 12px; }
  .badges { display: flex; flex-wrap: wrap; gap: 10px; margin: 10px 0; }
  .badge { display: inline-block; padding: 4px 14px; border-radius: 14px; font-size: 12px; font-weight: 700; }
  .score-row { display: flex; align-items: center; gap: 12px; margin: 6px 0; }
  .score-label { width: 220px; font-weight: 600; font-size: 13px; }
  .bar-track { flex: 1; height: 10px; background: #F1F5F9; border-radius: 5px; overflow: hidden; }
  .bar-fill { height: 100%; border-radius: 5px; }
  .score-value { width: 130px; font-weight: 700; font-size: 13px; }
  ul, ol { margin: 8px 0 8px 22px; }
  footer { text-align: center; color: #64748B; font-size: 12px; padding: 24px; }
"#;

/// Escape text for element content and attribute values.
pub fn escape_html(s: &str) -> String {
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

pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Styled
    }

    fn render(&self, doc: &Document) -> Result<Vec<u8>, RenderError> {
        Ok(render_html(doc)?.into_bytes())
    }
}

pub fn render_html(doc: &Document) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    let accent = doc.accent.to_hex();

    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"en\">")?;
    writeln!(out, "<head>")?;
    writeln!(out, "<meta charset=\"UTF-8\">")?;
    writeln!(out, "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">")?;
    writeln!(out, "<title>{}</title>", escape_html(&doc.title))?;
    writeln!(out, "<style>{}  h2 {{ color: {}; }}\n  th {{ background: {}; }}\n</style>", STYLESHEET, accent, accent)?;
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")?;

    writeln!(out, "<div class=\"header\" style=\"background:{}\">", accent)?;
    writeln!(out, "  <h1>{}</h1>", escape_html(&doc.title))?;
    if !doc.subtitle.is_empty() {
        writeln!(out, "  <div class=\"subtitle\">{}</div>", escape_html(&doc.subtitle))?;
    }
    if !doc.metadata.is_empty() {
        writeln!(out, "  <div class=\"meta\">")?;
        for (key, value) in &doc.metadata {
            writeln!(
                out,
                "    <div class=\"meta-item\"><strong>{}:</strong> {}</div>",
                escape_html(key),
                escape_html(value)
            )?;
        }
        writeln!(out, "  </div>")?;
    }
    writeln!(out, "</div>")?;

    writeln!(out, "<main>")?;
    for section in &doc.sections {
        write_section(&mut out, section)?;
    }
    writeln!(out, "</main>")?;

    if !doc.footer.is_empty() {
        writeln!(out, "<footer>{}</footer>", escape_html(&doc.footer))?;
    }
    writeln!(out, "</body>")?;
    writeln!(out, "</html>")?;
    Ok(out)
}

fn write_section(out: &mut String, section: &Section) -> std::fmt::Result {
    writeln!(out, "<section class=\"content\">")?;
    if !section.heading.is_empty() {
        writeln!(out, "  <h2>{}</h2>", escape_html(&section.heading))?;
    }
    for block in &section.blocks {
        match block {
            Block::Narrative(text) => write_narrative(out, text)?,
            Block::Table(table) => write_table(out, table)?,
            Block::BadgeRow(badges) => write_badges(out, badges)?,
            Block::ScoreBar { label, score, band } => write_score_bar(out, label, *score, band)?,
            Block::List { items, numbered } => {
                let tag = if *numbered { "ol" } else { "ul" };
                writeln!(out, "  <{}>", tag)?;
                for item in items {
                    writeln!(out, "    <li>{}</li>", escape_html(item))?;
                }
                writeln!(out, "  </{}>", tag)?;
            }
        }
    }
    writeln!(out, "</section>")
}

fn write_narrative(out: &mut String, text: &str) -> std::fmt::Result {
    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let lines: Vec<String> = paragraph.lines().map(escape_html).collect();
        writeln!(out, "  <p class=\"text-block\">{}</p>", lines.join("<br>"))?;
    }
    Ok(())
}

fn band_style(band: &ClassificationBand) -> String {
    format!("background:{};color:{}", band.background.to_hex(), band.text.to_hex())
}

fn align_style(align: Align) -> &'static str {
    match align {
        Align::Left => "text-align:left",
        Align::Center => "text-align:center",
        Align::Right => "text-align:right",
    }
}

fn write_table(out: &mut String, table: &Table) -> std::fmt::Result {
    writeln!(out, "  <table>")?;
    write!(out, "    <thead><tr>")?;
    for column in table.columns() {
        write!(out, "<th style=\"{}\">{}</th>", align_style(column.align), escape_html(&column.label))?;
    }
    writeln!(out, "</tr></thead>")?;
    writeln!(out, "    <tbody>")?;
    for row in table.rows() {
        write!(out, "      <tr>")?;
        for (cell, column) in row.iter().zip(table.columns()) {
            let text = escape_html(&cell.text);
            match &cell.band {
                Some(band) => write!(
                    out,
                    "<td style=\"{}\"><span class=\"band\" style=\"{}\">{}</span></td>",
                    align_style(column.align),
                    band_style(band),
                    text
                )?,
                None => write!(out, "<td style=\"{}\">{}</td>", align_style(column.align), text)?,
            }
        }
        writeln!(out, "</tr>")?;
    }
    writeln!(out, "    </tbody>")?;
    writeln!(out, "  </table>")
}

fn write_badges(out: &mut String, badges: &[Badge]) -> std::fmt::Result {
    writeln!(out, "  <div class=\"badges\">")?;
    for badge in badges {
        writeln!(
            out,
            "    <span class=\"badge\" style=\"{}\">{}</span>",
            band_style(&badge.band),
            escape_html(&badge.label)
        )?;
    }
    writeln!(out, "  </div>")
}

fn write_score_bar(out: &mut String, label: &str, score: f64, band: &ClassificationBand) -> std::fmt::Result {
    let percent = score.clamp(0.0, 100.0).max(MIN_BAR_PERCENT);
    let fill: Rgb = band.strong();
    writeln!(out, "  <div class=\"score-row\">")?;
    writeln!(out, "    <span class=\"score-label\">{}</span>", escape_html(label))?;
    writeln!(
        out,
        "    <div class=\"bar-track\"><div class=\"bar-fill\" style=\"width:{:.0}%;background:{}\"></div></div>",
        percent,
        fill.to_hex()
    )?;
    writeln!(
        out,
        "    <span class=\"score-value\" style=\"color:{}\">{}/100 {}</span>",
        fill.to_hex(),
        crate::payload::format_number(score),
        escape_html(&band.label)
    )?;
    writeln!(out, "  </div>")
}
