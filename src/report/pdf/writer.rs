//! Minimal PDF 1.4 serializer for laid-out pages.
//!
//! Object layout: 1 catalog, 2 page tree, 3-5 fonts, 6 info, then a
//! page/content-stream pair per page. The output carries no creation date,
//! so identical pages serialize to identical bytes.

use std::fmt::Write;

use super::canvas::{DrawOp, Page, TextRun};
use super::layout::PageGeometry;
use super::metrics::{Font, PT_PER_MM, to_latin1};
use crate::model::Rgb;

const FONTS: [Font; 3] = [Font::Regular, Font::Bold, Font::Oblique];
const FIRST_FONT_OBJECT: usize = 3;
const INFO_OBJECT: usize = 6;
const FIRST_PAGE_OBJECT: usize = 7;

/// Escape a string literal body. Bytes above 0x7F are written as octal escapes.
pub fn escape_pdf_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in to_latin1(text).chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            c if (c as u32) < 0x80 => out.push(c),
            c => {
                let _ = write!(out, "\\{:03o}", c as u32);
            }
        }
    }
    out
}

fn color(c: Rgb) -> String {
    format!("{:.3} {:.3} {:.3}", c.0 as f64 / 255.0, c.1 as f64 / 255.0, c.2 as f64 / 255.0)
}

struct ObjectWriter {
    out: String,
    offsets: Vec<usize>,
}

impl ObjectWriter {
    fn begin(&mut self, number: usize) -> std::fmt::Result {
        debug_assert_eq!(number, self.offsets.len() + 1);
        self.offsets.push(self.out.len());
        writeln!(self.out, "{} 0 obj", number)
    }

    fn end(&mut self) -> std::fmt::Result {
        writeln!(self.out, "endobj")
    }
}

pub fn write_pdf(pages: &[Page], geometry: &PageGeometry, title: &str) -> Result<Vec<u8>, std::fmt::Error> {
    let mut w = ObjectWriter { out: String::from("%PDF-1.4\n"), offsets: Vec::new() };
    let page_w = geometry.width * PT_PER_MM;
    let page_h = geometry.height * PT_PER_MM;

    w.begin(1)?;
    writeln!(w.out, "<< /Type /Catalog /Pages 2 0 R >>")?;
    w.end()?;

    let kids: Vec<String> = (0..pages.len()).map(|i| format!("{} 0 R", FIRST_PAGE_OBJECT + 2 * i)).collect();
    w.begin(2)?;
    writeln!(w.out, "<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages.len())?;
    w.end()?;

    for (i, font) in FONTS.iter().enumerate() {
        w.begin(FIRST_FONT_OBJECT + i)?;
        writeln!(
            w.out,
            "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
            font.base_font()
        )?;
        w.end()?;
    }

    w.begin(INFO_OBJECT)?;
    writeln!(w.out, "<< /Title ({}) /Producer (report-export) >>", escape_pdf_string(title))?;
    w.end()?;

    let font_resources: Vec<String> =
        FONTS.iter().enumerate().map(|(i, f)| format!("/{} {} 0 R", f.resource(), FIRST_FONT_OBJECT + i)).collect();

    for (i, page) in pages.iter().enumerate() {
        let page_obj = FIRST_PAGE_OBJECT + 2 * i;
        w.begin(page_obj)?;
        writeln!(
            w.out,
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
             /Resources << /Font << {} >> >> /Contents {} 0 R >>",
            page_w,
            page_h,
            font_resources.join(" "),
            page_obj + 1
        )?;
        w.end()?;

        let content = content_stream(page, geometry)?;
        w.begin(page_obj + 1)?;
        writeln!(w.out, "<< /Length {} >>", content.len())?;
        writeln!(w.out, "stream")?;
        w.out.push_str(&content);
        writeln!(w.out, "endstream")?;
        w.end()?;
    }

    let xref_offset = w.out.len();
    writeln!(w.out, "xref")?;
    writeln!(w.out, "0 {}", w.offsets.len() + 1)?;
    writeln!(w.out, "0000000000 65535 f ")?;
    for offset in &w.offsets {
        writeln!(w.out, "{:010} 00000 n ", offset)?;
    }
    writeln!(w.out, "trailer")?;
    writeln!(w.out, "<< /Size {} /Root 1 0 R /Info {} 0 R >>", w.offsets.len() + 1, INFO_OBJECT)?;
    writeln!(w.out, "startxref")?;
    writeln!(w.out, "{}", xref_offset)?;
    w.out.push_str("%%EOF\n");

    Ok(w.out.into_bytes())
}

fn content_stream(page: &Page, geometry: &PageGeometry) -> Result<String, std::fmt::Error> {
    let k = PT_PER_MM;
    let h = geometry.height;
    let mut s = String::new();

    for op in &page.ops {
        match op {
            DrawOp::Rect { x, y, w, h: rh, fill, stroke } => {
                let paint = match (fill, stroke) {
                    (Some(_), Some(_)) => "B",
                    (Some(_), None) => "f",
                    (None, Some(_)) => "S",
                    (None, None) => continue,
                };
                if let Some(f) = fill {
                    write!(s, "{} rg ", color(*f))?;
                }
                if let Some(c) = stroke {
                    write!(s, "{} RG 0.20 w ", color(*c))?;
                }
                writeln!(s, "{:.2} {:.2} {:.2} {:.2} re {}", x * k, (h - y - rh) * k, w * k, rh * k, paint)?;
            }
            DrawOp::Line { x1, y1, x2, y2, color: c, width } => {
                writeln!(
                    s,
                    "{} RG {:.2} w {:.2} {:.2} m {:.2} {:.2} l S",
                    color(*c),
                    width * k,
                    x1 * k,
                    (h - y1) * k,
                    x2 * k,
                    (h - y2) * k
                )?;
            }
            DrawOp::Text(run) => write_text(&mut s, run, h)?,
        }
    }
    if let Some(footer) = &page.footer {
        write_text(&mut s, footer, h)?;
    }
    Ok(s)
}

fn write_text(s: &mut String, run: &TextRun, page_height: f64) -> std::fmt::Result {
    let k = PT_PER_MM;
    writeln!(
        s,
        "BT /{} {:.2} Tf {} rg {:.2} {:.2} Td ({}) Tj ET",
        run.font.resource(),
        run.size,
        color(run.color),
        run.x * k,
        (page_height - run.y) * k,
        escape_pdf_string(&run.text)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::pdf::layout::PageSize;

    fn sample_pages() -> Vec<Page> {
        let mut page = Page::new(1);
        page.rect(10.0, 10.0, 50.0, 6.0, Some(Rgb(13, 148, 136)), Some(Rgb::BORDER));
        page.line(10.0, 20.0, 100.0, 20.0, Rgb::MUTED, 0.3);
        page.text(12.0, 14.0, Font::Bold, 8.0, Rgb::WHITE, "Caf\u{e9} (beta) \\ 100%");
        vec![page, Page::new(2)]
    }

    #[test]
    fn test_escape_pdf_string() {
        assert_eq!(escape_pdf_string("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(escape_pdf_string("caf\u{e9}"), "caf\\351");
        assert_eq!(escape_pdf_string("\u{2014}"), "--");
    }

    #[test]
    fn test_document_structure() {
        let geometry = PageGeometry::new(PageSize::Letter);
        let bytes = write_pdf(&sample_pages(), &geometry, "Report").unwrap();
        let pdf = String::from_utf8(bytes).unwrap();
        assert!(pdf.starts_with("%PDF-1.4\n"));
        assert!(pdf.ends_with("%%EOF\n"));
        assert!(pdf.contains("/Count 2"));
        assert!(pdf.contains("/Kids [7 0 R 9 0 R]"));
        assert!(pdf.contains("/BaseFont /Helvetica-Bold"));
        assert!(pdf.contains("(Caf\\351 \\(beta\\) \\\\ 100%) Tj"));
        assert!(pdf.contains("/MediaBox [0 0 612.00 792.00]"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let geometry = PageGeometry::new(PageSize::A4);
        let pdf = String::from_utf8(write_pdf(&sample_pages(), &geometry, "Report").unwrap()).unwrap();
        let xref_at: usize = pdf.lines().rev().nth(1).unwrap().parse().unwrap();
        assert!(pdf[xref_at..].starts_with("xref\n"));
        let entries: Vec<&str> = pdf[xref_at..].lines().skip(3).take_while(|l| l.ends_with(" n ")).collect();
        assert_eq!(entries.len(), 10);
        for (i, entry) in entries.iter().enumerate() {
            let offset: usize = entry[..10].parse().unwrap();
            assert!(pdf[offset..].starts_with(&format!("{} 0 obj", i + 1)));
        }
    }

    #[test]
    fn test_output_is_deterministic() {
        let geometry = PageGeometry::new(PageSize::Letter);
        assert_eq!(
            write_pdf(&sample_pages(), &geometry, "Same").unwrap(),
            write_pdf(&sample_pages(), &geometry, "Same").unwrap()
        );
    }
}
