use super::canvas::DrawOp;
use super::layout::PageSize;
use super::*;
use crate::classify::BandKey;
use crate::model::ColumnDef;

/// A page body that fits one header row plus exactly six data rows.
fn six_rows_per_page() -> PageGeometry {
    PageGeometry::with_body_height(PageSize::Letter, HEADER_ROW_HEIGHT + 6.0 * ROW_HEIGHT)
}

fn table_document(rows: usize) -> Document {
    let mut table = Table::new(vec![ColumnDef::new("Item", 2.0), ColumnDef::new("Value", 1.0)]);
    for i in 1..=rows {
        table.push_row(vec![Cell::plain(format!("Row {:02}", i)), Cell::plain(i.to_string())]).unwrap();
    }
    let mut section = Section::new("");
    section.table(table);
    let mut doc = Document::new("Pagination", "test", Rgb(13, 148, 136));
    doc.push_section(section);
    doc
}

fn body_texts(page: &Page) -> Vec<String> {
    page.texts().filter(|run| run.text != "Pagination").map(|run| run.text.clone()).collect()
}

#[test]
fn test_sixty_rows_make_ten_pages() {
    let pages = paginate(&table_document(60), &six_rows_per_page()).unwrap();
    assert_eq!(pages.len(), 10);

    for page in &pages {
        let texts = body_texts(page);
        // Header (continuation header after page 1) comes first on every page.
        assert_eq!(&texts[..2], &["Item".to_string(), "Value".to_string()], "page {}", page.number);
        let rows = texts.iter().filter(|t| t.starts_with("Row ")).count();
        assert_eq!(rows, 6, "page {}", page.number);
    }
}

#[test]
fn test_row_order_is_preserved_across_pages() {
    let pages = paginate(&table_document(60), &six_rows_per_page()).unwrap();
    let rows: Vec<String> =
        pages.iter().flat_map(body_texts).filter(|t| t.starts_with("Row ")).collect();
    let expected: Vec<String> = (1..=60).map(|i| format!("Row {:02}", i)).collect();
    assert_eq!(rows, expected);
}

#[test]
fn test_partial_last_page() {
    let pages = paginate(&table_document(13), &six_rows_per_page()).unwrap();
    assert_eq!(pages.len(), 3);
    let last = body_texts(&pages[2]);
    assert_eq!(last, vec!["Item", "Value", "Row 13", "13"]);
}

#[test]
fn test_zebra_parity_resets_on_every_page() {
    let geometry = six_rows_per_page();
    let pages = paginate(&table_document(14), &geometry).unwrap();
    let first_row_top = geometry.body_top + HEADER_ROW_HEIGHT;
    for page in &pages {
        let fill = page.ops.iter().find_map(|op| match op {
            DrawOp::Rect { y, fill, .. } if (*y - first_row_top).abs() < 1e-9 => *fill,
            _ => None,
        });
        assert_eq!(fill, Some(Rgb::ZEBRA), "page {}", page.number);
    }
}

#[test]
fn test_footer_shows_total_pages() {
    let mut doc = table_document(20);
    doc.footer = "Pagination Report".to_string();
    let pages = paginate(&doc, &six_rows_per_page()).unwrap();
    assert_eq!(pages.len(), 4);
    let footers: Vec<String> = pages.iter().map(|p| p.footer.as_ref().unwrap().text.clone()).collect();
    assert_eq!(footers[0], "Pagination Report  |  Page 1 of 4");
    assert_eq!(footers[3], "Pagination Report  |  Page 4 of 4");
    assert!(footers.iter().all(|f| !f.contains(TOTAL_PAGES_TOKEN)));
}

#[test]
fn test_header_stays_with_first_row() {
    // Leave less than a header plus one row free at the bottom of page one.
    let geometry = six_rows_per_page();
    let free = geometry.usable_height();
    let lines = ((free - ROW_HEIGHT) / LINE_HEIGHT).floor() as usize;
    let mut doc = table_document(3);
    let mut intro = Section::new("");
    intro.narrative(vec!["line"; lines].join("\n"));
    doc.sections.insert(0, intro);

    let pages = paginate(&doc, &geometry).unwrap();
    assert_eq!(pages.len(), 2);
    assert!(!body_texts(&pages[0]).contains(&"Item".to_string()));
    assert_eq!(&body_texts(&pages[1])[..3], &["Item".to_string(), "Value".to_string(), "Row 01".to_string()]);
}

#[test]
fn test_narrative_paragraphs_are_separated_by_a_blank_line() {
    let mut section = Section::new("");
    section.narrative("First paragraph.\n\nSecond paragraph.");
    let mut doc = Document::new("Paragraphs", "test", Rgb::WHITE);
    doc.push_section(section);

    let pages = paginate(&doc, &PageGeometry::new(PageSize::Letter)).unwrap();
    let baselines: Vec<f64> =
        pages[0].texts().filter(|run| run.text.ends_with("paragraph.")).map(|run| run.y).collect();
    assert_eq!(baselines.len(), 2);
    assert!((baselines[1] - baselines[0] - 2.0 * LINE_HEIGHT).abs() < 1e-9);
}

#[test]
fn test_row_taller_than_page_is_rejected() {
    let geometry = PageGeometry::with_body_height(PageSize::Letter, ROW_HEIGHT);
    let err = paginate(&table_document(1), &geometry).unwrap_err();
    assert!(matches!(err, LayoutError::RowTooTall { what: "table row", .. }));
}

#[test]
fn test_empty_document_has_one_page() {
    let doc = Document::new("Empty", "test", Rgb::WHITE);
    let pages = paginate(&doc, &PageGeometry::new(PageSize::A4)).unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].footer.as_ref().unwrap().text, "Page 1 of 1");
}

#[test]
fn test_long_cells_are_truncated() {
    let mut table = Table::new(vec![ColumnDef::new("Name", 1.0), ColumnDef::new("Notes", 9.0)]);
    table.push_row(vec![Cell::plain("A very long business name that will never fit"), Cell::plain("ok")]).unwrap();
    let mut section = Section::new("Truncation");
    section.table(table);
    let mut doc = Document::new("T", "test", Rgb::WHITE);
    doc.push_section(section);

    let pages = paginate(&doc, &PageGeometry::new(PageSize::Letter)).unwrap();
    let cell = pages[0].texts().find(|run| run.text.starts_with("A ")).unwrap();
    assert!(cell.text.ends_with("..."));
}

#[test]
fn test_score_bar_fill_is_proportional() {
    let band = ClassificationBand {
        key: BandKey::Threshold(0.0),
        background: Rgb(0xFF, 0xC7, 0xCE),
        text: Rgb(0x99, 0x1B, 0x1B),
        label: "Critical".into(),
    };
    let mut section = Section::new("");
    section.push(Block::ScoreBar { label: "Risk".into(), score: 41.0, band: band.clone() });
    section.push(Block::ScoreBar { label: "Zero".into(), score: 0.0, band });
    let mut doc = Document::new("Bars", "test", Rgb::WHITE);
    doc.push_section(section);

    let geometry = PageGeometry::new(PageSize::Letter);
    let pages = paginate(&doc, &geometry).unwrap();
    let fills: Vec<f64> = pages[0]
        .ops
        .iter()
        .filter_map(|op| match op {
            DrawOp::Rect { w, fill: Some(color), .. } if *color == Rgb(0x99, 0x1B, 0x1B) => Some(*w),
            _ => None,
        })
        .collect();
    let track = geometry.usable_width() - BAR_LABEL_WIDTH - BAR_VALUE_WIDTH;
    assert_eq!(fills.len(), 2);
    assert!((fills[0] - track * 0.41).abs() < 1e-9);
    assert!((fills[1] - BAR_MIN_FILL).abs() < 1e-9);
}

#[test]
fn test_render_produces_pdf_bytes() {
    let renderer = PdfRenderer::new(six_rows_per_page());
    let bytes = renderer.render(&table_document(60)).unwrap();
    assert!(bytes.starts_with(b"%PDF-1.4"));
    assert!(String::from_utf8_lossy(&bytes).contains("/Count 10"));
}
