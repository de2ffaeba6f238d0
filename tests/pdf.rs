use health_report::reports::{Column, Document, Table};
use health_report::sinks::layout::{CONTENT_WIDTH, Op, fit_text, paginate, text_width, wrap_text};
use health_report::sinks::pdf::render_document;

fn long_document(rows: usize) -> Document {
    let mut doc = Document::new("Heart Rate Report").subtitle("2024-01-01 to 2024-12-31");
    doc.heading("Summary")
        .key_values(vec![("Days with data".to_string(), rows.to_string())]);
    doc.heading("Daily values").table(Table {
        columns: vec![Column::left("Date", 1.5), Column::right("Avg", 1.0)],
        rows: (0..rows)
            .map(|i| vec![format!("day {}", i), format!("{}.0", 60 + i % 40)])
            .collect(),
    });
    doc
}

fn texts(page: &[Op]) -> Vec<&str> {
    page.iter()
        .filter_map(|op| match op {
            Op::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

#[test]
fn rendered_document_is_a_pdf() {
    let bytes = render_document(&long_document(5), "2024-03-04 10:00").unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    let tail = String::from_utf8_lossy(&bytes[bytes.len().saturating_sub(64)..]).to_string();
    assert!(tail.contains("%%EOF"));
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("/Helvetica"));
    assert!(text.contains("/Count 1"));
}

#[test]
fn short_document_fits_one_page() {
    let pages = paginate(&long_document(5), "now");
    assert_eq!(pages.len(), 1);
    let page = texts(&pages[0]);
    assert!(page.contains(&"Heart Rate Report"));
    assert!(page.contains(&"Page 1 of 1"));
    assert!(page.contains(&"Generated now"));
}

#[test]
fn long_tables_repeat_their_header() {
    let pages = paginate(&long_document(200), "now");
    assert!(pages.len() >= 3, "expected several pages, got {}", pages.len());

    for (index, page) in pages.iter().enumerate() {
        let page_texts = texts(page);
        let label = format!("Page {} of {}", index + 1, pages.len());
        assert!(page_texts.contains(&label.as_str()));
        assert!(page_texts.contains(&"Date"), "page {} lacks the table header", index + 1);
    }

    let rows: usize = pages
        .iter()
        .map(|page| texts(page).iter().filter(|t| t.starts_with("day ")).count())
        .sum();
    assert_eq!(rows, 200);

    let text = String::from_utf8_lossy(&render_document(&long_document(200), "now").unwrap())
        .to_string();
    assert!(text.contains(&format!("/Count {}", pages.len())));
}

#[test]
fn content_stays_inside_the_page() {
    for page in paginate(&long_document(120), "now") {
        for op in page {
            if let Op::Text { x, y, .. } = op {
                assert!(x >= 0.0 && y >= 0.0, "text placed off page at ({}, {})", x, y);
            }
        }
    }
}

#[test]
fn fit_text_truncates_with_ellipsis() {
    assert_eq!(fit_text("short", 100.0, 10.0, false), "short");
    let fitted = fit_text("a very long medication name indeed", 60.0, 10.0, false);
    assert!(fitted.ends_with("..."));
    assert!(text_width(&fitted, 10.0, false) <= 60.0);
    assert_eq!(fit_text("anything", 1.0, 10.0, false), "");
}

#[test]
fn wrap_text_keeps_lines_within_width() {
    let text = "A night collects every interval that starts between noon and noon of the next day. "
        .repeat(4);
    let lines = wrap_text(&text, CONTENT_WIDTH, 10.0);
    assert!(lines.len() > 1);
    for line in &lines {
        assert!(text_width(line, 10.0, false) <= CONTENT_WIDTH);
    }
    assert_eq!(lines.join(" "), text.split_whitespace().collect::<Vec<_>>().join(" "));
    assert!(wrap_text("   ", 100.0, 10.0).is_empty());
}

#[test]
fn bold_text_is_wider() {
    assert!(text_width("Summary", 10.0, true) > text_width("Summary", 10.0, false));
    assert_eq!(text_width("", 10.0, false), 0.0);
}

#[test]
fn non_latin_text_still_renders() {
    let mut doc = Document::new("Medication Report");
    doc.paragraph("Ibuprofène 200 mg 💊");
    let bytes = render_document(&doc, "now").unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
}
