use crate::core::{Grouped, Processable, Sink};
use crate::error::{AppError, Result};
use crate::reports::{Document, ReportLayout};
use crate::sinks::layout::{self, Op, PAGE_HEIGHT, PAGE_WIDTH};
use crate::util::encode_latin1;
use chrono::Local;
use log::{debug, info};
use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str, TextStr};
use std::path::Path;
use std::time::Instant;
use tokio::task;

const REGULAR_FONT: Name<'static> = Name(b"F1");
const BOLD_FONT: Name<'static> = Name(b"F2");

/// Lays records out with `L` and writes the result as a PDF file.
pub struct PdfSink<L> {
    layout: L,
    include_daily_table: bool,
}

impl<L> PdfSink<L> {
    pub fn new(layout: L, include_daily_table: bool) -> Self {
        Self {
            layout,
            include_daily_table,
        }
    }
}

#[async_trait::async_trait]
impl<T, L> Sink<T> for PdfSink<L>
where
    T: Processable,
    L: ReportLayout<T>,
{
    async fn load(&self, grouped_records: Grouped<T>, output_path: &Path) -> Result<()> {
        let start = Instant::now();
        let document = self.layout.build(&grouped_records, self.include_daily_table)?;
        drop(grouped_records);

        let generated = Local::now().format("%Y-%m-%d %H:%M").to_string();
        let bytes = task::spawn_blocking(move || render_document(&document, &generated)).await??;
        tokio::fs::write(output_path, &bytes).await?;
        info!(
            "Wrote {} ({} bytes) in {:.2}s",
            output_path.display(),
            bytes.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }
}

/// Render `document` into the bytes of a PDF file.
pub fn render_document(document: &Document, generated: &str) -> Result<Vec<u8>> {
    let pages = layout::paginate(document, generated);
    if pages.is_empty() {
        return Err(AppError::PdfError("document produced no pages".to_string()));
    }
    debug!("'{}' laid out on {} pages", document.title, pages.len());

    let catalog_id = Ref::new(1);
    let page_tree_id = Ref::new(2);
    let regular_id = Ref::new(3);
    let bold_id = Ref::new(4);
    let info_id = Ref::new(5);
    let page_ids: Vec<(Ref, Ref)> = (0..pages.len() as i32)
        .map(|i| (Ref::new(6 + 2 * i), Ref::new(7 + 2 * i)))
        .collect();

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id)
        .kids(page_ids.iter().map(|(page_id, _)| *page_id))
        .count(page_ids.len() as i32);

    for (ops, (page_id, content_id)) in pages.iter().zip(&page_ids) {
        let mut page = pdf.page(*page_id);
        page.media_box(Rect::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT));
        page.parent(page_tree_id);
        page.contents(*content_id);
        page.resources()
            .fonts()
            .pair(REGULAR_FONT, regular_id)
            .pair(BOLD_FONT, bold_id);
        page.finish();

        pdf.stream(*content_id, &render_ops(ops));
    }

    pdf.type1_font(regular_id)
        .base_font(Name(b"Helvetica"))
        .encoding_predefined(Name(b"WinAnsiEncoding"));
    pdf.type1_font(bold_id)
        .base_font(Name(b"Helvetica-Bold"))
        .encoding_predefined(Name(b"WinAnsiEncoding"));
    pdf.document_info(info_id)
        .title(TextStr(&document.title))
        .producer(TextStr("health-report"));

    Ok(pdf.finish())
}

fn render_ops(ops: &[Op]) -> Vec<u8> {
    let mut content = Content::new();
    for op in ops {
        match op {
            Op::Text {
                x,
                y,
                size,
                bold,
                text,
            } => {
                let font = if *bold { BOLD_FONT } else { REGULAR_FONT };
                content.begin_text();
                content.set_font(font, *size);
                content.next_line(*x, *y);
                content.show(Str(&encode_latin1(text)));
                content.end_text();
            }
            Op::Rule {
                x1,
                y1,
                x2,
                y2,
                width,
            } => {
                content.save_state();
                content.set_line_width(*width);
                content.set_stroke_gray(0.6);
                content.move_to(*x1, *y1);
                content.line_to(*x2, *y2);
                content.stroke();
                content.restore_state();
            }
            Op::Fill {
                x,
                y,
                width,
                height,
                gray,
            } => {
                content.save_state();
                content.set_fill_gray(*gray);
                content.rect(*x, *y, *width, *height);
                content.fill_nonzero();
                content.restore_state();
            }
        }
    }
    content.finish()
}
