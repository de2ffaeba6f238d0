//! Page layout for report documents.
//!
//! A [`Document`] is flowed top to bottom onto A4 pages and turned into a
//! list of drawing operations per page. Coordinates are PDF points with the
//! origin in the bottom-left corner.

use crate::reports::{Align, Block, Document, Table};

pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;
pub const MARGIN: f32 = 50.0;
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const FOOTER_HEIGHT: f32 = 24.0;
const BOTTOM: f32 = MARGIN + FOOTER_HEIGHT;

const TITLE_SIZE: f32 = 20.0;
const SUBTITLE_SIZE: f32 = 11.0;
const HEADING_SIZE: f32 = 13.0;
const BODY_SIZE: f32 = 10.0;
const TABLE_SIZE: f32 = 9.0;
const FOOTER_SIZE: f32 = 8.0;

const BODY_LEADING: f32 = 14.0;
const ROW_HEIGHT: f32 = 15.0;
const CELL_PADDING: f32 = 4.0;
const KEY_COLUMN: f32 = 190.0;

/// Helvetica advance widths for U+0020..=U+007E, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];
const DEFAULT_WIDTH: u16 = 556;
const BOLD_FACTOR: f32 = 1.06;

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Text {
        x: f32,
        y: f32,
        size: f32,
        bold: bool,
        text: String,
    },
    Rule {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
    },
    Fill {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        gray: f32,
    },
}

pub type Page = Vec<Op>;

pub fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| {
            let code = c as u32;
            if (0x20..=0x7E).contains(&code) {
                HELVETICA_WIDTHS[(code - 0x20) as usize] as u32
            } else {
                DEFAULT_WIDTH as u32
            }
        })
        .sum();
    let width = units as f32 * size / 1000.0;
    if bold { width * BOLD_FACTOR } else { width }
}

/// Shorten `text` with a trailing `...` until it fits in `max_width`.
pub fn fit_text(text: &str, max_width: f32, size: f32, bold: bool) -> String {
    if text_width(text, size, bold) <= max_width {
        return text.to_string();
    }
    let mut chars: Vec<char> = text.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate: String = chars.iter().collect::<String>() + "...";
        if text_width(&candidate, size, bold) <= max_width {
            return candidate;
        }
    }
    String::new()
}

/// Greedy word wrap.
pub fn wrap_text(text: &str, max_width: f32, size: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", line, word)
        };
        if !line.is_empty() && text_width(&candidate, size, false) > max_width {
            lines.push(std::mem::take(&mut line));
            line = word.to_string();
        } else {
            line = candidate;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

struct Paginator {
    pages: Vec<Page>,
    current: Page,
    y: f32,
}

impl Paginator {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn fits(&self, height: f32) -> bool {
        self.y - height >= BOTTOM
    }

    /// Start a new page unless `height` still fits. Returns `true` on a break.
    fn ensure(&mut self, height: f32) -> bool {
        if self.fits(height) {
            return false;
        }
        self.break_page();
        true
    }

    fn break_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn text(&mut self, x: f32, size: f32, bold: bool, text: impl Into<String>) {
        self.current.push(Op::Text {
            x,
            y: self.y,
            size,
            bold,
            text: text.into(),
        });
    }

    fn rule(&mut self, width: f32) {
        self.current.push(Op::Rule {
            x1: MARGIN,
            y1: self.y,
            x2: PAGE_WIDTH - MARGIN,
            y2: self.y,
            width,
        });
    }

    fn finish(mut self) -> Vec<Page> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

/// Flow `document` onto pages. Every page gets a footer; `generated` is
/// printed in it next to the page number.
pub fn paginate(document: &Document, generated: &str) -> Vec<Page> {
    let mut p = Paginator::new();

    p.y -= TITLE_SIZE;
    p.text(MARGIN, TITLE_SIZE, true, document.title.as_str());
    if let Some(subtitle) = &document.subtitle {
        p.y -= SUBTITLE_SIZE + 8.0;
        p.text(MARGIN, SUBTITLE_SIZE, false, subtitle.as_str());
    }
    p.y -= 10.0;
    p.rule(1.0);
    p.y -= 8.0;

    for block in &document.blocks {
        match block {
            Block::Heading(text) => {
                // keep a heading together with the first lines below it
                p.ensure(HEADING_SIZE + 14.0 + 3.0 * ROW_HEIGHT);
                p.y -= HEADING_SIZE + 10.0;
                p.text(MARGIN, HEADING_SIZE, true, text.as_str());
                p.y -= 6.0;
            }
            Block::Paragraph(text) => {
                p.y -= 4.0;
                for line in wrap_text(text, CONTENT_WIDTH, BODY_SIZE) {
                    p.ensure(BODY_LEADING);
                    p.y -= BODY_LEADING;
                    p.text(MARGIN, BODY_SIZE, false, line);
                }
            }
            Block::KeyValues(pairs) => {
                for (key, value) in pairs {
                    p.ensure(BODY_LEADING + 1.0);
                    p.y -= BODY_LEADING + 1.0;
                    let key = fit_text(key, KEY_COLUMN - CELL_PADDING, BODY_SIZE, true);
                    let value = fit_text(value, CONTENT_WIDTH - KEY_COLUMN, BODY_SIZE, false);
                    p.text(MARGIN, BODY_SIZE, true, key);
                    p.text(MARGIN + KEY_COLUMN, BODY_SIZE, false, value);
                }
            }
            Block::Table(table) => layout_table(&mut p, table),
        }
    }

    let mut pages = p.finish();
    let total = pages.len();
    for (index, page) in pages.iter_mut().enumerate() {
        let label = format!("Page {} of {}", index + 1, total);
        page.push(Op::Text {
            x: PAGE_WIDTH - MARGIN - text_width(&label, FOOTER_SIZE, false),
            y: MARGIN / 2.0,
            size: FOOTER_SIZE,
            bold: false,
            text: label,
        });
        page.push(Op::Text {
            x: MARGIN,
            y: MARGIN / 2.0,
            size: FOOTER_SIZE,
            bold: false,
            text: format!("Generated {}", generated),
        });
    }
    pages
}

fn column_edges(table: &Table) -> Vec<(f32, f32)> {
    let total: f32 = table.columns.iter().map(|c| c.weight.max(0.0)).sum();
    let mut x = MARGIN;
    table
        .columns
        .iter()
        .map(|c| {
            let width = if total > 0.0 {
                CONTENT_WIDTH * c.weight.max(0.0) / total
            } else {
                CONTENT_WIDTH / table.columns.len() as f32
            };
            let edge = (x, width);
            x += width;
            edge
        })
        .collect()
}

fn layout_row(p: &mut Paginator, table: &Table, edges: &[(f32, f32)], cells: &[String], bold: bool) {
    let baseline = p.y + (ROW_HEIGHT - TABLE_SIZE) / 2.0;
    for ((column, &(x, width)), cell) in table.columns.iter().zip(edges).zip(cells) {
        let text = fit_text(cell, width - 2.0 * CELL_PADDING, TABLE_SIZE, bold);
        let x = match column.align {
            Align::Left => x + CELL_PADDING,
            Align::Right => x + width - CELL_PADDING - text_width(&text, TABLE_SIZE, bold),
        };
        p.current.push(Op::Text {
            x,
            y: baseline,
            size: TABLE_SIZE,
            bold,
            text,
        });
    }
}

fn layout_header(p: &mut Paginator, table: &Table, edges: &[(f32, f32)]) {
    p.y -= ROW_HEIGHT;
    p.current.push(Op::Fill {
        x: MARGIN,
        y: p.y,
        width: CONTENT_WIDTH,
        height: ROW_HEIGHT,
        gray: 0.85,
    });
    let headers: Vec<String> = table.columns.iter().map(|c| c.header.clone()).collect();
    layout_row(p, table, edges, &headers, true);
}

fn layout_table(p: &mut Paginator, table: &Table) {
    if table.columns.is_empty() {
        return;
    }
    let edges = column_edges(table);
    p.y -= 4.0;
    p.ensure(2.0 * ROW_HEIGHT);
    layout_header(p, table, &edges);

    for (index, row) in table.rows.iter().enumerate() {
        if p.ensure(ROW_HEIGHT) {
            layout_header(p, table, &edges);
        }
        p.y -= ROW_HEIGHT;
        if index % 2 == 1 {
            p.current.push(Op::Fill {
                x: MARGIN,
                y: p.y,
                width: CONTENT_WIDTH,
                height: ROW_HEIGHT,
                gray: 0.95,
            });
        }
        layout_row(p, table, &edges, row, false);
    }
    p.rule(0.5);
    p.y -= 6.0;
}
