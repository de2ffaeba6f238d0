//! Report types and the document model they lay themselves out into.

pub mod heart_rate;
pub mod medication;
pub mod sleep;

use crate::core::Grouped;
use crate::error::Result;
use chrono::NaiveDate;

/// Builds the printable document for one report type.
pub trait ReportLayout<T>: Send + Sync + 'static {
    fn build(&self, days: &Grouped<T>, include_daily_table: bool) -> Result<Document>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub header: String,
    /// Share of the table width, relative to the other columns.
    pub weight: f32,
    pub align: Align,
}

impl Column {
    pub fn left(header: &str, weight: f32) -> Self {
        Self {
            header: header.to_string(),
            weight,
            align: Align::Left,
        }
    }

    pub fn right(header: &str, weight: f32) -> Self {
        Self {
            header: header.to_string(),
            weight,
            align: Align::Right,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading(String),
    Paragraph(String),
    KeyValues(Vec<(String, String)>),
    Table(Table),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub title: String,
    pub subtitle: Option<String>,
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            blocks: Vec::new(),
        }
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn heading(&mut self, text: impl Into<String>) -> &mut Self {
        self.blocks.push(Block::Heading(text.into()));
        self
    }

    pub fn paragraph(&mut self, text: impl Into<String>) -> &mut Self {
        self.blocks.push(Block::Paragraph(text.into()));
        self
    }

    pub fn key_values(&mut self, pairs: Vec<(String, String)>) -> &mut Self {
        self.blocks.push(Block::KeyValues(pairs));
        self
    }

    pub fn table(&mut self, table: Table) -> &mut Self {
        self.blocks.push(Block::Table(table));
        self
    }

    pub fn headings(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Heading(text) => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Table(table) => Some(table),
            _ => None,
        })
    }
}

/// Heading placed above every per-day table.
pub const DAILY_TABLE_HEADING: &str = "Daily values";

/// `2024-03-01 to 2024-03-07`, or a single date.
pub fn period<T>(days: &Grouped<T>) -> String {
    match (days.keys().next(), days.keys().next_back()) {
        (Some(first), Some(last)) if first != last => format!("{} to {}", first, last),
        (Some(first), _) => first.to_string(),
        _ => "-".to_string(),
    }
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn kv(key: &str, value: impl Into<String>) -> (String, String) {
    (key.to_string(), value.into())
}
