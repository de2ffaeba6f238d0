use crate::error::{AppError, Result};
use chrono::{DateTime, FixedOffset};
use quick_xml::events::BytesStart;
use quick_xml::name::QName;

/// Timestamp layout used throughout `export.xml`, e.g. `2024-03-01 07:15:00 +0100`.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

pub fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| AppError::ParseError(format!("Invalid timestamp '{}': {}", value, e)))
}

/// One `<Record>` element of an Apple Health export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthRecord {
    pub record_type: String,
    pub value: Option<String>,
    pub unit: Option<String>,
    pub source_name: String,
    pub creation_date: Option<String>,
    pub start_date: String,
    pub end_date: String,
    /// `<MetadataEntry key=".." value=".."/>` children, in document order.
    pub metadata: Vec<(String, String)>,
}

impl HealthRecord {
    pub fn from_xml(element: &BytesStart) -> Result<Self> {
        let mut record = HealthRecord::default();

        for attr in element.attributes() {
            let attr = attr
                .map_err(|e| AppError::ParseError(format!("Failed to parse attribute: {}", e)))?;
            let value = attr
                .unescape_value()
                .map_err(|e| AppError::ParseError(format!("Invalid attribute value: {}", e)))?
                .into_owned();
            match attr.key {
                QName(b"type") => record.record_type = value,
                QName(b"value") => record.value = Some(value),
                QName(b"unit") => record.unit = Some(value),
                QName(b"sourceName") => record.source_name = value,
                QName(b"creationDate") => record.creation_date = Some(value),
                QName(b"startDate") => record.start_date = value,
                QName(b"endDate") => record.end_date = value,
                _ => {}
            }
        }

        Ok(record)
    }

    /// Attach a `<MetadataEntry>` child.
    pub fn push_metadata(&mut self, element: &BytesStart) -> Result<()> {
        let mut key = None;
        let mut value = None;
        for attr in element.attributes() {
            let attr = attr
                .map_err(|e| AppError::ParseError(format!("Failed to parse attribute: {}", e)))?;
            let text = attr
                .unescape_value()
                .map_err(|e| AppError::ParseError(format!("Invalid attribute value: {}", e)))?
                .into_owned();
            match attr.key {
                QName(b"key") => key = Some(text),
                QName(b"value") => value = Some(text),
                _ => {}
            }
        }
        if let Some(key) = key {
            self.metadata.push((key, value.unwrap_or_default()));
        }
        Ok(())
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn start(&self) -> Result<DateTime<FixedOffset>> {
        parse_timestamp(&self.start_date)
    }

    pub fn end(&self) -> Result<DateTime<FixedOffset>> {
        parse_timestamp(&self.end_date)
    }

    pub fn numeric_value(&self) -> Result<f64> {
        let raw = self.value.as_deref().ok_or_else(|| AppError::MalformedRecord {
            record_type: self.record_type.clone(),
            reason: "missing value".to_string(),
        })?;
        raw.trim().parse().map_err(|e| AppError::MalformedRecord {
            record_type: self.record_type.clone(),
            reason: format!("value '{}' is not a number: {}", raw, e),
        })
    }
}
