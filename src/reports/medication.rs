use crate::apple_health::types::HealthRecord;
use crate::core::{Grouped, Processable};
use crate::error::{AppError, Result};
use crate::reports::{Column, DAILY_TABLE_HEADING, Document, ReportLayout, Table, format_date, kv, period};
use crate::util::{format_clock, format_percent};
use chrono::{DateTime, FixedOffset, NaiveDate};
use log::debug;
use std::collections::BTreeMap;

/// Record types carrying logged doses all contain this marker.
pub const DOSE_EVENT_MARKER: &str = "MedicationDoseEvent";

const NAME_KEYS: [&str; 3] = ["HKMedicationName", "MedicationName", "medicationName"];
const STATUS_KEYS: [&str; 2] = ["HKMedicationDoseEventStatus", "status"];
pub const UNKNOWN_MEDICATION: &str = "Unknown medication";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoseStatus {
    Taken,
    Skipped,
    Unknown,
}

/// Status words that mean the dose was not taken. Matched before `taken`,
/// which every negated form contains.
const NOT_TAKEN: [&str; 4] = ["skipped", "missed", "nottaken", "untaken"];

impl DoseStatus {
    /// Read a status from metadata or a record value, ignoring case and
    /// separators (`HKMedicationDoseEventStatusNotTaken`, `not taken`).
    pub fn from_text(text: &str) -> Self {
        let word: String = text
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if NOT_TAKEN.iter().any(|negative| word.contains(negative)) {
            DoseStatus::Skipped
        } else if word.contains("taken") {
            DoseStatus::Taken
        } else {
            DoseStatus::Unknown
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MedicationDose {
    pub at: DateTime<FixedOffset>,
    pub name: String,
    pub status: DoseStatus,
    pub dose: Option<f64>,
    pub unit: Option<String>,
}

impl MedicationDose {
    pub fn from_record(record: HealthRecord) -> Option<Self> {
        if !record.record_type.contains(DOSE_EVENT_MARKER) {
            return None;
        }
        let at = match record.start() {
            Ok(at) => at,
            Err(e) => {
                debug!("Skipping medication record: {}", e);
                return None;
            }
        };
        let name = NAME_KEYS
            .iter()
            .find_map(|k| record.metadata_value(k))
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN_MEDICATION)
            .to_string();
        let dose = record.numeric_value().ok();
        let status = STATUS_KEYS
            .iter()
            .find_map(|k| record.metadata_value(k))
            .map(DoseStatus::from_text)
            .or_else(|| match (&record.value, dose) {
                (_, Some(_)) => None,
                (Some(text), None) => Some(DoseStatus::from_text(text)),
                (None, None) => None,
            })
            .unwrap_or(if dose.is_some() {
                DoseStatus::Taken
            } else {
                DoseStatus::Unknown
            });

        Some(Self {
            at,
            name,
            status,
            dose,
            unit: record.unit,
        })
    }
}

impl Processable for MedicationDose {
    fn day(&self) -> NaiveDate {
        self.at.date_naive()
    }

    fn sort_key(&self) -> i64 {
        self.at.timestamp()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoseTally {
    pub taken: usize,
    pub skipped: usize,
    pub unknown: usize,
}

impl DoseTally {
    pub fn record(&mut self, status: DoseStatus) {
        match status {
            DoseStatus::Taken => self.taken += 1,
            DoseStatus::Skipped => self.skipped += 1,
            DoseStatus::Unknown => self.unknown += 1,
        }
    }

    /// `taken / (taken + skipped)`; doses without a status do not count.
    pub fn adherence(&self) -> Option<f64> {
        let logged = self.taken + self.skipped;
        (logged > 0).then(|| self.taken as f64 / logged as f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MedicationSummary {
    pub name: String,
    pub tally: DoseTally,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyMedication {
    pub date: NaiveDate,
    pub name: String,
    pub tally: DoseTally,
    /// Clock times of the doses taken that day.
    pub times: Vec<String>,
}

/// Per-medication totals, ordered by name.
pub fn medication_summaries(days: &Grouped<MedicationDose>) -> Vec<MedicationSummary> {
    let mut by_name: BTreeMap<&str, MedicationSummary> = BTreeMap::new();
    for (date, doses) in days {
        for dose in doses {
            let entry = by_name
                .entry(dose.name.as_str())
                .or_insert_with(|| MedicationSummary {
                    name: dose.name.clone(),
                    tally: DoseTally::default(),
                    first_day: *date,
                    last_day: *date,
                });
            entry.tally.record(dose.status);
            entry.first_day = entry.first_day.min(*date);
            entry.last_day = entry.last_day.max(*date);
        }
    }
    by_name.into_values().collect()
}

/// One row per day and medication, in date then name order.
pub fn daily_values(days: &Grouped<MedicationDose>) -> Vec<DailyMedication> {
    let mut rows = Vec::new();
    for (date, doses) in days {
        let mut by_name: BTreeMap<&str, DailyMedication> = BTreeMap::new();
        for dose in doses {
            let entry = by_name
                .entry(dose.name.as_str())
                .or_insert_with(|| DailyMedication {
                    date: *date,
                    name: dose.name.clone(),
                    tally: DoseTally::default(),
                    times: Vec::new(),
                });
            entry.tally.record(dose.status);
            if dose.status == DoseStatus::Taken {
                entry.times.push(format_clock(&dose.at));
            }
        }
        rows.extend(by_name.into_values());
    }
    rows
}

pub struct MedicationLayout;

impl ReportLayout<MedicationDose> for MedicationLayout {
    fn build(&self, days: &Grouped<MedicationDose>, include_daily_table: bool) -> Result<Document> {
        if days.is_empty() {
            return Err(AppError::NoRecords("medication dose records".to_string()));
        }
        let summaries = medication_summaries(days);
        let mut total = DoseTally::default();
        for summary in &summaries {
            total.taken += summary.tally.taken;
            total.skipped += summary.tally.skipped;
            total.unknown += summary.tally.unknown;
        }

        let mut doc = Document::new("Medication Report").subtitle(period(days));
        doc.heading("Summary").key_values(vec![
            kv("Period", period(days)),
            kv("Days with doses", days.len().to_string()),
            kv("Medications", summaries.len().to_string()),
            kv("Doses taken", total.taken.to_string()),
            kv("Doses skipped", total.skipped.to_string()),
            kv("Overall adherence", adherence(&total)),
        ]);

        doc.heading("Medications").table(Table {
            columns: vec![
                Column::left("Medication", 2.6),
                Column::right("Taken", 0.9),
                Column::right("Skipped", 0.9),
                Column::right("Adherence", 1.1),
                Column::right("First", 1.4),
                Column::right("Last", 1.4),
            ],
            rows: summaries
                .iter()
                .map(|s| {
                    vec![
                        s.name.clone(),
                        s.tally.taken.to_string(),
                        s.tally.skipped.to_string(),
                        adherence(&s.tally),
                        format_date(&s.first_day),
                        format_date(&s.last_day),
                    ]
                })
                .collect(),
        });

        if include_daily_table {
            let rows = daily_values(days)
                .into_iter()
                .map(|d| {
                    vec![
                        format_date(&d.date),
                        d.name,
                        d.tally.taken.to_string(),
                        d.tally.skipped.to_string(),
                        if d.times.is_empty() {
                            "-".to_string()
                        } else {
                            d.times.join(", ")
                        },
                    ]
                })
                .collect();
            doc.heading(DAILY_TABLE_HEADING).table(Table {
                columns: vec![
                    Column::left("Date", 1.3),
                    Column::left("Medication", 2.4),
                    Column::right("Taken", 0.8),
                    Column::right("Skipped", 0.9),
                    Column::left("Times", 2.2),
                ],
                rows,
            });
        }
        doc.paragraph("Adherence counts taken doses against taken plus skipped doses.");
        Ok(doc)
    }
}

fn adherence(tally: &DoseTally) -> String {
    tally
        .adherence()
        .map_or_else(|| "-".to_string(), format_percent)
}
