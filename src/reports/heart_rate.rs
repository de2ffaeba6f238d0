use crate::apple_health::types::HealthRecord;
use crate::core::{Grouped, Processable};
use crate::error::{AppError, Result};
use crate::reports::{Column, DAILY_TABLE_HEADING, Document, ReportLayout, Table, format_date, kv, period};
use crate::util::{Stats, format_opt};
use chrono::{DateTime, FixedOffset, NaiveDate};
use log::debug;

pub const HEART_RATE_TYPE: &str = "HKQuantityTypeIdentifierHeartRate";
pub const RESTING_HEART_RATE_TYPE: &str = "HKQuantityTypeIdentifierRestingHeartRate";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartRateKind {
    Sample,
    Resting,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeartRateSample {
    pub at: DateTime<FixedOffset>,
    pub bpm: f64,
    pub kind: HeartRateKind,
}

impl HeartRateSample {
    pub fn from_record(record: HealthRecord) -> Option<Self> {
        let kind = match record.record_type.as_str() {
            HEART_RATE_TYPE => HeartRateKind::Sample,
            RESTING_HEART_RATE_TYPE => HeartRateKind::Resting,
            _ => return None,
        };
        let parsed = record
            .numeric_value()
            .and_then(|bpm| Ok((record.start()?, bpm)));
        match parsed {
            Ok((at, bpm)) => Some(Self { at, bpm, kind }),
            Err(e) => {
                debug!("Skipping heart rate record: {}", e);
                None
            }
        }
    }
}

impl Processable for HeartRateSample {
    fn day(&self) -> NaiveDate {
        self.at.date_naive()
    }

    fn sort_key(&self) -> i64 {
        self.at.timestamp()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyHeartRate {
    pub date: NaiveDate,
    pub samples: Stats,
    pub resting: Stats,
}

impl DailyHeartRate {
    pub fn from_samples(date: NaiveDate, samples: &[HeartRateSample]) -> Self {
        let pick = |kind| {
            samples
                .iter()
                .filter(move |s| s.kind == kind)
                .map(|s| s.bpm)
                .collect::<Stats>()
        };
        Self {
            date,
            samples: pick(HeartRateKind::Sample),
            resting: pick(HeartRateKind::Resting),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeartRateSummary {
    pub days_with_data: usize,
    pub overall: Stats,
    pub lowest_day: Option<NaiveDate>,
    pub highest_day: Option<NaiveDate>,
    pub resting: Stats,
}

impl HeartRateSummary {
    pub fn from_days(days: &[DailyHeartRate]) -> Self {
        let mut overall = Stats::default();
        let mut resting = Stats::default();
        let mut lowest: Option<(f64, NaiveDate)> = None;
        let mut highest: Option<(f64, NaiveDate)> = None;
        for day in days {
            overall.merge(&day.samples);
            resting.merge(&day.resting);
            if let Some(min) = day.samples.min {
                if lowest.is_none_or(|(v, _)| min < v) {
                    lowest = Some((min, day.date));
                }
            }
            if let Some(max) = day.samples.max {
                if highest.is_none_or(|(v, _)| max > v) {
                    highest = Some((max, day.date));
                }
            }
        }
        Self {
            days_with_data: days.len(),
            overall,
            lowest_day: lowest.map(|(_, d)| d),
            highest_day: highest.map(|(_, d)| d),
            resting,
        }
    }
}

pub fn daily_values(days: &Grouped<HeartRateSample>) -> Vec<DailyHeartRate> {
    days.iter()
        .map(|(date, samples)| DailyHeartRate::from_samples(*date, samples))
        .collect()
}

pub struct HeartRateLayout;

impl ReportLayout<HeartRateSample> for HeartRateLayout {
    fn build(&self, days: &Grouped<HeartRateSample>, include_daily_table: bool) -> Result<Document> {
        if days.is_empty() {
            return Err(AppError::NoRecords("heart rate records".to_string()));
        }
        let daily = daily_values(days);
        let summary = HeartRateSummary::from_days(&daily);

        let mut doc = Document::new("Heart Rate Report").subtitle(period(days));
        doc.heading("Summary").key_values(vec![
            kv("Period", period(days)),
            kv("Days with data", summary.days_with_data.to_string()),
            kv("Heart rate samples", summary.overall.count.to_string()),
            kv("Average heart rate", bpm(summary.overall.mean())),
            kv(
                "Lowest heart rate",
                with_day(summary.overall.min, summary.lowest_day),
            ),
            kv(
                "Highest heart rate",
                with_day(summary.overall.max, summary.highest_day),
            ),
            kv("Average resting heart rate", bpm(summary.resting.mean())),
        ]);

        if include_daily_table {
            let rows = daily
                .iter()
                .map(|d| {
                    vec![
                        format_date(&d.date),
                        d.samples.count.to_string(),
                        format_opt(d.samples.min, 0),
                        format_opt(d.samples.mean(), 1),
                        format_opt(d.samples.max, 0),
                        format_opt(d.resting.mean(), 0),
                    ]
                })
                .collect();
            doc.heading(DAILY_TABLE_HEADING).table(Table {
                columns: vec![
                    Column::left("Date", 1.6),
                    Column::right("Samples", 1.0),
                    Column::right("Min", 1.0),
                    Column::right("Avg", 1.0),
                    Column::right("Max", 1.0),
                    Column::right("Resting", 1.0),
                ],
                rows,
            });
        }
        doc.paragraph("Values in beats per minute.");
        Ok(doc)
    }
}

fn bpm(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.1} bpm", v))
}

fn with_day(value: Option<f64>, day: Option<NaiveDate>) -> String {
    match (value, day) {
        (Some(v), Some(d)) => format!("{:.0} bpm on {}", v, format_date(&d)),
        _ => "-".to_string(),
    }
}
