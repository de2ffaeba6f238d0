use crate::apple_health::types::HealthRecord;
use crate::core::{Grouped, Processable};
use crate::error::{AppError, Result};
use crate::reports::{Column, DAILY_TABLE_HEADING, Document, ReportLayout, Table, format_date, kv, period};
use crate::util::{format_clock, format_minutes, format_percent};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use log::debug;

pub const SLEEP_ANALYSIS_TYPE: &str = "HKCategoryTypeIdentifierSleepAnalysis";

/// Hours subtracted from an interval's start before taking its date, so the
/// evening and the early morning of one night share a key.
pub const NIGHT_OFFSET_HOURS: i64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepStage {
    InBed,
    Asleep,
    Core,
    Deep,
    Rem,
    Awake,
}

impl SleepStage {
    pub fn from_value(value: &str) -> Option<Self> {
        let stage = value.strip_prefix("HKCategoryValueSleepAnalysis")?;
        match stage {
            "InBed" => Some(SleepStage::InBed),
            "Asleep" | "AsleepUnspecified" => Some(SleepStage::Asleep),
            "AsleepCore" => Some(SleepStage::Core),
            "AsleepDeep" => Some(SleepStage::Deep),
            "AsleepREM" => Some(SleepStage::Rem),
            "Awake" => Some(SleepStage::Awake),
            _ => None,
        }
    }

    pub fn is_asleep(self) -> bool {
        matches!(
            self,
            SleepStage::Asleep | SleepStage::Core | SleepStage::Deep | SleepStage::Rem
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SleepInterval {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub stage: SleepStage,
}

impl SleepInterval {
    pub fn from_record(record: HealthRecord) -> Option<Self> {
        if record.record_type != SLEEP_ANALYSIS_TYPE {
            return None;
        }
        let Some(stage) = record.value.as_deref().and_then(SleepStage::from_value) else {
            debug!("Skipping sleep record with value {:?}", record.value);
            return None;
        };
        match (record.start(), record.end()) {
            (Ok(start), Ok(end)) if end > start => Some(Self { start, end, stage }),
            (Ok(_), Ok(_)) => None,
            (Err(e), _) | (_, Err(e)) => {
                debug!("Skipping sleep record: {}", e);
                None
            }
        }
    }
}

impl Processable for SleepInterval {
    fn day(&self) -> NaiveDate {
        (self.start - Duration::hours(NIGHT_OFFSET_HOURS)).date_naive()
    }

    fn sort_key(&self) -> i64 {
        self.start.timestamp()
    }
}

/// Total minutes covered by the union of `intervals`.
pub fn union_minutes<'a, I>(intervals: I) -> i64
where
    I: IntoIterator<Item = &'a SleepInterval>,
{
    let mut spans: Vec<(DateTime<FixedOffset>, DateTime<FixedOffset>)> =
        intervals.into_iter().map(|i| (i.start, i.end)).collect();
    spans.sort_by_key(|(start, _)| *start);

    let mut total = Duration::zero();
    let mut current: Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> = None;
    for (start, end) in spans {
        current = match current {
            Some((cs, ce)) if start <= ce => Some((cs, ce.max(end))),
            Some((cs, ce)) => {
                total += ce - cs;
                Some((start, end))
            }
            None => Some((start, end)),
        };
    }
    if let Some((cs, ce)) = current {
        total += ce - cs;
    }
    total.num_minutes()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SleepNight {
    pub night: NaiveDate,
    pub bedtime: DateTime<FixedOffset>,
    pub wake: DateTime<FixedOffset>,
    pub in_bed_minutes: i64,
    pub asleep_minutes: i64,
    pub core_minutes: i64,
    pub deep_minutes: i64,
    pub rem_minutes: i64,
    pub awake_minutes: i64,
}

impl SleepNight {
    /// Summarise one night; `None` when it has no intervals.
    pub fn from_intervals(night: NaiveDate, intervals: &[SleepInterval]) -> Option<Self> {
        let bedtime = intervals.iter().map(|i| i.start).min()?;
        let wake = intervals.iter().map(|i| i.end).max()?;
        let stage = |stage: SleepStage| union_minutes(intervals.iter().filter(move |i| i.stage == stage));

        // sleep recorded by another source may fall outside the InBed span
        let in_bed_minutes = if intervals.iter().any(|i| i.stage == SleepStage::InBed) {
            union_minutes(
                intervals
                    .iter()
                    .filter(|i| i.stage == SleepStage::InBed || i.stage.is_asleep()),
            )
        } else {
            union_minutes(intervals)
        };

        Some(Self {
            night,
            bedtime,
            wake,
            in_bed_minutes,
            asleep_minutes: union_minutes(intervals.iter().filter(|i| i.stage.is_asleep())),
            core_minutes: stage(SleepStage::Core),
            deep_minutes: stage(SleepStage::Deep),
            rem_minutes: stage(SleepStage::Rem),
            awake_minutes: stage(SleepStage::Awake),
        })
    }

    pub fn efficiency(&self) -> Option<f64> {
        (self.in_bed_minutes > 0).then(|| self.asleep_minutes as f64 / self.in_bed_minutes as f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SleepSummary {
    pub nights: usize,
    pub average_asleep_minutes: i64,
    pub average_in_bed_minutes: i64,
    pub average_efficiency: Option<f64>,
    pub shortest: Option<(NaiveDate, i64)>,
    pub longest: Option<(NaiveDate, i64)>,
}

impl SleepSummary {
    pub fn from_nights(nights: &[SleepNight]) -> Self {
        let count = nights.len() as i64;
        let average = |f: fn(&SleepNight) -> i64| {
            if count == 0 {
                0
            } else {
                nights.iter().map(f).sum::<i64>() / count
            }
        };
        let efficiencies: Vec<f64> = nights.iter().filter_map(SleepNight::efficiency).collect();
        let average_efficiency = (!efficiencies.is_empty())
            .then(|| efficiencies.iter().sum::<f64>() / efficiencies.len() as f64);

        Self {
            nights: nights.len(),
            average_asleep_minutes: average(|n| n.asleep_minutes),
            average_in_bed_minutes: average(|n| n.in_bed_minutes),
            average_efficiency,
            shortest: nights
                .iter()
                .min_by_key(|n| n.asleep_minutes)
                .map(|n| (n.night, n.asleep_minutes)),
            longest: nights
                .iter()
                .max_by_key(|n| n.asleep_minutes)
                .map(|n| (n.night, n.asleep_minutes)),
        }
    }
}

pub fn nightly_values(nights: &Grouped<SleepInterval>) -> Vec<SleepNight> {
    nights
        .iter()
        .filter_map(|(night, intervals)| SleepNight::from_intervals(*night, intervals))
        .collect()
}

pub struct SleepLayout;

impl ReportLayout<SleepInterval> for SleepLayout {
    fn build(&self, days: &Grouped<SleepInterval>, include_daily_table: bool) -> Result<Document> {
        let nights = nightly_values(days);
        if nights.is_empty() {
            return Err(AppError::NoRecords("sleep analysis records".to_string()));
        }
        let summary = SleepSummary::from_nights(&nights);

        let mut doc = Document::new("Sleep Report").subtitle(period(days));
        doc.heading("Summary").key_values(vec![
            kv("Period", period(days)),
            kv("Nights recorded", summary.nights.to_string()),
            kv("Average time asleep", format_minutes(summary.average_asleep_minutes)),
            kv("Average time in bed", format_minutes(summary.average_in_bed_minutes)),
            kv(
                "Average sleep efficiency",
                summary.average_efficiency.map_or_else(|| "-".to_string(), format_percent),
            ),
            kv("Shortest night", night_label(summary.shortest)),
            kv("Longest night", night_label(summary.longest)),
        ]);

        if include_daily_table {
            let rows = nights
                .iter()
                .map(|n| {
                    vec![
                        format_date(&n.night),
                        format_clock(&n.bedtime),
                        format_clock(&n.wake),
                        format_minutes(n.in_bed_minutes),
                        format_minutes(n.asleep_minutes),
                        format_minutes(n.deep_minutes),
                        format_minutes(n.rem_minutes),
                        n.efficiency().map_or_else(|| "-".to_string(), format_percent),
                    ]
                })
                .collect();
            doc.heading(DAILY_TABLE_HEADING).table(Table {
                columns: vec![
                    Column::left("Night", 1.5),
                    Column::right("Bedtime", 1.0),
                    Column::right("Wake", 1.0),
                    Column::right("In bed", 1.1),
                    Column::right("Asleep", 1.1),
                    Column::right("Deep", 1.0),
                    Column::right("REM", 1.0),
                    Column::right("Efficiency", 1.1),
                ],
                rows,
            });
        }
        doc.paragraph(
            "A night collects every interval that starts between noon and noon of the next day.",
        );
        Ok(doc)
    }
}

fn night_label(night: Option<(NaiveDate, i64)>) -> String {
    night.map_or_else(
        || "-".to_string(),
        |(date, minutes)| format!("{} ({})", format_minutes(minutes), format_date(&date)),
    )
}
