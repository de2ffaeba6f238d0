//! The three report exporters and the seam the dispatcher calls them through.

use crate::apple_health::extractor::AppleHealthExtractor;
use crate::config::ReportKind;
use crate::core::Engine;
use crate::error::Result;
use crate::reports::heart_rate::{HeartRateLayout, HeartRateSample};
use crate::reports::medication::{MedicationDose, MedicationLayout};
use crate::reports::sleep::{SleepInterval, SleepLayout};
use crate::sinks::pdf::PdfSink;
use async_trait::async_trait;
use std::path::Path;

/// Produces the report for `kind` from `input` into `output`.
#[async_trait]
pub trait ReportExporter: Send + Sync {
    async fn export(
        &self,
        kind: ReportKind,
        input: &Path,
        output: &Path,
        include_daily_table: bool,
    ) -> Result<()>;
}

/// Exporter backed by the Apple Health pipeline.
pub struct HealthExporter;

#[async_trait]
impl ReportExporter for HealthExporter {
    async fn export(
        &self,
        kind: ReportKind,
        input: &Path,
        output: &Path,
        include_daily_table: bool,
    ) -> Result<()> {
        match kind {
            ReportKind::Heart => export_heart_rate(input, output, include_daily_table).await,
            ReportKind::Sleep => export_sleep(input, output, include_daily_table).await,
            ReportKind::Medication => export_medication(input, output, include_daily_table).await,
        }
    }
}

pub async fn export_heart_rate(input: &Path, output: &Path, include_daily_table: bool) -> Result<()> {
    let extractor = AppleHealthExtractor::new(HeartRateSample::from_record);
    let sink = PdfSink::new(HeartRateLayout, include_daily_table);
    Engine::new(extractor, sink).run(input, output).await
}

pub async fn export_sleep(input: &Path, output: &Path, include_daily_table: bool) -> Result<()> {
    let extractor = AppleHealthExtractor::new(SleepInterval::from_record);
    let sink = PdfSink::new(SleepLayout, include_daily_table);
    Engine::new(extractor, sink).run(input, output).await
}

pub async fn export_medication(input: &Path, output: &Path, include_daily_table: bool) -> Result<()> {
    let extractor = AppleHealthExtractor::new(MedicationDose::from_record);
    let sink = PdfSink::new(MedicationLayout, include_daily_table);
    Engine::new(extractor, sink).run(input, output).await
}
