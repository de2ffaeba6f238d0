use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use crossbeam_channel as channel;
use log::{debug, info};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::Path;
use std::thread;
use std::time::Instant;
use tokio::task;

/// Records grouped by calendar day, each day ordered by [`Processable::sort_key`].
pub type Grouped<T> = BTreeMap<NaiveDate, Vec<T>>;

/// An item a report is built from.
pub trait Processable: Send + Sync + Debug + 'static {
    /// The calendar day this record is reported under.
    fn day(&self) -> NaiveDate;

    /// Key used for ordering records within a day.
    fn sort_key(&self) -> i64;
}

/// A running extraction: items arrive on `receiver`, the outcome on `handle`.
pub struct Extraction<T> {
    pub receiver: channel::Receiver<T>,
    pub handle: thread::JoinHandle<Result<usize>>,
}

/// Starts reading `input_path` and streams converted items into a channel.
pub trait Extractor<T: Processable> {
    fn extract(&self, input_path: &Path) -> Result<Extraction<T>>;
}

/// Writes the grouped items of one report to `output_path`.
#[async_trait]
pub trait Sink<T: Processable>: Send + Sync {
    async fn load(&self, grouped_records: Grouped<T>, output_path: &Path) -> Result<()>;
}

pub struct Engine<T, E, S>
where
    T: Processable,
    E: Extractor<T>,
    S: Sink<T>,
{
    extractor: E,
    sink: S,
    _marker: std::marker::PhantomData<T>,
}

impl<T, E, S> Engine<T, E, S>
where
    T: Processable,
    E: Extractor<T>,
    S: Sink<T>,
{
    pub fn new(extractor: E, sink: S) -> Self {
        Self {
            extractor,
            sink,
            _marker: std::marker::PhantomData,
        }
    }

    /// Extract, group by day and hand the days to the sink.
    pub async fn run(&self, input_path: &Path, output_path: &Path) -> Result<()> {
        let started = Instant::now();
        info!(
            "Reading {} into {}",
            input_path.display(),
            output_path.display()
        );

        let extraction = self.extractor.extract(input_path)?;
        let grouped_records =
            task::spawn_blocking(move || transformer::transform(extraction)).await??;
        let grouped_in = started.elapsed();

        let total_records: usize = grouped_records.values().map(Vec::len).sum();
        let days = grouped_records.len();
        info!(
            "Collected {} matching records over {} days in {:.3}s",
            total_records,
            days,
            grouped_in.as_secs_f64()
        );
        if let (Some(first), Some(last)) =
            (grouped_records.keys().next(), grouped_records.keys().next_back())
        {
            debug!("Records span {} to {}", first, last);
        }

        let load_started = Instant::now();
        self.sink.load(grouped_records, output_path).await?;
        let rendered_in = load_started.elapsed();

        let elapsed = started.elapsed();
        info!(
            "Report ready in {:.3}s (extract and group {:.3}s, render {:.3}s)",
            elapsed.as_secs_f64(),
            grouped_in.as_secs_f64(),
            rendered_in.as_secs_f64()
        );
        if total_records > 0 && elapsed.as_secs_f64() > 0.0 {
            debug!(
                "{:.0} records/second",
                total_records as f64 / elapsed.as_secs_f64()
            );
        }
        Ok(())
    }
}

pub mod transformer {
    use super::{Extraction, Grouped, Processable};
    use crate::error::{AppError, Result};
    use log::debug;

    /// Drain the extraction into day groups, then surface its outcome.
    pub fn transform<T: Processable>(extraction: Extraction<T>) -> Result<Grouped<T>> {
        let Extraction { receiver, handle } = extraction;
        let mut grouped: Grouped<T> = Grouped::new();
        for record in receiver.iter() {
            grouped.entry(record.day()).or_default().push(record);
        }

        let extracted = handle
            .join()
            .map_err(|_| AppError::ThreadError("extraction thread panicked".to_string()))??;
        debug!("Extraction thread reported {} records", extracted);

        for records in grouped.values_mut() {
            records.sort_by_key(|r| r.sort_key());
        }
        Ok(grouped)
    }
}
