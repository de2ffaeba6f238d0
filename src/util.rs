use chrono::{DateTime, FixedOffset};

/// Replace characters the base-14 fonts cannot show.
///
/// Helvetica is written with WinAnsi encoding, which matches Latin-1 for the
/// printable range, so anything above U+00FF becomes `?`.
pub fn sanitize_text(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\t' => ' ',
            c if c.is_control() => ' ',
            c if (c as u32) > 0xFF => '?',
            c => c,
        })
        .collect()
}

/// Encode sanitized text as single-byte WinAnsi.
pub fn encode_latin1(input: &str) -> Vec<u8> {
    sanitize_text(input).chars().map(|c| c as u32 as u8).collect()
}

/// Format a minute count as `7h 05m`.
pub fn format_minutes(minutes: i64) -> String {
    let minutes = minutes.max(0);
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

pub fn format_percent(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

pub fn format_clock(at: &DateTime<FixedOffset>) -> String {
    at.format("%H:%M").to_string()
}

/// Running min/max/mean over a stream of values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    pub count: usize,
    pub sum: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Stats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    pub fn merge(&mut self, other: &Stats) {
        self.count += other.count;
        self.sum += other.sum;
        if let Some(v) = other.min {
            self.min = Some(self.min.map_or(v, |m| m.min(v)));
        }
        if let Some(v) = other.max {
            self.max = Some(self.max.map_or(v, |m| m.max(v)));
        }
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

impl FromIterator<f64> for Stats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = Stats::default();
        for value in iter {
            stats.push(value);
        }
        stats
    }
}

/// `-` for missing values in report tables.
pub fn format_opt(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.*}", decimals, v))
}
