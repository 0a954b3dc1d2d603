//! CSV log for PID tuning: one row per dispensing iteration.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use eyre::WrapErr;
use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Serialize)]
struct TuneRow {
    /// Seconds since the Unix epoch.
    timestamp: f64,
    /// Motor speed fraction before this iteration's correction.
    motor_speed: f64,
    /// Current weight over target weight.
    weight_ratio: f64,
}

pub struct PidTuneLog {
    writer: csv::Writer<Box<dyn Write + Send>>,
}

impl PidTuneLog {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .wrap_err_with(|| format!("creating PID tune log {}", path.display()))?;
        tracing::info!(path = %path.display(), "PID tune log enabled");
        Ok(Self::new(file))
    }

    pub fn new(out: impl Write + Send + 'static) -> Self {
        let out: Box<dyn Write + Send> = Box::new(out);
        Self {
            writer: csv::WriterBuilder::new().has_headers(true).from_writer(out),
        }
    }

    pub fn record(&mut self, motor_speed: f64, weight_ratio: f64) -> Result<()> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        self.writer
            .serialize(TuneRow {
                timestamp,
                motor_speed,
                weight_ratio,
            })
            .wrap_err("writing PID tune row")?;
        self.writer.flush().wrap_err("flushing PID tune log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_then_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tune.csv");
        {
            let mut log = PidTuneLog::create(&path).unwrap();
            log.record(0.0, 0.95).unwrap();
            log.record(0.42, 0.97).unwrap();
        }
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("timestamp,motor_speed,weight_ratio"));
        let row: Vec<&str> = lines.nth(1).unwrap().split(',').collect();
        assert_eq!(&row[1..], ["0.42", "0.97"]);
        assert!(row[0].parse::<f64>().unwrap() > 1.0e9);
    }
}
