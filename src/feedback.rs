//! Append-only store for user corrections.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PersistenceError;
use crate::session::{Slot, TranslationRecord};

/// One submitted correction, with both results and ratings as they stood at submission time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRow {
    #[serde(rename = "時間")]
    pub timestamp: String,
    #[serde(rename = "原文")]
    pub original: String,
    #[serde(rename = "參考一結果")]
    pub mt_result: String,
    #[serde(rename = "參考一評分")]
    pub mt_rating: String,
    #[serde(rename = "參考一建議")]
    pub mt_correction: String,
    #[serde(rename = "參考二結果")]
    pub generative_result: String,
    #[serde(rename = "參考二評分")]
    pub generative_rating: String,
    #[serde(rename = "參考二建議")]
    pub generative_correction: String,
}

impl FeedbackRow {
    /// Row for `record` with `correction` filled into `slot`; the other slot keeps its stored
    /// correction, if any.
    pub fn for_correction(record: &TranslationRecord, slot: Slot, correction: &str) -> Self {
        let pick = |s: Slot| -> String {
            if s == slot {
                correction.to_string()
            } else {
                record.slot(s).correction.clone().unwrap_or_default()
            }
        };
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            original: record.original.clone(),
            mt_result: record.mt.text.clone(),
            mt_rating: record.mt.rating.label().to_string(),
            mt_correction: pick(Slot::Mt),
            generative_result: record.generative.text.clone(),
            generative_rating: record.generative.rating.label().to_string(),
            generative_correction: pick(Slot::Generative),
        }
    }
}

pub trait FeedbackSink {
    fn append(&mut self, row: &FeedbackRow) -> Result<(), PersistenceError>;

    fn rows(&self) -> Result<Vec<FeedbackRow>, PersistenceError>;

    fn count(&self) -> Result<usize, PersistenceError> {
        Ok(self.rows()?.len())
    }
}

/// Cumulative number of contributions; unreadable sinks count as zero.
pub fn contribution_count(sink: &dyn FeedbackSink) -> usize {
    match sink.count() {
        Ok(n) => n,
        Err(err) => {
            warn!(error = %err, "failed to read feedback sink");
            0
        }
    }
}

/// One JSON object per line.
pub struct JsonlFeedbackSink {
    path: PathBuf,
}

impl JsonlFeedbackSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FeedbackSink for JsonlFeedbackSink {
    fn append(&mut self, row: &FeedbackRow) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(row)?;
        line.push('\n');
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        f.write_all(line.as_bytes())?;
        f.flush()?;
        Ok(())
    }

    fn rows(&self) -> Result<Vec<FeedbackRow>, PersistenceError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        text.lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(i, l)| {
                serde_json::from_str(l).map_err(|e| PersistenceError::Malformed {
                    line: i + 1,
                    message: e.to_string(),
                })
            })
            .collect()
    }
}
