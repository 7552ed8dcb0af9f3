use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Local;
use serde::Serialize;

use crate::session::{Session, TranslationRecord};

#[derive(Clone, Debug, Serialize)]
pub struct HistoryRow {
    #[serde(rename = "時間")]
    pub time: String,
    #[serde(rename = "方向")]
    pub direction: String,
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
    #[serde(rename = "參考二來源")]
    pub generative_source: String,
    #[serde(rename = "參考二評分")]
    pub generative_rating: String,
    #[serde(rename = "參考二建議")]
    pub generative_correction: String,
}

impl From<&TranslationRecord> for HistoryRow {
    fn from(r: &TranslationRecord) -> Self {
        Self {
            time: r.timestamp.format("%H:%M:%S").to_string(),
            direction: r.direction.label().to_string(),
            original: r.original.clone(),
            mt_result: r.mt.text.clone(),
            mt_rating: r.mt.rating.label().to_string(),
            mt_correction: r.mt.correction.clone().unwrap_or_default(),
            generative_result: r.generative.text.clone(),
            generative_source: r.generative_source.label().to_string(),
            generative_rating: r.generative.rating.label().to_string(),
            generative_correction: r.generative.correction.clone().unwrap_or_default(),
        }
    }
}

pub fn build_history(session: &Session) -> Vec<HistoryRow> {
    session.history().iter().map(HistoryRow::from).collect()
}

/// Writes `History_<YYYYmmdd_HHMM>.json` into `dir` and returns its path.
pub fn export_history(session: &Session, dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create export dir: {}", dir.display()))?;
    let name = format!("History_{}.json", Local::now().format("%Y%m%d_%H%M"));
    let path = dir.join(name);
    write_history_file(&path, &build_history(session))?;
    Ok(path)
}

pub fn write_history_file(path: &Path, rows: &[HistoryRow]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(rows).context("serialize history")?;
    let mut buf = String::new();
    buf.push('\u{FEFF}');
    buf.push_str(&json);
    std::fs::write(path, buf).with_context(|| format!("write history: {}", path.display()))?;
    Ok(())
}
