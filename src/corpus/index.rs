use std::collections::HashMap;
use std::path::Path;

use tracing::{info, warn};

use super::delimited::read_delimited_rows;
use super::sheet::read_xlsx_rows;
use crate::error::LoadError;
use crate::lang::Direction;
use crate::textutil::normalize;

/// One Mandarin/Truku pair with its precomputed lookup keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorpusEntry {
    pub source: String,
    pub target: String,
    pub source_key: String,
    pub target_key: String,
}

impl CorpusEntry {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            source_key: normalize(&source),
            target_key: normalize(&target),
            source,
            target,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct LoadOptions {
    /// Skip the first row of the table.
    pub has_header: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { has_header: true }
    }
}

/// Read-only bilingual corpus, loaded once per process.
#[derive(Debug, Default)]
pub struct CorpusIndex {
    entries: Vec<CorpusEntry>,
    by_source: HashMap<String, usize>,
    by_target: HashMap<String, usize>,
}

impl CorpusIndex {
    pub fn load(path: &Path, opts: LoadOptions) -> Result<Self, LoadError> {
        if !path.is_file() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        let rows = match ext.as_str() {
            "xlsx" => read_xlsx_rows(path)?,
            "csv" => read_delimited_rows(path, ',')?,
            "tsv" | "txt" => read_delimited_rows(path, '\t')?,
            other => return Err(LoadError::UnsupportedFormat(other.to_string())),
        };
        let index = Self::from_rows(rows, opts)?;
        info!(
            path = %path.display(),
            entries = index.len(),
            "corpus loaded"
        );
        Ok(index)
    }

    pub fn from_rows(rows: Vec<Vec<String>>, opts: LoadOptions) -> Result<Self, LoadError> {
        let skip = usize::from(opts.has_header);
        let data: Vec<Vec<String>> = rows.into_iter().skip(skip).collect();
        let widest = data.iter().map(Vec::len).max().unwrap_or(0);
        if !data.is_empty() && widest < 2 {
            return Err(LoadError::Malformed(
                "expected two columns (source, target)".to_string(),
            ));
        }

        let pairs = data.into_iter().filter_map(|mut row| {
            row.resize(row.len().max(2), String::new());
            let mut cells = row.into_iter();
            let source = cells.next().unwrap_or_default().trim().to_string();
            let target = cells.next().unwrap_or_default().trim().to_string();
            if source.is_empty() && target.is_empty() {
                None
            } else {
                Some((source, target))
            }
        });
        Ok(Self::from_pairs(pairs))
    }

    pub fn from_pairs<S, T>(pairs: impl IntoIterator<Item = (S, T)>) -> Self
    where
        S: Into<String>,
        T: Into<String>,
    {
        let mut index = Self::default();
        let mut collisions = 0usize;
        for (source, target) in pairs {
            let entry = CorpusEntry::new(source, target);
            let row = index.entries.len();
            // A key is only reachable when the column it answers with has text.
            if !entry.target.trim().is_empty() {
                collisions += usize::from(!insert_first(&mut index.by_source, &entry.source_key, row));
            }
            if !entry.source.trim().is_empty() {
                collisions += usize::from(!insert_first(&mut index.by_target, &entry.target_key, row));
            }
            index.entries.push(entry);
        }
        if collisions > 0 {
            warn!(
                collisions,
                "corpus rows share a normalized key; the first row wins for exact matches"
            );
        }
        index
    }

    /// Corpus text opposite to `key` in the given direction, if some row normalizes to `key`.
    pub fn exact_match(&self, direction: Direction, key: &str) -> Option<&str> {
        if key.is_empty() {
            return None;
        }
        match direction {
            Direction::ZhToTruku => self
                .by_source
                .get(key)
                .map(|&i| self.entries[i].target.as_str()),
            Direction::TrukuToZh => self
                .by_target
                .get(key)
                .map(|&i| self.entries[i].source.as_str()),
        }
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Returns false when `key` was already taken by an earlier row.
fn insert_first(map: &mut HashMap<String, usize>, key: &str, row: usize) -> bool {
    if key.is_empty() {
        return true;
    }
    if map.contains_key(key) {
        return false;
    }
    map.insert(key.to_string(), row);
    true
}
