//! Per-user state: translation history, result cache and the active record.

mod cache;
mod record;

pub use cache::{CachedResult, TranslationCache};
pub use record::{Rating, ResultSource, Slot, SlotResult, TranslationRecord};

use tracing::{info, warn};

use crate::error::SessionError;
use crate::feedback::{FeedbackRow, FeedbackSink};
use crate::lang::Direction;

/// Result of a correction submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
    Recorded,
    /// The slot was submitted earlier; the sink was not touched.
    AlreadySubmitted,
}

#[derive(Debug, Default)]
pub struct Session {
    history: Vec<TranslationRecord>,
    cache: TranslationCache,
    current: Option<usize>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[TranslationRecord] {
        &self.history
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn current(&self) -> Option<&TranslationRecord> {
        self.current.and_then(|i| self.history.get(i))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Makes `index` the active record.
    pub fn select(&mut self, index: usize) -> Result<(), SessionError> {
        if index >= self.history.len() {
            return Err(SessionError::UnknownRecord(index));
        }
        self.current = Some(index);
        Ok(())
    }

    /// History index of a cached query, keyed by an already normalized text.
    pub(crate) fn lookup(&self, direction: Direction, key: &str) -> Option<usize> {
        self.cache
            .get_normalized(direction, key)
            .map(|hit| hit.record)
            .filter(|&i| i < self.history.len())
    }

    /// Appends `record` and its cache entry together, then activates it.
    pub(crate) fn commit(&mut self, key: String, record: TranslationRecord) -> usize {
        let index = self.history.len();
        self.cache.put_normalized(
            record.direction,
            key,
            record.mt.text.clone(),
            record.generative.text.clone(),
            index,
        );
        self.history.push(record);
        self.current = Some(index);
        index
    }

    pub fn rate(&mut self, index: usize, slot: Slot, rating: Rating) -> Result<(), SessionError> {
        let record = self
            .history
            .get_mut(index)
            .ok_or(SessionError::UnknownRecord(index))?;
        record.slot_mut(slot).rating = rating;
        Ok(())
    }

    /// True iff the slot is rated 普通 or 不佳 and has not been submitted yet.
    pub fn accepts_correction(&self, index: usize, slot: Slot) -> bool {
        self.history.get(index).is_some_and(|r| {
            let s = r.slot(slot);
            s.rating.invites_correction() && !s.submitted
        })
    }

    pub fn submit_correction(
        &mut self,
        index: usize,
        slot: Slot,
        text: &str,
        sink: &mut dyn FeedbackSink,
    ) -> Result<Submission, SessionError> {
        let record = self
            .history
            .get(index)
            .ok_or(SessionError::UnknownRecord(index))?;
        if record.slot(slot).submitted {
            return Ok(Submission::AlreadySubmitted);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyCorrection);
        }
        if !record.slot(slot).rating.invites_correction() {
            return Err(SessionError::CorrectionNotAccepted { index, slot });
        }

        let row = FeedbackRow::for_correction(record, slot, text);
        if let Err(err) = sink.append(&row) {
            warn!(index, %slot, error = %err, "failed to persist correction");
            return Err(err.into());
        }

        let s = self.history[index].slot_mut(slot);
        s.correction = Some(text.to_string());
        s.submitted = true;
        info!(index, %slot, "correction recorded");
        Ok(Submission::Recorded)
    }

    /// Clears history, cache and the active record together.
    pub fn reset(&mut self) {
        self.history.clear();
        self.cache.clear();
        self.current = None;
    }
}
