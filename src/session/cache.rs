use std::collections::HashMap;

use crate::lang::Direction;
use crate::textutil::normalize;

/// Results of an earlier query plus the history record they were stored in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedResult {
    pub mt: String,
    pub generative: String,
    pub record: usize,
}

/// Dual-engine results keyed by direction and normalized input.
#[derive(Debug, Default)]
pub struct TranslationCache {
    entries: HashMap<(Direction, String), CachedResult>,
}

impl TranslationCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, direction: Direction, text: &str) -> Option<&CachedResult> {
        self.get_normalized(direction, &normalize(text))
    }

    pub fn get_normalized(&self, direction: Direction, key: &str) -> Option<&CachedResult> {
        self.entries.get(&(direction, key.to_string()))
    }

    pub fn put(
        &mut self,
        direction: Direction,
        text: &str,
        mt: impl Into<String>,
        generative: impl Into<String>,
        record: usize,
    ) {
        self.put_normalized(direction, normalize(text), mt, generative, record);
    }

    pub(crate) fn put_normalized(
        &mut self,
        direction: Direction,
        key: String,
        mt: impl Into<String>,
        generative: impl Into<String>,
        record: usize,
    ) {
        self.entries.insert(
            (direction, key),
            CachedResult {
                mt: mt.into(),
                generative: generative.into(),
                record,
            },
        );
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::TranslationCache;
    use crate::lang::Direction;

    #[test]
    fn lookup_is_normalized_and_direction_scoped() {
        let mut cache = TranslationCache::new();
        cache.put(Direction::ZhToTruku, "您好!", "mt", "gen", 0);

        let hit = cache.get(Direction::ZhToTruku, "您 好").expect("hit");
        assert_eq!(hit.generative, "gen");
        assert_eq!(hit.record, 0);
        assert!(cache.get(Direction::TrukuToZh, "您好").is_none());
    }

    #[test]
    fn same_key_keeps_one_entry() {
        let mut cache = TranslationCache::new();
        cache.put(Direction::ZhToTruku, "山", "a", "b", 0);
        cache.put(Direction::ZhToTruku, "山。", "c", "d", 0);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
