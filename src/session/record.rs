use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::lang::Direction;
use crate::sentinels;

/// User verdict on one result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    #[default]
    #[serde(rename = "")]
    Unrated,
    #[serde(rename = "優質")]
    Good,
    #[serde(rename = "普通")]
    Fair,
    #[serde(rename = "不佳")]
    Poor,
}

impl Rating {
    pub fn label(self) -> &'static str {
        match self {
            Self::Unrated => "",
            Self::Good => "優質",
            Self::Fair => "普通",
            Self::Poor => "不佳",
        }
    }

    /// 普通 and 不佳 invite the user to suggest a better translation.
    pub fn invites_correction(self) -> bool {
        matches!(self, Self::Fair | Self::Poor)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "優質" | "good" | "1" => Some(Self::Good),
            "普通" | "fair" | "2" => Some(Self::Fair),
            "不佳" | "poor" | "3" => Some(Self::Poor),
            _ => None,
        }
    }
}

/// Which of the two side-by-side results an action refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// Reference one: the dedicated MT service.
    Mt,
    /// Reference two: corpus match or generative model.
    Generative,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mt => f.write_str("參考翻譯一"),
            Self::Generative => f.write_str("參考翻譯二"),
        }
    }
}

/// Where the reference-two result came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultSource {
    #[serde(rename = "語料庫")]
    Corpus,
    #[serde(rename = "AI 專家系統")]
    Generative,
}

impl ResultSource {
    pub fn label(self) -> &'static str {
        match self {
            Self::Corpus => "語料庫",
            Self::Generative => "AI 專家系統",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotResult {
    pub text: String,
    pub rating: Rating,
    pub correction: Option<String>,
    pub submitted: bool,
}

impl SlotResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rating: Rating::Unrated,
            correction: None,
            submitted: false,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        sentinels::is_sentinel(&self.text)
    }
}

/// One query with both engines' results and the user's feedback on them.
#[derive(Clone, Debug)]
pub struct TranslationRecord {
    pub timestamp: DateTime<Local>,
    pub original: String,
    pub direction: Direction,
    pub mt: SlotResult,
    pub generative: SlotResult,
    pub generative_source: ResultSource,
}

impl TranslationRecord {
    pub fn new(
        original: impl Into<String>,
        direction: Direction,
        mt: impl Into<String>,
        generative: impl Into<String>,
        generative_source: ResultSource,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            original: original.into(),
            direction,
            mt: SlotResult::new(mt),
            generative: SlotResult::new(generative),
            generative_source,
        }
    }

    pub fn slot(&self, slot: Slot) -> &SlotResult {
        match slot {
            Slot::Mt => &self.mt,
            Slot::Generative => &self.generative,
        }
    }

    pub fn slot_mut(&mut self, slot: Slot) -> &mut SlotResult {
        match slot {
            Slot::Mt => &mut self.mt,
            Slot::Generative => &mut self.generative,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Rating, ResultSource, Slot, TranslationRecord};
    use crate::lang::Direction;
    use crate::sentinels::MT_BUSY;

    #[test]
    fn only_fair_and_poor_invite_corrections() {
        assert!(!Rating::Unrated.invites_correction());
        assert!(!Rating::Good.invites_correction());
        assert!(Rating::Fair.invites_correction());
        assert!(Rating::Poor.invites_correction());
    }

    #[test]
    fn rating_parses_labels_and_shortcuts() {
        assert_eq!(Rating::parse("優質"), Some(Rating::Good));
        assert_eq!(Rating::parse(" Fair "), Some(Rating::Fair));
        assert_eq!(Rating::parse("3"), Some(Rating::Poor));
        assert_eq!(Rating::parse("meh"), None);
    }

    #[test]
    fn rating_serializes_as_label() {
        assert_eq!(serde_json::to_string(&Rating::Poor).unwrap(), "\"不佳\"");
        assert_eq!(serde_json::to_string(&Rating::Unrated).unwrap(), "\"\"");
    }

    #[test]
    fn new_record_slots_start_unrated() {
        let r = TranslationRecord::new("你好", Direction::ZhToTruku, MT_BUSY, "Kia su hug", ResultSource::Corpus);
        assert!(r.slot(Slot::Mt).is_sentinel());
        assert!(!r.slot(Slot::Generative).is_sentinel());
        assert_eq!(r.slot(Slot::Generative).rating, Rating::Unrated);
        assert!(!r.mt.submitted);
    }
}
