use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

pub const ZH_TAG: &str = "zho_Hant";
pub const TRUKU_TAG: &str = "trv_Truk";

/// Translation direction between Mandarin (華語) and Truku (太魯閣語).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    ZhToTruku,
    TrukuToZh,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Self::ZhToTruku => "華語 ⮕ 太魯閣語",
            Self::TrukuToZh => "太魯閣語 ⮕ 華語",
        }
    }

    pub fn source_tag(self) -> &'static str {
        match self {
            Self::ZhToTruku => ZH_TAG,
            Self::TrukuToZh => TRUKU_TAG,
        }
    }

    pub fn target_tag(self) -> &'static str {
        match self {
            Self::ZhToTruku => TRUKU_TAG,
            Self::TrukuToZh => ZH_TAG,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Self::ZhToTruku => Self::TrukuToZh,
            Self::TrukuToZh => Self::ZhToTruku,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Direction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "zh_truku" | "zh_to_truku" | "zh" => Ok(Self::ZhToTruku),
            "truku_zh" | "truku_to_zh" | "truku" | "trv" => Ok(Self::TrukuToZh),
            other => Err(anyhow!(
                "unknown direction: {other} (expected zh-truku or truku-zh)"
            )),
        }
    }
}
