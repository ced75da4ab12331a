//! Administrative level definitions for crawled policies
//!
//! The level is inferred from keywords in the policy title.

use serde::{Deserialize, Serialize};
use std::fmt;

/// City names that mark a policy as municipal
const MUNICIPAL_KEYWORDS: &[&str] = &[
    "北京市", "上海市", "天津市", "重庆市", "广州市", "深圳市", "杭州市", "南京市", "武汉市",
    "成都市",
];

/// Title fragments that mark a policy as provincial
const PROVINCIAL_MARKERS: &[&str] = &["省", "自治区", "兵团"];

/// Administrative level a policy was issued at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionLevel {
    National,
    Provincial,
    Municipal,
}

impl RegionLevel {
    /// Infers the level from a policy title
    ///
    /// Municipal keywords are checked before provincial markers, so
    /// "上海市" wins over the "省" in a title that mentions both. Titles
    /// matching neither list are national.
    pub fn infer(title: &str) -> Self {
        if MUNICIPAL_KEYWORDS.iter().any(|k| title.contains(k)) {
            Self::Municipal
        } else if PROVINCIAL_MARKERS.iter().any(|m| title.contains(m)) {
            Self::Provincial
        } else {
            Self::National
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::National => "national",
            Self::Provincial => "provincial",
            Self::Municipal => "municipal",
        }
    }
}

impl fmt::Display for RegionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
