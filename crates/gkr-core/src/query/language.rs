//! Script detection for incoming queries.

use serde::{Deserialize, Serialize};

use crate::bm25::is_cjk;

/// Share of CJK ideographs above which a query counts as CJK.
pub const CJK_RATIO_THRESHOLD: f32 = 0.3;

/// Dominant script of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Language {
    Cjk,
    Latin,
    /// Empty or whitespace-only input. Handled as Latin downstream.
    Unknown,
}

impl Language {
    /// Whether the query needs translating before English-only processing.
    pub fn needs_translation(self) -> bool {
        self == Self::Cjk
    }

    /// Short code used in the analysis prompt ("zh" / "en").
    pub fn code(self) -> &'static str {
        match self {
            Self::Cjk => "zh",
            Self::Latin | Self::Unknown => "en",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Cjk => "cjk",
            Self::Latin => "latin",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Detect the language of `text` from its CJK ideograph ratio.
pub fn detect_language(text: &str) -> Language {
    let mut total = 0usize;
    let mut cjk = 0usize;
    for c in text.chars().filter(|c| !c.is_whitespace()) {
        total += 1;
        if is_cjk(c) {
            cjk += 1;
        }
    }

    if total == 0 {
        return Language::Unknown;
    }
    if cjk as f32 / total as f32 > CJK_RATIO_THRESHOLD {
        Language::Cjk
    } else {
        Language::Latin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("法师职业介绍"), Language::Cjk);
        assert_eq!(detect_language("how to kill bile titan"), Language::Latin);
        assert_eq!(detect_language(""), Language::Unknown);
        assert_eq!(detect_language("   \t"), Language::Unknown);
    }

    #[test]
    fn test_mixed_text_threshold() {
        // 2 of 6 non-whitespace chars: 0.33 > 0.3
        assert_eq!(detect_language("法师 abcd"), Language::Cjk);
        // 1 of 6: below threshold
        assert_eq!(detect_language("法 abcde"), Language::Latin);
        // Kana and Hangul are outside the ideograph range
        assert_eq!(detect_language("こんにちは"), Language::Latin);
    }
}
