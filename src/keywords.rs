// =============================================================================
// keywords.rs — THE LISTS
// =============================================================================
//
// Three ordered lists of forbidden phrases, one per risk tier. They are
// compiled into the binary and never change while the process runs. The
// classifier receives them at construction instead of reaching for globals,
// which keeps the tests free to hand it smaller lists.
//
// Order inside a list matters for exactly one thing: highlight precedence.
// Classification only cares whether ANY entry of a tier is present.
// =============================================================================

use crate::error::{AnalysisError, Result};
use crate::models::RiskTier;

/// Restricted goods and services. One hit and the copy is High risk.
pub static HIGH_RISK_KEYWORDS: &[&str] = &[
    "총포",
    "도검류",
    "전기충격기",
    "도박",
    "카지노",
    "마약",
    "담배",
    "담배대용품",
    "혈액",
    "랜덤박스",
    "콘택트 렌즈",
    "성인 사이트",
    "성인 만화",
    "가상화폐",
    "NFT",
    "복권",
    "렌탈폰",
    "중고차",
    "청소년유해매체물",
    "청소년유해약물",
    "청소년 출입",
    "청소년고용금지업소",
    "대출",
    "외화환전",
    "주식정보",
    "암호화폐",
    "몰래카메라",
];

/// Exaggerated efficacy and guarantee claims.
pub static MID_RISK_KEYWORDS: &[&str] = &[
    "1일 10kg 감량",
    "100% 보장",
    "병원보다 낫다",
    "의사 추천",
    "지속적 효과",
    "부작용 없음",
    "즉시 효과",
    "무조건",
];

/// Pressure-selling phrases.
pub static LOW_RISK_KEYWORDS: &[&str] = &[
    "한정 수량",
    "무료 배송",
    "즉시 할인",
    "기간 한정",
    "인기 상품",
    "고객 만족",
    "베스트셀러",
];

/// The three tier lists, validated and ready to hand to a classifier.
#[derive(Debug, Clone, Copy)]
pub struct KeywordLists {
    high: &'static [&'static str],
    mid: &'static [&'static str],
    low: &'static [&'static str],
}

impl KeywordLists {
    /// Build a set of lists. Rejects empty keywords: an empty needle would
    /// match at every position and make every text High risk.
    pub fn new(
        high: &'static [&'static str],
        mid: &'static [&'static str],
        low: &'static [&'static str],
    ) -> Result<Self> {
        for (tier, list) in [(RiskTier::High, high), (RiskTier::Mid, mid), (RiskTier::Low, low)] {
            if list.iter().any(|keyword| keyword.is_empty()) {
                return Err(AnalysisError::InvalidKeyword { tier });
            }
        }
        Ok(Self { high, mid, low })
    }

    /// The lists shipped with the engine.
    pub fn builtin() -> Self {
        Self {
            high: HIGH_RISK_KEYWORDS,
            mid: MID_RISK_KEYWORDS,
            low: LOW_RISK_KEYWORDS,
        }
    }

    /// The list for a tier. `Safe` has no keywords by definition.
    pub fn for_tier(&self, tier: RiskTier) -> &'static [&'static str] {
        match tier {
            RiskTier::High => self.high,
            RiskTier::Mid => self.mid,
            RiskTier::Low => self.low,
            RiskTier::Safe => &[],
        }
    }

    /// Every keyword of every tier, High list first.
    pub fn all(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.high
            .iter()
            .chain(self.mid)
            .chain(self.low)
            .copied()
    }

    pub fn len(&self) -> usize {
        self.high.len() + self.mid.len() + self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for KeywordLists {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lists_validate() {
        let builtin = KeywordLists::builtin();
        assert!(KeywordLists::new(HIGH_RISK_KEYWORDS, MID_RISK_KEYWORDS, LOW_RISK_KEYWORDS).is_ok());
        assert_eq!(builtin.len(), 27 + 8 + 7);
        assert!(builtin.for_tier(RiskTier::Safe).is_empty());
    }

    #[test]
    fn test_empty_keyword_rejected() {
        static BAD: &[&str] = &["무료", ""];
        let err = KeywordLists::new(HIGH_RISK_KEYWORDS, &[], BAD).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidKeyword { tier: RiskTier::Low }));
    }

    #[test]
    fn test_all_starts_with_high_tier() {
        let builtin = KeywordLists::builtin();
        assert_eq!(builtin.all().next(), Some("총포"));
        assert_eq!(builtin.all().last(), Some("베스트셀러"));
        assert_eq!(builtin.all().count(), builtin.len());
    }
}
