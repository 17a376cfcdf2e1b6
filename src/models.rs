// =============================================================================
// models.rs — THE SACRED DATA STRUCTURES OF AD COPY JUDGEMENT
// =============================================================================
//
// Four tiers, one verdict, one tally. Every piece of ad copy that passes
// through the engine leaves as an AnalysisResult: how risky it is, how many
// forbidden phrases it contains, and the same text with those phrases
// painted red, orange or blue.
// =============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// The verdict. Variants are declared lowest-first so the derived `Ord`
/// gives `High > Mid > Low > Safe`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    /// Nothing from any list. Go ahead and publish.
    Safe,
    /// Pushy marketing ("한정 수량", "무료 배송"). Annoying but legal.
    Low,
    /// Exaggerated efficacy claims ("100% 보장", "의사 추천").
    Mid,
    /// Restricted goods and services (weapons, gambling, loans, ...).
    High,
}

impl RiskTier {
    /// Every tier, highest precedence first. Also the chart order.
    pub const BY_PRECEDENCE: [RiskTier; 4] =
        [RiskTier::High, RiskTier::Mid, RiskTier::Low, RiskTier::Safe];

    /// Fixed display label, as shown to users and written to exports.
    pub fn label(self) -> &'static str {
        match self {
            RiskTier::High => "고위험",
            RiskTier::Mid => "중위험",
            RiskTier::Low => "저위험",
            RiskTier::Safe => "안전",
        }
    }

    /// Stable machine identifier, matches the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            RiskTier::High => "high",
            RiskTier::Mid => "mid",
            RiskTier::Low => "low",
            RiskTier::Safe => "safe",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything we know about one piece of ad copy. Produced fresh per input,
/// owned by the caller, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub tier: RiskTier,
    /// Non-overlapping occurrences summed over every keyword of every tier.
    pub keyword_count: usize,
    /// The input with tier markers wrapped around each matched keyword.
    pub annotated_text: String,
}

/// How many rows landed in each tier. The batch view's bar chart is drawn
/// straight from this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierDistribution {
    pub high: usize,
    pub mid: usize,
    pub low: usize,
    pub safe: usize,
}

impl TierDistribution {
    pub fn record(&mut self, tier: RiskTier) {
        *self.slot(tier) += 1;
    }

    pub fn count(&self, tier: RiskTier) -> usize {
        match tier {
            RiskTier::High => self.high,
            RiskTier::Mid => self.mid,
            RiskTier::Low => self.low,
            RiskTier::Safe => self.safe,
        }
    }

    pub fn total(&self) -> usize {
        self.high + self.mid + self.low + self.safe
    }

    /// `(tier, rows)` pairs in chart order: High, Mid, Low, Safe.
    pub fn iter(&self) -> impl Iterator<Item = (RiskTier, usize)> + '_ {
        RiskTier::BY_PRECEDENCE
            .into_iter()
            .map(move |tier| (tier, self.count(tier)))
    }

    fn slot(&mut self, tier: RiskTier) -> &mut usize {
        match tier {
            RiskTier::High => &mut self.high,
            RiskTier::Mid => &mut self.mid,
            RiskTier::Low => &mut self.low,
            RiskTier::Safe => &mut self.safe,
        }
    }
}

impl FromIterator<RiskTier> for TierDistribution {
    fn from_iter<I: IntoIterator<Item = RiskTier>>(iter: I) -> Self {
        let mut distribution = TierDistribution::default();
        for tier in iter {
            distribution.record(tier);
        }
        distribution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_ordering() {
        assert!(RiskTier::High > RiskTier::Mid);
        assert!(RiskTier::Mid > RiskTier::Low);
        assert!(RiskTier::Low > RiskTier::Safe);
        let mut sorted = RiskTier::BY_PRECEDENCE;
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(sorted, RiskTier::BY_PRECEDENCE);
    }

    #[test]
    fn test_labels_are_fixed() {
        let labels: Vec<_> = RiskTier::BY_PRECEDENCE.iter().map(|t| t.label()).collect();
        assert_eq!(labels, ["고위험", "중위험", "저위험", "안전"]);
        assert_eq!(RiskTier::Mid.to_string(), "중위험");
    }

    #[test]
    fn test_serde_uses_identifiers() {
        assert_eq!(serde_json::to_string(&RiskTier::High).unwrap(), "\"high\"");
        let tier: RiskTier = serde_json::from_str("\"safe\"").unwrap();
        assert_eq!(tier, RiskTier::Safe);
    }

    #[test]
    fn test_distribution_collects_in_chart_order() {
        let distribution: TierDistribution =
            [RiskTier::Low, RiskTier::High, RiskTier::Low, RiskTier::Safe]
                .into_iter()
                .collect();
        assert_eq!(distribution.total(), 4);
        let pairs: Vec<_> = distribution.iter().collect();
        assert_eq!(
            pairs,
            vec![
                (RiskTier::High, 1),
                (RiskTier::Mid, 0),
                (RiskTier::Low, 2),
                (RiskTier::Safe, 1),
            ]
        );
    }
}
