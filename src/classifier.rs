// =============================================================================
// classifier.rs — THE AD COPY INTERROGATION ROOM
// =============================================================================
//
// This module is where we decide whether a piece of ad copy is about to get
// someone a letter from the regulator. The machinery:
//
// 1. Aho-Corasick — one automaton per tier, plus one over every keyword.
//    "Does this text contain ANY High risk keyword?" becomes a single pass
//    instead of twenty-seven `contains` calls. The combined automaton is the
//    bouncer at the door: text with no keyword at all skips the rest.
//
// 2. memchr — SIMD-accelerated substring search for the tally. Each list
//    entry is counted on its own, non-overlapping, exactly like repeatedly
//    finding a match and skipping past it. No deduplication: "담배대용품"
//    counts once for "담배" and once for "담배대용품".
//
// 3. Plain sequential `replace` for highlighting. Tier by tier, keyword by
//    keyword, every occurrence at once. Later keywords can match inside
//    text an earlier pass already wrapped, and the markup nests when that
//    happens. Downstream renderers must cope with nested markers.
//
// Everything here is a pure function of the input text. No locks, no
// caches, no state. Call it from as many threads as you like.
// =============================================================================

use aho_corasick::AhoCorasick;
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::keywords::KeywordLists;
use crate::models::{AnalysisResult, RiskTier};
use crate::report;

/// Closing half of every highlight marker.
pub const MARKER_CLOSE: &str = "]**";

/// The emphasis marker wrapped around a matched keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// High risk. Red.
    Danger,
    /// Mid risk. Orange.
    Warning,
    /// Low risk. Blue.
    Info,
}

impl Marker {
    pub const ALL: [Marker; 3] = [Marker::Danger, Marker::Warning, Marker::Info];

    pub fn for_tier(tier: RiskTier) -> Option<Marker> {
        match tier {
            RiskTier::High => Some(Marker::Danger),
            RiskTier::Mid => Some(Marker::Warning),
            RiskTier::Low => Some(Marker::Info),
            RiskTier::Safe => None,
        }
    }

    /// Opening half of the marker, e.g. `**:red[`.
    pub fn open(self) -> &'static str {
        match self {
            Marker::Danger => "**:red[",
            Marker::Warning => "**:orange[",
            Marker::Info => "**:blue[",
        }
    }

    pub fn wrap(self, keyword: &str) -> String {
        format!("{}{}{}", self.open(), keyword, MARKER_CLOSE)
    }
}

/// The classifier. Owns its keyword lists and the automatons built from them.
pub struct Classifier {
    lists: KeywordLists,
    high: AhoCorasick,
    mid: AhoCorasick,
    low: AhoCorasick,
    /// Every keyword of every tier. Used as the "any hit at all?" prefilter.
    any: AhoCorasick,
}

impl Classifier {
    /// Build a classifier over the given lists. Fails only if an automaton
    /// cannot be built, which for lists this small means never in practice.
    pub fn new(lists: KeywordLists) -> Result<Self> {
        let all: Vec<&str> = lists.all().collect();
        Ok(Self {
            high: AhoCorasick::new(lists.for_tier(RiskTier::High))?,
            mid: AhoCorasick::new(lists.for_tier(RiskTier::Mid))?,
            low: AhoCorasick::new(lists.for_tier(RiskTier::Low))?,
            any: AhoCorasick::new(&all)?,
            lists,
        })
    }

    /// A classifier over the built-in lists.
    pub fn builtin() -> Result<Self> {
        Self::new(KeywordLists::builtin())
    }

    pub fn lists(&self) -> &KeywordLists {
        &self.lists
    }

    /// First tier, in order High → Mid → Low, with any keyword present in
    /// `text`. `Safe` when none is. Presence decides; counts do not.
    pub fn classify(&self, text: &str) -> RiskTier {
        if self.high.is_match(text) {
            RiskTier::High
        } else if self.mid.is_match(text) {
            RiskTier::Mid
        } else if self.low.is_match(text) {
            RiskTier::Low
        } else {
            RiskTier::Safe
        }
    }

    /// Sum over every keyword of every tier of its non-overlapping
    /// occurrences in `text`.
    pub fn count_keywords(&self, text: &str) -> usize {
        if !self.any.is_match(text) {
            return 0;
        }

        let haystack = text.as_bytes();
        self.lists
            .all()
            .map(|keyword| memchr::memmem::find_iter(haystack, keyword.as_bytes()).count())
            .sum()
    }

    /// Wrap every keyword occurrence in its tier's marker. High keywords
    /// first, then Mid, then Low, each keyword replaced everywhere before
    /// the next one is looked at. No escaping of the original text.
    pub fn highlight(&self, text: &str) -> String {
        if !self.any.is_match(text) {
            return text.to_string();
        }

        let mut annotated = text.to_string();
        for tier in [RiskTier::High, RiskTier::Mid, RiskTier::Low] {
            let Some(marker) = Marker::for_tier(tier) else {
                continue;
            };
            for keyword in self.lists.for_tier(tier) {
                if annotated.contains(keyword) {
                    annotated = annotated.replace(keyword, &marker.wrap(keyword));
                }
            }
        }
        annotated
    }

    /// Classify, count and highlight in one go.
    pub fn analyze(&self, text: &str) -> AnalysisResult {
        let tier = self.classify(text);
        let keyword_count = self.count_keywords(text);
        let annotated_text = self.highlight(text);

        debug!(
            tier = tier.as_str(),
            keyword_count = keyword_count,
            text_len = text.len(),
            "Text analysis complete"
        );

        AnalysisResult {
            tier,
            keyword_count,
            annotated_text,
        }
    }

    /// Render the one-page PDF report for an analyzed text.
    pub fn build_report(&self, text: &str, tier: RiskTier, keyword_count: usize) -> Result<Vec<u8>> {
        report::render(text, tier, keyword_count)
    }
}

/// The single-text flow: refuse blank input, analyze everything else.
pub fn analyze_single(classifier: &Classifier, input: &str) -> Result<AnalysisResult> {
    if input.trim().is_empty() {
        return Err(AnalysisError::EmptyInput);
    }
    Ok(classifier.analyze(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::builtin().unwrap()
    }

    #[test]
    fn test_high_risk_keyword_wins() {
        let c = classifier();
        let text = "이 제품은 마약 성분이 없습니다";
        assert_eq!(c.classify(text), RiskTier::High);
        assert!(c.count_keywords(text) >= 1);
    }

    #[test]
    fn test_high_dominates_mid_and_low() {
        let c = classifier();
        assert_eq!(c.classify("100% 보장 한정 수량 카지노"), RiskTier::High);
    }

    #[test]
    fn test_mid_beats_low() {
        let c = classifier();
        assert_eq!(c.classify("의사 추천! 무료 배송"), RiskTier::Mid);
    }

    #[test]
    fn test_mid_risk_counts_each_keyword() {
        let c = classifier();
        let text = "100% 보장! 의사 추천 제품입니다";
        assert_eq!(c.classify(text), RiskTier::Mid);
        assert_eq!(c.count_keywords(text), 2);
    }

    #[test]
    fn test_low_risk_only() {
        let c = classifier();
        let text = "한정 수량! 무료 배송!";
        assert_eq!(c.classify(text), RiskTier::Low);
        assert_eq!(c.count_keywords(text), 2);
    }

    #[test]
    fn test_safe_text() {
        let c = classifier();
        let text = "오늘도 좋은 하루 되세요";
        assert_eq!(c.classify(text), RiskTier::Safe);
        assert_eq!(c.count_keywords(text), 0);
        assert_eq!(c.highlight(text), text);
    }

    #[test]
    fn test_empty_text_is_safe() {
        let c = classifier();
        assert_eq!(c.classify(""), RiskTier::Safe);
        assert_eq!(c.count_keywords(""), 0);
        assert_eq!(c.highlight(""), "");
    }

    #[test]
    fn test_nested_keywords_counted_independently() {
        let c = classifier();
        // "담배" and "담배대용품" are separate list entries.
        assert_eq!(c.count_keywords("담배대용품"), 2);
    }

    #[test]
    fn test_count_is_non_overlapping_and_repeats() {
        let c = classifier();
        assert_eq!(c.count_keywords("대출 대출 대출"), 3);
        let a = "무조건 대출";
        let doubled = format!("{a}{a}");
        assert_eq!(c.count_keywords(&doubled), 2 * c.count_keywords(a));
    }

    #[test]
    fn test_self_overlapping_keyword_is_counted_without_overlap() {
        static HIGH: &[&str] = &["aa"];
        let lists = KeywordLists::new(HIGH, &[], &[]).unwrap();
        let c = Classifier::new(lists).unwrap();
        assert_eq!(c.count_keywords("aaaa"), 2);
        assert_eq!(c.count_keywords("aaa"), 1);
        assert_eq!(c.count_keywords("a"), 0);
    }

    #[test]
    fn test_highlight_wraps_per_tier() {
        let c = classifier();
        assert_eq!(
            c.highlight("카지노 무조건 무료 배송"),
            "**:red[카지노]** **:orange[무조건]** **:blue[무료 배송]**"
        );
    }

    #[test]
    fn test_highlight_replaces_every_occurrence() {
        let c = classifier();
        assert_eq!(c.highlight("NFT, NFT"), "**:red[NFT]**, **:red[NFT]**");
    }

    #[test]
    fn test_highlight_nests_overlapping_keywords() {
        let c = classifier();
        // "담배" is processed before "담배대용품", so the longer keyword is
        // split by the first marker and never matches on its own.
        assert_eq!(c.highlight("담배대용품"), "**:red[담배]**대용품");
    }

    #[test]
    fn test_highlight_later_keyword_matches_inside_marker() {
        static HIGH: &[&str] = &["abc"];
        static MID: &[&str] = &["red"];
        let lists = KeywordLists::new(HIGH, MID, &[]).unwrap();
        let c = Classifier::new(lists).unwrap();
        assert_eq!(
            c.highlight("abc"),
            "**:**:orange[red]**[abc]**"
        );
    }

    #[test]
    fn test_operations_are_idempotent() {
        let c = classifier();
        let text = "기간 한정 즉시 할인, 주식정보 무료 제공";
        assert_eq!(c.classify(text), c.classify(text));
        assert_eq!(c.count_keywords(text), c.count_keywords(text));
        assert_eq!(c.analyze(text), c.analyze(text));
    }

    #[test]
    fn test_analyze_single_rejects_blank_input() {
        let c = classifier();
        assert!(matches!(analyze_single(&c, ""), Err(AnalysisError::EmptyInput)));
        assert!(matches!(analyze_single(&c, "  \n\t "), Err(AnalysisError::EmptyInput)));
        let result = analyze_single(&c, "무료 배송").unwrap();
        assert_eq!(result.tier, RiskTier::Low);
        assert_eq!(result.keyword_count, 1);
        assert_eq!(result.annotated_text, "**:blue[무료 배송]**");
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let c = classifier();
        assert_eq!(c.classify("nft"), RiskTier::Safe);
        assert_eq!(c.classify("NFT"), RiskTier::High);
    }
}
