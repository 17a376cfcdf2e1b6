// Colored terminal output for analysis verdicts, batch tables and the tier
// distribution chart.
//
// The classifier speaks in markup (`**:red[...]**` and friends); this module
// turns that markup into ANSI colors. main.rs only decides *what* to show.

use colored::{ColoredString, Colorize};

use crate::batch::BatchOutcome;
use crate::classifier::{Marker, MARKER_CLOSE};
use crate::models::{AnalysisResult, RiskTier, TierDistribution};

/// Longest bar in the distribution chart, in cells.
const CHART_WIDTH: usize = 40;
/// Text column width in the batch table, in characters.
const PREVIEW_CHARS: usize = 40;

pub const CHART_TITLE: &str = "문구 위험도 분포";

/// Display a single-text verdict.
pub fn display_analysis(result: &AnalysisResult) {
    println!();
    println!(
        "{} {}",
        "✅ 예측된 위험도:".bold(),
        colorize_tier(result.tier)
    );
    println!("{} {}", "🔢 금칙어 개수:".bold(), result.keyword_count);
    println!("{}", "🔎 금칙어 하이라이팅:".bold());
    println!("  {}", render_highlighted(&result.annotated_text));
    println!();
}

/// Display the augmented batch table followed by the distribution chart.
pub fn display_batch(outcome: &BatchOutcome) {
    println!(
        "\n{}",
        format!("=== 🔎 분석 결과 ({} rows) ===", outcome.rows.len()).bold()
    );
    println!();
    println!(
        "  {:>4}  {:<6}  {:>5}  {}",
        "#".dimmed(),
        "위험도".dimmed(),
        "개수".dimmed(),
        "text".dimmed(),
    );
    println!("  {}", "-".repeat(70).dimmed());

    for (i, row) in outcome.rows.iter().enumerate() {
        let text = row.fields.get(outcome.text_column).map(String::as_str).unwrap_or("");
        println!(
            "  {:>4}  {}{}  {:>5}  {}",
            i + 1,
            colorize_tier(row.tier),
            " ".repeat(label_padding(row.tier)),
            row.keyword_count,
            preview(text),
        );
    }

    println!();
    print!("{}", format_distribution_chart(&outcome.distribution));
}

/// Horizontal bar chart of rows per tier, High first.
pub fn format_distribution_chart(distribution: &TierDistribution) -> String {
    let max = distribution.iter().map(|(_, n)| n).max().unwrap_or(0);
    let mut out = format!("{}\n", format!("📊 {CHART_TITLE}").bold());

    for (tier, rows) in distribution.iter() {
        let width = if max == 0 {
            0
        } else {
            (rows * CHART_WIDTH).div_ceil(max)
        };
        out.push_str(&format!(
            "  {}{}  {} {}\n",
            tier.label(),
            " ".repeat(label_padding(tier)),
            paint_tier(tier, &"█".repeat(width)),
            rows
        ));
    }
    out
}

/// Turn highlight markup into ANSI colors. Markers may nest; the innermost
/// one decides the color of the text it encloses.
pub fn render_highlighted(annotated: &str) -> String {
    let mut out = String::with_capacity(annotated.len());
    let mut stack: Vec<Marker> = Vec::new();
    let mut segment = String::new();
    let mut rest = annotated;

    while let Some(ch) = rest.chars().next() {
        if let Some(marker) = Marker::ALL.into_iter().find(|m| rest.starts_with(m.open())) {
            flush_segment(&mut out, &mut segment, stack.last().copied());
            stack.push(marker);
            rest = &rest[marker.open().len()..];
        } else if !stack.is_empty() && rest.starts_with(MARKER_CLOSE) {
            flush_segment(&mut out, &mut segment, stack.last().copied());
            stack.pop();
            rest = &rest[MARKER_CLOSE.len()..];
        } else {
            segment.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }
    flush_segment(&mut out, &mut segment, stack.last().copied());
    out
}

fn flush_segment(out: &mut String, segment: &mut String, marker: Option<Marker>) {
    if segment.is_empty() {
        return;
    }
    match marker {
        Some(marker) => out.push_str(&paint_marker(marker, segment).to_string()),
        None => out.push_str(segment),
    }
    segment.clear();
}

fn paint_marker(marker: Marker, text: &str) -> ColoredString {
    match marker {
        Marker::Danger => text.red().bold(),
        Marker::Warning => text.truecolor(255, 165, 0).bold(),
        Marker::Info => text.blue().bold(),
    }
}

fn paint_tier(tier: RiskTier, text: &str) -> ColoredString {
    match Marker::for_tier(tier) {
        Some(marker) => paint_marker(marker, text),
        None => text.green(),
    }
}

fn colorize_tier(tier: RiskTier) -> ColoredString {
    paint_tier(tier, tier.label())
}

/// Hangul labels are two terminal cells per character; pad them to the
/// width of the widest label.
fn label_padding(tier: RiskTier) -> usize {
    6usize.saturating_sub(tier.label().chars().count() * 2)
}

fn preview(text: &str) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() > PREVIEW_CHARS {
        let cut: String = single_line.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}…")
    } else {
        single_line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_color() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_render_strips_markup() {
        no_color();
        let annotated = "**:red[카지노]** 그리고 **:blue[무료 배송]**";
        assert_eq!(render_highlighted(annotated), "카지노 그리고 무료 배송");
    }

    #[test]
    fn test_render_handles_nested_markup() {
        no_color();
        assert_eq!(render_highlighted("**:**:orange[red]**[abc]**"), "**:red[abc]**");
    }

    #[test]
    fn test_render_leaves_plain_text_alone() {
        no_color();
        assert_eq!(render_highlighted("오늘도 좋은 하루 되세요"), "오늘도 좋은 하루 되세요");
        assert_eq!(render_highlighted("stray ]** close"), "stray ]** close");
    }

    #[test]
    fn test_distribution_chart_order_and_scale() {
        no_color();
        let distribution = TierDistribution {
            high: 2,
            mid: 1,
            low: 0,
            safe: 1,
        };
        let chart = format_distribution_chart(&distribution);
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains(CHART_TITLE));
        assert!(lines[1].trim_start().starts_with("고위험"));
        assert!(lines[1].contains(&"█".repeat(CHART_WIDTH)));
        assert!(lines[2].contains(&"█".repeat(CHART_WIDTH / 2)));
        assert!(!lines[3].contains('█'));
        assert!(lines[4].trim_start().starts_with("안전"));
    }

    #[test]
    fn test_preview_truncates_long_text() {
        let long = "가".repeat(100);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), PREVIEW_CHARS + 1);
        assert!(shown.ends_with('…'));
    }
}
