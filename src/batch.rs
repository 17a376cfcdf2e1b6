// =============================================================================
// batch.rs — THE SPREADSHEET SHREDDER
// =============================================================================
//
// Takes a CSV with a `text` column, runs every row through the classifier,
// and hands back the same table with two extra columns: the tier label and
// the keyword tally. The export is UTF-8 with a BOM, because that is the
// only way a certain spreadsheet program will read Hangul without turning
// it into hieroglyphics.
//
// Rows are independent, so they are classified in parallel with Rayon.
// Order is preserved: row N of the output is row N of the input, whether
// one core did the work or sixteen.
// =============================================================================

use rayon::prelude::*;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::classifier::Classifier;
use crate::error::{AnalysisError, Result};
use crate::models::{RiskTier, TierDistribution};

/// The mandatory input column.
pub const TEXT_COLUMN: &str = "text";
/// Appended column: tier label.
pub const TIER_COLUMN: &str = "위험도";
/// Appended column: keyword tally.
pub const COUNT_COLUMN: &str = "금칙어 개수";

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
pub const CSV_MIME: &str = "text/csv";
pub const DEFAULT_CSV_FILENAME: &str = "risk_result.csv";

/// One input row plus its verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRow {
    /// The original fields, padded with empty strings up to the header width.
    pub fields: Vec<String>,
    pub tier: RiskTier,
    pub keyword_count: usize,
}

/// The augmented table.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub headers: Vec<String>,
    /// Position of the `text` column in `headers`.
    pub text_column: usize,
    pub rows: Vec<BatchRow>,
    pub distribution: TierDistribution,
}

impl BatchOutcome {
    /// Output headers: the original ones followed by the two verdict columns.
    pub fn output_headers(&self) -> Vec<&str> {
        self.headers
            .iter()
            .map(String::as_str)
            .chain([TIER_COLUMN, COUNT_COLUMN])
            .collect()
    }

    /// Serialize as BOM-prefixed UTF-8 CSV.
    pub fn write_csv<W: Write>(&self, mut out: W) -> Result<()> {
        out.write_all(UTF8_BOM)?;
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(self.output_headers())?;
        for row in &self.rows {
            let count = row.keyword_count.to_string();
            writer.write_record(
                row.fields
                    .iter()
                    .map(String::as_str)
                    .chain([row.tier.label(), count.as_str()]),
            )?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write_csv(&mut bytes)?;
        Ok(bytes)
    }
}

/// Classify and count a slice of texts in parallel. Output order matches
/// input order.
pub fn batch_classify(classifier: &Classifier, texts: &[&str]) -> Vec<(RiskTier, usize)> {
    texts
        .par_iter()
        .map(|text| (classifier.classify(text), classifier.count_keywords(text)))
        .collect()
}

/// Read a CSV table and analyze its `text` column. A table without that
/// column is refused before any row is read.
pub fn analyze_csv<R: Read>(classifier: &Classifier, input: R) -> Result<BatchOutcome> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    let text_index = headers
        .iter()
        .position(|h| h == TEXT_COLUMN)
        .ok_or(AnalysisError::MissingTextColumn)?;

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() > headers.len() {
            return Err(AnalysisError::MalformedRow {
                line: record.position().map(|p| p.line()).unwrap_or_default(),
                expected: headers.len(),
                found: record.len(),
            });
        }
        let mut fields: Vec<String> = record.iter().map(str::to_string).collect();
        fields.resize(headers.len(), String::new());
        records.push(fields);
    }

    debug!(rows = records.len(), columns = headers.len(), "CSV table parsed");

    let texts: Vec<&str> = records.iter().map(|fields| fields[text_index].as_str()).collect();
    let verdicts = batch_classify(classifier, &texts);

    let rows: Vec<BatchRow> = records
        .into_iter()
        .zip(verdicts)
        .map(|(fields, (tier, keyword_count))| BatchRow {
            fields,
            tier,
            keyword_count,
        })
        .collect();

    let distribution: TierDistribution = rows.iter().map(|row| row.tier).collect();

    info!(
        rows = rows.len(),
        high = distribution.high,
        mid = distribution.mid,
        low = distribution.low,
        safe = distribution.safe,
        "Batch analysis complete"
    );

    Ok(BatchOutcome {
        headers,
        text_column: text_index,
        rows,
        distribution,
    })
}

pub fn analyze_csv_path(classifier: &Classifier, path: &Path) -> Result<BatchOutcome> {
    let file = File::open(path)?;
    analyze_csv(classifier, file)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::builtin().unwrap()
    }

    const SCENARIO_CSV: &str = "id,text\n\
        1,이 제품은 마약 성분이 없습니다\n\
        2,100% 보장! 의사 추천 제품입니다\n\
        3,한정 수량! 무료 배송!\n\
        4,오늘도 좋은 하루 되세요\n";

    #[test]
    fn test_scenario_rows_are_labelled() {
        let outcome = analyze_csv(&classifier(), SCENARIO_CSV.as_bytes()).unwrap();
        let verdicts: Vec<_> = outcome
            .rows
            .iter()
            .map(|r| (r.tier, r.keyword_count))
            .collect();
        assert_eq!(verdicts[0].0, RiskTier::High);
        assert!(verdicts[0].1 >= 1);
        assert_eq!(verdicts[1], (RiskTier::Mid, 2));
        assert_eq!(verdicts[2], (RiskTier::Low, 2));
        assert_eq!(verdicts[3], (RiskTier::Safe, 0));
        assert_eq!(outcome.distribution.total(), 4);
    }

    #[test]
    fn test_missing_text_column_is_rejected() {
        let err = analyze_csv(&classifier(), "id,body\n1,마약\n".as_bytes()).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingTextColumn));
    }

    #[test]
    fn test_header_only_table_is_fine() {
        let outcome = analyze_csv(&classifier(), "text\n".as_bytes()).unwrap();
        assert!(outcome.rows.is_empty());
        assert_eq!(outcome.distribution, TierDistribution::default());
    }

    #[test]
    fn test_bom_prefixed_input_header() {
        let input = "\u{feff}text,note\n대출 가능,x\n";
        let outcome = analyze_csv(&classifier(), input.as_bytes()).unwrap();
        assert_eq!(outcome.headers, vec!["text", "note"]);
        assert_eq!(outcome.rows[0].tier, RiskTier::High);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let outcome = analyze_csv(&classifier(), "id,text\n7\n".as_bytes()).unwrap();
        assert_eq!(outcome.rows[0].fields, vec!["7", ""]);
        assert_eq!(outcome.rows[0].tier, RiskTier::Safe);
    }

    #[test]
    fn test_long_rows_are_rejected() {
        let err = analyze_csv(&classifier(), "text\n무조건,extra\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::MalformedRow { expected: 1, found: 2, .. }
        ));
    }

    #[test]
    fn test_export_has_bom_and_appended_columns() {
        let outcome = analyze_csv(&classifier(), "text\n무료 배송\n".as_bytes()).unwrap();
        let bytes = outcome.to_csv_bytes().unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let body = std::str::from_utf8(&bytes[UTF8_BOM.len()..]).unwrap();
        assert_eq!(body, "text,위험도,금칙어 개수\n무료 배송,저위험,1\n");
    }

    #[test]
    fn test_quoted_fields_survive_export() {
        let input = "text\n\"카지노, 도박\"\n";
        let outcome = analyze_csv(&classifier(), input.as_bytes()).unwrap();
        assert_eq!(outcome.rows[0].keyword_count, 2);
        let bytes = outcome.to_csv_bytes().unwrap();
        let body = std::str::from_utf8(&bytes[UTF8_BOM.len()..]).unwrap();
        assert!(body.contains("\"카지노, 도박\",고위험,2"));
    }

    #[test]
    fn test_batch_classify_matches_sequential() {
        let c = classifier();
        let texts = ["무조건", "hello", "NFT 복권", "인기 상품"];
        let parallel = batch_classify(&c, &texts);
        let sequential: Vec<_> = texts
            .iter()
            .map(|t| (c.classify(t), c.count_keywords(t)))
            .collect();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_rows_carry_batch_verdicts_in_input_order() {
        let c = classifier();
        let texts = ["무조건", "hello", "NFT 복권", "인기 상품", "담배대용품"];
        let input = std::iter::once("text".to_string())
            .chain(texts.iter().map(|t| t.to_string()))
            .collect::<Vec<_>>()
            .join("\n");
        let outcome = analyze_csv(&c, input.as_bytes()).unwrap();
        let verdicts: Vec<_> = outcome
            .rows
            .iter()
            .map(|row| (row.tier, row.keyword_count))
            .collect();
        assert_eq!(verdicts, batch_classify(&c, &texts));
    }
}
