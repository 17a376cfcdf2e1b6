// =============================================================================
// report.rs — THE ONE-PAGE VERDICT
// =============================================================================
//
// Renders an analysis as a single-page PDF: title, the ad copy verbatim,
// the tier label and the keyword tally, laid out as plain text starting
// 72pt from the top-left corner. No pagination, no wrapping. Text that runs
// past the page edge is clipped by the viewer, exactly as a fixed text
// block would be.
//
// Hangul needs a CJK font. Rather than shipping one, the page uses the
// non-embedded Adobe-Korea1 font HYSMyeongJo-Medium with the UniKS-UCS2-H
// CMap, so every BMP character is written as its UCS-2 code unit. Characters
// outside the BMP are written as '?'. The exact input also goes into the
// document Info /Subject as a UTF-16 text string, surrogates and all.
//
// Output is deterministic: no timestamps, no document IDs. Same input,
// same bytes.
// =============================================================================

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, StringFormat};
use tracing::debug;

use crate::error::Result;
use crate::models::RiskTier;

pub const REPORT_TITLE: &str = "광고 문구 위험도 분석 결과";
pub const REPORT_MIME: &str = "application/pdf";
pub const DEFAULT_REPORT_FILENAME: &str = "risk_analysis.pdf";

/// A4 portrait, in points.
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
/// Distance of the text block from the left and top edges.
const MARGIN: i64 = 72;
const FONT_SIZE: i64 = 12;
const LEADING: i64 = 16;

const CID_FONT: &str = "HYSMyeongJo-Medium";
const CMAP: &str = "UniKS-UCS2-H";

/// The report body, one entry per rendered line.
pub fn report_lines(text: &str, tier: RiskTier, keyword_count: usize) -> Vec<String> {
    let mut lines = vec![REPORT_TITLE.to_string(), String::new(), "문구:".to_string()];
    lines.extend(text.split('\n').map(|line| line.trim_end_matches('\r').to_string()));
    lines.push(String::new());
    lines.push(format!("예측된 위험도: {}", tier.label()));
    lines.push(format!("금칙어 개수: {keyword_count}"));
    lines
}

/// Render the PDF report and return its bytes.
pub fn render(text: &str, tier: RiskTier, keyword_count: usize) -> Result<Vec<u8>> {
    let lines = report_lines(text, tier, keyword_count);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => CID_FONT,
        "Flags" => 6,
        "FontBBox" => vec![(-28).into(), (-148).into(), 1001.into(), 880.into()],
        "ItalicAngle" => 0,
        "Ascent" => 880,
        "Descent" => -148,
        "CapHeight" => 880,
        "StemV" => 60,
    });
    let cid_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType0",
        "BaseFont" => CID_FONT,
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Korea1"),
            "Supplement" => 1,
        },
        "FontDescriptor" => descriptor_id,
        "DW" => 1000,
    });
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => format!("{CID_FONT}-{CMAP}").as_str(),
        "Encoding" => CMAP,
        "DescendantFonts" => vec![cid_font_id.into()],
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
        Operation::new("TL", vec![LEADING.into()]),
        Operation::new("Td", vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN).into()]),
    ];
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            operations.push(Operation::new("T*", vec![]));
        }
        if !line.is_empty() {
            operations.push(Operation::new("Tj", vec![ucs2_string(line)]));
        }
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let content_id = doc.add_object(lopdf::Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => utf16_text_string(REPORT_TITLE),
        "Subject" => utf16_text_string(text),
        "Producer" => Object::string_literal(env!("CARGO_PKG_NAME")),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;

    debug!(
        tier = tier.as_str(),
        keyword_count = keyword_count,
        lines = lines.len(),
        bytes = bytes.len(),
        "PDF report rendered"
    );

    Ok(bytes)
}

/// Encode a line for the UCS2 CMap: big-endian code units, non-BMP as '?'.
fn ucs2_string(line: &str) -> Object {
    let bytes = line
        .chars()
        .flat_map(|c| {
            let unit = u16::try_from(u32::from(c)).unwrap_or(u16::from(b'?'));
            unit.to_be_bytes()
        })
        .collect();
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// PDF text string: UTF-16BE with a byte order mark.
fn utf16_text_string(text: &str) -> Object {
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lines_layout() {
        let lines = report_lines("첫 줄\r\n둘째 줄", RiskTier::Mid, 2);
        assert_eq!(
            lines,
            vec![
                REPORT_TITLE,
                "",
                "문구:",
                "첫 줄",
                "둘째 줄",
                "",
                "예측된 위험도: 중위험",
                "금칙어 개수: 2",
            ]
        );
    }

    #[test]
    fn test_render_produces_single_page_pdf() {
        let bytes = render("이 제품은 마약 성분이 없습니다", RiskTier::High, 1).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_render_is_deterministic() {
        let a = render("한정 수량! 무료 배송!", RiskTier::Low, 2).unwrap();
        let b = render("한정 수량! 무료 배송!", RiskTier::Low, 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_render_accepts_empty_and_huge_text() {
        assert!(render("", RiskTier::Safe, 0).is_ok());
        let huge = "무조건 ".repeat(5_000);
        assert!(render(&huge, RiskTier::Mid, 5_000).is_ok());
    }

    #[test]
    fn test_ucs2_encoding() {
        match ucs2_string("가A😀") {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                assert_eq!(bytes, vec![0xAC, 0x00, 0x00, 0x41, 0x00, 0x3F]);
            }
            other => panic!("unexpected object: {other:?}"),
        }
    }

    #[test]
    fn test_utf16_text_string_keeps_surrogates() {
        match utf16_text_string("😀") {
            Object::String(bytes, _) => {
                assert_eq!(bytes, vec![0xFE, 0xFF, 0xD8, 0x3D, 0xDE, 0x00]);
            }
            other => panic!("unexpected object: {other:?}"),
        }
    }
}
