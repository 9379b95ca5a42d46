// Tests for document upload validation and analysis response parsing.

use juriscore::analysis::{parse_analysis, DocumentFile, MAX_DOCUMENT_BYTES, PDF_MIME};
use juriscore::error::AnalysisError;

#[test]
fn png_upload_is_rejected_with_a_format_error() {
    let err = DocumentFile::from_bytes("scan.png", "image/png", &[0x89, 0x50, 0x4e, 0x47])
        .unwrap_err();
    assert!(matches!(err, AnalysisError::UnsupportedFormat(m) if m == "image/png"));
}

#[test]
fn mime_check_is_exact_not_prefix() {
    let err =
        DocumentFile::from_bytes("doc.pdf", "application/pdf; charset=utf-8", b"%PDF").unwrap_err();
    assert!(matches!(err, AnalysisError::UnsupportedFormat(_)));
}

#[test]
fn well_formed_pdf_under_limit_validates() {
    let doc = DocumentFile::from_bytes("motion.pdf", PDF_MIME, b"%PDF-1.7 minimal").unwrap();
    assert!(doc.validate().is_ok());
    assert_eq!(doc.name, "motion.pdf");
}

#[test]
fn oversized_pdf_is_rejected_before_any_call() {
    let big = vec![0u8; MAX_DOCUMENT_BYTES + 1];
    let err = DocumentFile::from_bytes("huge.pdf", PDF_MIME, &big).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::TooLarge { limit, .. } if limit == MAX_DOCUMENT_BYTES
    ));
}

#[test]
fn validate_catches_bad_mime_on_prebuilt_documents() {
    let doc = DocumentFile {
        name: "sneaky.pdf".to_string(),
        mime_type: "text/html".to_string(),
        data: "aGVsbG8=".to_string(),
    };
    assert!(matches!(
        doc.validate().unwrap_err(),
        AnalysisError::UnsupportedFormat(_)
    ));
}

#[test]
fn complete_analysis_payload_parses() {
    let text = r#"{
        "summary": "Contract for the sale of goods with a disputed warranty clause.",
        "deadlines": ["Notice of breach within 30 days", "Cure period ends 2026-01-15"],
        "citations": ["UCC 2-607", "Hadley v. Baxendale"],
        "logic_check": "The consequential damages waiver may conflict with clause 9."
    }"#;

    let result = parse_analysis(text).unwrap();
    assert_eq!(result.deadlines.len(), 2);
    assert_eq!(result.citations[1], "Hadley v. Baxendale");
    assert!(result.logic_check.contains("clause 9"));
}

#[test]
fn non_json_analysis_text_is_a_single_generic_failure() {
    let err = parse_analysis("Here is your analysis:\n\nThe contract looks fine.").unwrap_err();
    assert!(matches!(err, AnalysisError::Failed));
    assert_eq!(err.to_string(), "document analysis failed");
}

#[test]
fn truncated_json_is_a_failure_not_a_partial_result() {
    let err = parse_analysis(r#"{"summary": "cut off", "deadlines": ["#).unwrap_err();
    assert!(matches!(err, AnalysisError::Failed));
}
