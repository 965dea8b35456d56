use crate::types::{AnalyzeResult, ResultSummary};

/// Longest recognized text echoed back in `raw_result.content`.
pub const CONTENT_PREVIEW_CHARS: usize = 500;

/// Format the raw result for debugging: model id, a content preview and the document count.
pub fn format_raw_result(result: &AnalyzeResult) -> ResultSummary {
    ResultSummary {
        model_id: result.model_id.clone(),
        content: preview(&result.content, CONTENT_PREVIEW_CHARS),
        document_count: result.documents.as_ref().map_or(0, Vec::len),
    }
}

/// First `limit` characters followed by "..." when `text` is longer.
fn preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnalyzedDocument;
    use pretty_assertions::assert_eq;

    fn result_with_content(content: String) -> AnalyzeResult {
        AnalyzeResult {
            model_id: "prebuilt-receipt".to_string(),
            content,
            documents: None,
        }
    }

    #[test]
    fn test_long_content_is_truncated() {
        let summary = format_raw_result(&result_with_content("a".repeat(600)));
        assert_eq!(summary.content, format!("{}...", "a".repeat(500)));
    }

    #[test]
    fn test_short_content_is_unchanged() {
        let exact = "b".repeat(500);
        assert_eq!(format_raw_result(&result_with_content(exact.clone())).content, exact);
        assert_eq!(format_raw_result(&result_with_content(String::new())).content, "");
    }

    #[test]
    fn test_truncation_counts_characters() {
        let summary = format_raw_result(&result_with_content("ж".repeat(501)));
        assert_eq!(summary.content, format!("{}...", "ж".repeat(500)));
    }

    #[test]
    fn test_document_count() {
        let mut result = result_with_content("TOTAL 1.00".to_string());
        assert_eq!(format_raw_result(&result).document_count, 0);

        result.documents = Some(vec![]);
        assert_eq!(format_raw_result(&result).document_count, 0);

        result.documents = Some(vec![AnalyzedDocument::default(), AnalyzedDocument::default()]);
        let summary = format_raw_result(&result);
        assert_eq!(
            summary,
            ResultSummary {
                model_id: "prebuilt-receipt".to_string(),
                content: "TOTAL 1.00".to_string(),
                document_count: 2,
            }
        );
    }
}
