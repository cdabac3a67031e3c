//! C4: convert a document byte stream and filename into `(title, content)`
//! regardless of source format.

mod docx;
mod md;
mod xlsx;

use std::path::Path;

use lorekeeper_core::error::{Error, Result};
use lorekeeper_core::traits::{DocumentParser, ParsedDocument};

/// Dispatches on the filename's extension, per §4.4.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtensionDocumentParser;

impl ExtensionDocumentParser {
    #[must_use]
    pub fn new() -> Self {
        ExtensionDocumentParser
    }
}

fn default_title(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string())
}

impl DocumentParser for ExtensionDocumentParser {
    fn parse(&self, bytes: &[u8], filename: &str) -> Result<ParsedDocument> {
        let ext = Path::new(filename)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let fallback_title = default_title(filename);

        match ext.as_str() {
            "pdf" => parse_pdf(bytes, fallback_title),
            "docx" => docx::parse(bytes, fallback_title),
            "xlsx" => xlsx::parse(bytes, fallback_title),
            "md" | "txt" => md::parse(bytes, fallback_title),
            other => Err(Error::validation(format!(
                "unsupported document format: .{other}"
            ))),
        }
    }
}

fn parse_pdf(bytes: &[u8], fallback_title: String) -> Result<ParsedDocument> {
    // pdf-extract concatenates per-page text internally, silently
    // skipping pages it cannot decode; a fully unreadable document still
    // yields an (possibly empty) string rather than erroring the whole
    // ingestion out from under the caller.
    let content = pdf_extract::extract_text_from_mem(bytes).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "pdf text extraction failed, continuing with empty content");
        String::new()
    });

    Ok(ParsedDocument {
        title: fallback_title,
        content: content.trim().to_string(),
        metadata: Default::default(),
    })
}

/// Escape characters that would otherwise corrupt a GFM pipe table cell.
pub(crate) fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_fails() {
        let parser = ExtensionDocumentParser::new();
        let err = parser.parse(b"whatever", "file.exe").unwrap_err();
        assert_eq!(err.category(), "ValidationFailed");
    }

    #[test]
    fn default_title_strips_extension() {
        assert_eq!(default_title("my report.pdf"), "my report");
        assert_eq!(default_title("notes"), "notes");
    }

    #[test]
    fn escape_table_cell_handles_pipes_and_newlines() {
        assert_eq!(escape_table_cell("a|b\nc"), "a\\|b c");
    }
}
