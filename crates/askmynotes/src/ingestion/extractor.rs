//! Text extraction for PDF, DOCX and plain text uploads

use std::panic::{self, AssertUnwindSafe};

use crate::error::{Error, Result};
use crate::types::{Document, ExtractedText, Format};

/// Extracts a single Unicode string from an uploaded document
pub struct TextExtractor;

impl TextExtractor {
    /// Extract all text in document order
    ///
    /// Blank output is not an error here; the orchestrator decides what an
    /// empty document means.
    pub fn extract(doc: &Document) -> Result<ExtractedText> {
        let extracted = match doc.format {
            Format::Pdf => Self::extract_pdf(&doc.filename, &doc.data)?,
            Format::Docx => Self::extract_docx(&doc.filename, &doc.data)?,
            Format::PlainText => Self::extract_plain_text(&doc.filename, &doc.data)?,
        };

        tracing::debug!(
            "Extracted {} chars from {} ({})",
            extracted.text.chars().count(),
            doc.filename,
            doc.format.display_name()
        );

        Ok(extracted)
    }

    /// Extract PDF text page by page; pages without text contribute nothing
    fn extract_pdf(filename: &str, data: &[u8]) -> Result<ExtractedText> {
        // pdf-extract panics on some malformed font tables
        let primary = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(data)
        }));

        let pages = match primary {
            Ok(Ok(pages)) => pages,
            Ok(Err(e)) => {
                tracing::warn!("pdf-extract failed for {}: {}, trying lopdf", filename, e);
                Self::extract_pdf_pages_fallback(filename, data)?
            }
            Err(_) => {
                tracing::warn!("pdf-extract crashed on {}, trying lopdf", filename);
                Self::extract_pdf_pages_fallback(filename, data)?
            }
        };

        let page_count = pages.len() as u32;
        let mut text = String::new();
        for page in &pages {
            let page_text = normalize_pdf_text(page);
            if page_text.trim().is_empty() {
                continue;
            }
            text.push_str(&page_text);
            if !page_text.ends_with(char::is_whitespace) {
                text.push('\n');
            }
        }

        Ok(ExtractedText {
            text,
            pages: Some(page_count),
        })
    }

    /// Page-by-page extraction using lopdf directly
    fn extract_pdf_pages_fallback(filename: &str, data: &[u8]) -> Result<Vec<String>> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::extraction(filename, format!("Failed to load PDF: {}", e)))?;

        let pages = doc
            .get_pages()
            .keys()
            .map(|&page_number| match doc.extract_text(&[page_number]) {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!("No text on page {} of {}: {}", page_number, filename, e);
                    String::new()
                }
            })
            .collect();

        Ok(pages)
    }

    /// Extract paragraph text, one line per paragraph
    fn extract_docx(filename: &str, data: &[u8]) -> Result<ExtractedText> {
        use docx_rs::{DocumentChild, ParagraphChild, RunChild};

        let docx = docx_rs::read_docx(data).map_err(|e| Error::extraction(filename, e.to_string()))?;

        let mut text = String::new();
        for child in &docx.document.children {
            if let DocumentChild::Paragraph(paragraph) = child {
                for paragraph_child in &paragraph.children {
                    if let ParagraphChild::Run(run) = paragraph_child {
                        for run_child in &run.children {
                            match run_child {
                                RunChild::Text(t) => text.push_str(&t.text),
                                RunChild::Tab(_) => text.push('\t'),
                                _ => {}
                            }
                        }
                    }
                }
                text.push('\n');
            }
        }

        Ok(ExtractedText { text, pages: None })
    }

    /// Decode raw bytes as UTF-8
    fn extract_plain_text(filename: &str, data: &[u8]) -> Result<ExtractedText> {
        let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::extraction(filename, format!("File is not valid UTF-8: {}", e)))?
            .to_string();

        Ok(ExtractedText { text, pages: None })
    }
}

/// Strip NUL bytes and expand typographic ligatures left by PDF fonts
fn normalize_pdf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\0' => {}
            '\u{FB00}' => out.push_str("ff"),
            '\u{FB01}' => out.push_str("fi"),
            '\u{FB02}' => out.push_str("fl"),
            '\u{FB03}' => out.push_str("ffi"),
            '\u{FB04}' => out.push_str("ffl"),
            '\u{00A0}' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}
