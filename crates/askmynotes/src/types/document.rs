//! Document, format and chunk types

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// MIME type for PDF uploads
pub const PDF_MIME: &str = "application/pdf";
/// MIME type for Word-processing (.docx) uploads
pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
/// MIME type for plain text uploads
pub const TEXT_MIME: &str = "text/plain";

/// Supported upload formats, resolved once from the declared MIME type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// PDF document
    Pdf,
    /// Word-processing document (.docx)
    Docx,
    /// UTF-8 plain text
    PlainText,
}

impl Format {
    /// Map a MIME type onto a format; parameters such as `charset` are ignored
    pub fn from_mime(mime: &str) -> Result<Self> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            PDF_MIME => Ok(Self::Pdf),
            DOCX_MIME => Ok(Self::Docx),
            TEXT_MIME => Ok(Self::PlainText),
            "" => Err(Error::UnsupportedFormat("missing content type".to_string())),
            _ => Err(Error::UnsupportedFormat(essence)),
        }
    }

    /// Resolve the format of an upload
    ///
    /// The declared content type wins. When it is absent or the generic
    /// `application/octet-stream`, the type is guessed from the filename.
    pub fn resolve(declared: Option<&str>, filename: &str) -> Result<Self> {
        match declared.map(str::trim) {
            Some(mime) if !mime.is_empty() && !mime.starts_with("application/octet-stream") => {
                Self::from_mime(mime)
            }
            _ => {
                let guessed = mime_guess::from_path(filename)
                    .first_raw()
                    .ok_or_else(|| {
                        Error::UnsupportedFormat(format!("cannot determine type of '{}'", filename))
                    })?;
                Self::from_mime(guessed)
            }
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::PlainText => "Text File",
        }
    }
}

/// A file as received, before its format is resolved
#[derive(Debug, Clone)]
pub struct Upload {
    /// Original filename
    pub filename: String,
    /// Content type declared by the client, if any
    pub content_type: Option<String>,
    /// Raw bytes
    pub data: Bytes,
}

impl Upload {
    /// Create an upload
    pub fn new(filename: impl Into<String>, content_type: Option<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            data: data.into(),
        }
    }
}

/// Uploaded bytes with a resolved format; consumed once by the extractor
#[derive(Debug, Clone)]
pub struct Document {
    /// Original filename
    pub filename: String,
    /// Resolved format
    pub format: Format,
    /// Raw bytes
    pub data: Bytes,
}

impl Document {
    /// Resolve the format of an upload
    pub fn from_upload(upload: Upload) -> Result<Self> {
        let format = Format::resolve(upload.content_type.as_deref(), &upload.filename)?;
        Ok(Self {
            filename: upload.filename,
            format,
            data: upload.data,
        })
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Text extracted from a document, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    /// Concatenated text
    pub text: String,
    /// Page count for paginated formats
    pub pages: Option<u32>,
}

impl ExtractedText {
    /// True when there is nothing but whitespace
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A contiguous, bounded substring of the extracted text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Position in source order
    pub index: u32,
    /// Text content
    pub content: String,
    /// Character offset of the first character in the extracted text
    pub char_start: usize,
    /// Character offset one past the last character
    pub char_end: usize,
}

impl Chunk {
    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.char_end - self.char_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_mime() {
        assert_eq!(Format::from_mime("application/pdf").unwrap(), Format::Pdf);
        assert_eq!(Format::from_mime(DOCX_MIME).unwrap(), Format::Docx);
        assert_eq!(
            Format::from_mime("text/plain; charset=utf-8").unwrap(),
            Format::PlainText
        );
        assert_eq!(Format::from_mime("TEXT/PLAIN").unwrap(), Format::PlainText);
    }

    #[test]
    fn test_unsupported_mime() {
        assert!(matches!(
            Format::from_mime("image/png"),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(matches!(
            Format::from_mime("text/markdown"),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_resolve_prefers_declared_type() {
        // Declared type wins over the extension
        let format = Format::resolve(Some("image/jpeg"), "notes.txt");
        assert!(matches!(format, Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_resolve_guesses_from_filename() {
        assert_eq!(Format::resolve(None, "notes.pdf").unwrap(), Format::Pdf);
        assert_eq!(
            Format::resolve(Some("application/octet-stream"), "lecture.docx").unwrap(),
            Format::Docx
        );
        assert_eq!(Format::resolve(Some(""), "todo.txt").unwrap(), Format::PlainText);
        assert!(Format::resolve(None, "photo.png").is_err());
        assert!(Format::resolve(None, "no_extension").is_err());
    }

    #[test]
    fn test_document_from_upload() {
        let upload = Upload::new("a.txt", Some("text/plain".into()), b"hello".to_vec());
        let doc = Document::from_upload(upload).unwrap();
        assert_eq!(doc.format, Format::PlainText);
        assert_eq!(doc.size(), 5);
    }
}
