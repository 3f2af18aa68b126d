//! Content extraction for uploaded documents.
//!
//! Converts raw file bytes into a single text string keyed on the declared
//! document type. Extraction is the only fatal step of ingestion: malformed
//! input fails here with [`ExtractError`], while oversized output is
//! truncated to the configured ceiling and logged rather than rejected, so
//! callers must not assume extracted text is complete.

use std::io::Read;
use thiserror::Error;

/// Raw ceiling applied before the configurable cap; bounds pathological
/// extractor output (for example a PDF that decompresses into megabytes of
/// whitespace-joined glyphs).
const RAW_EXTRACT_CAP: usize = 100_000;

/// Maximum decompressed bytes read from a single DOCX archive entry
/// (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Declared type of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// PDF document.
    Pdf,
    /// Office Open XML word-processing document.
    Docx,
    /// Comma-separated values.
    Csv,
    /// Plain UTF-8 text.
    Text,
}

impl std::str::FromStr for DocumentKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "csv" => Ok(Self::Csv),
            "text" | "txt" => Ok(Self::Text),
            _ => Err(()),
        }
    }
}

/// Errors raised when a document cannot be converted to text.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// PDF content could not be parsed.
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    /// DOCX archive or its document XML could not be read.
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
    /// CSV content could not be parsed.
    #[error("CSV extraction failed: {0}")]
    Csv(String),
}

/// Size limits applied during extraction.
#[derive(Debug, Clone, Copy)]
pub struct ExtractLimits {
    /// Hard ceiling on the extracted text length in characters.
    pub max_chars: usize,
    /// Maximum CSV rows converted to text.
    pub csv_max_rows: usize,
}

/// Text derived from one document, with the losses incurred along the way.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    /// The extracted (possibly truncated) text.
    pub text: String,
    /// Characters removed by the length caps.
    pub truncated_chars: usize,
    /// CSV rows dropped beyond the row cap; zero for other kinds.
    pub csv_rows_dropped: usize,
}

/// Convert raw document bytes into capped text.
pub fn extract(
    bytes: &[u8],
    kind: DocumentKind,
    limits: &ExtractLimits,
) -> Result<ExtractedText, ExtractError> {
    let (raw, csv_rows_dropped) = match kind {
        DocumentKind::Pdf => (extract_pdf(bytes)?, 0),
        DocumentKind::Docx => (extract_docx(bytes)?, 0),
        DocumentKind::Csv => extract_csv(bytes, limits.csv_max_rows)?,
        DocumentKind::Text => (String::from_utf8_lossy(bytes).into_owned(), 0),
    };

    let mut text = raw;
    let mut truncated_chars = truncate_chars(&mut text, RAW_EXTRACT_CAP);
    truncated_chars += truncate_chars(&mut text, limits.max_chars);

    if truncated_chars > 0 {
        tracing::warn!(
            kind = ?kind,
            kept_chars = limits.max_chars.min(RAW_EXTRACT_CAP),
            truncated_chars,
            "Extracted text exceeded the length cap and was truncated"
        );
    }
    if csv_rows_dropped > 0 {
        tracing::warn!(
            csv_rows_dropped,
            row_cap = limits.csv_max_rows,
            "CSV rows beyond the row cap were dropped"
        );
    }

    Ok(ExtractedText {
        text,
        truncated_chars,
        csv_rows_dropped,
    })
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|err| ExtractError::Pdf(err.to_string()))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|err| ExtractError::Docx(err.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|err| ExtractError::Docx(err.to_string()))?;

    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|err| ExtractError::Docx(err.to_string()))?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Docx(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }

    collect_text_runs(&doc_xml)
}

/// Pull the text runs (`<w:t>`) out of the document XML, inserting a newline
/// at every paragraph boundary (`</w:p>`).
fn collect_text_runs(xml: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t"
                    && let Ok(quick_xml::events::Event::Text(text)) =
                        reader.read_event_into(&mut buf)
                {
                    out.push_str(text.unescape().unwrap_or_default().as_ref());
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"p" && !out.ends_with('\n') && !out.is_empty() {
                    out.push('\n');
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(err) => return Err(ExtractError::Docx(err.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

/// Flatten CSV rows into compact `header: value, header: value` lines.
///
/// At most `max_rows` rows are converted; the remainder is counted and
/// dropped. Rows past the cap are still iterated so parse errors surface
/// deterministically regardless of where they occur.
fn extract_csv(bytes: &[u8], max_rows: usize) -> Result<(String, usize), ExtractError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);
    let headers = reader
        .headers()
        .map_err(|err| ExtractError::Csv(err.to_string()))?
        .clone();

    let mut lines = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = record.map_err(|err| ExtractError::Csv(err.to_string()))?;
        if lines.len() >= max_rows {
            dropped += 1;
            continue;
        }
        let line = record
            .iter()
            .enumerate()
            .map(|(idx, value)| match headers.get(idx) {
                Some(header) if !header.is_empty() => format!("{header}: {value}"),
                _ => value.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(line);
    }

    Ok((lines.join("\n"), dropped))
}

/// Truncate `text` to `max` characters in place, returning how many
/// characters were removed. Cuts on a character boundary.
fn truncate_chars(text: &mut String, max: usize) -> usize {
    let total = text.chars().count();
    if total <= max {
        return 0;
    }
    let byte_end = text
        .char_indices()
        .nth(max)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len());
    text.truncate(byte_end);
    total - max
}
