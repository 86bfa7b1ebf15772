//! Visible-text extraction from zipped XML documents
//!
//! Decoding is total: a malformed archive produces a diagnostic string
//! instead of an error so one bad revision never aborts an extraction run.

use crate::config::DecoderConfig;
use regex::Regex;
use std::io::{Cursor, Read};
use std::sync::LazyLock;
use zip::ZipArchive;

/// Returned when the bytes are not a readable zip archive
pub const ARCHIVE_UNREADABLE: &str = "Unable to parse document archive";
/// Returned when no archive entry ends with the content-part suffix
pub const CONTENT_PART_MISSING: &str = "Content.xml not found in archive";
/// Returned when the content part exists but cannot be decompressed
pub const CONTENT_PART_UNREADABLE: &str = "Could not read Content.xml";
/// Returned when decoding succeeds but yields nothing at all
pub const EMPTY_CONTENT: &str = "Unable to parse content";

/// Paragraphs, string literals and generic element wrappers, in the order
/// their fragments are emitted
static TEXT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?s)<p(?:\s[^>]*)?>(.*?)</p>",
        r"(?s)<string(?:\s[^>]*)?>(.*?)</string>",
        r"(?s)<element(?:\s[^>]*)?>(.*?)</element>",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

static ANY_TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]+>").ok());

/// Decodes document archives into their visible text
#[derive(Debug, Clone)]
pub struct DocumentDecoder {
    content_part_suffix: String,
    fallback_chars: usize,
}

impl Default for DocumentDecoder {
    fn default() -> Self {
        Self::new(&DecoderConfig::default())
    }
}

impl DocumentDecoder {
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            content_part_suffix: config.content_part_suffix.clone(),
            fallback_chars: config.fallback_chars,
        }
    }

    /// Decode raw archive bytes into visible text or a diagnostic string
    pub fn decode(&self, bytes: &[u8]) -> String {
        let xml = match self.read_content_part(bytes) {
            Ok(xml) => xml,
            Err(diagnostic) => return diagnostic.to_string(),
        };

        let text = extract_visible_text(&xml, self.fallback_chars);
        if text.is_empty() {
            EMPTY_CONTENT.to_string()
        } else {
            text
        }
    }

    fn read_content_part(&self, bytes: &[u8]) -> Result<String, &'static str> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
            tracing::debug!("Archive open failed: {}", e);
            ARCHIVE_UNREADABLE
        })?;

        // Central-directory order, so the first match is stable across runs
        for index in 0..archive.len() {
            let mut entry = match archive.by_index(index) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Skipping unreadable archive entry {}: {}", index, e);
                    continue;
                }
            };

            if !entry.name().ends_with(&self.content_part_suffix) {
                continue;
            }

            let mut raw = Vec::new();
            entry.read_to_end(&mut raw).map_err(|e| {
                tracing::debug!("Content part read failed: {}", e);
                CONTENT_PART_UNREADABLE
            })?;
            return Ok(String::from_utf8_lossy(&raw).into_owned());
        }

        Err(CONTENT_PART_MISSING)
    }
}

/// Extract human-visible text from document XML
///
/// Each pattern is applied over the whole document in turn; every match is
/// stripped of nested tags, entity-unescaped and trimmed, and empty
/// fragments are dropped. Fragments are joined by a blank line. When nothing
/// survives, the first `fallback_chars` characters of the raw XML are
/// returned instead.
pub fn extract_visible_text(xml: &str, fallback_chars: usize) -> String {
    let mut fragments = Vec::new();

    for pattern in TEXT_PATTERNS.iter() {
        for captures in pattern.captures_iter(xml) {
            let Some(inner) = captures.get(1) else {
                continue;
            };
            let text = unescape_entities(&strip_tags(inner.as_str()));
            let text = text.trim();
            if !text.is_empty() {
                fragments.push(text.to_string());
            }
        }
    }

    if fragments.is_empty() {
        return xml.chars().take(fallback_chars).collect();
    }

    fragments.join("\n\n").trim().to_string()
}

fn strip_tags(fragment: &str) -> String {
    match ANY_TAG.as_ref() {
        Some(tag) => tag.replace_all(fragment, "").into_owned(),
        None => fragment.to_string(),
    }
}

/// Unescape the five predefined XML entities
///
/// `&amp;` is replaced after `&lt;`/`&gt;` so `&amp;lt;` stays `&lt;`.
fn unescape_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}
