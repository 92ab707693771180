use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    sync::LazyLock,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use bytes::Bytes;
use chrono::{DateTime, Local};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIME_IMAGE_PREFIX: &str = "image/";
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";
pub const DEFAULT_IMAGE_EXTENSION: &str = ".png";
pub const PASTED_IMAGE_PREFIX: &str = "pasted_image_";
pub const MAX_EXTENSION_LEN: usize = 16;
pub const MAX_REGION_ID_LEN: usize = 128;

/// Allow-list used by a send box that was not given one explicitly.
pub const DEFAULT_SUPPORTED_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".webp", ".bmp", ".svg", ".pdf", ".doc", ".docx", ".xls",
    ".xlsx", ".ppt", ".pptx", ".txt", ".md", ".json", ".csv", ".xml", ".yaml", ".yml", ".html",
    ".css", ".js", ".ts", ".py", ".rs", ".java", ".go", ".c", ".cpp", ".h", ".sh", ".log",
];

static SYSTEM_GENERATED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]*_?\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2}")
        .expect("system-generated name pattern compiles")
});

pub type RegionId = String;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("region id must not be empty")]
    EmptyRegionId,
    #[error("region id exceeds {MAX_REGION_ID_LEN} chars")]
    RegionIdTooLong,
    #[error("invalid file extension {0:?}")]
    InvalidExtension(String),
}

/// A file accepted by the ingestion pipeline, ready for the chat input and uploader.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime: String,
    /// Unix milliseconds.
    pub last_modified: u64,
}

/// One item of a clipboard or drop file list.
///
/// `origin_path` is only set when the platform handed us an existing file
/// (file-manager drag or paste). In-memory blobs carry their bytes in `data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardEntry {
    pub name: Option<String>,
    pub mime: String,
    pub size: u64,
    pub last_modified_ms: u64,
    pub origin_path: Option<PathBuf>,
    pub data: Bytes,
}

impl ClipboardEntry {
    pub fn blob(name: Option<&str>, mime: &str, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            name: name.map(str::to_owned),
            mime: mime.to_owned(),
            size: data.len() as u64,
            last_modified_ms: now_unix_ms(),
            origin_path: None,
            data,
        }
    }

    pub fn on_disk(
        name: &str,
        path: impl Into<PathBuf>,
        mime: &str,
        size: u64,
        last_modified_ms: u64,
    ) -> Self {
        Self {
            name: Some(name.to_owned()),
            mime: mime.to_owned(),
            size,
            last_modified_ms,
            origin_path: Some(path.into()),
            data: Bytes::new(),
        }
    }

    /// The entry's name, with an empty name treated as absent.
    pub fn file_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with(MIME_IMAGE_PREFIX)
    }
}

/// Contents of one paste or drop event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PastePayload {
    pub text: Option<String>,
    pub files: Vec<ClipboardEntry>,
}

impl PastePayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            files: Vec::new(),
        }
    }

    pub fn files(files: Vec<ClipboardEntry>) -> Self {
        Self { text: None, files }
    }

    pub fn plain_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|text| !text.is_empty())
    }

    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }
}

/// Payload-level decision, evaluated in order: text only, then any file list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadClass<'a> {
    PlainText(&'a str),
    Files(&'a [ClipboardEntry]),
    Empty,
}

pub fn classify_payload(payload: &PastePayload) -> PayloadClass<'_> {
    match (payload.plain_text(), payload.has_files()) {
        (Some(text), false) => PayloadClass::PlainText(text),
        (_, true) => PayloadClass::Files(&payload.files),
        (None, false) => PayloadClass::Empty,
    }
}

/// Per-entry classification. The extension is derived once, by the rules of
/// the variant, so acceptance and naming never re-inspect the entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified<'a> {
    /// In-memory image without a path; named from its own name or its MIME.
    ImageBlob {
        entry: &'a ClipboardEntry,
        extension: String,
    },
    /// Existing file on disk; referenced in place.
    NamedFile {
        entry: &'a ClipboardEntry,
        path: &'a Path,
        extension: String,
    },
    /// In-memory non-image file; keeps its original name.
    BinaryBlob {
        entry: &'a ClipboardEntry,
        extension: String,
    },
}

impl<'a> Classified<'a> {
    pub fn entry(&self) -> &'a ClipboardEntry {
        match self {
            Classified::ImageBlob { entry, .. }
            | Classified::NamedFile { entry, .. }
            | Classified::BinaryBlob { entry, .. } => *entry,
        }
    }

    pub fn extension(&self) -> &str {
        match self {
            Classified::ImageBlob { extension, .. }
            | Classified::NamedFile { extension, .. }
            | Classified::BinaryBlob { extension, .. } => extension,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Classified::ImageBlob { .. } => "image_blob",
            Classified::NamedFile { .. } => "named_file",
            Classified::BinaryBlob { .. } => "binary_blob",
        }
    }
}

pub fn classify(entry: &ClipboardEntry) -> Classified<'_> {
    let name = entry.file_name().unwrap_or("");
    match entry.origin_path.as_deref() {
        Some(path) => Classified::NamedFile {
            entry,
            path,
            extension: file_extension(name),
        },
        None if entry.is_image() => {
            let from_name = file_extension(name);
            let extension = if from_name.is_empty() {
                extension_for_mime(&entry.mime).to_owned()
            } else {
                from_name
            };
            Classified::ImageBlob { entry, extension }
        }
        None => Classified::BinaryBlob {
            entry,
            extension: file_extension(name),
        },
    }
}

/// Lowercase, dot-prefixed extension of the last path component, or empty.
pub fn file_extension(name: &str) -> String {
    let file_name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match file_name.rfind('.') {
        None | Some(0) => String::new(),
        Some(idx) if idx + 1 == file_name.len() => String::new(),
        Some(idx) => file_name[idx..].to_ascii_lowercase(),
    }
}

pub fn extension_for_mime(mime: &str) -> &'static str {
    let essence = mime.split(';').next().unwrap_or(mime).trim();
    match essence.to_ascii_lowercase().as_str() {
        "image/png" => ".png",
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/bmp" => ".bmp",
        "image/svg+xml" => ".svg",
        _ => DEFAULT_IMAGE_EXTENSION,
    }
}

pub fn mime_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        ".png" => "image/png",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".gif" => "image/gif",
        ".webp" => "image/webp",
        ".bmp" => "image/bmp",
        ".svg" => "image/svg+xml",
        ".pdf" => "application/pdf",
        ".txt" => "text/plain",
        ".md" => "text/markdown",
        ".json" => "application/json",
        ".csv" => "text/csv",
        _ => MIME_OCTET_STREAM,
    }
}

/// Normalized extension allow-list (lowercase, dot-prefixed, no empties).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SupportedExtensions(BTreeSet<String>);

impl SupportedExtensions {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            extensions
                .into_iter()
                .filter_map(|ext| normalize_extension(ext.as_ref()))
                .collect(),
        )
    }

    /// Parses a comma-separated list such as `png, .JPG,pdf`.
    pub fn parse_list(list: &str) -> Result<Self, CoreError> {
        let mut out = BTreeSet::new();
        for raw in list.split(',') {
            let Some(ext) = normalize_extension(raw) else {
                continue;
            };
            let valid = ext.len() <= MAX_EXTENSION_LEN
                && ext[1..]
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '_'));
            if !valid {
                return Err(CoreError::InvalidExtension(raw.trim().to_owned()));
            }
            out.insert(ext);
        }
        Ok(Self(out))
    }

    pub fn contains(&self, extension: &str) -> bool {
        !extension.is_empty() && self.0.contains(extension)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for SupportedExtensions {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPORTED_EXTENSIONS)
    }
}

impl From<Vec<String>> for SupportedExtensions {
    fn from(value: Vec<String>) -> Self {
        Self::new(value)
    }
}

impl From<SupportedExtensions> for Vec<String> {
    fn from(value: SupportedExtensions) -> Self {
        value.0.into_iter().collect()
    }
}

fn normalize_extension(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    Some(format!(".{}", trimmed.to_ascii_lowercase()))
}

pub fn validate_region_id(region_id: &str) -> Result<(), CoreError> {
    if region_id.trim().is_empty() {
        return Err(CoreError::EmptyRegionId);
    }
    if region_id.len() > MAX_REGION_ID_LEN {
        return Err(CoreError::RegionIdTooLong);
    }
    Ok(())
}

/// Matches OS/clipboard placeholder names like `IMG_2024-01-01_10-30-00.png`.
pub fn is_system_generated_name(name: &str) -> bool {
    SYSTEM_GENERATED_NAME.is_match(name)
}

pub fn pasted_image_name(now: &DateTime<Local>, extension: &str) -> String {
    format!("{PASTED_IMAGE_PREFIX}{}{extension}", now.format("%H%M%S"))
}

/// Name for a materialized image blob: keep a meaningful original name,
/// otherwise synthesize one from the current time.
pub fn image_blob_name(original: Option<&str>, now: &DateTime<Local>, extension: &str) -> String {
    match original.filter(|name| !name.is_empty()) {
        Some(name) if !is_system_generated_name(name) => name.to_owned(),
        _ => pasted_image_name(now, extension),
    }
}

/// Drops a trailing whitespace run that begins at a newline.
pub fn clean_pasted_text(text: &str) -> &str {
    let content_len = text.trim_end().len();
    match text[content_len..].find('\n') {
        Some(offset) => &text[..content_len + offset],
        None => text,
    }
}

/// Why a send box refused to send its contents.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SendRejected {
    #[error("a send is already in progress")]
    InProgress,
    #[error("nothing to send")]
    Blank,
}

/// Text box state of a send box: the value, a caret as a char index when one
/// is known, and whether a send is in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposerInput {
    value: String,
    cursor: Option<usize>,
    sending: bool,
}

impl ComposerInput {
    /// A box whose caret position is unknown; pasted text replaces the value.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            cursor: None,
            sending: false,
        }
    }

    pub fn with_cursor(value: impl Into<String>, cursor: usize) -> Self {
        let value = value.into();
        let cursor = cursor.min(value.chars().count());
        Self {
            value,
            cursor: Some(cursor),
            sending: false,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    /// Inserts at the caret and leaves the caret after the inserted text.
    /// Without a caret the text replaces the whole value.
    pub fn insert_text(&mut self, text: &str) {
        let Some(cursor) = self.cursor else {
            self.value = text.to_owned();
            return;
        };
        let byte_offset = self
            .value
            .char_indices()
            .nth(cursor)
            .map(|(idx, _)| idx)
            .unwrap_or(self.value.len());
        self.value.insert_str(byte_offset, text);
        self.cursor = Some(cursor + text.chars().count());
    }

    /// Claims the box for one send. Refused while another send is in flight
    /// or when the value is blank.
    pub fn begin_send(&mut self) -> Result<String, SendRejected> {
        if self.sending {
            return Err(SendRejected::InProgress);
        }
        if self.value.trim().is_empty() {
            return Err(SendRejected::Blank);
        }
        self.sending = true;
        Ok(self.value.clone())
    }

    /// Releases the send claim; a delivered message clears the box.
    pub fn finish_send(&mut self, delivered: bool) {
        self.sending = false;
        if delivered {
            self.value.clear();
            self.cursor = self.cursor.map(|_| 0);
        }
    }
}

pub fn now_unix_ms() -> u64 {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0));
    duration.as_millis() as u64
}
