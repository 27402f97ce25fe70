//! Local gallery of saved generations.
//!
//! The whole gallery lives in one storage slot as a JSON array, newest entry
//! first. Every save and delete re-reads the slot and writes it back whole, so
//! two writers sharing a slot can lose each other's updates.

use crate::data_uri::DataUri;
use crate::error::{GenError, Result};
use crate::image::AspectRatio;
use crate::media::{MediaKind, MediaResult};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// One saved image or video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryEntry {
    /// Creation timestamp in milliseconds, as a string.
    pub id: String,
    /// Data URI of the media.
    pub url: String,
    /// Entries written before videos existed have no kind; they are images.
    #[serde(default)]
    pub kind: MediaKind,
    /// Prompt that produced the media.
    #[serde(default)]
    pub prompt: String,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub created_at: i64,
    /// Aspect ratio of the media. Unrecognized values read as landscape.
    #[serde(default, deserialize_with = "lenient_aspect_ratio")]
    pub aspect_ratio: AspectRatio,
}

fn lenient_aspect_ratio<'de, D>(deserializer: D) -> std::result::Result<AspectRatio, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(|r| AspectRatio::normalize(&r)).unwrap_or_default())
}

impl GalleryEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(result: &MediaResult, prompt: impl Into<String>, aspect_ratio: AspectRatio) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: now.to_string(),
            url: result.data_uri.to_string(),
            kind: result.kind,
            prompt: prompt.into(),
            created_at: now,
            aspect_ratio,
        }
    }

    /// Creation time, if the stored timestamp is in range.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.created_at).single()
    }

    /// Decodes the media and writes it to `path`.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = DataUri::parse(&self.url)?.decode()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// A single string-valued persistent slot.
pub trait StorageSlot: Send + Sync {
    /// Returns the slot contents, or `None` if nothing was ever written.
    fn read(&self) -> Result<Option<String>>;

    /// Replaces the slot contents.
    fn write(&self, contents: &str) -> Result<()>;
}

/// Slot backed by one file on disk.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    /// Creates a slot at `path`. Nothing is touched until the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageSlot for FileSlot {
    fn read(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GenError::StorageRead(format!("{}: {e}", self.path.display()))),
        }
    }

    fn write(&self, contents: &str) -> Result<()> {
        let to_storage_err = |e: std::io::Error| GenError::StorageWrite(format!("{}: {e}", self.path.display()));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(to_storage_err)?;
        }
        // Write-then-rename so a crash never leaves a half-written gallery
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).map_err(to_storage_err)?;
        std::fs::rename(&tmp, &self.path).map_err(to_storage_err)?;
        Ok(())
    }
}

/// In-memory slot, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemorySlot {
    contents: Mutex<Option<String>>,
    fail_writes: AtomicBool,
}

impl MemorySlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a slot holding `contents`.
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent write fail, like a browser storage quota.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current raw contents.
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl StorageSlot for MemorySlot {
    fn read(&self) -> Result<Option<String>> {
        self.contents
            .lock()
            .map(|c| c.clone())
            .map_err(|e| GenError::StorageRead(e.to_string()))
    }

    fn write(&self, contents: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GenError::StorageWrite("storage quota exceeded".into()));
        }
        let mut guard = self
            .contents
            .lock()
            .map_err(|e| GenError::StorageWrite(e.to_string()))?;
        *guard = Some(contents.to_string());
        Ok(())
    }
}

/// Result of [`Gallery::save`].
#[derive(Debug)]
#[must_use = "a session-only save carries a warning for the user"]
pub enum SaveOutcome {
    /// The entry was written to the slot.
    Persisted,
    /// The entry is kept for this session only; persisting it failed.
    SessionOnly(GenError),
}

impl SaveOutcome {
    /// Whether the entry reached storage.
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted)
    }

    /// The non-fatal storage error, if any.
    pub fn warning(&self) -> Option<&GenError> {
        match self {
            Self::Persisted => None,
            Self::SessionOnly(e) => Some(e),
        }
    }
}

/// Ordered collection of gallery entries, newest first.
#[derive(Debug)]
pub struct Gallery<S> {
    slot: S,
    entries: Vec<GalleryEntry>,
}

impl<S: StorageSlot> Gallery<S> {
    /// Loads the gallery. Missing or unreadable storage yields an empty gallery.
    pub fn load(slot: S) -> Self {
        let entries = read_entries(&slot).unwrap_or_else(|e| {
            tracing::warn!("starting with an empty gallery: {e}");
            Vec::new()
        });
        Self { slot, entries }
    }

    /// Entries, newest first.
    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    /// Looks up an entry by id.
    pub fn get(&self, id: &str) -> Option<&GalleryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the gallery has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The underlying slot.
    pub fn slot(&self) -> &S {
        &self.slot
    }

    /// Prepends `entry` and persists the gallery.
    ///
    /// The in-memory gallery always keeps the entry. A storage failure is
    /// reported through [`SaveOutcome::SessionOnly`], never as an error.
    /// Stored elements this version cannot parse are written back untouched,
    /// and a slot that does not hold a JSON array is never overwritten.
    pub fn save(&mut self, entry: GalleryEntry) -> SaveOutcome {
        self.entries.insert(0, entry.clone());

        let result = read_raw(&self.slot).and_then(|mut persisted| {
            persisted.insert(0, serde_json::to_value(&entry)?);
            write_raw(&self.slot, &persisted)
        });

        match result {
            Ok(()) => SaveOutcome::Persisted,
            Err(e) => {
                tracing::warn!("gallery entry kept for this session only: {e}");
                SaveOutcome::SessionOnly(e)
            }
        }
    }

    /// Removes the entry with `id`. Unknown ids and storage failures are ignored.
    pub fn delete(&mut self, id: &str) {
        self.entries.retain(|e| e.id != id);

        let mut persisted = match read_raw(&self.slot) {
            Ok(persisted) => persisted,
            Err(e) => {
                tracing::debug!("ignoring unreadable gallery on delete: {e}");
                return;
            }
        };
        let before = persisted.len();
        persisted.retain(|v| v.get("id").and_then(Value::as_str) != Some(id));
        if persisted.len() == before {
            return;
        }
        if let Err(e) = write_raw(&self.slot, &persisted) {
            tracing::debug!("ignoring gallery write failure on delete: {e}");
        }
    }
}

/// Reads the slot as a JSON array without interpreting its elements.
fn read_raw(slot: &impl StorageSlot) -> Result<Vec<Value>> {
    match slot.read()? {
        Some(contents) if !contents.trim().is_empty() => serde_json::from_str(&contents)
            .map_err(|e| GenError::StorageRead(format!("malformed gallery: {e}"))),
        _ => Ok(Vec::new()),
    }
}

/// Parses every element it can; the rest are skipped with a warning.
fn read_entries(slot: &impl StorageSlot) -> Result<Vec<GalleryEntry>> {
    Ok(read_raw(slot)?
        .into_iter()
        .filter_map(|v| match serde_json::from_value(v) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("skipping unreadable gallery entry: {e}");
                None
            }
        })
        .collect())
}

fn write_raw(slot: &impl StorageSlot, values: &[Value]) -> Result<()> {
    let json = serde_json::to_string(values).map_err(|e| GenError::StorageWrite(e.to_string()))?;
    slot.write(&json)
}
