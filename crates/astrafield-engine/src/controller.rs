use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use astrafield_contracts::events::{EventPayload, EventWriter};
use astrafield_contracts::params::{ParamSet, ParamValue};
use astrafield_contracts::presets::{preset_choices, PresetCatalog, DEFAULT_PRESET};
use serde_json::{json, Map, Value};

use crate::config::PanelConfig;
use crate::generated::{GeneratedImage, PreviewInfo};
use crate::transport::{ApiClient, FilePart, FormReply, HttpTransport, MultipartPayload, ReqwestTransport};

pub const PRESETS_ENDPOINT: &str = "/presets";
pub const GENERATE_ENDPOINT: &str = "/generate";
pub const STATUS_ENDPOINT: &str = "/";
/// Multipart field carrying the optional source photo.
pub const PHOTO_FIELD: &str = "photo";

const BUSY_MESSAGE: &str = "a generation is already in progress";

/// Receives user-facing failure messages and background diagnostics.
pub trait Notifier {
    fn alert(&self, message: &str);

    /// Logged but not surfaced, e.g. a failed preset fetch.
    fn diagnostic(&self, message: &str) {
        eprintln!("astrafield: {message}");
    }
}

pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn alert(&self, message: &str) {
        eprintln!("{message}");
    }
}

/// Shared view of the `loading` state. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag {
    inner: Arc<AtomicBool>,
}

impl BusyFlag {
    pub fn is_busy(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }

    /// Flips idle to busy. `None` when already busy.
    fn try_acquire(&self) -> Option<BusyGuard> {
        self.inner
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| BusyGuard {
                inner: Arc::clone(&self.inner),
            })
    }
}

/// Returns the flag to idle when dropped.
struct BusyGuard {
    inner: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.inner.store(false, Ordering::SeqCst);
    }
}

/// Photo chosen for the next generate. Read from disk only at submit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoSelection {
    path: PathBuf,
}

impl PhotoSelection {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_part(&self, field: &str) -> Result<FilePart> {
        let bytes = fs::read(&self.path)
            .with_context(|| format!("failed reading {}", self.path.display()))?;
        let file_name = self
            .path
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or("photo")
            .to_string();
        Ok(FilePart {
            field: field.to_string(),
            file_name,
            mime_type: mime_for_path(&self.path).map(str::to_string),
            bytes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    Generated,
    Failed(String),
    /// Another generate was still running; nothing was sent.
    Rejected,
}

/// Owns the form state and drives the preset/generate/download flow.
pub struct PanelController<T: HttpTransport> {
    client: ApiClient<T>,
    notifier: Box<dyn Notifier>,
    events: EventWriter,
    download_dir: PathBuf,
    params: ParamSet,
    revision: u64,
    catalog: Option<PresetCatalog>,
    preset_names: Vec<String>,
    selected_preset: String,
    photo: Option<PhotoSelection>,
    loading: BusyFlag,
    image: Option<GeneratedImage>,
}

impl PanelController<ReqwestTransport> {
    pub fn connect(config: &PanelConfig, session_id: &str) -> Result<Self> {
        let events = match config.events_path.as_ref() {
            Some(path) => EventWriter::new(path, session_id),
            None => EventWriter::disabled(session_id),
        };
        Ok(Self::new(
            ApiClient::new(ReqwestTransport::new()?, &config.server),
            Box::new(StderrNotifier),
            events,
            config.download_dir.clone(),
        ))
    }
}

impl<T: HttpTransport> PanelController<T> {
    pub fn new(
        client: ApiClient<T>,
        notifier: Box<dyn Notifier>,
        events: EventWriter,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            notifier,
            events,
            download_dir: download_dir.into(),
            params: ParamSet::default(),
            revision: 0,
            catalog: None,
            preset_names: Vec::new(),
            selected_preset: DEFAULT_PRESET.to_string(),
            photo: None,
            loading: BusyFlag::default(),
            image: None,
        }
    }

    pub fn client(&self) -> &ApiClient<T> {
        &self.client
    }

    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    /// Bumped on every parameter change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn selected_preset(&self) -> &str {
        &self.selected_preset
    }

    pub fn preset_names(&self) -> &[String] {
        &self.preset_names
    }

    pub fn preset_choices(&self) -> Vec<String> {
        preset_choices(&self.preset_names)
    }

    pub fn photo(&self) -> Option<&PhotoSelection> {
        self.photo.as_ref()
    }

    pub fn image(&self) -> Option<&GeneratedImage> {
        self.image.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_busy()
    }

    pub fn loading_flag(&self) -> BusyFlag {
        self.loading.clone()
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn events(&self) -> &EventWriter {
        &self.events
    }

    /// Fetches the catalog and caches it. Failures are logged and yield
    /// `None`; the previous name list is kept.
    pub fn load_preset_names(&mut self) -> Option<Vec<String>> {
        match self.fetch_catalog() {
            Ok(names) => Some(names),
            Err(err) => {
                self.record_failure(
                    "presets_load_failed",
                    json!({ "error": format!("{err:#}") }),
                );
                None
            }
        }
    }

    /// Drops the cached catalog and loads it again.
    pub fn refresh_presets(&mut self) -> Option<Vec<String>> {
        self.catalog = None;
        self.load_preset_names()
    }

    /// Merges the named preset over the current parameters and returns the
    /// keys that changed. The name is recorded as selected even when the
    /// catalog is unavailable or lacks it; errors only reach the log.
    pub fn apply_preset(&mut self, name: &str) -> Option<Vec<String>> {
        let lookup = self.cached_catalog().map(|catalog| catalog.get(name));
        self.selected_preset = name.to_string();
        match lookup {
            Ok(Some(partial)) => {
                let next = self.params.merged(&partial);
                let changed = self.params.changed_keys(&next);
                self.replace_params(next);
                self.record(
                    "preset_applied",
                    json!({ "preset": name, "changed": changed }),
                );
                Some(changed)
            }
            Ok(None) => {
                self.record_failure(
                    "preset_apply_failed",
                    json!({ "preset": name, "error": format!("no parameters for preset '{name}'") }),
                );
                None
            }
            Err(err) => {
                self.record_failure(
                    "preset_apply_failed",
                    json!({ "preset": name, "error": format!("{err:#}") }),
                );
                None
            }
        }
    }

    /// Replaces a single field. No validation.
    pub fn set_field(&mut self, key: &str, value: ParamValue) {
        let next = self.params.with_field(key, value);
        self.record(
            "param_set",
            json!({ "key": key, "value": next.get(key).map(ParamValue::form_text) }),
        );
        self.replace_params(next);
    }

    pub fn reset_params(&mut self) {
        self.replace_params(ParamSet::default());
        self.record("params_reset", json!({}));
    }

    pub fn select_photo(&mut self, path: impl Into<PathBuf>) {
        let selection = PhotoSelection::new(path);
        self.record(
            "photo_selected",
            json!({ "path": selection.path().to_string_lossy() }),
        );
        self.photo = Some(selection);
    }

    pub fn clear_photo(&mut self) {
        self.photo = None;
    }

    /// Submits the current form. Failures are surfaced through the notifier
    /// as `Generate failed: <message>`; a call made while another generate
    /// is running is rejected. The loading flag is idle again on return.
    pub fn generate(&mut self) -> GenerateOutcome {
        let Some(_busy) = self.loading.try_acquire() else {
            self.record("generate_rejected", json!({ "error": BUSY_MESSAGE }));
            self.notifier.alert(&format!("Generate failed: {BUSY_MESSAGE}"));
            return GenerateOutcome::Rejected;
        };

        let photo = self
            .photo
            .as_ref()
            .map(|photo| photo.path().to_string_lossy().to_string());
        self.record(
            "generate_started",
            json!({ "fields": self.params.len(), "photo": photo }),
        );

        match self.submit_generate() {
            Ok(image) => {
                self.record(
                    "generate_finished",
                    json!({
                        "image_id": image.id(),
                        "content_type": image.content_type(),
                        "bytes": image.bytes().len(),
                        "sha256": image.sha256(),
                    }),
                );
                self.image = Some(image);
                GenerateOutcome::Generated
            }
            Err(err) => {
                let message = format!("{err:#}");
                self.record("generate_failed", json!({ "error": message }));
                self.notifier.alert(&format!("Generate failed: {message}"));
                GenerateOutcome::Failed(message)
            }
        }
    }

    /// Saves the current image as `astrafield-cover.png`. Without an image
    /// this does nothing and returns `Ok(None)`.
    pub fn download(&self) -> Result<Option<PathBuf>> {
        let Some(image) = self.image.as_ref() else {
            return Ok(None);
        };
        let path = image.save_to(&self.download_dir)?;
        self.record(
            "image_downloaded",
            json!({ "image_id": image.id(), "path": path.to_string_lossy() }),
        );
        Ok(Some(path))
    }

    pub fn preview(&self) -> Option<Result<PreviewInfo>> {
        self.image.as_ref().map(GeneratedImage::preview)
    }

    /// Writes an HTML preview page for the current image, if any.
    pub fn render_preview_html(&self, path: &Path) -> Result<Option<PathBuf>> {
        let Some(image) = self.image.as_ref() else {
            return Ok(None);
        };
        image.write_preview_html(path)?;
        Ok(Some(path.to_path_buf()))
    }

    /// Backend health object (`{"msg": ..., "version": ...}`).
    pub fn server_status(&self) -> Result<Value> {
        self.client.get_json(STATUS_ENDPOINT)
    }

    fn fetch_catalog(&mut self) -> Result<Vec<String>> {
        let catalog: PresetCatalog = self.client.get_json(PRESETS_ENDPOINT)?;
        let names = catalog.names();
        self.record("presets_loaded", json!({ "names": names }));
        self.preset_names = names.clone();
        self.catalog = Some(catalog);
        Ok(names)
    }

    fn cached_catalog(&mut self) -> Result<&PresetCatalog> {
        if self.catalog.is_none() {
            self.fetch_catalog()?;
        }
        self.catalog
            .as_ref()
            .ok_or_else(|| anyhow!("preset catalog unavailable"))
    }

    fn submit_generate(&self) -> Result<GeneratedImage> {
        let mut payload = MultipartPayload::new();
        if let Some(photo) = self.photo.as_ref() {
            payload = payload.with_file(photo.read_part(PHOTO_FIELD)?);
        }
        for (name, value) in self.params.form_fields() {
            payload = payload.text(name, value);
        }
        match self.client.post_form(GENERATE_ENDPOINT, &payload)? {
            FormReply::Binary {
                content_type,
                bytes,
            } => Ok(GeneratedImage::new(bytes, content_type)),
            FormReply::Json(value) => Err(anyhow!(
                "server answered with JSON instead of an image: {}",
                json_error_text(&value)
            )),
        }
    }

    fn replace_params(&mut self, next: ParamSet) {
        if next != self.params {
            self.revision += 1;
        }
        self.params = next;
    }

    fn record(&self, event_type: &str, payload: Value) {
        let payload: EventPayload = match payload {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if let Err(err) = self.events.emit(event_type, payload) {
            self.notifier
                .diagnostic(&format!("session log write failed: {err:#}"));
        }
    }

    /// Swallowed failure: goes to the session log, or to the notifier's
    /// diagnostics when the log has no file.
    fn record_failure(&self, event_type: &str, payload: Value) {
        if self.events.path().is_none() {
            let error = payload
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            self.notifier.diagnostic(&format!("{event_type}: {error}"));
        }
        self.record(event_type, payload);
    }
}

fn json_error_text(value: &Value) -> String {
    value
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}
