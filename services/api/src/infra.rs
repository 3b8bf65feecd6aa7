use learn_to_work::error::AppError;
use learn_to_work::workflows::registration::{SessionStorage, StorageError, UploadedFile};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Per-session key/value scope held in process memory.
#[derive(Default, Clone)]
pub(crate) struct InMemorySessionStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl SessionStorage for InMemorySessionStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self.entries.lock().expect("session storage mutex poisoned");
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut guard = self.entries.lock().expect("session storage mutex poisoned");
        guard.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self.entries.lock().expect("session storage mutex poisoned");
        guard.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let guard = self.entries.lock().expect("session storage mutex poisoned");
        Ok(guard.keys().cloned().collect())
    }
}

/// Describe a local file the way a browser file picker would: name, size and a MIME type
/// guessed from the extension.
pub(crate) fn uploaded_file_from_path(path: &Path) -> Result<UploadedFile, AppError> {
    let metadata = std::fs::metadata(path)?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content_type = mime_guess::from_path(path).first_or_octet_stream();

    Ok(UploadedFile::new(
        name,
        metadata.len(),
        content_type.essence_str(),
    ))
}
