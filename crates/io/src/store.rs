//! On-disk dataset store, one JSON file per dataset under a session
//! directory.

use std::fs;
use std::path::PathBuf;

use waybill_core::error::PipelineError;
use waybill_core::store::DatasetStore;
use waybill_core::Table;

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Fresh random session id for naming stored datasets.
    pub fn new_session_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn dataset_path(&self, key: &str) -> Result<PathBuf, PipelineError> {
        // Keys name files directly, so path syntax is not a valid key.
        if key.is_empty() || key.contains(['/', '\\', '.']) {
            return Err(PipelineError::Store(format!("invalid dataset key: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl DatasetStore for FileStore {
    fn put(&mut self, key: &str, table: &Table) -> Result<(), PipelineError> {
        let path = self.dataset_path(key)?;
        fs::create_dir_all(&self.dir)
            .map_err(|e| PipelineError::Store(format!("cannot create {}: {e}", self.dir.display())))?;
        let json = serde_json::to_vec(table).map_err(|e| PipelineError::Store(e.to_string()))?;
        fs::write(&path, json)
            .map_err(|e| PipelineError::Store(format!("cannot write {}: {e}", path.display())))
    }

    fn get(&self, key: &str) -> Result<Option<Table>, PipelineError> {
        let path = self.dataset_path(key)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PipelineError::Store(format!(
                    "cannot read {}: {e}",
                    path.display()
                )))
            }
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| PipelineError::Store(format!("cannot decode {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waybill_core::Value;

    fn sample() -> Table {
        let mut t = Table::new(vec!["PAN".into()]);
        t.push_row(vec![Value::text("AACI6306G1")]);
        t
    }

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path());

        store.put("abc123", &sample()).unwrap();
        assert_eq!(store.get("abc123").unwrap(), Some(sample()));
    }

    #[test]
    fn missing_key_is_none_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert_eq!(store.get("nope").unwrap(), None);
    }

    #[test]
    fn path_syntax_in_keys_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.get("../escape").is_err());
        assert!(store.get("").is_err());
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(FileStore::new_session_id(), FileStore::new_session_id());
    }
}
