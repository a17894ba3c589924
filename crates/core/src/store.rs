//! Dataset store seam.
//!
//! Pipeline stages hand datasets between invocations through a store keyed
//! by session id. The engine only knows the trait; persistence lives with
//! the caller.

use std::collections::HashMap;

use crate::error::PipelineError;
use crate::table::Table;

pub trait DatasetStore {
    fn put(&mut self, key: &str, table: &Table) -> Result<(), PipelineError>;
    fn get(&self, key: &str) -> Result<Option<Table>, PipelineError>;
}

/// In-process store. Used in tests and for single-shot runs that never
/// touch disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    datasets: HashMap<String, Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DatasetStore for MemoryStore {
    fn put(&mut self, key: &str, table: &Table) -> Result<(), PipelineError> {
        self.datasets.insert(key.to_string(), table.clone());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Table>, PipelineError> {
        Ok(self.datasets.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    #[test]
    fn put_then_get_round_trips_and_misses_are_none() {
        let mut store = MemoryStore::new();
        let mut t = Table::new(vec!["a".into()]);
        t.push_row(vec![Value::Number(1.0)]);

        store.put("s1", &t).unwrap();
        assert_eq!(store.get("s1").unwrap(), Some(t));
        assert_eq!(store.get("s2").unwrap(), None);
    }
}
