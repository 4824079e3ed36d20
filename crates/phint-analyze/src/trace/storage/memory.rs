use std::collections::{BTreeMap, HashMap};

use super::{CorrelatedFn, StorageError, TraceStorage};
use crate::model::PhpTypeValue;
use crate::trace::{TraceEntryRecord, TraceReturnRecord, TypeMapper};

/// Keeps every record in memory
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: BTreeMap<u64, TraceEntryRecord>,
    returns: HashMap<u64, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TraceStorage for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn append_entry(&mut self, entry: TraceEntryRecord) -> Result<(), StorageError> {
        self.entries.entry(entry.call_number).or_insert(entry);
        Ok(())
    }

    fn append_return(&mut self, record: TraceReturnRecord) -> Result<(), StorageError> {
        self.returns
            .entry(record.call_number)
            .or_insert(record.return_value);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), StorageError> {
        Ok(())
    }

    fn for_each_correlated(&self, f: &mut CorrelatedFn<'_>) -> Result<(), StorageError> {
        for (call_number, entry) in &self.entries {
            let params: Vec<PhpTypeValue> =
                entry.parameters.iter().map(|p| TypeMapper::map(p)).collect();
            let ret = self.returns.get(call_number).map(|r| TypeMapper::map(r));
            f(entry, &params, ret.as_ref());
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.entries.clear();
        self.returns.clear();
        Ok(())
    }
}
