use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{CorrelatedFn, StorageError, TraceStorage};
use crate::model::PhpTypeValue;
use crate::trace::{TraceEntryRecord, TraceReturnRecord, TypeMapper};

const BATCH_SIZE: usize = 1000;
const ENTRIES_FILE: &str = "entries.jsonl";
const RETURNS_FILE: &str = "returns.jsonl";

/// Spills records to JSON-lines files in a directory
///
/// Records are buffered and written in batches. Records still in the
/// buffer are visible to readers as well.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
    pending_entries: Vec<TraceEntryRecord>,
    pending_returns: Vec<TraceReturnRecord>,
}

impl FileStorage {
    /// Use `dir` as storage, discarding whatever an earlier run left there
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut storage = Self {
            dir,
            pending_entries: Vec::new(),
            pending_returns: Vec::new(),
        };
        storage.clear()?;
        Ok(storage)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entries_path(&self) -> PathBuf {
        self.dir.join(ENTRIES_FILE)
    }

    fn returns_path(&self) -> PathBuf {
        self.dir.join(RETURNS_FILE)
    }

    fn flush_entries(&mut self) -> Result<(), StorageError> {
        append_lines(&self.entries_path(), &self.pending_entries)?;
        self.pending_entries.clear();
        Ok(())
    }

    fn flush_returns(&mut self) -> Result<(), StorageError> {
        append_lines(&self.returns_path(), &self.pending_returns)?;
        self.pending_returns.clear();
        Ok(())
    }
}

fn append_lines<T: Serialize>(path: &Path, records: &[T]) -> Result<(), StorageError> {
    if records.is_empty() {
        return Ok(());
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record).map_err(std::io::Error::from)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Read every record of a JSON-lines file; a missing file holds no records
fn read_lines<T: DeserializeOwned>(
    path: &Path,
    mut f: impl FnMut(T),
) -> Result<(), StorageError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| StorageError::Malformed {
            path: path.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        f(record);
    }

    Ok(())
}

impl TraceStorage for FileStorage {
    fn name(&self) -> &'static str {
        "file"
    }

    fn append_entry(&mut self, entry: TraceEntryRecord) -> Result<(), StorageError> {
        self.pending_entries.push(entry);
        if self.pending_entries.len() >= BATCH_SIZE {
            self.flush_entries()?;
        }
        Ok(())
    }

    fn append_return(&mut self, record: TraceReturnRecord) -> Result<(), StorageError> {
        self.pending_returns.push(record);
        if self.pending_returns.len() >= BATCH_SIZE {
            self.flush_returns()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), StorageError> {
        self.flush_entries()?;
        self.flush_returns()
    }

    fn for_each_correlated(&self, f: &mut CorrelatedFn<'_>) -> Result<(), StorageError> {
        let mut returns: HashMap<u64, String> = HashMap::new();
        read_lines(&self.returns_path(), |r: TraceReturnRecord| {
            returns.entry(r.call_number).or_insert(r.return_value);
        })?;
        for r in &self.pending_returns {
            returns
                .entry(r.call_number)
                .or_insert_with(|| r.return_value.clone());
        }

        let mut entries: Vec<TraceEntryRecord> = Vec::new();
        read_lines(&self.entries_path(), |e: TraceEntryRecord| entries.push(e))?;
        entries.extend(self.pending_entries.iter().cloned());
        // Stable sort, so dedup keeps the first record of a call number
        entries.sort_by_key(|e| e.call_number);
        entries.dedup_by_key(|e| e.call_number);

        for entry in &entries {
            let params: Vec<PhpTypeValue> =
                entry.parameters.iter().map(|p| TypeMapper::map(p)).collect();
            let ret = returns.get(&entry.call_number).map(|r| TypeMapper::map(r));
            f(entry, &params, ret.as_ref());
        }

        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.pending_entries.clear();
        self.pending_returns.clear();
        for path in [self.entries_path(), self.returns_path()] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(call_number: u64) -> TraceEntryRecord {
        TraceEntryRecord {
            call_number,
            function_name: "App\\Foo->bar".to_string(),
            user_defined: true,
            file_path: "/p/src/Foo.php".to_string(),
            parameters: vec!["long".to_string()],
        }
    }

    #[test]
    fn test_batches_are_flushed() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileStorage::create(dir.path()).unwrap();

        for n in 0..(BATCH_SIZE as u64 + 5) {
            storage.append_entry(entry(n)).unwrap();
        }

        let written = fs::read_to_string(dir.path().join(ENTRIES_FILE)).unwrap();
        assert_eq!(written.lines().count(), BATCH_SIZE);

        let mut count = 0;
        storage
            .for_each_correlated(&mut |_, _, _| count += 1)
            .unwrap();
        assert_eq!(count, BATCH_SIZE + 5);
    }

    #[test]
    fn test_malformed_record() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileStorage::create(dir.path()).unwrap();
        storage.append_entry(entry(1)).unwrap();
        storage.finish().unwrap();

        fs::write(dir.path().join(RETURNS_FILE), "{not json}\n").unwrap();

        let result = storage.for_each_correlated(&mut |_, _, _| {});
        assert!(matches!(
            result,
            Err(StorageError::Malformed { line: 1, .. })
        ));

        let err: crate::AnalyzeError = result.unwrap_err().into();
        assert!(matches!(err, crate::AnalyzeError::InvalidArgument(_)));
    }
}
