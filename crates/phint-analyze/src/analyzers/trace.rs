//! Types observed while the test suite ran

use std::path::PathBuf;
use std::sync::Arc;

use super::Analyzer;
use crate::collection::AnalyzedFunctionCollection;
use crate::exclude::PathFilter;
use crate::index::DeclarationIndex;
use crate::model::{CallObservation, ClassId, ClassNode, FunctionRecord};
use crate::trace::{parse_function_name, FileStorage, MemoryStorage, TraceParser, TraceStorage};
use crate::{logging, Result};

/// Where parsed trace records are kept between parsing and merging
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceStorageKind {
    Memory,
    /// JSON-lines files in the given directory
    File(PathBuf),
}

/// Feeds an Xdebug trace into the collection
pub struct TraceAnalyzer {
    trace_path: PathBuf,
    storage: TraceStorageKind,
    index: Arc<DeclarationIndex>,
    filter: PathFilter,
}

impl TraceAnalyzer {
    pub fn new(
        trace_path: impl Into<PathBuf>,
        storage: TraceStorageKind,
        index: Arc<DeclarationIndex>,
        filter: PathFilter,
    ) -> Self {
        Self {
            trace_path: trace_path.into(),
            storage,
            index,
            filter,
        }
    }

    pub fn in_memory(
        trace_path: impl Into<PathBuf>,
        index: Arc<DeclarationIndex>,
        filter: PathFilter,
    ) -> Self {
        Self::new(trace_path, TraceStorageKind::Memory, index, filter)
    }

    pub fn with_file_storage(
        trace_path: impl Into<PathBuf>,
        storage_dir: impl Into<PathBuf>,
        index: Arc<DeclarationIndex>,
        filter: PathFilter,
    ) -> Self {
        Self::new(
            trace_path,
            TraceStorageKind::File(storage_dir.into()),
            index,
            filter,
        )
    }

    fn open_storage(&self) -> Result<Box<dyn TraceStorage>> {
        let storage: Box<dyn TraceStorage> = match &self.storage {
            TraceStorageKind::Memory => Box::new(MemoryStorage::new()),
            TraceStorageKind::File(dir) => Box::new(FileStorage::create(dir.clone())?),
        };
        Ok(storage)
    }

    /// Turn every correlated call in `storage` into observations
    pub fn merge_storage(
        storage: &dyn TraceStorage,
        collection: &mut AnalyzedFunctionCollection,
    ) -> Result<usize> {
        let mut merged = 0;

        storage.for_each_correlated(&mut |entry, params, ret| {
            let Some(name) = parse_function_name(&entry.function_name) else {
                return;
            };
            // Free functions are not inference targets
            if !name.has_class() {
                return;
            }

            let class = ClassId::from_parts(&name.namespace, &name.class);
            let mut record = FunctionRecord::new(class.clone(), name.function)
                .with_call(CallObservation::new(params.to_vec()));
            if let Some(ret) = ret {
                record = record.with_return(ret.clone());
            }

            collection.add(ClassNode::new(class), record);
            merged += 1;
        })?;

        Ok(merged)
    }
}

impl Analyzer for TraceAnalyzer {
    fn name(&self) -> &'static str {
        "trace"
    }

    fn analyze(&self, collection: &mut AnalyzedFunctionCollection) -> Result<()> {
        let mut storage = self.open_storage()?;
        logging::log(&format!(
            "Reading {} into {} storage",
            self.trace_path.display(),
            storage.name()
        ));

        let mut parser = TraceParser::new(&self.index, &self.filter);
        parser.parse_file(&self.trace_path, storage.as_mut())?;

        let merged = Self::merge_storage(storage.as_ref(), collection)?;
        logging::log(&format!("Merged {} traced calls", merged));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PhpTypeValue, ScalarKind};
    use crate::trace::TraceEntryRecord;
    use crate::trace::TraceReturnRecord;

    #[test]
    fn test_merge_storage() {
        let mut storage = MemoryStorage::new();
        storage
            .append_entry(TraceEntryRecord {
                call_number: 1,
                function_name: "App\\Greeter->greet".to_string(),
                user_defined: true,
                file_path: "/p/src/Greeter.php".to_string(),
                parameters: vec!["'Ada'".to_string()],
            })
            .unwrap();
        storage
            .append_return(TraceReturnRecord {
                call_number: 1,
                return_value: "'Hello Ada'".to_string(),
            })
            .unwrap();
        storage
            .append_entry(TraceEntryRecord {
                call_number: 2,
                function_name: "App\\helper".to_string(),
                user_defined: true,
                file_path: "/p/src/helpers.php".to_string(),
                parameters: vec![],
            })
            .unwrap();
        storage.finish().unwrap();

        let mut collection = AnalyzedFunctionCollection::new();
        let merged = TraceAnalyzer::merge_storage(&storage, &mut collection).unwrap();

        assert_eq!(merged, 1);
        let record = collection.get(&ClassId::new("App\\Greeter"), "greet").unwrap();
        assert_eq!(
            record.calls[0].0,
            vec![PhpTypeValue::scalar(ScalarKind::String)]
        );
        assert_eq!(
            record.returns[0].0,
            PhpTypeValue::scalar(ScalarKind::String)
        );
    }

    #[test]
    fn test_missing_trace_fails() {
        let analyzer = TraceAnalyzer::in_memory(
            "/no/such/trace.xt",
            Arc::new(DeclarationIndex::new()),
            PathFilter::default(),
        );
        let mut collection = AnalyzedFunctionCollection::new();
        let result = analyzer.analyze(&mut collection);
        assert!(matches!(result, Err(crate::AnalyzeError::NotFound(_))));
    }
}
