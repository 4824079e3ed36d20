use std::collections::{HashSet, VecDeque};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::mocks::MockRegistry;
use super::name::parse_function_name;
use super::storage::TraceStorage;
use super::{TraceEntryRecord, TraceReturnRecord, TraceStats};
use crate::exclude::PathFilter;
use crate::index::DeclarationIndex;
use crate::{logging, AnalyzeError, Result};

/// `Version:`, `File format:` and `TRACE START`
const HEADER_LINES: usize = 3;
/// Exit summary and `TRACE END`
const FOOTER_LINES: usize = 2;

const RETURN_FIELDS: usize = 6;
const ENTRY_MIN_FIELDS: usize = 11;

/// Streams an Xdebug trace into a storage backend
///
/// Only calls of functions declared in the project (and not under an
/// excluded path) are kept, together with their return values.
pub struct TraceParser<'a> {
    index: &'a DeclarationIndex,
    filter: &'a PathFilter,
    mocks: MockRegistry,
    retained: HashSet<u64>,
    stats: TraceStats,
}

impl<'a> TraceParser<'a> {
    pub fn new(index: &'a DeclarationIndex, filter: &'a PathFilter) -> Self {
        Self {
            index,
            filter,
            mocks: MockRegistry::new(),
            retained: HashSet::new(),
            stats: TraceStats::default(),
        }
    }

    pub fn mocks(&self) -> &MockRegistry {
        &self.mocks
    }

    /// Parse a trace file; fails before reading anything if it does not exist
    pub fn parse_file(
        &mut self,
        path: &Path,
        storage: &mut dyn TraceStorage,
    ) -> Result<TraceStats> {
        if !path.is_file() {
            return Err(AnalyzeError::NotFound(format!(
                "trace file {}",
                path.display()
            )));
        }

        let file = File::open(path)?;
        let stats = self.parse_reader(BufReader::new(file), storage)?;
        logging::log_trace_summary(path, &stats);
        Ok(stats)
    }

    /// Parse trace text from any reader
    pub fn parse_reader<R: BufRead>(
        &mut self,
        mut reader: R,
        storage: &mut dyn TraceStorage,
    ) -> Result<TraceStats> {
        self.retained.clear();
        self.stats = TraceStats::default();

        // Lines are held back until we know they are not part of the footer
        let mut delayed: VecDeque<String> = VecDeque::with_capacity(FOOTER_LINES + 1);
        let mut buf = Vec::new();
        let mut line_no = 0usize;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line_no += 1;
            if line_no <= HEADER_LINES {
                continue;
            }

            let line = String::from_utf8_lossy(&buf)
                .trim_end_matches(['\n', '\r'])
                .to_string();
            delayed.push_back(line);

            if delayed.len() > FOOTER_LINES {
                if let Some(line) = delayed.pop_front() {
                    self.process_line(&line, storage)?;
                }
            }
        }

        storage.finish()?;
        self.stats.lines = line_no;
        Ok(self.stats.clone())
    }

    fn process_line(&mut self, line: &str, storage: &mut dyn TraceStorage) -> Result<()> {
        let fields: Vec<&str> = line.split('\t').collect();

        if fields.len() == RETURN_FIELDS {
            self.process_return(&fields, storage)
        } else if fields.len() >= ENTRY_MIN_FIELDS {
            self.process_entry(&fields, storage)
        } else {
            Ok(())
        }
    }

    fn process_return(&mut self, fields: &[&str], storage: &mut dyn TraceStorage) -> Result<()> {
        let Ok(call_number) = fields[1].trim().parse::<u64>() else {
            return Ok(());
        };
        if !self.retained.contains(&call_number) {
            return Ok(());
        }

        let raw = fields[5];
        let return_value = self.mocks.rewrite(raw).unwrap_or_else(|| raw.to_string());
        storage.append_return(TraceReturnRecord {
            call_number,
            return_value,
        })?;
        self.stats.returns_retained += 1;
        Ok(())
    }

    fn process_entry(&mut self, fields: &[&str], storage: &mut dyn TraceStorage) -> Result<()> {
        let Ok(call_number) = fields[1].trim().parse::<u64>() else {
            return Ok(());
        };
        self.stats.entries_seen += 1;

        let parameters: Vec<String> = fields[11..].iter().map(|p| p.to_string()).collect();

        // Doubles are declared inside dependency code, so look at every entry
        self.stats.mocks_detected += self.mocks.observe(&parameters);

        let user_defined = fields[6].trim() == "1";
        let file_path = fields[8].trim();
        if !user_defined || self.filter.is_excluded_str(file_path) {
            return Ok(());
        }

        let Some(name) = parse_function_name(fields[5]) else {
            return Ok(());
        };
        if name.is_closure() || name.namespace.is_empty() {
            return Ok(());
        }
        if !self
            .index
            .has_function(&name.namespace, &name.class, &name.function)
        {
            return Ok(());
        }

        let parameters = parameters
            .into_iter()
            .map(|p| self.mocks.rewrite(&p).unwrap_or(p))
            .collect();

        storage.append_entry(TraceEntryRecord {
            call_number,
            function_name: fields[5].trim().to_string(),
            user_defined,
            file_path: file_path.to_string(),
            parameters,
        })?;
        self.retained.insert(call_number);
        self.stats.entries_retained += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PhpTypeValue, ScalarKind};
    use crate::trace::MemoryStorage;
    use std::path::PathBuf;

    const SOURCE: &str = r#"<?php
namespace App;

class Calculator
{
    public function add($a, $b) { return $a + $b; }
}
"#;

    fn index() -> DeclarationIndex {
        let mut index = DeclarationIndex::new();
        index.add_source(Path::new("/p/src/Calculator.php"), SOURCE);
        index
    }

    fn entry(call: u64, name: &str, user: u8, file: &str, params: &[&str]) -> String {
        let mut fields = vec![
            "1".to_string(),
            call.to_string(),
            "0".to_string(),
            "0.001".to_string(),
            "400000".to_string(),
            name.to_string(),
            user.to_string(),
            String::new(),
            file.to_string(),
            "10".to_string(),
            params.len().to_string(),
        ];
        fields.extend(params.iter().map(|p| p.to_string()));
        fields.join("\t")
    }

    fn ret(call: u64, value: &str) -> String {
        format!("1\t{}\tR\t\t\t{}", call, value)
    }

    fn trace(body: &[String]) -> String {
        let mut lines = vec![
            "Version: 3.1.0".to_string(),
            "File format: 4".to_string(),
            "TRACE START [2024-01-01 10:00:00.000000]".to_string(),
        ];
        lines.extend(body.iter().cloned());
        lines.push("\t\t\t0.5\t380000".to_string());
        lines.push("TRACE END   [2024-01-01 10:00:01.000000]".to_string());
        lines.join("\n") + "\n"
    }

    fn collect(storage: &MemoryStorage) -> Vec<(TraceEntryRecord, Vec<PhpTypeValue>, Option<PhpTypeValue>)> {
        let mut out = Vec::new();
        storage
            .for_each_correlated(&mut |e, p, r| out.push((e.clone(), p.to_vec(), r.cloned())))
            .unwrap();
        out
    }

    #[test]
    fn test_entry_with_return() {
        let index = index();
        let filter = PathFilter::default();
        let text = trace(&[
            entry(1, "App\\Calculator->add", 1, "/p/src/Calculator.php", &["1", "2"]),
            ret(1, "3"),
        ]);

        let mut storage = MemoryStorage::new();
        let stats = TraceParser::new(&index, &filter)
            .parse_reader(text.as_bytes(), &mut storage)
            .unwrap();

        assert_eq!(stats.entries_retained, 1);
        assert_eq!(stats.returns_retained, 1);

        let tuples = collect(&storage);
        assert_eq!(tuples.len(), 1);
        assert_eq!(tuples[0].1, vec![PhpTypeValue::scalar(ScalarKind::Int); 2]);
        assert_eq!(tuples[0].2, Some(PhpTypeValue::scalar(ScalarKind::Int)));
    }

    #[test]
    fn test_excluded_path_is_dropped() {
        let index = index();
        let filter = PathFilter::new(vec!["vendor/".to_string()]);
        let text = trace(&[
            entry(1, "App\\Calculator->add", 1, "/p/vendor/lib/Calculator.php", &["1", "2"]),
            ret(1, "3"),
        ]);

        let mut storage = MemoryStorage::new();
        TraceParser::new(&index, &filter)
            .parse_reader(text.as_bytes(), &mut storage)
            .unwrap();

        assert!(collect(&storage).is_empty());
    }

    #[test]
    fn test_unwanted_entries_are_dropped() {
        let index = index();
        let filter = PathFilter::default();
        let text = trace(&[
            entry(1, "strlen", 0, "/p/src/Calculator.php", &["'abc'"]),
            entry(2, "App\\{closure:/p/src/Calculator.php:5-7}", 1, "/p/src/Calculator.php", &[]),
            entry(3, "Calculator->add", 1, "/p/src/Calculator.php", &["1", "2"]),
            entry(4, "App\\Unknown->run", 1, "/p/src/Unknown.php", &[]),
            ret(1, "3"),
            ret(3, "3"),
        ]);

        let mut storage = MemoryStorage::new();
        let stats = TraceParser::new(&index, &filter)
            .parse_reader(text.as_bytes(), &mut storage)
            .unwrap();

        assert_eq!(stats.entries_seen, 4);
        assert_eq!(stats.entries_retained, 0);
        assert_eq!(stats.returns_retained, 0);
    }

    #[test]
    fn test_footer_is_not_parsed() {
        let index = index();
        let filter = PathFilter::default();
        // A trace truncated to its framing only
        let text = trace(&[]);

        let mut storage = MemoryStorage::new();
        let stats = TraceParser::new(&index, &filter)
            .parse_reader(text.as_bytes(), &mut storage)
            .unwrap();

        assert_eq!(stats.lines, 5);
        assert_eq!(stats.entries_seen, 0);
    }

    #[test]
    fn test_mock_values_rewritten() {
        let index = index();
        let filter = PathFilter::default();
        let declaration = r"'class Mock_Calculator_0badf00d extends \\App\\Calculator\n{\n}'";
        let text = trace(&[
            entry(1, "eval", 0, "/p/vendor/phpunit/Generator.php", &[declaration]),
            entry(2, "App\\Calculator->add", 1, "/p/src/Calculator.php", &["class Mock_Calculator_0badf00d { }", "'Mock_Calculator_0badf00d'"]),
            ret(2, "class Mock_Calculator_0badf00d { }"),
        ]);

        let mut storage = MemoryStorage::new();
        let stats = TraceParser::new(&index, &filter)
            .parse_reader(text.as_bytes(), &mut storage)
            .unwrap();
        assert_eq!(stats.mocks_detected, 1);

        let tuples = collect(&storage);
        assert_eq!(tuples[0].1[0], PhpTypeValue::object("App", "Calculator"));
        assert_eq!(tuples[0].1[1], PhpTypeValue::scalar(ScalarKind::String));
        assert_eq!(tuples[0].2, Some(PhpTypeValue::object("App", "Calculator")));
    }

    #[test]
    fn test_missing_trace_file() {
        let index = index();
        let filter = PathFilter::default();
        let mut storage = MemoryStorage::new();
        let result = TraceParser::new(&index, &filter)
            .parse_file(&PathBuf::from("/definitely/not/here.xt"), &mut storage);

        assert!(matches!(result, Err(AnalyzeError::NotFound(_))));
    }
}
