//! Project declaration index
//!
//! A one-time scan of every project file recording where each class and
//! function is declared. Lookups are case-insensitive, like PHP names.

use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::exclude::PathFilter;
use crate::model::ClassId;
use crate::scan::{class_spans, free_functions, function_spans, mask_non_code};

/// A declaration found in one file
#[derive(Debug, Clone, PartialEq, Eq)]
enum Declaration {
    Class {
        namespace: String,
        name: String,
    },
    Method {
        namespace: String,
        class: String,
        name: String,
    },
    Function {
        namespace: String,
        name: String,
    },
}

#[derive(Debug, Clone)]
struct ClassEntry {
    id: ClassId,
    files: Vec<PathBuf>,
}

/// (namespace, class, function) -> declaring file
#[derive(Debug, Default)]
pub struct DeclarationIndex {
    classes: HashMap<(String, String), ClassEntry>,
    /// Free functions use an empty class name
    functions: HashMap<(String, String, String), PathBuf>,
    files: usize,
}

fn key(part: &str) -> String {
    part.trim_matches('\\').to_lowercase()
}

impl DeclarationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan every PHP file under `roots` that the filter does not exclude
    pub fn build(roots: &[PathBuf], filter: &PathFilter) -> Self {
        let files = filter.collect_php_files(roots);

        let scanned: Vec<(PathBuf, Vec<Declaration>)> = files
            .par_iter()
            .filter_map(|path| {
                std::fs::read_to_string(path)
                    .ok()
                    .map(|source| (path.clone(), scan_declarations(&source)))
            })
            .collect();

        let mut index = Self::new();
        for (path, declarations) in scanned {
            index.insert(&path, declarations);
        }
        index
    }

    /// Index a single source text
    pub fn add_source(&mut self, path: &Path, source: &str) {
        self.insert(path, scan_declarations(source));
    }

    fn insert(&mut self, path: &Path, declarations: Vec<Declaration>) {
        self.files += 1;
        for declaration in declarations {
            match declaration {
                Declaration::Class { namespace, name } => {
                    let entry = self
                        .classes
                        .entry((key(&namespace), key(&name)))
                        .or_insert_with(|| ClassEntry {
                            id: ClassId::from_parts(&namespace, &name),
                            files: Vec::new(),
                        });
                    if !entry.files.iter().any(|f| f == path) {
                        entry.files.push(path.to_path_buf());
                    }
                }
                Declaration::Method {
                    namespace,
                    class,
                    name,
                } => {
                    self.functions
                        .entry((key(&namespace), key(&class), key(&name)))
                        .or_insert_with(|| path.to_path_buf());
                }
                Declaration::Function { namespace, name } => {
                    self.functions
                        .entry((key(&namespace), String::new(), key(&name)))
                        .or_insert_with(|| path.to_path_buf());
                }
            }
        }
    }

    /// File declaring a method, or a free function when `class` is empty
    pub fn function_file(&self, namespace: &str, class: &str, function: &str) -> Option<&Path> {
        self.functions
            .get(&(key(namespace), key(class), key(function)))
            .map(|p| p.as_path())
    }

    pub fn has_function(&self, namespace: &str, class: &str, function: &str) -> bool {
        self.function_file(namespace, class, function).is_some()
    }

    /// Every file declaring the class
    pub fn class_files(&self, namespace: &str, class: &str) -> &[PathBuf] {
        self.classes
            .get(&(key(namespace), key(class)))
            .map(|e| e.files.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_class(&self, namespace: &str, class: &str) -> bool {
        self.classes.contains_key(&(key(namespace), key(class)))
    }

    /// Find a class by its bare name inside a namespace
    pub fn find_class(&self, namespace: &str, name: &str) -> Option<&ClassId> {
        self.classes
            .get(&(key(namespace), key(name)))
            .map(|e| &e.id)
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn file_count(&self) -> usize {
        self.files
    }
}

fn scan_declarations(source: &str) -> Vec<Declaration> {
    let masked = mask_non_code(source);
    let classes = class_spans(&masked);
    let mut declarations = Vec::new();

    for class in &classes {
        declarations.push(Declaration::Class {
            namespace: class.namespace.clone(),
            name: class.name.clone(),
        });
        for function in function_spans(&masked, class.body.clone()) {
            declarations.push(Declaration::Method {
                namespace: class.namespace.clone(),
                class: class.name.clone(),
                name: function.name,
            });
        }
    }

    for (namespace, function) in free_functions(&masked, &classes) {
        declarations.push(Declaration::Function {
            namespace,
            name: function.name,
        });
    }

    declarations
}
