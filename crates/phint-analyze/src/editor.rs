//! Writes decided types back into source files
//!
//! Declarations are located with targeted text patterns on a masked copy of
//! the file (comments and strings blanked), and each instruction becomes a
//! single insertion. Everything else in the file is left byte-for-byte intact.

use phint_core::{apply_edits, offset_to_line_column, Edit};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::index::DeclarationIndex;
use crate::logging;
use crate::model::Instruction;
use crate::scan::{class_spans, find_closing, function_spans, mask_non_code};
use crate::Result;

const PROMOTION_MODIFIERS: &[&str] = &["public", "protected", "private", "readonly"];

/// Receives the contents of a file before and after an edit
pub trait DiffSink {
    fn file_changed(&mut self, path: &Path, before: &str, after: &str, instruction: &Instruction);
}

/// Result of applying one instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Edited file and the 1-based line of the edit
    Applied(PathBuf, usize),
    /// Nothing was changed, with the reason
    NoOp(String),
}

impl ApplyOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied(..))
    }
}

/// Applies instructions to the files declaring their targets
///
/// In dry-run mode files are never written; edited contents are kept in an
/// in-memory overlay so later instructions see earlier edits.
pub struct CodeEditor {
    index: Arc<DeclarationIndex>,
    dry_run: bool,
    overlay: HashMap<PathBuf, String>,
}

impl CodeEditor {
    pub fn new(index: Arc<DeclarationIndex>, dry_run: bool) -> Self {
        Self {
            index,
            dry_run,
            overlay: HashMap::new(),
        }
    }

    /// Current contents of a file, including edits not yet written
    pub fn contents(&self, path: &Path) -> Result<String> {
        match self.overlay.get(path) {
            Some(source) => Ok(source.clone()),
            None => Ok(fs::read_to_string(path)?),
        }
    }

    /// Files edited in dry-run mode, with their edited contents
    pub fn overlay(&self) -> &HashMap<PathBuf, String> {
        &self.overlay
    }

    pub fn apply(
        &mut self,
        instruction: &Instruction,
        sink: Option<&mut dyn DiffSink>,
    ) -> Result<ApplyOutcome> {
        let class = instruction.class();
        let path = match self.index.class_files(class.namespace(), class.short_name()) {
            [path] => path.clone(),
            [] => return Ok(self.noop(instruction, "no file declares the class")),
            _ => return Ok(self.noop(instruction, "class is declared in several files")),
        };

        let source = self.contents(&path)?;
        let edit = match locate_edit(&source, instruction) {
            Ok(edit) => edit,
            Err(reason) => return Ok(self.noop(instruction, reason)),
        };
        let (line, _) = offset_to_line_column(&source, edit.start);
        let updated = apply_edits(&source, &[edit])?;

        if let Some(sink) = sink {
            sink.file_changed(&path, &source, &updated, instruction);
        }

        if self.dry_run {
            self.overlay.insert(path.clone(), updated);
        } else {
            fs::write(&path, updated)?;
            self.overlay.remove(&path);
        }

        logging::log_edit_applied(instruction, &path, line);
        Ok(ApplyOutcome::Applied(path, line))
    }

    fn noop(&self, instruction: &Instruction, reason: &str) -> ApplyOutcome {
        logging::log_editor_noop(instruction, reason);
        ApplyOutcome::NoOp(reason.to_string())
    }
}

/// Find where the instruction's text goes
fn locate_edit(source: &str, instruction: &Instruction) -> std::result::Result<Edit, &'static str> {
    let masked = mask_non_code(source);
    let class = instruction.class();

    let spans: Vec<_> = class_spans(&masked)
        .into_iter()
        .filter(|span| {
            span.namespace.eq_ignore_ascii_case(class.namespace())
                && span.name.eq_ignore_ascii_case(class.short_name())
        })
        .collect();
    let span = match spans.as_slice() {
        [span] => span,
        [] => return Err("class declaration not found in file"),
        _ => return Err("class declared more than once in file"),
    };

    let function = function_spans(&masked, span.body.clone())
        .into_iter()
        .find(|f| f.name.eq_ignore_ascii_case(instruction.function()))
        .ok_or("function not found in class")?;
    let params_close =
        find_closing(&masked, function.params_open).ok_or("unterminated parameter list")?;

    match instruction {
        Instruction::ReturnType { ty, .. } => {
            if masked[params_close + 1..].trim_start().starts_with(':') {
                return Err("return type already declared");
            }
            Ok(Edit::insert(
                params_close + 1,
                format!(": {}", ty.render()),
                instruction.to_string(),
            ))
        }
        Instruction::TypeHint { arg_index, ty, .. } => {
            let offset = parameter_offset(&masked, function.params_open + 1, params_close, *arg_index)
                .ok_or("parameter not found")?;
            let rest = &masked[offset..params_close];
            if !(rest.starts_with('$') || rest.starts_with('&') || rest.starts_with("...")) {
                return Err("parameter already has a type");
            }
            Ok(Edit::insert(
                offset,
                format!("{} ", ty.render()),
                instruction.to_string(),
            ))
        }
    }
}

/// Offset of the `arg_index`-th parameter's first token after any
/// promotion modifiers
fn parameter_offset(masked: &str, start: usize, end: usize, arg_index: usize) -> Option<usize> {
    let bytes = masked.as_bytes();
    let mut depth = 0i32;
    let mut param_start = start;
    let mut current = 0usize;

    for i in start..=end {
        let at_end = i == end;
        let b = if at_end { b',' } else { bytes[i] };
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b',' if depth == 0 => {
                if current == arg_index {
                    return first_token(masked, param_start, i);
                }
                current += 1;
                param_start = i + 1;
            }
            _ => {}
        }
    }

    None
}

fn first_token(masked: &str, start: usize, end: usize) -> Option<usize> {
    let mut offset = start;
    loop {
        let segment = &masked[offset..end];
        let trimmed = segment.trim_start();
        if trimmed.is_empty() {
            return None;
        }
        offset = end - trimmed.len();

        let word_len = trimmed
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(trimmed.len());
        let word = &trimmed[..word_len];
        if word_len > 0 && PROMOTION_MODIFIERS.contains(&word.to_lowercase().as_str()) {
            offset += word_len;
            continue;
        }
        return Some(offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassId, InferredType};
    use tempfile::TempDir;

    struct Recorder(Vec<(PathBuf, String, String)>);

    impl DiffSink for Recorder {
        fn file_changed(&mut self, path: &Path, before: &str, after: &str, _: &Instruction) {
            self.0.push((path.to_path_buf(), before.to_string(), after.to_string()));
        }
    }

    fn setup(source: &str) -> (TempDir, PathBuf, Arc<DeclarationIndex>) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Greeter.php");
        fs::write(&path, source).unwrap();
        let mut index = DeclarationIndex::new();
        index.add_source(&path, source);
        (dir, path, Arc::new(index))
    }

    fn returns(function: &str, ty: &str) -> Instruction {
        Instruction::ReturnType {
            class: ClassId::new("App\\Greeter"),
            function: function.to_string(),
            ty: InferredType::new(ty, false),
        }
    }

    fn hint(function: &str, arg_index: usize, ty: &str, nullable: bool) -> Instruction {
        Instruction::TypeHint {
            class: ClassId::new("App\\Greeter"),
            function: function.to_string(),
            arg_index,
            ty: InferredType::new(ty, nullable),
        }
    }

    #[test]
    fn test_single_line_return_type() {
        let source = "<?php\nnamespace App;\n\nclass Greeter\n{\n    function singleLineFunc() { return 'Hello world'; }\n}\n";
        let (_dir, path, index) = setup(source);

        let mut editor = CodeEditor::new(index, false);
        let outcome = editor.apply(&returns("singleLineFunc", "string"), None).unwrap();

        assert_eq!(outcome, ApplyOutcome::Applied(path.clone(), 6));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "<?php\nnamespace App;\n\nclass Greeter\n{\n    function singleLineFunc(): string { return 'Hello world'; }\n}\n"
        );
    }

    #[test]
    fn test_missing_function_leaves_file_identical() {
        let source = "<?php\nnamespace App;\n\nclass Greeter\n{\n    function other() { return 1; }\n}\n";
        let (_dir, path, index) = setup(source);

        let mut editor = CodeEditor::new(index, false);
        let outcome = editor.apply(&returns("singleLineFunc", "string"), None).unwrap();

        assert!(!outcome.is_applied());
        assert_eq!(fs::read(&path).unwrap(), source.as_bytes());
    }

    #[test]
    fn test_unknown_class_is_noop() {
        let (_dir, _path, index) = setup("<?php\nnamespace App;\nclass Greeter {}\n");
        let mut editor = CodeEditor::new(index, false);
        let instruction = Instruction::ReturnType {
            class: ClassId::new("Other\\Greeter"),
            function: "x".to_string(),
            ty: InferredType::new("int", false),
        };
        assert!(matches!(
            editor.apply(&instruction, None).unwrap(),
            ApplyOutcome::NoOp(_)
        ));
    }

    #[test]
    fn test_existing_return_type_is_noop() {
        let source = "<?php\nnamespace App;\nclass Greeter { function name() : string { return ''; } }\n";
        let (_dir, path, index) = setup(source);
        let mut editor = CodeEditor::new(index, false);

        let outcome = editor.apply(&returns("name", "int"), None).unwrap();
        assert_eq!(outcome, ApplyOutcome::NoOp("return type already declared".to_string()));
        assert_eq!(fs::read_to_string(&path).unwrap(), source);
    }

    #[test]
    fn test_multiline_parameters_with_promotion() {
        let source = r#"<?php
namespace App;

class Greeter
{
    public function __construct(
        private $name,
        #[Sensitive] protected readonly $secret = null,
        array $options = ['a' => [1, 2]],
        &$out
    ) {
    }
}
"#;
        let (_dir, path, index) = setup(source);
        let mut editor = CodeEditor::new(index, false);

        assert!(editor.apply(&hint("__construct", 0, "string", false), None).unwrap().is_applied());
        assert!(editor.apply(&hint("__construct", 1, "string", true), None).unwrap().is_applied());
        assert!(!editor.apply(&hint("__construct", 2, "array", false), None).unwrap().is_applied());
        assert_eq!(
            editor.apply(&hint("__construct", 3, "array", false), None).unwrap(),
            ApplyOutcome::Applied(path.clone(), 10)
        );
        assert!(!editor.apply(&hint("__construct", 4, "int", false), None).unwrap().is_applied());

        let updated = fs::read_to_string(&path).unwrap();
        assert!(updated.contains("        private string $name,\n"));
        assert!(updated.contains("#[Sensitive] protected readonly ?string $secret = null,"));
        assert!(updated.contains("        array &$out\n"));
    }

    #[test]
    fn test_dry_run_uses_overlay() {
        let source = "<?php\nnamespace App;\nclass Greeter { function greet($who, $greeting) { return $greeting . $who; } }\n";
        let (_dir, path, index) = setup(source);
        let mut editor = CodeEditor::new(index, true);
        let mut recorder = Recorder(Vec::new());

        editor.apply(&hint("greet", 0, "string", false), Some(&mut recorder)).unwrap();
        editor.apply(&hint("greet", 1, "string", false), Some(&mut recorder)).unwrap();
        editor.apply(&returns("greet", "string"), Some(&mut recorder)).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), source);
        assert_eq!(recorder.0.len(), 3);
        assert_eq!(recorder.0[0].1, source);
        assert!(editor.contents(&path).unwrap().contains(
            "function greet(string $who, string $greeting): string {"
        ));
    }

    #[test]
    fn test_fully_qualified_class_hint() {
        let source = "<?php\nnamespace App;\nclass Greeter { function with($clock) {} }\n";
        let (_dir, path, index) = setup(source);
        let mut editor = CodeEditor::new(index, false);

        editor.apply(&hint("with", 0, "\\App\\Clock", false), None).unwrap();
        assert!(fs::read_to_string(&path)
            .unwrap()
            .contains("function with(\\App\\Clock $clock)"));
    }
}
