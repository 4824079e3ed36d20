//! Output formatting for phint
//!
//! Supports text (colored terminal), unified diff and JSON output formats.

use anyhow::Result;
use colored::*;
use phint_analyze::editor::{ApplyOutcome, DiffSink};
use phint_analyze::model::InstructionSurface;
use phint_analyze::project::{DecisionOutcome, DecisionStats};
use phint_analyze::Instruction;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Diff,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<OutputFormat> {
        match s.to_lowercase().as_str() {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            "diff" => Some(OutputFormat::Diff),
            _ => None,
        }
    }
}

/// Contents of one edited file
#[derive(Debug, Clone)]
pub struct FileChange {
    /// Contents before the first edit
    pub before: String,
    /// Contents after the last edit
    pub after: String,
    pub instructions: Vec<Instruction>,
}

/// Gathers edits per file while the editor runs
#[derive(Debug, Default)]
pub struct ChangeCollector {
    changes: BTreeMap<PathBuf, FileChange>,
}

impl ChangeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Changed files in path order
    pub fn into_changes(self) -> impl Iterator<Item = (PathBuf, FileChange)> {
        self.changes.into_iter()
    }
}

impl DiffSink for ChangeCollector {
    fn file_changed(&mut self, path: &Path, before: &str, after: &str, instruction: &Instruction) {
        let change = self
            .changes
            .entry(path.to_path_buf())
            .or_insert_with(|| FileChange {
                before: before.to_string(),
                after: String::new(),
                instructions: Vec::new(),
            });
        change.after = after.to_string();
        change.instructions.push(instruction.clone());
    }
}

/// What happened to one instruction
#[derive(Debug, Clone, Serialize)]
pub struct InstructionResult {
    #[serde(flatten)]
    pub instruction: InstructionSurface,
    /// "applied", "pending" (check mode) or "skipped"
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Summary statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub functions: usize,
    pub instructions: usize,
    pub applied: usize,
    pub skipped: usize,
    pub inconsistent: usize,
    pub files_with_changes: usize,
}

/// Full JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput {
    pub version: String,
    pub summary: Summary,
    pub instructions: Vec<InstructionResult>,
}

/// Reporter for accumulating and outputting results
pub struct Reporter {
    format: OutputFormat,
    verbose: bool,
    results: Vec<InstructionResult>,
    summary: Summary,
}

impl Reporter {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self {
            format,
            verbose,
            results: Vec::new(),
            summary: Summary::default(),
        }
    }

    pub fn record_decisions(&mut self, stats: &DecisionStats) {
        self.summary.functions = stats.functions;
        self.summary.instructions = stats.instructions;
        self.summary.inconsistent = stats.inconsistent;
    }

    /// Report observations that disagree (verbose text only)
    pub fn report_inconsistent(&mut self, outcome: &DecisionOutcome) {
        if self.verbose && self.format == OutputFormat::Text {
            println!(
                "  {} {}::{}() {}: {}",
                "!".yellow(),
                outcome.class,
                outcome.function,
                outcome.target,
                outcome.conflicting.join(", ")
            );
        }
    }

    /// Report what the editor did with an instruction
    pub fn report_outcome(&mut self, instruction: &Instruction, outcome: &ApplyOutcome, fix_mode: bool) {
        let result = match outcome {
            ApplyOutcome::Applied(path, line) => {
                self.summary.applied += 1;
                InstructionResult {
                    instruction: instruction.surface(),
                    status: if fix_mode { "applied" } else { "pending" },
                    path: Some(path.display().to_string()),
                    line: Some(*line),
                    reason: None,
                }
            }
            ApplyOutcome::NoOp(reason) => {
                self.summary.skipped += 1;
                if self.verbose && self.format == OutputFormat::Text {
                    println!("  {} {} ({})", "-".dimmed(), instruction, reason);
                }
                InstructionResult {
                    instruction: instruction.surface(),
                    status: "skipped",
                    path: None,
                    line: None,
                    reason: Some(reason.clone()),
                }
            }
        };
        self.results.push(result);
    }

    /// Report an edited file
    pub fn report_file(&mut self, path: &Path, change: &FileChange, fix_mode: bool) {
        self.summary.files_with_changes += 1;

        match self.format {
            OutputFormat::Text => {
                println!("{}", path.display().to_string().bold());
                if fix_mode {
                    println!(
                        "  {} Applied {} change(s)",
                        "OK".green(),
                        change.instructions.len()
                    );
                } else {
                    print_diff(&change.before, &change.after);
                    println!();
                    for instruction in &change.instructions {
                        println!("  {} {}", "->".green(), instruction);
                    }
                }
                println!();
            }
            OutputFormat::Diff => {
                print_unified_diff(path, &change.before, &change.after);
            }
            OutputFormat::Json => {
                // JSON output is handled in finish()
            }
        }
    }

    /// Print final summary/output
    pub fn finish(self, check_mode: bool) -> Result<()> {
        match self.format {
            OutputFormat::Text => {
                println!();
                println!("{}", "Summary".bold().underline());
                println!("  Methods analyzed: {}", self.summary.functions);
                println!("  Types decided: {}", self.summary.instructions);
                println!("  Files with changes: {}", self.summary.files_with_changes);
                if self.summary.skipped > 0 {
                    println!("  Skipped: {}", self.summary.skipped);
                }
                if self.summary.inconsistent > 0 {
                    println!("  Inconsistent: {}", self.summary.inconsistent);
                }

                if check_mode && self.summary.applied > 0 {
                    println!();
                    println!("{}", "Run with --fix to apply changes".yellow());
                }
            }
            OutputFormat::Json => {
                let output = JsonOutput {
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    summary: self.summary,
                    instructions: self.results,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Diff => {
                // Patch-compatible output has no summary
            }
        }
        Ok(())
    }

    /// Get summary for exit code determination
    pub fn summary(&self) -> &Summary {
        &self.summary
    }
}

/// Print a colored diff between old and new content
fn print_diff(old: &str, new: &str) {
    for diff_result in diff::lines(old, new) {
        match diff_result {
            diff::Result::Left(l) => {
                println!("  {}", format!("- {}", l).red());
            }
            diff::Result::Right(r) => {
                println!("  {}", format!("+ {}", r).green());
            }
            diff::Result::Both(_, _) => {}
        }
    }
}

/// Print unified diff format (standard diff -u compatible)
fn print_unified_diff(path: &Path, old: &str, new: &str) {
    use similar::{ChangeTag, TextDiff};

    let diff = TextDiff::from_lines(old, new);
    let path_str = path.display().to_string();

    println!("--- a/{}", path_str);
    println!("+++ b/{}", path_str);

    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        println!("{}", hunk.header());
        for change in hunk.iter_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => " ",
            };
            print!("{}{}", sign, change);
            if change.missing_newline() {
                println!();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phint_analyze::{ClassId, InferredType};

    fn instruction(function: &str) -> Instruction {
        Instruction::ReturnType {
            class: ClassId::new("App\\Greeter"),
            function: function.to_string(),
            ty: InferredType::new("string", false),
        }
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("text"), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::from_str("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("diff"), Some(OutputFormat::Diff));
        assert_eq!(OutputFormat::from_str("xml"), None);
    }

    #[test]
    fn test_collector_keeps_first_and_last_contents() {
        let mut collector = ChangeCollector::new();
        let path = Path::new("/p/src/Greeter.php");

        collector.file_changed(path, "v0", "v1", &instruction("a"));
        collector.file_changed(path, "v1", "v2", &instruction("b"));
        collector.file_changed(Path::new("/p/src/Other.php"), "x0", "x1", &instruction("c"));

        assert_eq!(collector.len(), 2);
        let changes: Vec<_> = collector.into_changes().collect();
        assert_eq!(changes[0].0, PathBuf::from("/p/src/Greeter.php"));
        assert_eq!(changes[0].1.before, "v0");
        assert_eq!(changes[0].1.after, "v2");
        assert_eq!(changes[0].1.instructions.len(), 2);
    }

    #[test]
    fn test_outcomes_counted() {
        let mut reporter = Reporter::new(OutputFormat::Json, false);
        reporter.report_outcome(
            &instruction("a"),
            &ApplyOutcome::Applied(PathBuf::from("/p/a.php"), 12),
            false,
        );
        reporter.report_outcome(
            &instruction("b"),
            &ApplyOutcome::NoOp("function not found in class".to_string()),
            false,
        );

        assert_eq!(reporter.summary().applied, 1);
        assert_eq!(reporter.summary().skipped, 1);
        assert_eq!(reporter.results[0].status, "pending");
        assert_eq!(reporter.results[0].line, Some(12));
    }

    #[test]
    fn test_json_serialization() {
        let output = JsonOutput {
            version: "0.1.0".to_string(),
            summary: Summary {
                functions: 4,
                instructions: 1,
                applied: 1,
                ..Summary::default()
            },
            instructions: vec![InstructionResult {
                instruction: instruction("greet").surface(),
                status: "applied",
                path: Some("src/Greeter.php".to_string()),
                line: Some(6),
                reason: None,
            }],
        };

        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains("\"version\":\"0.1.0\""));
        assert!(json.contains("\"functions\":4"));
        assert!(json.contains("\"functionName\":\"greet\""));
        assert!(json.contains("\"typeName\":\"string\""));
        assert!(json.contains("\"status\":\"applied\""));
        assert!(json.contains("\"line\":6"));
        assert!(!json.contains("\"reason\""));
    }
}
