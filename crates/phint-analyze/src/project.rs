//! Analyzer orchestration and the type decision step
//!
//! A type is only written when every observation for a parameter or
//! return value agrees on it. Observed `null` makes the decision nullable,
//! doc comments without a usable type are ignored, and anything else that
//! disagrees leaves the declaration untouched.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::analyzers::Analyzer;
use crate::collection::AnalyzedFunctionCollection;
use crate::model::{ClassId, FunctionRecord, InferredType, Instruction, PhpTypeValue, UnresolvableReason};
use crate::{logging, Result};

/// Knobs of the decision step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecisionOptions {
    /// Replace conflicting class types with their nearest common ancestor
    pub widen: bool,
}

/// What a decision is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionTarget {
    Return,
    Parameter(usize),
}

impl fmt::Display for DecisionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionTarget::Return => write!(f, "return"),
            DecisionTarget::Parameter(idx) => write!(f, "parameter #{}", idx),
        }
    }
}

/// Result of deciding one parameter or return type
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionOutcome {
    pub class: ClassId,
    pub function: String,
    pub target: DecisionTarget,
    /// Decided type, or `Unresolvable(inconsistent)`
    pub value: PhpTypeValue,
    /// Distinct type names behind an inconsistent outcome
    pub conflicting: Vec<String>,
}

impl DecisionOutcome {
    pub fn is_inconsistent(&self) -> bool {
        self.value.unresolvable_reason() == Some(UnresolvableReason::Inconsistent)
    }
}

/// Counters of one decision run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionStats {
    pub functions: usize,
    pub instructions: usize,
    pub inconsistent: usize,
}

/// Everything a run produced
#[derive(Debug, Default)]
pub struct AnalysisReport {
    pub instructions: Vec<Instruction>,
    pub outcomes: Vec<DecisionOutcome>,
    pub stats: DecisionStats,
}

/// Runs analyzers in order, then decides types
pub struct ProjectAnalyzer {
    analyzers: Vec<Box<dyn Analyzer>>,
    options: DecisionOptions,
    collection: AnalyzedFunctionCollection,
}

impl ProjectAnalyzer {
    pub fn new(options: DecisionOptions) -> Self {
        Self {
            analyzers: Vec::new(),
            options,
            collection: AnalyzedFunctionCollection::new(),
        }
    }

    pub fn add_analyzer(&mut self, analyzer: Box<dyn Analyzer>) {
        self.analyzers.push(analyzer);
    }

    pub fn collection(&self) -> &AnalyzedFunctionCollection {
        &self.collection
    }

    pub fn run(&mut self) -> Result<AnalysisReport> {
        logging::section("ANALYSIS");
        for analyzer in &self.analyzers {
            logging::log_analyzer_start(analyzer.name());
            analyzer.analyze(&mut self.collection)?;
            logging::log_analyzer_done(
                analyzer.name(),
                self.collection.class_count(),
                self.collection.len(),
            );
        }

        Ok(decide_collection(&self.collection, self.options))
    }
}

/// Outcome of folding a set of observations
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Nothing usable was observed
    Nothing,
    Decided(PhpTypeValue),
    Inconsistent(Vec<String>),
}

/// Fold observations into a single type
pub fn decide<'a>(
    observed: impl IntoIterator<Item = &'a PhpTypeValue>,
    collection: &AnalyzedFunctionCollection,
    options: DecisionOptions,
) -> Decision {
    let mut nullable = false;
    let mut distinct: BTreeMap<String, &PhpTypeValue> = BTreeMap::new();

    for ty in observed {
        match ty.unresolvable_reason() {
            Some(UnresolvableReason::None) => nullable = true,
            Some(UnresolvableReason::Docblock) => {}
            _ => {
                nullable |= ty.is_nullable();
                distinct.entry(ty.type_name()).or_insert(ty);
            }
        }
    }

    let decided = match distinct.len() {
        0 => return Decision::Nothing,
        1 => distinct.values().next().map(|ty| (*ty).clone()),
        _ if options.widen => {
            let classes: Option<Vec<ClassId>> = distinct.values().map(|ty| ty.class_id()).collect();
            classes
                .map(|classes| common_ancestor(collection, &classes))
                .filter(PhpTypeValue::is_resolved)
        }
        _ => None,
    };

    match decided {
        Some(ty) if nullable => Decision::Decided(ty.into_nullable()),
        Some(ty) => Decision::Decided(ty),
        None => Decision::Inconsistent(distinct.into_keys().collect()),
    }
}

/// Nearest class or interface every given class descends from
///
/// Ancestors shared by all classes are candidates; a candidate that is an
/// ancestor of another candidate is dropped. A single survivor is the
/// answer, anything else is `Unresolvable(inconsistent)`.
pub fn common_ancestor(collection: &AnalyzedFunctionCollection, classes: &[ClassId]) -> PhpTypeValue {
    let Some((first, rest)) = classes.split_first() else {
        return PhpTypeValue::unresolvable(UnresolvableReason::None);
    };

    let others: Vec<HashSet<ClassId>> = rest
        .iter()
        .map(|class| collection.get_parents(class).into_iter().collect())
        .collect();

    let candidates: Vec<ClassId> = collection
        .get_parents(first)
        .into_iter()
        .filter(|ancestor| others.iter().all(|set| set.contains(ancestor)))
        .collect();

    let minimal: Vec<&ClassId> = candidates
        .iter()
        .filter(|candidate| {
            !candidates.iter().any(|other| {
                other != *candidate && collection.get_parents(other).contains(candidate)
            })
        })
        .collect();

    match minimal.as_slice() {
        [single] => PhpTypeValue::from_fqcn(single.as_str()),
        _ => PhpTypeValue::unresolvable_with(
            UnresolvableReason::Inconsistent,
            format!("no single common ancestor of {} classes", classes.len()),
        ),
    }
}

fn decide_target(
    record: &FunctionRecord,
    target: DecisionTarget,
    decision: Decision,
    force_nullable: bool,
    report: &mut AnalysisReport,
) {
    let outcome = |value: PhpTypeValue, conflicting: Vec<String>| DecisionOutcome {
        class: record.class.clone(),
        function: record.name.clone(),
        target,
        value,
        conflicting,
    };

    match decision {
        Decision::Nothing => {}
        Decision::Inconsistent(names) => {
            logging::log_inconsistent(&record.qualified_name(), &target.to_string(), &names);
            report.stats.inconsistent += 1;
            report.outcomes.push(outcome(
                PhpTypeValue::unresolvable_with(UnresolvableReason::Inconsistent, names.join("|")),
                names,
            ));
        }
        Decision::Decided(value) => {
            let value = if force_nullable {
                value.into_nullable()
            } else {
                value
            };

            if let Some(ty) = InferredType::from_value(&value) {
                let instruction = match target {
                    DecisionTarget::Return => Instruction::ReturnType {
                        class: record.class.clone(),
                        function: record.name.clone(),
                        ty,
                    },
                    DecisionTarget::Parameter(arg_index) => Instruction::TypeHint {
                        class: record.class.clone(),
                        function: record.name.clone(),
                        arg_index,
                        ty,
                    },
                };
                logging::log_instruction(&instruction);
                report.instructions.push(instruction);
            }
            report.outcomes.push(outcome(value, Vec::new()));
        }
    }
}

/// Decide every missing type declaration in the collection
pub fn decide_collection(
    collection: &AnalyzedFunctionCollection,
    options: DecisionOptions,
) -> AnalysisReport {
    let mut report = AnalysisReport::default();

    for record in collection.functions() {
        report.stats.functions += 1;

        if !record.has_return_type && !record.forbids_return_type() {
            let decision = decide(record.observed_returns(), collection, options);
            decide_target(record, DecisionTarget::Return, decision, false, &mut report);
        }

        for (idx, param) in record.parameters.iter().enumerate() {
            if param.has_type_hint() || param.variadic {
                continue;
            }
            let decision = decide(record.observed_at(idx), collection, options);
            decide_target(
                record,
                DecisionTarget::Parameter(idx),
                decision,
                param.default_is_null(),
                &mut report,
            );
        }
    }

    report.stats.instructions = report.instructions.len();
    logging::log_decision_summary(
        report.stats.functions,
        report.stats.instructions,
        report.stats.inconsistent,
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CallObservation, ClassKind, ClassNode, Parameter, ScalarKind};

    fn int() -> PhpTypeValue {
        PhpTypeValue::scalar(ScalarKind::Int)
    }

    fn null() -> PhpTypeValue {
        PhpTypeValue::unresolvable(UnresolvableReason::None)
    }

    fn collection_with(record: FunctionRecord) -> AnalyzedFunctionCollection {
        let mut collection = AnalyzedFunctionCollection::new();
        collection.add(ClassNode::new(record.class.clone()), record);
        collection
    }

    fn record() -> FunctionRecord {
        FunctionRecord::new(ClassId::new("App\\Calc"), "compute")
    }

    #[test]
    fn test_single_type_emits_return_instruction() {
        let collection = collection_with(record().with_return(int()).with_return(int()).with_return(int()));
        let report = decide_collection(&collection, DecisionOptions::default());

        assert_eq!(
            report.instructions,
            vec![Instruction::ReturnType {
                class: ClassId::new("App\\Calc"),
                function: "compute".to_string(),
                ty: InferredType::new("int", false),
            }]
        );
        assert_eq!(report.stats.instructions, 1);
    }

    #[test]
    fn test_no_observations_no_instruction() {
        let report = decide_collection(&collection_with(record()), DecisionOptions::default());
        assert!(report.instructions.is_empty());
        assert!(report.outcomes.is_empty());
    }

    #[test]
    fn test_conflicting_types_no_instruction() {
        let collection = collection_with(
            record()
                .with_return(int())
                .with_return(PhpTypeValue::scalar(ScalarKind::String)),
        );
        let report = decide_collection(&collection, DecisionOptions::default());

        assert!(report.instructions.is_empty());
        assert_eq!(report.stats.inconsistent, 1);
        assert!(report.outcomes[0].is_inconsistent());
        assert_eq!(report.outcomes[0].conflicting, vec!["int", "string"]);
    }

    #[test]
    fn test_null_makes_nullable() {
        let collection = collection_with(record().with_return(int()).with_return(null()));
        let report = decide_collection(&collection, DecisionOptions::default());
        assert_eq!(report.instructions[0].ty().render(), "?int");

        let only_null = collection_with(record().with_return(null()));
        let report = decide_collection(&only_null, DecisionOptions::default());
        assert!(report.instructions.is_empty());
    }

    #[test]
    fn test_docblock_observations() {
        let unusable = PhpTypeValue::unresolvable(UnresolvableReason::Docblock);
        let collection = collection_with(record().with_return(unusable).with_return(int()));
        let report = decide_collection(&collection, DecisionOptions::default());
        assert_eq!(report.instructions.len(), 1);

        let multiple = PhpTypeValue::unresolvable(UnresolvableReason::DocblockMultiple);
        let collection = collection_with(record().with_return(multiple).with_return(int()));
        let report = decide_collection(&collection, DecisionOptions::default());
        assert!(report.instructions.is_empty());
        assert_eq!(report.stats.inconsistent, 1);
    }

    #[test]
    fn test_skips_declared_and_constructors() {
        let declared = collection_with(record().with_return_type(true).with_return(int()));
        assert!(decide_collection(&declared, DecisionOptions::default())
            .instructions
            .is_empty());

        let ctor = FunctionRecord::new(ClassId::new("App\\Calc"), "__construct").with_return(int());
        assert!(decide_collection(&collection_with(ctor), DecisionOptions::default())
            .instructions
            .is_empty());
    }

    #[test]
    fn test_parameter_hints() {
        let string = PhpTypeValue::scalar(ScalarKind::String);
        let record = record()
            .with_parameter(Parameter::new("a"))
            .with_parameter(Parameter::new("b").with_type_hint("int"))
            .with_parameter(Parameter::new("c").with_default("null"))
            .with_parameter(Parameter::new("rest").with_variadic(true))
            .with_call(CallObservation::new(vec![string.clone(), int(), int(), int()]))
            .with_call(CallObservation::new(vec![string.clone(), int()]));

        let report = decide_collection(&collection_with(record), DecisionOptions::default());
        let hints: Vec<(usize, String)> = report
            .instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::TypeHint { arg_index, ty, .. } => Some((*arg_index, ty.render())),
                _ => None,
            })
            .collect();

        assert_eq!(hints, vec![(0, "string".to_string()), (2, "?int".to_string())]);
    }

    fn hierarchy() -> AnalyzedFunctionCollection {
        let mut collection = AnalyzedFunctionCollection::new();
        let id = ClassId::new;
        collection.add_class(ClassNode::declared(id("App\\Shape"), ClassKind::Interface));
        collection.add_class(
            ClassNode::declared(id("App\\Polygon"), ClassKind::Class).with_implements(id("App\\Shape")),
        );
        collection.add_class(
            ClassNode::declared(id("App\\Square"), ClassKind::Class).with_extends(id("App\\Polygon")),
        );
        collection.add_class(
            ClassNode::declared(id("App\\Triangle"), ClassKind::Class).with_extends(id("App\\Polygon")),
        );
        collection.add_class(
            ClassNode::declared(id("App\\Circle"), ClassKind::Class).with_implements(id("App\\Shape")),
        );
        collection
    }

    #[test]
    fn test_common_ancestor() {
        let collection = hierarchy();
        let id = ClassId::new;

        assert_eq!(
            common_ancestor(&collection, &[id("App\\Square"), id("App\\Triangle")]),
            PhpTypeValue::object("App", "Polygon")
        );
        assert_eq!(
            common_ancestor(&collection, &[id("App\\Square"), id("App\\Circle")]),
            PhpTypeValue::object("App", "Shape")
        );
        assert_eq!(
            common_ancestor(&collection, &[id("App\\Square"), id("Other\\Thing")])
                .unresolvable_reason(),
            Some(UnresolvableReason::Inconsistent)
        );
    }

    #[test]
    fn test_widening_is_opt_in() {
        let mut collection = hierarchy();
        collection.add(
            ClassNode::new(ClassId::new("App\\Factory")),
            FunctionRecord::new(ClassId::new("App\\Factory"), "make")
                .with_return(PhpTypeValue::from_fqcn("App\\Square"))
                .with_return(PhpTypeValue::from_fqcn("App\\Triangle")),
        );

        let strict = decide_collection(&collection, DecisionOptions::default());
        assert!(strict.instructions.is_empty());

        let widened = decide_collection(&collection, DecisionOptions { widen: true });
        assert_eq!(widened.instructions[0].ty().render(), "\\App\\Polygon");
    }
}
