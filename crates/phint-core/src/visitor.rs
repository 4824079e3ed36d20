//! Declaration walker for PHP syntax trees
//!
//! Type inference only cares about declarations: namespaces, imports,
//! classes and their members. The walker descends into namespace bodies
//! and blocks, never into function bodies or expressions.

use mago_syntax::ast::*;

/// Trait for visiting top-level declarations
pub trait DeclarationVisitor<'a> {
    /// Called for each declaration-level statement. Return `true` to descend
    /// into namespace and block bodies.
    fn visit_statement(&mut self, _stmt: &Statement<'a>, _source: &str) -> bool {
        true
    }

    /// Visit a program (entry point)
    fn visit_program(&mut self, program: &Program<'a>, source: &str) {
        for stmt in program.statements.iter() {
            self.traverse_statement(stmt, source);
        }
    }

    /// Traverse a statement and the declarations nested in it
    fn traverse_statement(&mut self, stmt: &Statement<'a>, source: &str) {
        if !self.visit_statement(stmt, source) {
            return;
        }

        match stmt {
            Statement::Namespace(ns) => match &ns.body {
                NamespaceBody::Implicit(body) => {
                    for inner in body.statements.iter() {
                        self.traverse_statement(inner, source);
                    }
                }
                NamespaceBody::BraceDelimited(body) => {
                    for inner in body.statements.iter() {
                        self.traverse_statement(inner, source);
                    }
                }
            },
            Statement::Block(block) => {
                for inner in block.statements.iter() {
                    self.traverse_statement(inner, source);
                }
            }
            _ => {}
        }
    }
}

/// Run a visitor over a program
pub fn walk_declarations<'a, V: DeclarationVisitor<'a>>(
    visitor: &mut V,
    program: &Program<'a>,
    source: &str,
) {
    visitor.visit_program(program, source);
}

/// Name declared by a `namespace` statement, read from its source text
///
/// Returns `None` for the unnamed `namespace { }` form.
pub fn namespace_name(statement_text: &str) -> Option<&str> {
    let start = statement_text.find("namespace")? + "namespace".len();
    let after_keyword = &statement_text[start..];
    let end = after_keyword
        .find(|c: char| c == '{' || c == ';')
        .unwrap_or(after_keyword.len());
    let name = after_keyword[..end].trim();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
