/*!
# Lexical Scope Index

Resolves an identifier use to the declaration it refers to, so rewrites are
keyed by variable identity instead of by name. This is a syntactic
approximation of Go's scoping rules: package-level names are visible
everywhere in the file, local names from the end of their declaring
statement to the end of the innermost enclosing block-like node.
*/

use std::collections::HashMap;

use tree_sitter::Node;

use super::lower::{field_children, find_nodes, has_token, lower_binding, named_children};
use super::Span;

/// Node kinds that open a Go scope
const SCOPE_KINDS: &[&str] = &[
    "source_file",
    "function_declaration",
    "method_declaration",
    "func_literal",
    "block",
    "for_statement",
    "if_statement",
    "expression_switch_statement",
    "type_switch_statement",
    "select_statement",
    "expression_case",
    "type_case",
    "default_case",
    "communication_case",
];

const DECLARING_KINDS: &[&str] = &[
    "var_spec",
    "const_spec",
    "short_var_declaration",
    "range_clause",
    "parameter_declaration",
    "variadic_parameter_declaration",
    "function_declaration",
];

/// A declared name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    /// Span of the declaring identifier; doubles as the declaration identity
    pub span: Span,
    /// Span of the declaring statement or clause
    pub origin: Span,
    /// Region in which the name is visible
    pub scope: Span,
    pub package_level: bool,
}

impl Declaration {
    fn visible_at(&self, offset: usize) -> bool {
        self.scope.contains_offset(offset) && (self.package_level || offset >= self.origin.end)
    }
}

/// Declarations of a file, grouped by name
#[derive(Debug, Default)]
pub struct ScopeIndex {
    by_name: HashMap<String, Vec<Declaration>>,
}

impl ScopeIndex {
    pub fn build(root: Node<'_>, source: &str) -> Self {
        let mut index = Self::default();

        for node in find_nodes(root, DECLARING_KINDS) {
            let Some(scope_node) = enclosing_scope(node) else {
                continue;
            };
            let scope = Span::of(scope_node);
            let package_level = scope_node.kind() == "source_file";
            let origin = Span::of(node);

            for name in declared_names(node, source) {
                index.by_name.entry(name.0.clone()).or_default().push(Declaration {
                    name: name.0,
                    span: name.1,
                    origin,
                    scope,
                    package_level,
                });
            }
        }

        index
    }

    /// The declaration `name` refers to when used at `offset`
    pub fn resolve(&self, name: &str, offset: usize) -> Option<&Declaration> {
        self.by_name
            .get(name)?
            .iter()
            .filter(|decl| decl.visible_at(offset))
            .min_by_key(|decl| (decl.scope.len(), std::cmp::Reverse(decl.origin.start)))
    }
}

fn enclosing_scope<'t>(node: Node<'t>) -> Option<Node<'t>> {
    // Start above the node: a function's name belongs to the scope around it
    let mut current = node.parent()?;
    loop {
        if SCOPE_KINDS.contains(&current.kind()) {
            return Some(current);
        }
        current = current.parent()?;
    }
}

fn identifiers(nodes: Vec<Node<'_>>, source: &str) -> Vec<(String, Span)> {
    nodes
        .into_iter()
        .filter(|name| name.kind() == "identifier")
        .map(|name| {
            let span = Span::of(name);
            (span.text(source).to_string(), span)
        })
        .collect()
}

fn declared_names(node: Node<'_>, source: &str) -> Vec<(String, Span)> {
    let names = match node.kind() {
        "var_spec"
        | "const_spec"
        | "parameter_declaration"
        | "variadic_parameter_declaration"
        | "function_declaration" => identifiers(field_children(node, "name"), source),
        "short_var_declaration" => lower_binding(node, source)
            .map(|binding| {
                binding
                    .names
                    .into_iter()
                    .map(|name| (name.name, name.span))
                    .collect()
            })
            .unwrap_or_default(),
        "range_clause" if has_token(node, ":=") => match node.child_by_field_name("left") {
            Some(left) => identifiers(named_children(left), source),
            None => Vec::new(),
        },
        _ => Vec::new(),
    };

    names.into_iter().filter(|(name, _)| name != "_").collect()
}
