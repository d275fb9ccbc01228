/*!
# Reference Rewriter

Updates the consumers of converted tables. A range loop qualifies when the
iterated expression resolves, through the scope index, to the declaration of
a table converted in the same file; a shadowing local with the same name
does not. A table is only converted when every such loop can bind the key
identifier, so no read of the removed field survives. Inside a qualifying loop the row variable (and any `v := row`
copies) is tracked by declaration, and every read of the removed name field
is replaced by the loop key.
*/

use serde::Serialize;
use tracing::debug;
use tree_sitter::Node;

use crate::ast::lower::named_children;
use crate::ast::{
    find_nodes, lower_binding, lower_expr, lower_range_loop, Expr, Ident, ScopeIndex, Span,
};
use crate::printer::EditSet;
use crate::ConverterConfig;

use super::detector::{Rejection, TableDeclaration};
use super::transformer::ConvertedTable;

/// Counts of rewritten consumer sites
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RewriteStats {
    /// Range loops whose blank key was bound to the key identifier
    pub loops: usize,
    /// `t.Run` first arguments replaced
    pub run_calls: usize,
    /// Other reads of the removed field replaced
    pub field_reads: usize,
}

impl RewriteStats {
    pub fn total(&self) -> usize {
        self.loops + self.run_calls + self.field_reads
    }

    pub fn merge(&mut self, other: &RewriteStats) {
        self.loops += other.loops;
        self.run_calls += other.run_calls;
        self.field_reads += other.field_reads;
    }
}

/// State shared by the rewrite of one loop body
struct LoopContext<'a> {
    source: &'a str,
    index: &'a ScopeIndex,
    config: &'a ConverterConfig,
    table: &'a ConvertedTable,
    key: String,
    /// Declarations of the row variable and its copies
    rows: Vec<Span>,
}

impl LoopContext<'_> {
    fn is_row(&self, expr: &Expr) -> bool {
        let Some(ident) = expr.as_ident() else {
            return false;
        };
        self.index
            .resolve(&ident.name, ident.span.start)
            .is_some_and(|decl| self.rows.contains(&decl.span))
    }

    /// `v.<removed field>` with `v` a row variable
    fn is_name_read(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Selector { operand, field, .. } => {
                field.name == self.table.removed_field && self.is_row(operand)
            }
            _ => false,
        }
    }

    fn track_copies(&mut self, body: Node<'_>) {
        for node in find_nodes(body, &["short_var_declaration"]) {
            let Some(binding) = lower_binding(node, self.source) else {
                continue;
            };
            if let ([name], [value]) = (binding.names.as_slice(), binding.values.as_slice()) {
                if !name.is_blank() && self.is_row(value) {
                    self.rows.push(name.span);
                }
            }
        }
    }
}

/// A `for k, v := range X` loop whose `X` resolves to a declaration
struct Consumer<'tree> {
    body: Node<'tree>,
    line: usize,
    /// Declaring identifier of the iterated variable
    declaration: Span,
    key: Ident,
    value: Ident,
}

impl Consumer<'_> {
    /// A blank key cannot be bound when the identifier is taken inside the loop
    fn key_in_use(&self, config: &ConverterConfig, source: &str) -> bool {
        self.key.is_blank()
            && (self.value.name == config.key_ident
                || mentions(self.body, &config.key_ident, source))
    }
}

// `for range`, `for k := range` and `=` assignments are not consumers
fn consumers<'tree>(source: &str, root: Node<'tree>, index: &ScopeIndex) -> Vec<Consumer<'tree>> {
    let mut found = Vec::new();
    for node in find_nodes(root, &["for_statement"]) {
        let Some(range) = lower_range_loop(node, source) else {
            continue;
        };
        let Some(iterated) = range.iterated.as_ident() else {
            continue;
        };
        let Some(declaration) = index.resolve(&iterated.name, iterated.span.start) else {
            continue;
        };
        let Some(body) = node.child_by_field_name("body") else {
            continue;
        };
        let (Some(key), Some(value)) = (
            range.key.as_ref().and_then(Expr::as_ident),
            range.value.as_ref().and_then(Expr::as_ident),
        ) else {
            continue;
        };
        if !range.define || value.is_blank() {
            continue;
        }

        found.push(Consumer {
            body,
            line: range.span.line(source),
            declaration: declaration.span,
            key: key.clone(),
            value: value.clone(),
        });
    }
    found
}

/// Check that every loop over `table` can be rewritten
pub fn check_consumers(
    source: &str,
    root: Node<'_>,
    index: &ScopeIndex,
    table: &TableDeclaration,
    config: &ConverterConfig,
) -> Result<(), Rejection> {
    let conflict = consumers(source, root, index).into_iter().find(|consumer| {
        consumer.declaration == table.variable.span && consumer.key_in_use(config, source)
    });
    match conflict {
        Some(consumer) => Err(Rejection::KeyInUse {
            ident: config.key_ident.clone(),
            line: consumer.line,
        }),
        None => Ok(()),
    }
}

/// Rewrite every consumer of `tables` below `root`
///
/// Tables must have passed [`check_consumers`].
pub fn rewrite_references(
    source: &str,
    root: Node<'_>,
    index: &ScopeIndex,
    tables: &[ConvertedTable],
    config: &ConverterConfig,
    edits: &mut EditSet,
) -> RewriteStats {
    let mut stats = RewriteStats::default();
    if tables.is_empty() {
        return stats;
    }

    for consumer in consumers(source, root, index) {
        let Some(table) = tables
            .iter()
            .find(|table| table.declaration == consumer.declaration)
        else {
            continue;
        };

        let key = if consumer.key.is_blank() {
            edits.replace(consumer.key.span, config.key_ident.clone());
            stats.loops += 1;
            config.key_ident.clone()
        } else {
            consumer.key.name.clone()
        };

        let mut context = LoopContext {
            source,
            index,
            config,
            table,
            key,
            rows: vec![consumer.value.span],
        };
        context.track_copies(consumer.body);

        let loop_stats = rewrite_body(&context, consumer.body, edits);
        debug!(
            "Loop over {} at line {}: {} run calls, {} field reads",
            table.variable, consumer.line, loop_stats.run_calls, loop_stats.field_reads
        );
        stats.merge(&loop_stats);
    }

    stats
}

fn rewrite_body(context: &LoopContext<'_>, body: Node<'_>, edits: &mut EditSet) -> RewriteStats {
    let mut stats = RewriteStats::default();
    let mut done = Vec::new();

    for node in find_nodes(body, &["call_expression"]) {
        let Expr::Call { function, args, .. } = lower_expr(node, context.source) else {
            continue;
        };
        if !is_run_call(&function, &args, context) {
            continue;
        }
        let argument = args[0].span();
        edits.replace(argument, context.key.clone());
        done.push(argument);
        stats.run_calls += 1;
    }

    for node in find_nodes(body, &["selector_expression"]) {
        let read = lower_expr(node, context.source);
        if done.contains(&read.span()) || !context.is_name_read(&read) {
            continue;
        }
        edits.replace(read.span(), context.key.clone());
        stats.field_reads += 1;
    }

    stats
}

/// `t.Run(v.name, fn)`
fn is_run_call(function: &Expr, args: &[Expr], context: &LoopContext<'_>) -> bool {
    let Expr::Selector { operand, field, .. } = function else {
        return false;
    };
    let Some(receiver) = operand.as_ident() else {
        return false;
    };
    context.config.is_run_receiver(&receiver.name)
        && field.name == context.config.run_method
        && args.len() == 2
        && context.is_name_read(&args[0])
}

/// An identifier named `name` occurs in `body`, other than as a struct literal key
fn mentions(body: Node<'_>, name: &str, source: &str) -> bool {
    find_nodes(body, &["identifier"]).into_iter().any(|ident| {
        Span::of(ident).text(source) == name && !is_literal_key(ident)
    })
}

fn is_literal_key(ident: Node<'_>) -> bool {
    let Some(element) = ident.parent().filter(|p| p.kind() == "literal_element") else {
        return false;
    };
    element
        .parent()
        .filter(|keyed| keyed.kind() == "keyed_element")
        .and_then(|keyed| named_children(keyed).first().copied())
        .is_some_and(|key| key == element)
}
