/*!
# Shape Analysis

Read-only report of what the converter sees in a file: every binding
initialised with a composite literal and its detection verdict, every range
loop, and every subtest call with the shape of its first argument. Used to
find out why a table was or was not converted. Nothing is written.
*/

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::ast::{find_nodes, lower_binding, lower_expr, lower_range_loop, Expr, ScopeIndex};
use crate::parser::Parser;
use crate::{ConverterConfig, Result};

use super::detector::{detect, Detection};
use super::rewriter::check_consumers;
use super::orchestrator::FileError;

/// A binding with a composite literal value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingReport {
    pub variable: String,
    pub line: usize,
    pub declared_type: Option<String>,
    pub rows: usize,
    pub eligible: bool,
    pub verdict: String,
}

/// A `for ... range` statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopReport {
    pub line: usize,
    pub iterated: String,
    pub key: Option<String>,
    pub value: Option<String>,
}

/// A subtest runner call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunCallReport {
    pub line: usize,
    pub first_argument: Option<String>,
}

/// Everything found in one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileAnalysis {
    pub path: PathBuf,
    pub bindings: Vec<BindingReport>,
    pub loops: Vec<LoopReport>,
    pub run_calls: Vec<RunCallReport>,
}

impl FileAnalysis {
    pub fn eligible_tables(&self) -> usize {
        self.bindings.iter().filter(|binding| binding.eligible).count()
    }
}

impl fmt::Display for FileAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "===== Analyzing {} =====", self.path.display())?;

        writeln!(f, "Bindings:")?;
        if self.bindings.is_empty() {
            writeln!(f, "  none")?;
        }
        for binding in &self.bindings {
            write!(f, "- {} (line {})", binding.variable, binding.line)?;
            if let Some(ty) = &binding.declared_type {
                write!(f, ": {ty}")?;
            }
            write!(f, ", {} rows", binding.rows)?;
            writeln!(f, " -> {}", binding.verdict)?;
        }

        writeln!(f, "Loop statements:")?;
        if self.loops.is_empty() {
            writeln!(f, "  none")?;
        }
        for report in &self.loops {
            writeln!(
                f,
                "- line {}: ranging over {}, key {}, value {}",
                report.line,
                report.iterated,
                report.key.as_deref().unwrap_or("-"),
                report.value.as_deref().unwrap_or("-"),
            )?;
        }

        writeln!(f, "Run calls:")?;
        if self.run_calls.is_empty() {
            writeln!(f, "  none")?;
        }
        for call in &self.run_calls {
            writeln!(
                f,
                "- line {}: first argument {}",
                call.line,
                call.first_argument.as_deref().unwrap_or("-"),
            )?;
        }

        Ok(())
    }
}

/// Analyses of a batch, in enumeration order
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisReport {
    pub files: Vec<FileAnalysis>,
    pub errors: Vec<FileError>,
}

/// Analyse one source text
pub fn analyze_source(
    parser: &mut dyn Parser,
    path: &Path,
    source: String,
    config: &ConverterConfig,
) -> Result<FileAnalysis> {
    let file = parser.parse(path, source)?;
    let root = file.root();
    let source = file.source.as_str();

    let mut bindings = Vec::new();
    let mut index = None;
    for node in find_nodes(root, &["var_spec", "short_var_declaration"]) {
        let Some(binding) = lower_binding(node, source) else {
            continue;
        };
        let Some(Expr::Composite { ty, body, .. }) = binding.values.first() else {
            continue;
        };

        let declared_type = binding.ty.as_ref().or(ty.as_ref()).map(|ty| ty.describe());
        let variable = binding
            .names
            .iter()
            .map(|name| name.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let detection = match detect(&binding, config) {
            Detection::Eligible(table) => {
                let scope = index.get_or_insert_with(|| ScopeIndex::build(root, source));
                match check_consumers(source, root, scope, &table, config) {
                    Ok(()) => Detection::Eligible(table),
                    Err(rejection) => Detection::NotApplicable(rejection),
                }
            }
            rejected => rejected,
        };
        let (eligible, verdict) = match detection {
            Detection::Eligible(table) => (
                true,
                format!("convertible, keyed by {}", table.name_field.name),
            ),
            Detection::NotApplicable(rejection) => (false, rejection.to_string()),
        };

        bindings.push(BindingReport {
            variable,
            line: binding.span.line(source),
            declared_type,
            rows: body.elements.len(),
            eligible,
            verdict,
        });
    }

    let loops = find_nodes(root, &["for_statement"])
        .into_iter()
        .filter_map(|node| lower_range_loop(node, source))
        .map(|range| LoopReport {
            line: range.span.line(source),
            iterated: range.iterated.describe(),
            key: range.key.as_ref().map(|key| key.span().text(source).to_string()),
            value: range.value.as_ref().map(|value| value.span().text(source).to_string()),
        })
        .collect();

    let run_calls = find_nodes(root, &["call_expression"])
        .into_iter()
        .filter_map(|node| match lower_expr(node, source) {
            Expr::Call { span, function, args } => {
                let Expr::Selector { operand, field, .. } = function.as_ref() else {
                    return None;
                };
                let receiver = operand.as_ident()?;
                if !config.is_run_receiver(&receiver.name) || field.name != config.run_method {
                    return None;
                }
                Some(RunCallReport {
                    line: span.line(source),
                    first_argument: args.first().map(Expr::describe),
                })
            }
            _ => None,
        })
        .collect();

    Ok(FileAnalysis {
        path: path.to_path_buf(),
        bindings,
        loops,
        run_calls,
    })
}
