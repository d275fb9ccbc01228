/*!
# Structural Transformer

Records the edits that turn an eligible table into a map keyed by its name
field: the slice prefix becomes `map[K]`, the name field leaves every struct
type, and each row loses its name value and gains it back as a map key.
*/

use tracing::debug;

use crate::ast::{record_fields, Span};
use crate::printer::{removal_span, EditSet};

use super::detector::{RecordShape, TableDeclaration};

/// A table whose declaration has been rewritten, as seen by the rewriter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedTable {
    pub variable: String,
    /// Span of the declaring identifier, used to match references
    pub declaration: Span,
    pub removed_field: String,
    pub key_type: String,
    pub rows: usize,
}

/// Record the edits converting `table` into keyed form
pub fn transform(table: &TableDeclaration, edits: &mut EditSet, source: &str) -> ConvertedTable {
    let key_type = &table.name_field.ty;

    for shape in &table.shapes {
        if let Some(prefix) = shape.prefix {
            edits.replace(prefix, format!("map[{key_type}]"));
        }
        if let Some(span) = field_removal(shape, &table.name_field.name, source) {
            edits.delete(span);
        }
    }

    for row in &table.rows {
        edits.delete(removal_span(source, &row.elements, row.key_element));
        edits.insert(row.span.start, format!("{}: ", row.key));
    }

    debug!(
        "Converted table {} ({} rows) keyed by {}",
        table.variable.name,
        table.rows.len(),
        table.name_field.name
    );

    ConvertedTable {
        variable: table.variable.name.clone(),
        declaration: table.variable.span,
        removed_field: table.name_field.name.clone(),
        key_type: key_type.clone(),
        rows: table.rows.len(),
    }
}

/// Span removing `name` from a struct type: the whole declaration, or just
/// the one name when the declaration lists several
fn field_removal(shape: &RecordShape, name: &str, source: &str) -> Option<Span> {
    let field = record_fields(&shape.fields)
        .into_iter()
        .find(|field| field.name.as_deref() == Some(name))?;
    let decl = &shape.fields[field.decl];

    if decl.names.len() == 1 {
        let spans: Vec<Span> = shape.fields.iter().map(|field| field.span).collect();
        Some(removal_span(source, &spans, field.decl))
    } else {
        let spans: Vec<Span> = decl.names.iter().map(|name| name.span).collect();
        Some(removal_span(source, &spans, field.slot))
    }
}
