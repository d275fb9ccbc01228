/*!
# Record-Shape Detector

Decides whether a binding is a slice of anonymous structs that can be keyed
by one of its fields. Detection is pure: it reads the lowered binding and
returns a [`Detection`] value; a table that does not qualify is a
[`Rejection`], never an error.
*/

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::ast::{
    record_fields, Binding, Element, Expr, FieldDecl, Ident, LiteralKind, Span, TypeExpr,
};
use crate::ConverterConfig;

/// Why a binding is not a convertible table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    /// More than one name or value in the binding
    MultipleBindings,
    /// Not initialised with a composite literal
    NoLiteralValue,
    NotSliceOfStruct,
    /// `[N]T` or `[...]T`
    SizedSequence,
    /// Slice of a named type rather than an inline struct
    NamedElementType,
    /// The explicit and literal types disagree
    MismatchedTypes,
    NoNameField,
    UnsupportedRow { row: usize },
    MissingKey { row: usize },
    ComputedKey { row: usize },
    DuplicateKey { key: String },
    /// A loop over the table cannot bind the key identifier
    KeyInUse { ident: String, line: usize },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MultipleBindings => write!(f, "binding declares more than one variable"),
            Rejection::NoLiteralValue => write!(f, "not initialised with a composite literal"),
            Rejection::NotSliceOfStruct => write!(f, "not a slice of structs"),
            Rejection::SizedSequence => write!(f, "fixed-length array"),
            Rejection::NamedElementType => write!(f, "element type is a named type"),
            Rejection::MismatchedTypes => write!(f, "declared and literal types differ"),
            Rejection::NoNameField => write!(f, "no name field"),
            Rejection::UnsupportedRow { row } => write!(f, "row {row} is not a struct literal"),
            Rejection::MissingKey { row } => write!(f, "row {row} has no name value"),
            Rejection::ComputedKey { row } => write!(f, "row {row} has a computed name"),
            Rejection::DuplicateKey { key } => write!(f, "duplicate name {key}"),
            Rejection::KeyInUse { ident, line } => {
                write!(f, "loop at line {line} already uses {ident}")
            }
        }
    }
}

/// Result of inspecting one binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    Eligible(TableDeclaration),
    NotApplicable(Rejection),
}

impl Detection {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Detection::Eligible(_))
    }
}

/// One occurrence of the row struct type in the declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordShape {
    /// Text between the start of the slice type and the struct (`[]`);
    /// absent for a struct type written on a row
    pub prefix: Option<Span>,
    pub fields: Vec<FieldDecl>,
}

/// The field rows are keyed by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameField {
    /// Position among the flattened struct fields
    pub index: usize,
    pub name: String,
    /// Declared type text, used as the map key type
    pub ty: String,
}

/// One row of the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Span of the row literal, including any explicit type
    pub span: Span,
    /// Spans of the row's elements in order
    pub elements: Vec<Span>,
    /// Element holding the key
    pub key_element: usize,
    /// Key literal text, verbatim
    pub key: String,
    /// Constant value of the key, equal for equal Go constants
    pub value: KeyValue,
}

/// Constant value of a key literal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyValue {
    Str(String),
    Int(u128),
    /// Literal text of keys not normalised further
    Text(String),
}

impl KeyValue {
    /// Evaluate a literal; falls back to its text when it cannot be decoded
    pub fn of(kind: LiteralKind, text: &str) -> Self {
        let value = match kind {
            LiteralKind::String => text
                .strip_prefix('"')
                .and_then(|text| text.strip_suffix('"'))
                .and_then(unescape)
                .map(KeyValue::Str),
            // Carriage returns are discarded from raw strings
            LiteralKind::RawString => text
                .strip_prefix('`')
                .and_then(|text| text.strip_suffix('`'))
                .map(|raw| KeyValue::Str(raw.replace('\r', ""))),
            LiteralKind::Int => int_value(text).map(KeyValue::Int),
            LiteralKind::Rune => text
                .strip_prefix('\'')
                .and_then(|text| text.strip_suffix('\''))
                .and_then(unescape)
                .and_then(|decoded| {
                    let mut chars = decoded.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => Some(KeyValue::Int(u128::from(u32::from(c)))),
                        _ => None,
                    }
                }),
            LiteralKind::Float | LiteralKind::Imaginary => None,
        };
        value.unwrap_or_else(|| KeyValue::Text(text.to_string()))
    }
}

fn int_value(text: &str) -> Option<u128> {
    let digits = text.replace('_', "");
    let lower = digits.to_ascii_lowercase();
    let (radix, body) = if let Some(rest) = lower.strip_prefix("0x") {
        (16, rest)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (2, rest)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (8, rest)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (8, &lower[1..])
    } else {
        (10, lower.as_str())
    };
    u128::from_str_radix(body, radix).ok()
}

/// Decode the escapes of an interpreted string or rune body
fn unescape(body: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let decoded = match chars.next()? {
            'a' => '\u{7}',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'v' => '\u{b}',
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            'x' => hex_char(&mut chars, 2)?,
            'u' => hex_char(&mut chars, 4)?,
            'U' => hex_char(&mut chars, 8)?,
            first @ '0'..='7' => {
                let mut code = first.to_digit(8)?;
                for _ in 0..2 {
                    code = code * 8 + chars.next()?.to_digit(8)?;
                }
                char::from_u32(code)?
            }
            _ => return None,
        };
        out.push(decoded);
    }
    Some(out)
}

fn hex_char(chars: &mut std::str::Chars<'_>, digits: usize) -> Option<char> {
    let mut code = 0u32;
    for _ in 0..digits {
        code = code * 16 + chars.next()?.to_digit(16)?;
    }
    char::from_u32(code)
}

/// A table binding accepted for conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDeclaration {
    pub variable: Ident,
    pub binding: Span,
    pub shapes: Vec<RecordShape>,
    pub name_field: NameField,
    pub rows: Vec<Row>,
}

/// Classify a binding
pub fn detect(binding: &Binding, config: &ConverterConfig) -> Detection {
    match detect_table(binding, config) {
        Ok(table) => Detection::Eligible(table),
        Err(rejection) => Detection::NotApplicable(rejection),
    }
}

fn detect_table(binding: &Binding, config: &ConverterConfig) -> Result<TableDeclaration, Rejection> {
    let ([variable], [value]) = (binding.names.as_slice(), binding.values.as_slice()) else {
        return Err(Rejection::MultipleBindings);
    };

    let Expr::Composite {
        ty: literal_ty,
        body,
        ..
    } = value
    else {
        return Err(Rejection::NoLiteralValue);
    };

    let mut shapes = Vec::new();
    for ty in binding.ty.iter().chain(literal_ty.iter()) {
        shapes.push(slice_shape(ty)?);
    }
    if shapes.is_empty() {
        return Err(Rejection::NotSliceOfStruct);
    }

    let expected = field_names(&shapes[0].fields);
    if shapes.iter().any(|shape| field_names_of(shape) != expected) {
        return Err(Rejection::MismatchedTypes);
    }

    let name_field = record_fields(&shapes[0].fields)
        .into_iter()
        .enumerate()
        .find_map(|(index, field)| {
            let name = field.name.filter(|name| config.is_name_field(name))?;
            Some(NameField {
                index,
                name,
                ty: field.ty,
            })
        })
        .ok_or(Rejection::NoNameField)?;

    let mut rows = Vec::with_capacity(body.elements.len());
    let mut seen = HashSet::new();
    for (index, element) in body.elements.iter().enumerate() {
        let (row, row_shape) = detect_row(index, element, &name_field, expected.len())?;

        if let Some(shape) = row_shape {
            if field_names_of(&shape) != expected {
                return Err(Rejection::MismatchedTypes);
            }
            shapes.push(shape);
        }

        if !seen.insert(row.value.clone()) {
            return Err(Rejection::DuplicateKey { key: row.key });
        }
        rows.push(row);
    }

    Ok(TableDeclaration {
        variable: variable.clone(),
        binding: binding.span,
        shapes,
        name_field,
        rows,
    })
}

fn slice_shape(ty: &TypeExpr) -> Result<RecordShape, Rejection> {
    match ty {
        TypeExpr::Slice { span, element } => match element.as_ref() {
            TypeExpr::Struct {
                span: struct_span,
                fields,
            } => Ok(RecordShape {
                prefix: Some(Span::new(span.start, struct_span.start)),
                fields: fields.clone(),
            }),
            TypeExpr::Named { .. } => Err(Rejection::NamedElementType),
            _ => Err(Rejection::NotSliceOfStruct),
        },
        TypeExpr::Array { .. } => Err(Rejection::SizedSequence),
        _ => Err(Rejection::NotSliceOfStruct),
    }
}

fn field_names(fields: &[FieldDecl]) -> Vec<Option<String>> {
    record_fields(fields).into_iter().map(|field| field.name).collect()
}

fn field_names_of(shape: &RecordShape) -> Vec<Option<String>> {
    field_names(&shape.fields)
}

fn detect_row(
    index: usize,
    element: &Element,
    name_field: &NameField,
    field_count: usize,
) -> Result<(Row, Option<RecordShape>), Rejection> {
    let unsupported = Rejection::UnsupportedRow { row: index };

    let Element::Positional { span, value } = element else {
        return Err(unsupported);
    };
    let Expr::Composite { ty, body, .. } = value else {
        return Err(unsupported);
    };

    let shape = match ty {
        None => None,
        Some(TypeExpr::Struct { fields, .. }) => Some(RecordShape {
            prefix: None,
            fields: fields.clone(),
        }),
        Some(_) => return Err(unsupported),
    };

    if body.elements.is_empty() {
        return Err(Rejection::MissingKey { row: index });
    }

    let key_element = if body.is_keyed() {
        body.elements
            .iter()
            .position(|element| match element {
                Element::Keyed { key, .. } => {
                    key.as_ident().is_some_and(|key| key.name == name_field.name)
                }
                Element::Positional { .. } => false,
            })
            .ok_or(Rejection::MissingKey { row: index })?
    } else {
        if body.elements.len() != field_count {
            return Err(unsupported);
        }
        name_field.index
    };

    let (key, value) = match body.elements[key_element].value() {
        Expr::Literal { kind, text, .. } => (text.clone(), KeyValue::of(*kind, text)),
        _ => return Err(Rejection::ComputedKey { row: index }),
    };

    let row = Row {
        span: *span,
        elements: body.element_spans(),
        key_element,
        key,
        value,
    };
    Ok((row, shape))
}
