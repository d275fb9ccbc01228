/*!
# Go Syntax Shapes

The converter only looks into a handful of Go constructs: slice, array, map
and struct types, composite literals, selectors, calls and range loops.
Those are lowered from the tree-sitter concrete syntax tree into the closed
enums below so every decision is an exhaustive `match`. Everything else is
kept as an opaque `Other` node carrying its span.

Spans always point into the original source text; edits are expressed
against them and applied by the printer.
*/

use serde::Serialize;

pub mod lower;
pub mod scope;


pub use lower::{
    find_nodes, lower_binding, lower_expr, lower_range_loop, lower_type, Binding, BindingKind,
    RangeLoop,
};
pub use scope::{Declaration, ScopeIndex};

/// Half-open byte range `[start, end)` into the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {start} after end {end}");
        Self { start, end }
    }

    pub fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn of(node: tree_sitter::Node<'_>) -> Self {
        let range = node.byte_range();
        Self::new(range.start, range.end)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.start..self.end]
    }

    /// 1-based line number of the span start
    pub fn line(&self, source: &str) -> usize {
        source[..self.start].matches('\n').count() + 1
    }
}

/// An identifier occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn is_blank(&self) -> bool {
        self.name == "_"
    }
}

/// Kinds of Go basic literals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LiteralKind {
    String,
    RawString,
    Int,
    Float,
    Imaginary,
    Rune,
}

impl LiteralKind {
    pub fn from_node_kind(kind: &str) -> Option<Self> {
        match kind {
            "interpreted_string_literal" => Some(LiteralKind::String),
            "raw_string_literal" => Some(LiteralKind::RawString),
            "int_literal" => Some(LiteralKind::Int),
            "float_literal" => Some(LiteralKind::Float),
            "imaginary_literal" => Some(LiteralKind::Imaginary),
            "rune_literal" => Some(LiteralKind::Rune),
            _ => None,
        }
    }
}

/// Type expressions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// `[]T`
    Slice { span: Span, element: Box<TypeExpr> },
    /// `[N]T` or `[...]T`
    Array { span: Span, element: Box<TypeExpr> },
    /// `struct { ... }`
    Struct { span: Span, fields: Vec<FieldDecl> },
    /// `map[K]V`
    Map {
        span: Span,
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    /// A named, qualified or generic type reference
    Named { span: Span, text: String },
    Other { span: Span, kind: String },
}

impl TypeExpr {
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Slice { span, .. }
            | TypeExpr::Array { span, .. }
            | TypeExpr::Struct { span, .. }
            | TypeExpr::Map { span, .. }
            | TypeExpr::Named { span, .. }
            | TypeExpr::Other { span, .. } => *span,
        }
    }

    /// Short human-readable shape, used by the analysis report
    pub fn describe(&self) -> String {
        match self {
            TypeExpr::Slice { element, .. } => format!("[]{}", element.describe()),
            TypeExpr::Array { element, .. } => format!("[N]{}", element.describe()),
            TypeExpr::Struct { fields, .. } => {
                let names: Vec<String> = record_fields(fields)
                    .into_iter()
                    .map(|field| field.name.unwrap_or(field.ty))
                    .collect();
                format!("struct{{{}}}", names.join(", "))
            }
            TypeExpr::Map { key, value, .. } => {
                format!("map[{}]{}", key.describe(), value.describe())
            }
            TypeExpr::Named { text, .. } => text.clone(),
            TypeExpr::Other { kind, .. } => format!("<{kind}>"),
        }
    }
}

/// One field declaration line of a struct type.
///
/// `a, b int` is a single declaration with two names; an embedded field has
/// no names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub span: Span,
    pub names: Vec<Ident>,
    pub ty: String,
}

/// A struct field after flattening multi-name declarations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordField {
    pub name: Option<String>,
    pub ty: String,
    /// Index of the owning declaration
    pub decl: usize,
    /// Index of the name within the owning declaration
    pub slot: usize,
}

/// Flatten field declarations into positional fields
pub fn record_fields(fields: &[FieldDecl]) -> Vec<RecordField> {
    let mut flattened = Vec::new();
    for (decl, field) in fields.iter().enumerate() {
        if field.names.is_empty() {
            flattened.push(RecordField {
                name: None,
                ty: field.ty.clone(),
                decl,
                slot: 0,
            });
            continue;
        }
        for (slot, name) in field.names.iter().enumerate() {
            flattened.push(RecordField {
                name: Some(name.name.clone()),
                ty: field.ty.clone(),
                decl,
                slot,
            });
        }
    }
    flattened
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal {
        span: Span,
        kind: LiteralKind,
        text: String,
    },
    Ident(Ident),
    /// `operand.field`
    Selector {
        span: Span,
        operand: Box<Expr>,
        field: Ident,
    },
    Call {
        span: Span,
        function: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `T{...}`, or an untyped `{...}` body inside another literal
    Composite {
        span: Span,
        ty: Option<TypeExpr>,
        body: LiteralBody,
    },
    Other { span: Span, kind: String },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal { span, .. }
            | Expr::Selector { span, .. }
            | Expr::Call { span, .. }
            | Expr::Composite { span, .. }
            | Expr::Other { span, .. } => *span,
            Expr::Ident(ident) => ident.span,
        }
    }

    pub fn as_ident(&self) -> Option<&Ident> {
        match self {
            Expr::Ident(ident) => Some(ident),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Literal { .. })
    }

    /// Short human-readable shape, used by the analysis report
    pub fn describe(&self) -> String {
        match self {
            Expr::Literal { text, .. } => format!("literal {text}"),
            Expr::Ident(ident) => format!("identifier {}", ident.name),
            Expr::Selector { operand, field, .. } => match operand.as_ref() {
                Expr::Ident(ident) => format!("selector {}.{}", ident.name, field.name),
                _ => format!("selector <expr>.{}", field.name),
            },
            Expr::Call { .. } => "call".to_string(),
            Expr::Composite { body, .. } => format!("composite literal with {} elements", body.elements.len()),
            Expr::Other { kind, .. } => kind.clone(),
        }
    }
}

/// The `{...}` body of a composite literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralBody {
    pub span: Span,
    pub elements: Vec<Element>,
}

impl LiteralBody {
    pub fn is_keyed(&self) -> bool {
        self.elements
            .iter()
            .any(|element| matches!(element, Element::Keyed { .. }))
    }

    pub fn element_spans(&self) -> Vec<Span> {
        self.elements.iter().map(Element::span).collect()
    }
}

/// An element of a literal body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Positional { span: Span, value: Expr },
    Keyed { span: Span, key: Expr, value: Expr },
}

impl Element {
    pub fn span(&self) -> Span {
        match self {
            Element::Positional { span, .. } | Element::Keyed { span, .. } => *span,
        }
    }

    pub fn value(&self) -> &Expr {
        match self {
            Element::Positional { value, .. } | Element::Keyed { value, .. } => value,
        }
    }
}
