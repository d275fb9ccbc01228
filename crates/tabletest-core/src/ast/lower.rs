/*!
# Lowering

Conversion from tree-sitter Go nodes into the shapes of [`crate::ast`].
Lowering never fails: node kinds the converter does not inspect become
`Other` values, so callers decide what to do with them.
*/

use tree_sitter::Node;

use super::{Element, Expr, FieldDecl, Ident, LiteralBody, LiteralKind, Span, TypeExpr};

/// How a binding was introduced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// `var x T = v`, at package level or inside a function
    Var,
    /// `x := v`
    ShortVar,
}

/// A variable binding: names, optional explicit type, initial values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub kind: BindingKind,
    pub span: Span,
    pub names: Vec<Ident>,
    pub ty: Option<TypeExpr>,
    pub values: Vec<Expr>,
}

/// A `for ... range` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeLoop {
    pub span: Span,
    pub key: Option<Expr>,
    pub value: Option<Expr>,
    /// `:=` rather than `=`
    pub define: bool,
    pub iterated: Expr,
    pub body: Span,
}

/// Named children of a node, skipping comments
pub(crate) fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

pub(crate) fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

pub(crate) fn has_token(node: Node<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| child.kind() == token);
    found
}

fn ident(node: Node<'_>, source: &str) -> Ident {
    let span = Span::of(node);
    Ident {
        name: span.text(source).to_string(),
        span,
    }
}

/// All nodes of the given kinds below `root` (inclusive), in document order
pub fn find_nodes<'t>(root: Node<'t>, kinds: &[&str]) -> Vec<Node<'t>> {
    let mut found = Vec::new();
    let mut cursor = root.walk();

    'walk: loop {
        let node = cursor.node();
        if kinds.contains(&node.kind()) {
            found.push(node);
        }

        if cursor.goto_first_child() {
            continue;
        }

        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }

    found
}

/// Lower a type node
pub fn lower_type(node: Node<'_>, source: &str) -> TypeExpr {
    let span = Span::of(node);
    match node.kind() {
        "slice_type" => match node.child_by_field_name("element") {
            Some(element) => TypeExpr::Slice {
                span,
                element: Box::new(lower_type(element, source)),
            },
            None => other_type(node),
        },
        "array_type" | "implicit_length_array_type" => match node.child_by_field_name("element") {
            Some(element) => TypeExpr::Array {
                span,
                element: Box::new(lower_type(element, source)),
            },
            None => other_type(node),
        },
        "struct_type" => {
            let fields = named_children(node)
                .into_iter()
                .find(|child| child.kind() == "field_declaration_list")
                .map(|list| lower_fields(list, source))
                .unwrap_or_default();
            TypeExpr::Struct { span, fields }
        }
        "map_type" => match (node.child_by_field_name("key"), node.child_by_field_name("value")) {
            (Some(key), Some(value)) => TypeExpr::Map {
                span,
                key: Box::new(lower_type(key, source)),
                value: Box::new(lower_type(value, source)),
            },
            _ => other_type(node),
        },
        "type_identifier" | "qualified_type" | "generic_type" => TypeExpr::Named {
            span,
            text: span.text(source).to_string(),
        },
        "parenthesized_type" => match named_children(node).first() {
            Some(inner) => lower_type(*inner, source),
            None => other_type(node),
        },
        _ => other_type(node),
    }
}

fn other_type(node: Node<'_>) -> TypeExpr {
    TypeExpr::Other {
        span: Span::of(node),
        kind: node.kind().to_string(),
    }
}

fn lower_fields(list: Node<'_>, source: &str) -> Vec<FieldDecl> {
    named_children(list)
        .into_iter()
        .filter(|child| child.kind() == "field_declaration")
        .map(|decl| {
            let names = field_children(decl, "name")
                .into_iter()
                .map(|name| ident(name, source))
                .collect();
            let ty = decl
                .child_by_field_name("type")
                .map(|ty| Span::of(ty).text(source).to_string())
                .unwrap_or_default();
            FieldDecl {
                span: Span::of(decl),
                names,
                ty,
            }
        })
        .collect()
}

/// Lower an expression node
pub fn lower_expr(node: Node<'_>, source: &str) -> Expr {
    let span = Span::of(node);

    if let Some(kind) = LiteralKind::from_node_kind(node.kind()) {
        return Expr::Literal {
            span,
            kind,
            text: span.text(source).to_string(),
        };
    }

    match node.kind() {
        "identifier" | "field_identifier" => Expr::Ident(ident(node, source)),
        "selector_expression" => {
            match (node.child_by_field_name("operand"), node.child_by_field_name("field")) {
                (Some(operand), Some(field)) => Expr::Selector {
                    span,
                    operand: Box::new(lower_expr(operand, source)),
                    field: ident(field, source),
                },
                _ => other_expr(node),
            }
        }
        "call_expression" => {
            let Some(function) = node.child_by_field_name("function") else {
                return other_expr(node);
            };
            let args = node
                .child_by_field_name("arguments")
                .map(|list| {
                    named_children(list)
                        .into_iter()
                        .map(|arg| lower_expr(arg, source))
                        .collect()
                })
                .unwrap_or_default();
            Expr::Call {
                span,
                function: Box::new(lower_expr(function, source)),
                args,
            }
        }
        "composite_literal" => match node.child_by_field_name("body") {
            Some(body) => Expr::Composite {
                span,
                ty: node
                    .child_by_field_name("type")
                    .map(|ty| lower_type(ty, source)),
                body: lower_body(body, source),
            },
            None => other_expr(node),
        },
        "literal_value" => Expr::Composite {
            span,
            ty: None,
            body: lower_body(node, source),
        },
        // Grammar wrapper around a single element value
        "literal_element" => match named_children(node).first() {
            Some(inner) => lower_expr(*inner, source),
            None => other_expr(node),
        },
        _ => other_expr(node),
    }
}

fn other_expr(node: Node<'_>) -> Expr {
    Expr::Other {
        span: Span::of(node),
        kind: node.kind().to_string(),
    }
}

fn lower_body(node: Node<'_>, source: &str) -> LiteralBody {
    let elements = named_children(node)
        .into_iter()
        .map(|child| {
            let span = Span::of(child);
            if child.kind() == "keyed_element" {
                let parts = named_children(child);
                if let [key, .., value] = parts.as_slice() {
                    return Element::Keyed {
                        span,
                        key: lower_expr(*key, source),
                        value: lower_expr(*value, source),
                    };
                }
            }
            Element::Positional {
                span,
                value: lower_expr(child, source),
            }
        })
        .collect();

    LiteralBody {
        span: Span::of(node),
        elements,
    }
}

/// Lower a `var_spec` or `short_var_declaration` node
pub fn lower_binding(node: Node<'_>, source: &str) -> Option<Binding> {
    match node.kind() {
        "var_spec" => {
            let names = field_children(node, "name")
                .into_iter()
                .map(|name| ident(name, source))
                .collect();
            let ty = node
                .child_by_field_name("type")
                .map(|ty| lower_type(ty, source));
            let values = node
                .child_by_field_name("value")
                .map(|list| expression_list(list, source))
                .unwrap_or_default();
            Some(Binding {
                kind: BindingKind::Var,
                span: Span::of(node),
                names,
                ty,
                values,
            })
        }
        "short_var_declaration" => {
            let left = node.child_by_field_name("left")?;
            let right = node.child_by_field_name("right")?;
            let names = expression_list(left, source)
                .into_iter()
                .map(|expr| match expr {
                    Expr::Ident(ident) => Some(ident),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()?;
            Some(Binding {
                kind: BindingKind::ShortVar,
                span: Span::of(node),
                names,
                ty: None,
                values: expression_list(right, source),
            })
        }
        _ => None,
    }
}

fn expression_list(node: Node<'_>, source: &str) -> Vec<Expr> {
    if node.kind() == "expression_list" {
        named_children(node)
            .into_iter()
            .map(|expr| lower_expr(expr, source))
            .collect()
    } else {
        vec![lower_expr(node, source)]
    }
}

/// Lower a `for_statement` whose header is a range clause
pub fn lower_range_loop(node: Node<'_>, source: &str) -> Option<RangeLoop> {
    if node.kind() != "for_statement" {
        return None;
    }

    let clause = named_children(node)
        .into_iter()
        .find(|child| child.kind() == "range_clause")?;
    let body = node.child_by_field_name("body")?;
    let iterated = lower_expr(clause.child_by_field_name("right")?, source);

    let mut bindings = clause
        .child_by_field_name("left")
        .map(|left| expression_list(left, source))
        .unwrap_or_default()
        .into_iter();

    Some(RangeLoop {
        span: Span::of(node),
        key: bindings.next(),
        value: bindings.next(),
        define: has_token(clause, ":="),
        iterated,
        body: Span::of(body),
    })
}
