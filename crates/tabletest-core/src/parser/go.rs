use std::path::Path;

use tree_sitter::Node;

use super::{Parser, SourceFile};
use crate::printer::EditSet;
use crate::{ConvertError, Result};

/// Go parser backed by tree-sitter-go
pub struct GoParser {
    parser: tree_sitter::Parser,
}

impl GoParser {
    pub fn new() -> Result<Self> {
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&tree_sitter_go::LANGUAGE.into())?;

        Ok(Self { parser })
    }
}

impl Parser for GoParser {
    fn parse(&mut self, path: &Path, source: String) -> Result<SourceFile> {
        let tree = self
            .parser
            .parse(&source, None)
            .ok_or_else(|| ConvertError::Parse {
                path: path.to_path_buf(),
                message: "parser produced no tree".to_string(),
            })?;

        if let Some(error) = first_error(tree.root_node()) {
            let position = error.start_position();
            let message = if error.is_missing() {
                format!(
                    "missing {} at line {}, column {}",
                    error.kind(),
                    position.row + 1,
                    position.column + 1
                )
            } else {
                format!(
                    "syntax error at line {}, column {}",
                    position.row + 1,
                    position.column + 1
                )
            };
            return Err(ConvertError::Parse {
                path: path.to_path_buf(),
                message,
            });
        }

        Ok(SourceFile {
            path: path.to_path_buf(),
            source,
            tree,
            edits: EditSet::new(),
        })
    }

    fn name(&self) -> &'static str {
        "go"
    }
}

/// Leftmost error or missing node of a tree
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }

    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error).or(Some(node))
}
