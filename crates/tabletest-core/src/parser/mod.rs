// Parser module - turns source text into a tree the converter can edit
use std::path::{Path, PathBuf};

use crate::printer::EditSet;
use crate::{ConvertError, Result};

pub mod go;


pub use go::GoParser;

/// A parsed source file together with the edits recorded against it.
///
/// The tree is never mutated; transformations record span replacements in
/// `edits` and the printer applies them to `source`.
#[derive(Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub source: String,
    pub tree: tree_sitter::Tree,
    pub edits: EditSet,
}

impl SourceFile {
    pub fn root(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    pub fn is_modified(&self) -> bool {
        !self.edits.is_empty()
    }
}

/// Trait for source parsers
pub trait Parser: Send {
    /// Parse source text; a tree with syntax errors is an error
    fn parse(&mut self, path: &Path, source: String) -> Result<SourceFile>;

    /// Read and parse a file
    fn parse_file(&mut self, path: &Path) -> Result<SourceFile> {
        let source = std::fs::read_to_string(path).map_err(|source| ConvertError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(path, source)
    }

    /// Get parser name for debugging
    fn name(&self) -> &'static str;
}

/// Create a parser for a language
pub fn create_parser(language: &str) -> Result<Box<dyn Parser>> {
    match language {
        "go" => Ok(Box::new(GoParser::new()?)),
        other => Err(ConvertError::UnknownLanguage(other.to_string())),
    }
}
