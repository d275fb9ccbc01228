//! # Tabletest Core
//!
//! Structural converter for Go table tests, including:
//! - Closed syntax shapes lowered from the tree-sitter Go grammar
//! - Parser and position-keyed printer capabilities
//! - Record-shape detection, structural transformation and reference rewriting
//! - A batch orchestrator that walks a directory and rewrites files in place
//!
//! The converter turns
//!
//! ```go
//! tests := []struct {
//!     name string
//!     in   int
//! }{
//!     {"one", 1},
//! }
//! for _, tc := range tests {
//!     t.Run(tc.name, func(t *testing.T) { /* ... */ })
//! }
//! ```
//!
//! into a `map[string]struct{ in int }` keyed by the row names, with the loop
//! and its consumers rewritten to use the map key.

#![warn(clippy::all)]

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub mod ast;
pub mod converter;
pub mod parser;
pub mod printer;

// Re-export commonly used types
pub use ast::{Expr, Span, TypeExpr};
pub use converter::{
    AtomicWriter, BatchResult, Detection, FileError, FileOutcome, FileWriter, Rejection,
    TableConverter, TableDeclaration,
};
pub use parser::{create_parser, GoParser, Parser, SourceFile};
pub use printer::{EditSet, PatchPrinter, PrintError, Printer};

/// Tabletest version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for the converter.
///
/// `RUST_LOG` takes precedence; otherwise core events are shown at `info`,
/// or `debug` when `verbose` is set. Output goes to stderr so reports on
/// stdout stay machine readable.
pub fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "tabletest_core=debug"
    } else {
        "tabletest_core=info"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

    // A subscriber may already be installed by an embedding application
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Converter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Field names recognized as the row name, checked in declaration order
    pub name_fields: Vec<String>,
    /// Identifier bound to the map key in rewritten range loops
    pub key_ident: String,
    /// Receivers whose `Run` calls take the row name as first argument
    pub run_receivers: Vec<String>,
    /// Method name of the subtest runner
    pub run_method: String,
    /// File extensions considered by the directory walk
    pub extensions: Vec<String>,
    /// Number of worker threads used for a batch
    pub jobs: usize,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            name_fields: vec!["name".to_string(), "desc".to_string(), "description".to_string()],
            key_ident: "name".to_string(),
            run_receivers: vec!["t".to_string()],
            run_method: "Run".to_string(),
            extensions: vec!["go".to_string()],
            jobs: 1,
        }
    }
}

impl ConverterConfig {
    pub fn is_name_field(&self, field: &str) -> bool {
        self.name_fields.iter().any(|name| name == field)
    }

    pub fn is_run_receiver(&self, receiver: &str) -> bool {
        self.run_receivers.iter().any(|name| name == receiver)
    }
}

/// Error types for conversion operations
#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    /// The root path (or a directory below it) could not be enumerated
    #[error("error walking {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Source text could not be read
    #[error("error reading file: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Source text is not syntactically valid Go
    #[error("error parsing file: {message}")]
    Parse { path: PathBuf, message: String },

    /// Recorded edits could not be applied
    #[error("error printing file: {source}")]
    Print { path: PathBuf, source: PrintError },

    /// Serialized output could not be persisted
    #[error("error writing file: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The tree-sitter grammar could not be loaded
    #[error("Language error: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    /// No parser is registered for the requested language
    #[error("Unknown parser type: {0}")]
    UnknownLanguage(String),
}

impl ConvertError {
    /// Path of the file the error refers to, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConvertError::Walk { path, .. }
            | ConvertError::Read { path, .. }
            | ConvertError::Parse { path, .. }
            | ConvertError::Print { path, .. }
            | ConvertError::Write { path, .. } => Some(path),
            ConvertError::Language(_) | ConvertError::UnknownLanguage(_) => None,
        }
    }
}

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;
