/*!
# Printer

Produces the converted source text. Rather than regenerating Go from a tree,
the printer applies a set of span replacements to the original text, so
everything the converter did not touch (comments, blank lines, formatting)
comes out byte-for-byte unchanged.
*/

use thiserror::Error;

use crate::ast::Span;
use crate::parser::SourceFile;

pub mod layout;


pub use layout::removal_span;

/// Errors raised while applying edits
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrintError {
    #[error("overlapping edits at {}..{} and {}..{}", first.start, first.end, second.start, second.end)]
    Overlap { first: Span, second: Span },

    #[error("edit {}..{} is outside the source ({len} bytes)", span.start, span.end)]
    OutOfBounds { span: Span, len: usize },

    #[error("edit {}..{} does not fall on a character boundary", span.start, span.end)]
    CharBoundary { span: Span },
}

/// A single replacement of `span` by `text`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub span: Span,
    pub text: String,
}

/// Edits recorded against one source text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditSet {
    edits: Vec<Edit>,
}

impl EditSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, span: Span, text: impl Into<String>) {
        self.edits.push(Edit {
            span,
            text: text.into(),
        });
    }

    pub fn insert(&mut self, at: usize, text: impl Into<String>) {
        self.replace(Span::empty(at), text);
    }

    pub fn delete(&mut self, span: Span) {
        self.replace(span, String::new());
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Edit> {
        self.edits.iter()
    }

    /// Apply every edit to `source`.
    ///
    /// Edits are applied in source order. Two edits may touch at a boundary
    /// (an insertion right where a deletion starts), but any overlap is an
    /// error and nothing is applied.
    pub fn apply(&self, source: &str) -> Result<String, PrintError> {
        let mut ordered: Vec<&Edit> = self.edits.iter().collect();
        // Stable: insertions at the same offset keep their recording order
        ordered.sort_by_key(|edit| (edit.span.start, edit.span.end));

        for edit in &ordered {
            if edit.span.end > source.len() {
                return Err(PrintError::OutOfBounds {
                    span: edit.span,
                    len: source.len(),
                });
            }
            if !source.is_char_boundary(edit.span.start) || !source.is_char_boundary(edit.span.end)
            {
                return Err(PrintError::CharBoundary { span: edit.span });
            }
        }

        for pair in ordered.windows(2) {
            let (first, second) = (pair[0].span, pair[1].span);
            if second.start < first.end {
                return Err(PrintError::Overlap { first, second });
            }
        }

        let mut output = String::with_capacity(source.len());
        let mut cursor = 0;
        for edit in ordered {
            output.push_str(&source[cursor..edit.span.start]);
            output.push_str(&edit.text);
            cursor = edit.span.end;
        }
        output.push_str(&source[cursor..]);

        Ok(output)
    }
}

/// Trait for producing output text from an edited source file
pub trait Printer {
    fn print(&self, file: &SourceFile) -> Result<String, PrintError>;
}

/// Printer that patches the original text with the recorded edits
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchPrinter;

impl PatchPrinter {
    pub fn new() -> Self {
        Self
    }
}

impl Printer for PatchPrinter {
    fn print(&self, file: &SourceFile) -> Result<String, PrintError> {
        file.edits.apply(&file.source)
    }
}
