/*!
# Table Converter

Detection, transformation and reference rewriting of Go table tests, plus
the batch orchestration that drives them over a directory.

Per file the stages run strictly in order:

1. [`detector`] classifies every binding as an eligible table or not
2. [`transformer`] records the edits turning each eligible table into a map
3. [`rewriter`] records the edits for the loops and reads that consume it
4. the printer applies the edits and the file is replaced if anything changed
*/

pub mod analysis;
pub mod detector;
pub mod orchestrator;
pub mod rewriter;
pub mod transformer;
pub mod walk;

#[cfg(test)]
mod tests;

pub use analysis::{
    analyze_source, AnalysisReport, BindingReport, FileAnalysis, LoopReport, RunCallReport,
};
pub use detector::{
    detect, Detection, KeyValue, NameField, RecordShape, Rejection, Row, TableDeclaration,
};
pub use orchestrator::{
    AtomicWriter, BatchResult, FileConversion, FileError, FileOutcome, FileWriter, TableConverter,
};
pub use rewriter::{check_consumers, rewrite_references, RewriteStats};
pub use transformer::{transform, ConvertedTable};
pub use walk::{collect_files, WalkEntry};
