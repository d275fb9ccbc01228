/*!
# Conversion Orchestrator

Drives detection, transformation and rewriting over a directory. Each file
is parsed, every binding is offered to the detector, accepted tables are
transformed, consumers are rewritten once, and the file is replaced only if
at least one edit was recorded. Per-file failures are collected in the
[`BatchResult`]; only a root that cannot be enumerated aborts the batch.
*/

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::unbounded;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ast::{find_nodes, lower_binding, ScopeIndex};
use crate::parser::{create_parser, Parser};
use crate::printer::{PatchPrinter, Printer};
use crate::{ConvertError, ConverterConfig, Result};

use super::analysis::{analyze_source, AnalysisReport};
use super::detector::{detect, Detection, Rejection};
use super::rewriter::{check_consumers, rewrite_references, RewriteStats};
use super::transformer::transform;
use super::walk::{collect_files, WalkEntry};

const LANGUAGE: &str = "go";

/// Outcome of converting one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub modified: bool,
    pub tables_converted: usize,
    pub rewrites: RewriteStats,
}

/// In-memory conversion of one source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileConversion {
    pub outcome: FileOutcome,
    /// New text, present only when something changed
    pub output: Option<String>,
}

/// A recorded per-file failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Aggregate over a batch of files
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub files_processed: usize,
    pub files_modified: usize,
    pub tables_converted: usize,
    pub rewrites: RewriteStats,
    pub errors: Vec<FileError>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: &FileOutcome) {
        self.files_processed += 1;
        if outcome.modified {
            self.files_modified += 1;
        }
        self.tables_converted += outcome.tables_converted;
        self.rewrites.merge(&outcome.rewrites);
    }

    pub fn record_error(&mut self, path: PathBuf, message: String) {
        warn!("{}", message);
        self.errors.push(FileError { path, message });
    }

    pub fn merge(&mut self, other: BatchResult) {
        self.files_processed += other.files_processed;
        self.files_modified += other.files_modified;
        self.tables_converted += other.tables_converted;
        self.rewrites.merge(&other.rewrites);
        self.errors.extend(other.errors);
    }

    /// Errors only fail a batch in which no file could be processed
    pub fn success(&self) -> bool {
        self.errors.is_empty() || self.files_processed > 0
    }
}

/// Destination of converted file contents
pub trait FileWriter: fmt::Debug + Send + Sync {
    /// Replace the contents of `path`
    fn write(&self, path: &Path, contents: &str) -> std::io::Result<()>;
}

/// Replaces a file through a temporary file in the same directory
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicWriter;

impl FileWriter for AtomicWriter {
    fn write(&self, path: &Path, contents: &str) -> std::io::Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let permissions = fs::metadata(path)?.permissions();

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(contents.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.as_file().set_permissions(permissions)?;
        temp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Converts slice-based Go table tests into map-based ones
#[derive(Debug, Clone)]
pub struct TableConverter {
    config: ConverterConfig,
    printer: PatchPrinter,
    writer: Arc<dyn FileWriter>,
}

impl Default for TableConverter {
    fn default() -> Self {
        Self::new(ConverterConfig::default())
    }
}

impl TableConverter {
    pub fn new(config: ConverterConfig) -> Self {
        Self {
            config,
            printer: PatchPrinter::new(),
            writer: Arc::new(AtomicWriter),
        }
    }

    /// Set where converted files are written
    pub fn writer(mut self, writer: impl FileWriter + 'static) -> Self {
        self.writer = Arc::new(writer);
        self
    }

    /// Set the number of worker threads
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.config.jobs = jobs;
        self
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Convert every candidate file below `root` in place
    pub fn convert(&self, root: &Path) -> Result<BatchResult> {
        let entries = collect_files(root, &self.config.extensions)?;
        let paths: Vec<&Path> = entries
            .iter()
            .filter_map(|entry| match entry {
                WalkEntry::File(path) => Some(path.as_path()),
                WalkEntry::Error { .. } => None,
            })
            .collect();

        info!("Converting {} files under {}", paths.len(), root.display());
        let mut outcomes = self.convert_all(&paths)?.into_iter();

        let mut result = BatchResult::new();
        for entry in &entries {
            match entry {
                WalkEntry::Error { path, error } => {
                    let message = format!("Error accessing {}: {}", path.display(), error);
                    result.record_error(path.clone(), message);
                }
                WalkEntry::File(path) => match outcomes.next() {
                    Some(Ok(outcome)) => result.record(&outcome),
                    Some(Err(e)) => {
                        let message = format!("Error processing {}: {}", path.display(), e);
                        result.record_error(path.clone(), message);
                    }
                    None => {}
                },
            }
        }

        Ok(result)
    }

    fn convert_all(&self, paths: &[&Path]) -> Result<Vec<Result<FileOutcome>>> {
        let workers = self.config.jobs.min(paths.len());
        if workers <= 1 {
            let mut parser = create_parser(LANGUAGE)?;
            debug!("Converting sequentially with the {} parser", parser.name());
            return Ok(paths
                .iter()
                .map(|path| self.convert_file(parser.as_mut(), path))
                .collect());
        }

        let mut parsers = (0..workers)
            .map(|_| create_parser(LANGUAGE))
            .collect::<Result<Vec<_>>>()?;
        if let Some(parser) = parsers.first() {
            debug!("Starting {} workers with the {} parser", workers, parser.name());
        }

        let (sender, receiver) = unbounded();
        for job in paths.iter().copied().enumerate() {
            // The receiver is alive until the pool joins
            let _ = sender.send(job);
        }
        drop(sender);

        let finished = Mutex::new(Vec::with_capacity(paths.len()));
        std::thread::scope(|scope| {
            for parser in parsers.iter_mut() {
                let receiver = receiver.clone();
                let finished = &finished;
                scope.spawn(move || {
                    for (index, path) in receiver.iter() {
                        let outcome = self.convert_file(parser.as_mut(), path);
                        finished.lock().push((index, outcome));
                    }
                });
            }
        });

        let mut finished = finished.into_inner();
        finished.sort_by_key(|(index, _)| *index);
        Ok(finished.into_iter().map(|(_, outcome)| outcome).collect())
    }

    /// Convert one file on disk, replacing it if anything changed
    pub fn convert_file(&self, parser: &mut dyn Parser, path: &Path) -> Result<FileOutcome> {
        let source = fs::read_to_string(path).map_err(|source| ConvertError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let conversion = self.convert_source(parser, path, source)?;
        if let Some(output) = &conversion.output {
            self.writer.write(path, output).map_err(|source| ConvertError::Write {
                path: path.to_path_buf(),
                source,
            })?;
            info!(
                "Converted {} tables in {}",
                conversion.outcome.tables_converted,
                path.display()
            );
        }

        Ok(conversion.outcome)
    }

    /// Convert source text in memory
    pub fn convert_source(
        &self,
        parser: &mut dyn Parser,
        path: &Path,
        source: String,
    ) -> Result<FileConversion> {
        let mut file = parser.parse(path, source)?;
        let root = file.tree.root_node();

        let mut candidates = Vec::new();
        for node in find_nodes(root, &["var_spec", "short_var_declaration"]) {
            let Some(binding) = lower_binding(node, &file.source) else {
                continue;
            };
            match detect(&binding, &self.config) {
                Detection::Eligible(table) => candidates.push(table),
                Detection::NotApplicable(
                    Rejection::NoLiteralValue
                    | Rejection::NotSliceOfStruct
                    | Rejection::MultipleBindings,
                ) => {}
                Detection::NotApplicable(rejection) => {
                    debug!(
                        "Skipping {} at line {}: {}",
                        binding.span.text(&file.source),
                        binding.span.line(&file.source),
                        rejection
                    );
                }
            }
        }

        let mut tables = Vec::new();
        let mut rewrites = RewriteStats::default();
        if !candidates.is_empty() {
            let index = ScopeIndex::build(root, &file.source);
            for table in &candidates {
                if let Err(rejection) =
                    check_consumers(&file.source, root, &index, table, &self.config)
                {
                    warn!(
                        "Leaving table {} at line {} unchanged: {}",
                        table.variable.name,
                        table.binding.line(&file.source),
                        rejection
                    );
                    continue;
                }
                tables.push(transform(table, &mut file.edits, &file.source));
            }
            rewrites = rewrite_references(
                &file.source,
                root,
                &index,
                &tables,
                &self.config,
                &mut file.edits,
            );
        }

        let output = if file.is_modified() {
            let printed = self.printer.print(&file).map_err(|source| ConvertError::Print {
                path: path.to_path_buf(),
                source,
            })?;
            Some(printed)
        } else {
            None
        };

        Ok(FileConversion {
            outcome: FileOutcome {
                path: path.to_path_buf(),
                modified: output.is_some(),
                tables_converted: tables.len(),
                rewrites,
            },
            output,
        })
    }

    /// Report shapes and verdicts for every candidate file without writing
    pub fn analyze(&self, root: &Path) -> Result<AnalysisReport> {
        let mut parser = create_parser(LANGUAGE)?;
        debug!("Analyzing {} with the {} parser", root.display(), parser.name());
        let mut report = AnalysisReport::default();

        for entry in collect_files(root, &self.config.extensions)? {
            match entry {
                WalkEntry::Error { path, error } => {
                    let message = format!("Error accessing {}: {}", path.display(), error);
                    report.errors.push(FileError { path, message });
                }
                WalkEntry::File(path) => {
                    let analysis = fs::read_to_string(&path)
                        .map_err(|source| ConvertError::Read {
                            path: path.clone(),
                            source,
                        })
                        .and_then(|source| {
                            analyze_source(parser.as_mut(), &path, source, &self.config)
                        });
                    match analysis {
                        Ok(analysis) => report.files.push(analysis),
                        Err(e) => {
                            let message = format!("Error processing {}: {}", path.display(), e);
                            report.errors.push(FileError { path, message });
                        }
                    }
                }
            }
        }

        Ok(report)
    }
}
