//! Tabletest CLI - command-line front end for the Go table-test converter
//!
//! Parses arguments into a [`tabletest_core::ConverterConfig`], runs the
//! conversion (or the read-only analysis) and renders the result.

pub mod cli;
pub mod report;

use anyhow::Result;
use tabletest_core::TableConverter;

pub use cli::{build_command, parse_options, Options};
pub use report::{render_analysis, render_summary};

/// Run one invocation, returning the text to print and whether it succeeded
pub fn run(options: &Options) -> Result<(String, bool)> {
    let converter = TableConverter::new(options.config.clone());

    if options.analyze {
        let report = converter.analyze(&options.root)?;
        let text = if options.json {
            serde_json::to_string_pretty(&report)?
        } else {
            render_analysis(&report)
        };
        let success = report.errors.is_empty() || !report.files.is_empty();
        return Ok((text, success));
    }

    let result = converter.convert(&options.root)?;
    let text = if options.json {
        serde_json::to_string_pretty(&result)?
    } else {
        render_summary(&result)
    };
    Ok((text, result.success()))
}
