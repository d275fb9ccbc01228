// Command-line definition and mapping onto the converter configuration
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tabletest_core::ConverterConfig;

/// Options for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub root: PathBuf,
    pub config: ConverterConfig,
    pub json: bool,
    pub analyze: bool,
    pub verbose: bool,
}

pub fn build_command() -> Command {
    Command::new("tabletest")
        .version(tabletest_core::VERSION)
        .about("Convert slice-based Go table tests into map-based table tests")
        .arg(
            Arg::new("directory")
                .value_name("DIRECTORY")
                .help("Directory (or single file) to convert in place")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .value_name("N")
                .help("Number of files converted in parallel")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("ext")
                .long("ext")
                .value_name("EXT")
                .help("File extension to convert (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("key")
                .long("key")
                .value_name("IDENT")
                .help("Identifier bound to the map key in rewritten loops"),
        )
        .arg(
            Arg::new("name-field")
                .long("name-field")
                .value_name("FIELD")
                .help("Struct field naming each row (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("JSON file with converter settings")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the result as JSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("analyze")
                .long("analyze")
                .help("Report table shapes and verdicts without modifying files")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log every detection and rewrite")
                .action(ArgAction::SetTrue),
        )
}

/// Build the options from parsed arguments; flags override the config file
pub fn parse_options(matches: &ArgMatches) -> Result<Options> {
    let Some(root) = matches.get_one::<PathBuf>("directory").cloned() else {
        bail!("missing directory argument");
    };

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => load_config(path)?,
        None => ConverterConfig::default(),
    };

    if let Some(jobs) = matches.get_one::<usize>("jobs") {
        config.jobs = *jobs;
    }
    if let Some(extensions) = matches.get_many::<String>("ext") {
        config.extensions = extensions
            .map(|ext| ext.trim_start_matches('.').to_string())
            .collect();
    }
    if let Some(key) = matches.get_one::<String>("key") {
        config.key_ident = key.clone();
    }
    if let Some(fields) = matches.get_many::<String>("name-field") {
        config.name_fields = fields.cloned().collect();
    }

    if config.jobs == 0 {
        bail!("--jobs must be at least 1");
    }
    if config.key_ident.is_empty() {
        bail!("--key must not be empty");
    }

    Ok(Options {
        root,
        config,
        json: matches.get_flag("json"),
        analyze: matches.get_flag("analyze"),
        verbose: matches.get_flag("verbose"),
    })
}

fn load_config(path: &Path) -> Result<ConverterConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}
