use anyhow::Result;
use tabletest_cli::{build_command, parse_options, run};
use tabletest_core::init_tracing;
use tracing::debug;

fn main() -> Result<()> {
    let matches = build_command().get_matches();
    let options = parse_options(&matches)?;

    // Initialize logging
    init_tracing(options.verbose);
    debug!("Running with {:?}", options.config);

    let (text, success) = match run(&options) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };

    if options.json {
        println!("{text}");
    } else {
        print!("{text}");
    }

    if !success {
        std::process::exit(1);
    }
    Ok(())
}
