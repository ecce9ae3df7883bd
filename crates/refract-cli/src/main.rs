//! Refract CLI - generate reference documentation from C++ headers
//!
//! Exit codes: 0 on success, 1 when per-file errors were reported, 2 on
//! fatal failures (configuration, corpus inconsistency, unknown format).

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use refract_core::config::CONFIG_FILE;
use refract_core::error::Exception;
use refract_core::extract::{self, CompilationDatabase};
use refract_core::frontend::HeaderScanner;
use refract_core::generate;
use refract_core::{Config, Reporter, ThreadPool};

#[derive(Parser)]
#[command(name = "refract")]
#[command(version = refract_core::VERSION)]
#[command(about = "Generate C++ reference documentation", long_about = None)]
struct Cli {
    /// The config filename, relative to the working directory.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory or file for generated output.
    #[arg(long, default_value = ".")]
    output: PathBuf,

    /// Output format: "adoc", "xml", or "bitcode". Overrides the config.
    #[arg(long)]
    format: Option<String>,

    /// Continue if translation units fail to map.
    #[arg(long, num_args(0..=1), default_missing_value = "true")]
    ignore_map_errors: Option<bool>,

    /// Also document private members.
    #[arg(long)]
    include_private: bool,

    /// Worker count; 0 selects the hardware parallelism.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Emit informational messages.
    #[arg(short, long)]
    verbose: bool,

    /// The compilation database, or one or more source files.
    inputs: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_file(path).map_err(Exception::from)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                Config::load_file(default_path).map_err(Exception::from)?
            } else {
                Config::default()
            }
        }
    };
    if let Some(format) = &cli.format {
        config.generate = format.clone();
    }
    if let Some(ignore) = cli.ignore_map_errors {
        config.ignore_map_errors = ignore;
    }
    if cli.include_private {
        config.include_private = true;
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    if cli.verbose {
        config.verbose = true;
    }
    Ok(config)
}

fn load_inputs(cli: &Cli, config: &Config) -> Result<CompilationDatabase> {
    let inputs: Vec<String> = if cli.inputs.is_empty() {
        config.input.clone()
    } else {
        cli.inputs
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    };
    if let [single] = inputs.as_slice() {
        if single.ends_with(".json") {
            return CompilationDatabase::load(Path::new(single))
                .map_err(|err| anyhow::Error::new(Exception::from(err)));
        }
    }
    CompilationDatabase::from_inputs(&inputs, config.source_root.as_deref())
        .map_err(|err| anyhow::Error::new(Exception::from(err)))
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config = load_config(cli)?;
    let reporter = Reporter::stderr(config.verbose);
    let pool = ThreadPool::new(config.concurrency).map_err(Exception::from)?;

    let generator = generate::find_generator(&config.generate)
        .ok_or_else(|| anyhow!("unknown output format \"{}\"", config.generate))?;

    let db = load_inputs(cli, &config)?;
    if db.is_empty() {
        reporter.info("no input files; nothing to do");
        return Ok(ExitCode::SUCCESS);
    }

    let options = extract::ExtractOptions {
        include_private: config.include_private,
    };
    let frontend = HeaderScanner;
    let corpus = extract::build_corpus(
        &db,
        &frontend,
        options,
        &pool,
        &reporter,
        config.ignore_map_errors,
    )
    .map_err(Exception::from)?;
    let corpus = std::sync::Arc::new(corpus);
    reporter.info(format!("corpus holds {} symbols", corpus.len()));

    let single_file = cli
        .output
        .extension()
        .is_some_and(|ext| ext == generator.ext());
    if single_file {
        if let Some(parent) = cli.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create \"{}\"", parent.display()))?;
        }
        let mut out = std::fs::File::create(&cli.output)
            .with_context(|| format!("create \"{}\"", cli.output.display()))?;
        if let Err(err) = generate::build_one(generator.as_ref(), &mut out, &corpus) {
            reporter.could_not(format!("write \"{}\"", cli.output.display()), &err);
        }
    } else if let Err(err) = generate::build(&generator, &cli.output, &corpus, &reporter, &pool) {
        // Per-file failures were already reported inside the tasks and
        // drive the exit code below; anything else is fatal.
        if reporter.error_count() == 0 {
            return Err(anyhow::Error::new(Exception::from(err)));
        }
    }

    if reporter.error_count() > 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
