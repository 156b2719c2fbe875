use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use wiki2docbook::config::{self, BuildConfig};

#[derive(Parser)]
#[command(name = "wiki2docbook")]
#[command(about = "Convert a tree of wiki guide pages into DocBook XML fragments")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory containing the raw wiki pages
    #[arg(long, default_value = config::DEFAULT_WIKI_DIR)]
    wiki_dir: PathBuf,

    /// Existing directory receiving <PageName>.xml files
    #[arg(short, long, default_value = config::DEFAULT_OUTPUT_DIR)]
    output: PathBuf,

    /// Root page whose bullet list defines the book
    #[arg(long, default_value = config::DEFAULT_INDEX_PAGE)]
    index: String,
}

fn run(cli: Cli) -> Result<()> {
    let config = BuildConfig {
        wiki_dir: cli.wiki_dir,
        output_dir: cli.output,
        index_page: cli.index,
    };

    let start = Instant::now();
    let summary = wiki2docbook::pipeline::run(&config)?;
    let duration = start.elapsed();
    info!(duration_secs = duration.as_secs_f64(), "Conversion complete");

    println!();
    println!("=== Summary ===");
    println!("Total time:      {:.2}s", duration.as_secs_f64());
    println!("Pages written:   {}", summary.pages);
    println!("Container pages: {}", summary.containers);
    println!("Inclusions:      {}", summary.includes);
    println!("Output:          {}", config.output_dir.display());

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    match run(cli) {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
