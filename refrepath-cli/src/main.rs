use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use refrepath::commands::{self, batch::BatchArgs, RuleArgs};
use refrepath::core::output::OutputFormat;

#[derive(Parser)]
#[command(name = "refrepath")]
#[command(author, version, long_about = None)]
#[command(
    about = "Batch repathing of external references in Maya scene files",
    long_about = "Rewrites the reference paths stored inside Maya scenes across a directory \
                  tree. Every scene is processed by its own worker process, so a broken \
                  file never stops the batch."
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (json, text, markdown)
    #[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Repath every scene under a directory, one worker process per file
    Batch(BatchArgs),

    /// List the scene files a batch would process
    Scan {
        /// Directory to search
        root: PathBuf,
    },

    /// Apply a rule to literal paths and print the result
    Resolve {
        /// Reference paths to resolve
        #[arg(required = true)]
        paths: Vec<String>,

        #[command(flatten)]
        rule: RuleArgs,

        /// Scan root used for defaults and --replace-with-scan-root
        #[arg(long)]
        scan_root: Option<PathBuf>,
    },

    /// Process one scene; parameters come from REFREPATH_ARG_* variables
    #[command(hide = true)]
    Worker,
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "refrepath=debug"
    } else {
        "refrepath=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Batch(args) => {
            let code = commands::batch::run(args, cli.format, cli.verbose).await?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Scan { root } => commands::scan::run(root, cli.format).await?,
        Commands::Resolve {
            paths,
            rule,
            scan_root,
        } => commands::resolve::run(paths, rule, scan_root, cli.format).await?,
        Commands::Worker => {
            let code = commands::worker::run();
            std::process::exit(code);
        }
    }

    Ok(())
}
