mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "agentlogic-cli")]
#[command(about = "AgentLogic CLI - Run exercise submissions against test cases locally", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a submission file ({code, testCases, language, functionName?})
    Run {
        /// Submission JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Read the source code from this file instead of the submission's "code"
        #[arg(short, long)]
        code: Option<PathBuf>,

        /// Override the submission language (javascript, python)
        #[arg(short, long)]
        language: Option<String>,

        /// Entry-point function to call
        #[arg(long)]
        function: Option<String>,

        /// Per-test timeout in milliseconds
        #[arg(short, long)]
        timeout_ms: Option<u64>,

        /// Print the raw JSON response
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// List enabled languages and their execution backends
    Languages,

    /// Print the entry point that would be called for a source file
    Detect {
        /// Source file
        #[arg(short, long)]
        file: PathBuf,

        /// Language of the source file
        #[arg(short, long)]
        language: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            code,
            language,
            function,
            timeout_ms,
            json,
        } => {
            let all_passed = commands::run_submission(
                &file,
                code.as_deref(),
                language.as_deref(),
                function.as_deref(),
                timeout_ms,
                json,
            )
            .await?;
            if !all_passed {
                std::process::exit(1);
            }
        }
        Commands::Languages => {
            commands::list_languages()?;
        }
        Commands::Detect { file, language } => {
            commands::detect(&file, &language)?;
        }
    }

    Ok(())
}
