//! rowdump CLI - Main entry point

use clap::Parser;
use rowdump_cli::{Cli, Commands, Config};
use rowdump_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // Values from .env fill in ROWDUMP_* and LOG_* variables that are not set
    let _ = dotenvy::dotenv();

    // Parse command-line arguments
    let cli = Cli::parse();

    // Handle markdown help generation
    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return;
    }

    let Some(command) = cli.command else {
        eprintln!("Error: A subcommand is required");
        eprintln!();
        eprintln!("For more information, try '--help'.");
        process::exit(2);
    };

    // Verbose mode logs debug to the console, otherwise warnings only
    let level = if cli.verbose { LogLevel::Debug } else { LogLevel::Warn };
    let log_config = LogConfig::builder()
        .level(level)
        .output(LogOutput::Console)
        .log_file_prefix("rowdump-cli")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // CLI works without logging; keep the guard so file logs are flushed on exit
    let _guard = init_logging(&log_config).ok().flatten();

    if let Err(e) = execute_command(command).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(command: Commands) -> rowdump_cli::Result<()> {
    let config = Config::from_env()?;

    match command {
        Commands::Export {
            source,
            paging,
            format,
            output,
        } => rowdump_cli::commands::export::run(&source, &paging, &format, &output, &config).await,

        Commands::ExportAll {
            source,
            on_failure,
            format,
            output,
        } => {
            rowdump_cli::commands::export::run_all(&source, on_failure, &format, &output, &config)
                .await
        },

        Commands::Stream {
            source,
            output,
            name,
        } => rowdump_cli::commands::stream::run(&source, output, &name, &config).await,

        Commands::Count {
            source,
            offset_param,
            limit_param,
        } => rowdump_cli::commands::count::run(&source, &offset_param, &limit_param, &config).await,
    }
}
