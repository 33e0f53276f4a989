//! Build automation tasks for rowdump
//!
//! - Generating the CLI reference from the clap definitions

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for rowdump", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    // Generate markdown from clap definitions
    let markdown = clap_markdown::help_markdown::<rowdump_cli::Cli>();

    let content = format!(
        r#"# rowdump CLI Reference

This documentation is auto-generated from the CLI source code. Last updated: {}.

## Overview

rowdump exports collections served by a paged REST API (`GET /users?_start=0&_limit=200`)
into a single CSV file. Pages are fetched concurrently and written in their original order.

## Installation

```bash
cargo install --path crates/rowdump-cli
```

## Quick Start

```bash
# How many records does the server have?
rowdump count --url http://localhost:3000/users

# Export them, 200 per page, 3 pages at a time
rowdump export --url http://localhost:3000/users --output ./exports

# Same, but fail instead of dropping rows when a page fails
rowdump export --url http://localhost:3000/users --on-page-failure abort

# Pipe the CSV somewhere else
rowdump export --url http://localhost:3000/users --total 1000 --stdout | head

# Small collections: one request
rowdump export-all --url http://localhost:3000/users

# Server renders the CSV itself
rowdump stream --url http://localhost:3000/export.csv
```

## Failed Pages

With the default `--on-page-failure skip` a page that fails or times out is
left out and the export still succeeds. The summary lists the failed pages;
their rows are missing from the file.

## Environment

| Variable | Meaning |
|----------|---------|
| `ROWDUMP_SOURCE_URL` | default for `--url` |
| `ROWDUMP_TOTAL`, `ROWDUMP_PAGE_SIZE`, `ROWDUMP_CONCURRENCY` | paging defaults |
| `ROWDUMP_ON_PAGE_FAILURE`, `ROWDUMP_PAGE_TIMEOUT_SECS` | failure handling |
| `ROWDUMP_OUTPUT_DIR` | output directory |
| `ROWDUMP_API_TIMEOUT_SECS` | HTTP request timeout |
| `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_DIR` | logging |

A `.env` file in the working directory is loaded at startup.

## Commands

{}

---

*This documentation is automatically generated from the CLI source code. To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    // Create output directory if it doesn't exist
    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("✅ Generated CLI documentation at: {}", file_path.display());

    Ok(())
}
