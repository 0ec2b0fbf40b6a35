//! trellis - workflow engine for collections procedures
//!
//! Inspects, validates, and exercises workflow definitions: the built-in
//! Spectrum loan procedures or definitions loaded from YAML/JSON files.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Workflow engine for multi-step collections procedures")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List built-in workflows
    List,

    /// Validate a workflow definition, reporting every structural defect
    Validate {
        /// Built-in workflow identifier or path to a definition file
        workflow: String,
    },

    /// Render a workflow as a Mermaid state diagram
    Diagram {
        /// Built-in workflow identifier or path to a definition file
        workflow: String,
    },

    /// Export a workflow definition
    Export {
        /// Built-in workflow identifier or path to a definition file
        workflow: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "yaml")]
        format: Format,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List a workflow's states, grouped by phase
    States {
        /// Built-in workflow identifier or path to a definition file
        workflow: String,
    },

    /// List the transitions available from a state
    Transitions {
        /// Built-in workflow identifier or path to a definition file
        workflow: String,

        /// Current state
        #[arg(short, long)]
        state: String,

        /// Acting roles (omit to skip role gating)
        #[arg(short, long, value_delimiter = ',')]
        roles: Option<Vec<String>>,
    },

    /// Apply a transition and print the resulting state
    Apply {
        /// Built-in workflow identifier or path to a definition file
        workflow: String,

        /// Current state
        #[arg(short, long)]
        state: String,

        /// Transition name
        #[arg(short, long)]
        transition: String,

        /// Acting roles (omit to skip role gating)
        #[arg(short, long, value_delimiter = ',')]
        roles: Option<Vec<String>>,

        /// Context data JSON (or @file.json to read from file)
        #[arg(short, long)]
        data: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match commands::execute(cli.command) {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }
}
