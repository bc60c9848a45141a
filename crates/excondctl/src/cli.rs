//! CLI - Command-line argument parsing
//!
//! Keeps argument parsing separate from execution logic.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// excond control CLI
#[derive(Parser, Debug)]
#[command(name = "excondctl")]
#[command(about = "Exception conditions from symbolic exploration traces", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Config file (overrides $EXCOND_CONFIG and ./excond.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level for stderr diagnostics (overrides config and $RUST_LOG)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a recorded trace and print its exception condition report
    Replay {
        /// Trace file (.jsonl)
        trace: PathBuf,

        /// Indent the JSON report
        #[arg(long)]
        pretty: bool,

        /// Keep instance fields unqualified (no `this.` prefix)
        #[arg(long)]
        no_qualify: bool,
    },

    /// Normalize a raw path condition
    Normalize {
        /// Raw condition text as printed by the engine. Every literal \n is
        /// read as a line break, including one inside a string constant
        condition: String,

        /// Instance field name of the throwing method's class (repeatable)
        #[arg(long = "field")]
        fields: Vec<String>,

        /// Parameter name of the throwing method (repeatable)
        #[arg(long = "param")]
        params: Vec<String>,
    },

    /// Render a readable method signature from an engine descriptor
    Signature {
        /// Declaring class, e.g. br.ufpe.cin.witup.jpf.Account
        class: String,

        /// Method name (<init> for constructors, <clinit> for static initializers)
        method: String,

        /// Method descriptor, e.g. (D)V
        descriptor: String,
    },

    /// List trace files in a directory with their descriptions
    List {
        /// Directory holding .jsonl traces
        #[arg(default_value = "demos")]
        dir: PathBuf,
    },
}
