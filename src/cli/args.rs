//! CLI argument definitions and parsing structures
//!
//! This module defines the command-line interface structure using clap,
//! including the main `Cli` struct and the `Commands` enum.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use eec_config::StoreBackend;

/// eec - execution environment controller
#[derive(Parser)]
#[command(name = "eec")]
#[command(about = "Provision infrastructure, deploy application topologies and supervise them until removal")]
#[command(long_about = r#"
eec accepts application topologies (ADTs), provisions orchestration
infrastructure for them, deploys the application and tracks its status until
an operator asks for removal.

EXAMPLES:
  # Run the supervisor: reattach to recorded submissions and keep them alive
  eec serve

  # Submit an artefact and return once it is RUNNING or ERROR
  eec submit app.json --inputs inputs.json --detach

  # Query and remove a submission
  eec status 0b1c...
  eec abort 0b1c...

  # List the inputs a topology accepts
  eec inputs app.json

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  Config file is discovered by searching upward from CWD for .eec/config.toml,
  then <EEC_HOME>/config.toml. Use --config to specify an explicit path.

LIFECYCLE:
  INIT → RUNNING → ABORTED → STOPPED
  Failed steps record ERROR; an ERROR submission can still be aborted.
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// eec home directory (default: $EEC_HOME, else ./.eec)
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Seconds between abort polls
    #[arg(long, global = true)]
    pub poll_interval: Option<u64>,

    /// Record store backend
    #[arg(long, global = true, value_enum)]
    pub store: Option<StoreArg>,

    /// Directory of the file record store
    #[arg(long, global = true)]
    pub store_path: Option<Utf8PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit command output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Emit logs as one JSON object per line
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Record store backend as spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreArg {
    File,
    Memory,
}

impl From<StoreArg> for StoreBackend {
    fn from(arg: StoreArg) -> Self {
        match arg {
            StoreArg::File => StoreBackend::File,
            StoreArg::Memory => StoreBackend::Memory,
        }
    }
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the lifecycle supervisor until interrupted
    ///
    /// Takes the serve lock on the record store, reconciles every record left
    /// by an earlier process and keeps the resumed workers running until
    /// Ctrl-C. Records are left intact on exit.
    ///
    /// EXAMPLES:
    ///   eec serve
    ///   eec serve --force
    Serve {
        /// Replace a serve lock left behind by a crashed supervisor
        #[arg(long)]
        force: bool,
    },

    /// Submit an artefact for deployment
    ///
    /// Drives the submission in the foreground and prints every status
    /// change until the worker ends or Ctrl-C is pressed.
    ///
    /// EXAMPLES:
    ///   eec submit app.json
    ///   eec submit app.json --inputs inputs.json --id my-app --detach
    Submit {
        /// Artefact JSON (`downloadUrl`, `downloadUrl_content` or `deployment_adt`)
        artefact: PathBuf,

        /// Submission inputs JSON (`{"parameters": [...]}`)
        #[arg(long)]
        inputs: Option<PathBuf>,

        /// Submit under this id instead of a generated one
        #[arg(long)]
        id: Option<String>,

        /// Return once the submission is RUNNING or ERROR, leaving it for `eec serve`
        #[arg(long)]
        detach: bool,
    },

    /// Show the last recorded status of a submission
    Status {
        /// Submission id
        id: String,
    },

    /// Show the runtime of a submission
    Usage {
        /// Submission id
        id: String,
    },

    /// Request removal of a submission
    ///
    /// Returns immediately; the worker driving the submission tears it down
    /// at its next poll.
    Abort {
        /// Submission id
        id: String,
    },

    /// List every recorded submission
    List,

    /// List the topology inputs an artefact accepts
    Inputs {
        /// Artefact JSON
        artefact: PathBuf,
    },
}

/// Build the CLI command for testing and introspection
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}
