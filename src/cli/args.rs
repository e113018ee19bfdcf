//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

/// Family tree builder: reconstructs trees from flat member snapshots and answers relationship questions
#[derive(Parser, Debug)]
#[command(name = "pyebwa")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Snapshot file argument shared by the data commands.
#[derive(Args, Debug, Clone, Default)]
pub struct SnapshotArg {
    /// Member snapshot (JSON array or {"members": [...]}), default: `data_file` from the config
    #[arg(value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render the family forest
    Tree {
        #[command(flatten)]
        snapshot: SnapshotArg,
        /// View: full, ancestors, descendants or hourglass
        #[arg(long)]
        view: Option<String>,
        /// Focus person id for filtered views (default: focus person)
        #[arg(long)]
        focus: Option<String>,
        /// Current user id, overrides `current_user` from the config
        #[arg(long)]
        user: Option<String>,
        /// Print the nested tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// List a member's ancestors
    Ancestors {
        #[command(flatten)]
        snapshot: SnapshotArg,
        /// Member id
        #[arg(long)]
        id: String,
    },

    /// List a member's descendants
    Descendants {
        #[command(flatten)]
        snapshot: SnapshotArg,
        /// Member id
        #[arg(long)]
        id: String,
    },

    /// List a member's ancestors and descendants
    Hourglass {
        #[command(flatten)]
        snapshot: SnapshotArg,
        /// Member id
        #[arg(long)]
        id: String,
    },

    /// Show the default focus person
    Focus {
        #[command(flatten)]
        snapshot: SnapshotArg,
        /// Current user id, overrides `current_user` from the config
        #[arg(long)]
        user: Option<String>,
    },

    /// Show the shortest relationship path between two members
    Path {
        #[command(flatten)]
        snapshot: SnapshotArg,
        /// Start member id
        #[arg(long)]
        from: String,
        /// Target member id
        #[arg(long)]
        to: String,
    },

    /// Name the relationship of one member to another
    Relation {
        #[command(flatten)]
        snapshot: SnapshotArg,
        /// Member the relationship is seen from
        #[arg(long)]
        from: String,
        /// Target member id
        #[arg(long, required_unless_present = "all", conflicts_with = "all")]
        to: Option<String>,
        /// Label every other member
        #[arg(long)]
        all: bool,
    },

    /// List common ancestors of two members
    Common {
        #[command(flatten)]
        snapshot: SnapshotArg,
        /// First member id
        #[arg(long)]
        a: String,
        /// Second member id
        #[arg(long)]
        b: String,
    },

    /// Show family statistics
    Stats {
        #[command(flatten)]
        snapshot: SnapshotArg,
        /// Print CSV instead of a summary
        #[arg(long)]
        csv: bool,
        /// Write the CSV export to a file
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Report data problems in a snapshot
    Validate {
        #[command(flatten)]
        snapshot: SnapshotArg,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print config template
    Template,

    /// Show config paths
    Path,
}
