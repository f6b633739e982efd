use clap::Subcommand;
use std::path::PathBuf;
use std::time::Duration;

use fleet_cli::{ComponentKind, SignalKind};
use fleet_supervisor::config::parse_duration;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stop the component installed in a directory
    Stop {
        /// Component directory
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Component kind (read from the directory's marker file if omitted)
        #[arg(long, value_enum)]
        kind: Option<ComponentKind>,

        /// Do not report what was stopped
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show the programs supervised in a component directory
    Status {
        /// Component directory
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Signal the process recorded in a pid file, then truncate the file
    Signal {
        pid_file: PathBuf,

        #[arg(value_enum)]
        signal: SignalKind,

        /// Name used in messages
        #[arg(long, default_value = "process")]
        name: String,
    },

    /// Invoke an admin service on a cluster
    Admin {
        /// Cluster admin endpoint, host:port
        address: String,

        /// Service name, e.g. security.ssl.get-list
        command: String,

        #[arg(long, default_value_t = 1)]
        cluster_id: u64,

        /// Cluster name used in messages (defaults to the address)
        #[arg(long)]
        cluster_name: Option<String>,

        /// Request document as JSON
        #[arg(long, default_value = "{}")]
        document: String,

        /// Time allowed for the whole call, e.g. 30s or 500ms
        #[arg(long, default_value = "30s", value_parser = parse_duration)]
        timeout: Duration,
    },
}
