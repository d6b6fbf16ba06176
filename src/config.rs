use clap::Parser;
use std::path::PathBuf;

/// Every per-request tunable still arrives in the request payload; this is
/// the one sliver of process-wide configuration the host reserves.
#[derive(Parser, Debug, Clone)]
#[command(name = "mcts-server", about = "Game-agnostic parallel MCTS service")]
pub struct Config {
    /// Directory the per-run log file is written into.
    #[arg(long, default_value = "logs")]
    pub log_dir: PathBuf,

    /// Root directory the schema cache resolves `schema/<path>` requests against.
    #[arg(long, default_value = "schema")]
    pub schema_dir: PathBuf,

    /// Bind a TCP listener instead of stdio, for integration testing.
    #[arg(long)]
    pub listen: Option<std::net::SocketAddr>,
}
