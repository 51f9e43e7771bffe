use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

/// Pay-per-call gateway for upstream APIs
#[derive(Debug, Parser)]
#[command(name = "tollgate", version, about)]
pub struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "TOLLGATE_CONFIG", default_value = "tollgate.toml")]
    pub config: PathBuf,

    /// Override `server.listen_address`
    #[arg(short, long, env = "TOLLGATE_LISTEN")]
    pub listen: Option<SocketAddr>,
}
