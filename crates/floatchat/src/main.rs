use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use floatchat::{config, ingest, server};

#[derive(Parser)]
#[command(name = "floatchat")]
#[command(
  about = "FloatChat - conversational access to ARGO float data\nIngest NetCDF float files and answer questions about them over HTTP"
)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Start the HTTP API server
  Serve {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0:8000")]
    addr: SocketAddr,
  },
  /// Ingest NetCDF float files into the similarity index
  Ingest {
    /// Directory containing .nc files
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
    .init();

  config::load_dotenv();

  let cli = Cli::parse();
  match cli.command {
    Command::Serve { addr } => server::server::start_server(addr).await,
    Command::Ingest { data_dir } => ingest::run(&data_dir, config::index_dir()).await,
  }
}
