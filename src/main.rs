mod app;
mod cache;
mod config;
mod event;
mod redmine;
mod roadmap;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "roadview")]
#[command(about = "Annotates roadmap work items with Redmine status, assignee, and environment")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/roadview/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Treat every cache read as a miss, refetching all rows
  #[arg(long)]
  force_refresh: bool,

  /// Skip the persistent cache for this run
  #[arg(long)]
  no_cache: bool,

  /// Issue ids to enrich
  #[arg(required = true)]
  ids: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Command-line flag wins over the config file
  if args.force_refresh {
    config.cache.force_refresh = true;
  }

  let app = app::App::new(config, args.ids);
  app.run(args.no_cache).await?;

  Ok(())
}
