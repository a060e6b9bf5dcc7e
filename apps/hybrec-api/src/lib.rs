pub mod routes;
pub mod state;

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::Parser;
use color_eyre::eyre;
use tokio::{net::TcpListener, time::MissedTickBehavior};
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(
	version = hybrec_cli::VERSION,
	rename_all = "kebab",
	styles = hybrec_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = hybrec_config::load(&args.config)?;

	init_tracing(&config)?;

	let http_addr: SocketAddr = config.service.http_bind.parse()?;
	let admin_addr: SocketAddr = config.service.admin_bind.parse()?;

	if !admin_addr.ip().is_loopback() {
		return Err(eyre::eyre!("admin_bind must be a loopback address."));
	}

	let reload_every = Duration::from_secs(config.keywords.reload_interval_secs);
	let state = AppState::new(config).await?;

	match state.service.reload_keywords().await {
		Ok(rows) => tracing::info!(rows, "Keyword mappings loaded."),
		Err(err) => tracing::warn!(error = %err, "Initial keyword load failed."),
	}

	tokio::spawn(reload_keywords_periodically(state.clone(), reload_every));

	let app = routes::router(state.clone());
	let admin_app = routes::admin_router(state);
	let http_listener = TcpListener::bind(http_addr).await?;

	tracing::info!(%http_addr, "HTTP server listening.");

	let http_server = axum::serve(http_listener, app);
	let admin_listener = TcpListener::bind(admin_addr).await?;

	tracing::info!(%admin_addr, "Admin server listening.");

	let admin_server = axum::serve(admin_listener, admin_app);

	tokio::try_join!(http_server, admin_server)?;

	Ok(())
}

async fn reload_keywords_periodically(state: AppState, every: Duration) {
	let mut ticker = tokio::time::interval(every);

	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
	// The first tick completes immediately and the startup load already ran.
	ticker.tick().await;

	loop {
		ticker.tick().await;

		if let Err(err) = state.service.reload_keywords().await {
			tracing::warn!(error = %err, "Scheduled keyword reload failed. Keeping previous rows.");
		}
	}
}

fn init_tracing(config: &hybrec_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	Ok(())
}
