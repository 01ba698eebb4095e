use std::path::PathBuf;

use clap::Parser;
use uno_server::config::{load_server_config, load_server_config_auto, ServerConfig};
use uno_server::defaults::ensure_config;
use uno_server::lobby::LobbyManager;
use uno_server::logging;
use uno_server::net::GameServer;

#[derive(Parser)]
#[command(name = "uno-server")]
#[command(about = "Host UNO lobbies and games")]
struct Cli {
	/// Address to listen on; overrides the config file
	#[arg(short, long)]
	bind: Option<String>,

	/// Port on 0.0.0.0, used when no bind address is given
	#[arg(long, env = "PORT")]
	port: Option<u16>,

	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Fixed seed for lobby codes, decks and AI delays
	#[arg(long)]
	seed: Option<u64>,

	#[arg(long, env = "RUST_LOG")]
	log: Option<String>,
}

fn load(cli: &Cli) -> Result<ServerConfig, Box<dyn std::error::Error>> {
	let mut config = match &cli.config {
		Some(path) => load_server_config(path)?,
		None => {
			ensure_config();
			load_server_config_auto()?
		}
	};

	if let Some(bind) = &cli.bind {
		config.bind = bind.clone();
	} else if let Some(port) = cli.port {
		config.bind = format!("0.0.0.0:{}", port);
	}
	if cli.seed.is_some() {
		config.seed = cli.seed;
	}
	Ok(config)
}

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init(cli.log.as_deref());

	let config = match load(&cli) {
		Ok(config) => config,
		Err(e) => {
			eprintln!("Config error: {}", e);
			std::process::exit(1);
		}
	};

	let addr = config.bind.clone();
	let server = GameServer::new(LobbyManager::new(config));

	if let Err(e) = server.run(&addr).await {
		eprintln!("Server error: {}", e);
		std::process::exit(1);
	}
}
