use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use thiserror::Error;

use crate::card::DECK_SIZE;
use crate::game::Rules;

pub const CONFIG_FILE: &str = "server.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("Failed to read {path}: {source}")]
	Read {
		path: PathBuf,
		source: std::io::Error,
	},
	#[error("Failed to parse server config: {0}")]
	Parse(#[from] toml::de::Error),
	#[error("Invalid server config: {0}")]
	Invalid(String),
}

fn config_paths(filename: &str) -> Vec<PathBuf> {
	let mut paths = Vec::new();

	if let Some(home) = std::env::var_os("HOME") {
		let user_config = PathBuf::from(home).join(".config/uno-server").join(filename);
		paths.push(user_config);
	}

	paths.push(PathBuf::from("config").join(filename));

	paths
}

pub fn find_config(filename: &str) -> Option<PathBuf> {
	config_paths(filename).into_iter().find(|p| p.exists())
}

/// Inclusive range a random delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DelayRange {
	pub min_ms: u64,
	pub max_ms: u64,
}

impl DelayRange {
	pub const fn new(min_ms: u64, max_ms: u64) -> Self {
		Self { min_ms, max_ms }
	}

	pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
		let ms = if self.max_ms <= self.min_ms {
			self.min_ms
		} else {
			rng.random_range(self.min_ms..=self.max_ms)
		};
		Duration::from_millis(ms)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
	pub bind: String,
	pub max_players: usize,
	pub hand_size: usize,
	pub uno_grace_ms: u64,
	pub ai_turn_delay_ms: DelayRange,
	pub ai_call_delay_ms: DelayRange,
	pub ai_catch_delay_ms: DelayRange,
	pub two_player_reverse_skips: bool,
	pub seed: Option<u64>,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			bind: "127.0.0.1:3001".to_string(),
			max_players: 4,
			hand_size: 7,
			uno_grace_ms: 3000,
			ai_turn_delay_ms: DelayRange::new(800, 1800),
			ai_call_delay_ms: DelayRange::new(500, 1500),
			ai_catch_delay_ms: DelayRange::new(800, 2000),
			two_player_reverse_skips: false,
			seed: None,
		}
	}
}

impl ServerConfig {
	pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
		let config: ServerConfig = toml::from_str(content)?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.max_players < 2 {
			return Err(ConfigError::Invalid("max_players must be at least 2".to_string()));
		}
		if self.hand_size == 0 {
			return Err(ConfigError::Invalid("hand_size must be at least 1".to_string()));
		}
		if self.max_players * self.hand_size + 1 > DECK_SIZE {
			return Err(ConfigError::Invalid(format!(
				"{} players with {} cards each do not fit in a {} card deck",
				self.max_players, self.hand_size, DECK_SIZE
			)));
		}
		Ok(())
	}

	pub fn rules(&self) -> Rules {
		Rules {
			hand_size: self.hand_size,
			two_player_reverse_skips: self.two_player_reverse_skips,
		}
	}

	pub fn uno_grace(&self) -> Duration {
		Duration::from_millis(self.uno_grace_ms)
	}
}

pub fn load_server_config<P: AsRef<Path>>(path: P) -> Result<ServerConfig, ConfigError> {
	let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
		path: path.as_ref().to_path_buf(),
		source,
	})?;
	ServerConfig::from_toml(&content)
}

/// Searches the usual locations; defaults when no file exists.
pub fn load_server_config_auto() -> Result<ServerConfig, ConfigError> {
	match find_config(CONFIG_FILE) {
		Some(path) => load_server_config(&path),
		None => Ok(ServerConfig::default()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	#[test]
	fn test_empty_file_is_default() {
		let config = ServerConfig::from_toml("").unwrap();
		assert_eq!(config, ServerConfig::default());
	}

	#[test]
	fn test_partial_override() {
		let config = ServerConfig::from_toml(
			r#"
			bind = "0.0.0.0:4000"
			uno_grace_ms = 1500
			ai_call_delay_ms = { min_ms = 100, max_ms = 200 }
			seed = 9
			"#,
		)
		.unwrap();
		assert_eq!(config.bind, "0.0.0.0:4000");
		assert_eq!(config.uno_grace(), Duration::from_millis(1500));
		assert_eq!(config.ai_call_delay_ms, DelayRange::new(100, 200));
		assert_eq!(config.seed, Some(9));
		assert_eq!(config.max_players, 4);
	}

	#[test]
	fn test_rejects_oversized_table() {
		let result = ServerConfig::from_toml("max_players = 20\nhand_size = 7");
		assert!(matches!(result, Err(ConfigError::Invalid(_))));
	}

	#[test]
	fn test_rejects_bad_toml() {
		let result = ServerConfig::from_toml("max_players = \"four\"");
		assert!(matches!(result, Err(ConfigError::Parse(_))));
	}

	#[test]
	fn test_delay_range_sample_bounds() {
		let mut rng = StdRng::seed_from_u64(1);
		let range = DelayRange::new(500, 1500);
		for _ in 0..100 {
			let d = range.sample(&mut rng);
			assert!(d >= Duration::from_millis(500) && d <= Duration::from_millis(1500));
		}
		assert_eq!(DelayRange::new(300, 300).sample(&mut rng), Duration::from_millis(300));
	}

	#[test]
	fn test_missing_file_reports_path() {
		let result = load_server_config("/nonexistent/uno/server.toml");
		match result {
			Err(ConfigError::Read { path, .. }) => assert!(path.ends_with("server.toml")),
			other => panic!("unexpected: {:?}", other),
		}
	}
}
