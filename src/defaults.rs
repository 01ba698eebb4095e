use include_dir::{include_dir, Dir};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::CONFIG_FILE;

static CONFIG_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/config");

/// Writes the bundled config files into the user config directory, never
/// overwriting files that already exist.
pub fn ensure_config() -> Option<PathBuf> {
	let user_config = dirs::config_dir()?;
	let dest = user_config.join("uno-server");

	extract_dir(&CONFIG_DIR, &dest);
	Some(dest)
}

fn extract_dir(dir: &Dir, dest: &Path) {
	for file in dir.files() {
		let file_dest = dest.join(file.path());
		if !file_dest.exists() {
			if let Some(parent) = file_dest.parent() {
				let _ = fs::create_dir_all(parent);
			}
			let _ = fs::write(&file_dest, file.contents());
		}
	}

	for subdir in dir.dirs() {
		extract_dir(subdir, dest);
	}
}

pub fn bundled_server_config() -> Option<&'static str> {
	CONFIG_DIR.get_file(CONFIG_FILE)?.contents_utf8()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::ServerConfig;

	#[test]
	fn test_bundled_config_matches_defaults() {
		let text = bundled_server_config().expect("server.toml is bundled");
		let config = ServerConfig::from_toml(text).unwrap();
		assert_eq!(config, ServerConfig::default());
	}
}
