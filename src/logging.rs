use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber. `filter` wins over `RUST_LOG`; the fallback is `info`.
/// Safe to call more than once.
pub fn init(filter: Option<&str>) {
	let filter = filter
		.map(EnvFilter::new)
		.or_else(|| EnvFilter::try_from_default_env().ok())
		.unwrap_or_else(|| EnvFilter::new("info"));

	fmt()
		.with_env_filter(filter)
		.with_target(false)
		.try_init()
		.ok();
}

/// Quiet by default; `TEST_LOG` or `RUST_LOG` raise the level.
pub fn init_for_tests() {
	let filter = std::env::var("TEST_LOG")
		.or_else(|_| std::env::var("RUST_LOG"))
		.map(EnvFilter::new)
		.unwrap_or_else(|_| EnvFilter::new("warn"));

	fmt()
		.with_env_filter(filter)
		.with_test_writer()
		.without_time()
		.try_init()
		.ok();
}

pub mod lobby {
	use tracing::{debug, info};

	pub fn created(code: &str, host: &str) {
		info!(code, host, "lobby created");
	}

	pub fn joined(code: &str, player: &str) {
		info!(code, player, "player joined lobby");
	}

	pub fn left(code: &str, conn: u64) {
		info!(code, conn, "player left lobby");
	}

	pub fn host_changed(code: &str, host: u64) {
		info!(code, host, "host role transferred");
	}

	pub fn closed(code: &str) {
		info!(code, "lobby closed");
	}

	pub fn ai_added(code: &str, name: &str) {
		info!(code, name, "AI seat added");
	}

	pub fn ai_removed(code: &str, id: &str) {
		info!(code, id, "AI seat removed");
	}

	pub fn game_started(code: &str, seats: usize) {
		info!(code, seats, "game started");
	}

	pub fn rejected(code: &str, conn: u64, reason: &str) {
		debug!(code, conn, reason, "lobby request rejected");
	}
}

pub mod game {
	use tracing::{debug, info};

	pub fn event(code: &str, description: &str) {
		debug!(code, "{}", description);
	}

	pub fn won(code: &str, seat: usize, name: &str) {
		info!(code, seat, name, "game won");
	}

	pub fn ai_move(seat: usize, strategy: &str, choice: &str) {
		debug!(seat, strategy, choice, "AI move");
	}

	pub fn timer_ignored(code: &str, timer: &str, reason: &str) {
		debug!(code, timer, reason, "timer had nothing to do");
	}
}

pub mod net {
	use tracing::{debug, info, warn};

	pub fn listening(addr: &str) {
		info!(addr, "UNO server listening");
	}

	pub fn connected(conn: u64, peer: &str) {
		info!(conn, peer, "client connected");
	}

	pub fn disconnected(conn: u64) {
		info!(conn, "client disconnected");
	}

	pub fn malformed(conn: u64, error: &str) {
		debug!(conn, error, "ignoring malformed message");
	}

	pub fn send_failed(conn: u64, error: &str) {
		warn!(conn, error, "failed to deliver message");
	}

	pub fn accept_failed(error: &str) {
		warn!(error, "connection failed");
	}
}
