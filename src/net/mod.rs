pub mod client;
pub mod protocol;
pub mod server;

pub use client::GameClient;
pub use protocol::{ClientMessage, ProtocolError, ServerMessage};
pub use server::{route, GameServer};
