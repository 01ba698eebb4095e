use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::card::{CardId, Color};
use crate::lobby::LobbyCode;
use crate::net::protocol::*;

/// Blocking client with a background reader thread.
pub struct GameClient {
	stream: TcpStream,
	rx: Receiver<ServerMessage>,
}

impl GameClient {
	pub fn connect(addr: &str) -> io::Result<Self> {
		let stream = TcpStream::connect(addr)?;
		stream.set_read_timeout(Some(Duration::from_millis(100)))?;

		let reader = stream.try_clone()?;
		let (tx, rx) = mpsc::channel();

		thread::spawn(move || {
			read_loop(reader, tx);
		});

		Ok(Self { stream, rx })
	}

	pub fn send(&mut self, msg: &ClientMessage) -> io::Result<()> {
		let data = encode_message(msg).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
		self.stream.write_all(&data)
	}

	pub fn try_recv(&self) -> Option<ServerMessage> {
		self.rx.try_recv().ok()
	}

	pub fn recv(&self) -> Option<ServerMessage> {
		self.rx.recv().ok()
	}

	pub fn recv_timeout(&self, timeout: Duration) -> Option<ServerMessage> {
		self.rx.recv_timeout(timeout).ok()
	}

	/// Discards messages until one matches or `timeout` runs out.
	pub fn wait_for<F>(&self, timeout: Duration, mut pred: F) -> Option<ServerMessage>
	where
		F: FnMut(&ServerMessage) -> bool,
	{
		let deadline = Instant::now() + timeout;
		loop {
			let left = deadline.checked_duration_since(Instant::now())?;
			let msg = self.recv_timeout(left)?;
			if pred(&msg) {
				return Some(msg);
			}
		}
	}

	pub fn create_lobby(&mut self, player_name: &str, password: Option<&str>) -> io::Result<()> {
		self.send(&ClientMessage::CreateLobby {
			player_name: player_name.to_string(),
			password: password.map(str::to_string),
		})
	}

	pub fn join_lobby(&mut self, code: &LobbyCode, player_name: &str, password: Option<&str>) -> io::Result<()> {
		self.send(&ClientMessage::JoinLobby {
			code: code.clone(),
			player_name: player_name.to_string(),
			password: password.map(str::to_string),
		})
	}

	pub fn add_ai(&mut self, code: &LobbyCode) -> io::Result<()> {
		self.send(&ClientMessage::AddAi { code: code.clone() })
	}

	pub fn remove_ai(&mut self, code: &LobbyCode, ai_id: &str) -> io::Result<()> {
		self.send(&ClientMessage::RemoveAi {
			code: code.clone(),
			ai_id: ai_id.to_string(),
		})
	}

	pub fn toggle_ready(&mut self, code: &LobbyCode) -> io::Result<()> {
		self.send(&ClientMessage::ToggleReady { code: code.clone() })
	}

	pub fn start_game(&mut self, code: &LobbyCode) -> io::Result<()> {
		self.send(&ClientMessage::StartGame { code: code.clone() })
	}

	pub fn game_action(&mut self, code: &LobbyCode, action: Value, data: Value) -> io::Result<()> {
		self.send(&ClientMessage::GameAction {
			code: code.clone(),
			action,
			data,
		})
	}

	pub fn leave_lobby(&mut self, code: &LobbyCode) -> io::Result<()> {
		self.send(&ClientMessage::LeaveLobby { code: code.clone() })
	}

	pub fn play_card(&mut self, code: &LobbyCode, card_id: CardId, chosen_color: Option<Color>) -> io::Result<()> {
		self.send(&ClientMessage::PlayCard {
			code: code.clone(),
			card_id,
			chosen_color,
		})
	}

	pub fn draw_card(&mut self, code: &LobbyCode) -> io::Result<()> {
		self.send(&ClientMessage::DrawCard { code: code.clone() })
	}

	pub fn pass_turn(&mut self, code: &LobbyCode) -> io::Result<()> {
		self.send(&ClientMessage::PassTurn { code: code.clone() })
	}

	pub fn call_uno(&mut self, code: &LobbyCode) -> io::Result<()> {
		self.send(&ClientMessage::CallUno { code: code.clone() })
	}

	pub fn catch_uno(&mut self, code: &LobbyCode) -> io::Result<()> {
		self.send(&ClientMessage::CatchUno { code: code.clone() })
	}
}

impl Drop for GameClient {
	/// The reader thread holds a clone of the socket; shutting down closes both.
	fn drop(&mut self) {
		let _ = self.stream.shutdown(Shutdown::Both);
	}
}

fn read_loop(mut reader: TcpStream, tx: Sender<ServerMessage>) {
	let mut buf = vec![0u8; 4096];
	let mut pending = Vec::new();

	loop {
		match reader.read(&mut buf) {
			Ok(0) => break,
			Ok(n) => {
				pending.extend_from_slice(&buf[..n]);
				loop {
					match try_decode_message::<ServerMessage>(&mut pending) {
						Ok(Some(msg)) => {
							if tx.send(msg).is_err() {
								return;
							}
						}
						Ok(None) => break,
						Err(ProtocolError::Json(_)) => continue,
						Err(_) => return,
					}
				}
			}
			Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
				continue;
			}
			Err(ref e) if e.kind() == io::ErrorKind::TimedOut => {
				continue;
			}
			Err(_) => break,
		}
	}
}
