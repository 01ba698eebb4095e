use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::events::ConnectionId;
use crate::lobby::{lock_mutex, Delivery, LobbyManager, MessageSink, Reaction};
use crate::logging;
use crate::net::protocol::*;

type Outbox = UnboundedSender<ServerMessage>;
type Outboxes = Arc<Mutex<HashMap<ConnectionId, Outbox>>>;

/// Hands deliveries to the writer tasks. The manager calls this under the
/// lobby lock; queueing never blocks.
struct WriterSink(Outboxes);

impl MessageSink for WriterSink {
	fn send(&self, delivery: Delivery) {
		queue(&lock_mutex(&self.0), delivery);
	}
}

fn queue(outboxes: &HashMap<ConnectionId, Outbox>, delivery: Delivery) {
	// Recipients that already hung up are skipped.
	if let Some(outbox) = outboxes.get(&delivery.to) {
		if outbox.send(delivery.message).is_err() {
			logging::net::send_failed(delivery.to.0, "writer closed");
		}
	}
}

/// TCP front end. Decodes frames and hands them to the [`LobbyManager`],
/// which queues outbound messages on the writer tasks while it still holds
/// the lobby lock. No lobby lock is ever held while writing to a socket.
/// The returned [`Reaction`] only arms timers.
#[derive(Clone)]
pub struct GameServer {
	manager: Arc<LobbyManager>,
	connections: Outboxes,
	next_conn_id: Arc<AtomicU64>,
}

impl GameServer {
	pub fn new(mut manager: LobbyManager) -> Self {
		let connections: Outboxes = Arc::new(Mutex::new(HashMap::new()));
		manager.set_sink(Arc::new(WriterSink(Arc::clone(&connections))));
		Self {
			manager: Arc::new(manager),
			connections,
			next_conn_id: Arc::new(AtomicU64::new(1)),
		}
	}

	pub fn manager(&self) -> &LobbyManager {
		&self.manager
	}

	pub async fn run(&self, addr: &str) -> std::io::Result<()> {
		let listener = TcpListener::bind(addr).await?;
		self.run_with_listener(listener).await
	}

	pub async fn run_with_listener(&self, listener: TcpListener) -> std::io::Result<()> {
		logging::net::listening(&listener.local_addr()?.to_string());

		loop {
			match listener.accept().await {
				Ok((stream, peer)) => {
					let server = self.clone();
					tokio::spawn(async move {
						server.handle_connection(stream, peer).await;
					});
				}
				Err(e) => {
					logging::net::accept_failed(&e.to_string());
				}
			}
		}
	}

	async fn handle_connection(self, stream: TcpStream, peer: SocketAddr) {
		let conn = ConnectionId(self.next_conn_id.fetch_add(1, Ordering::Relaxed));
		let (mut reader, writer) = stream.into_split();
		let (tx, rx) = mpsc::unbounded_channel();

		lock_mutex(&self.connections).insert(conn, tx.clone());
		logging::net::connected(conn.0, &peer.to_string());
		tokio::spawn(write_loop(conn, writer, rx));
		let _ = tx.send(ServerMessage::Welcome { connection_id: conn });
		drop(tx);

		let mut buf = vec![0u8; 4096];
		let mut pending = Vec::new();

		'read: loop {
			match reader.read(&mut buf).await {
				Ok(0) => break,
				Ok(n) => {
					pending.extend_from_slice(&buf[..n]);
					loop {
						match try_decode_message::<ClientMessage>(&mut pending) {
							Ok(Some(msg)) => self.dispatch(conn, msg),
							Ok(None) => break,
							Err(ProtocolError::Json(e)) => {
								logging::net::malformed(conn.0, &e.to_string());
							}
							Err(e) => {
								logging::net::malformed(conn.0, &e.to_string());
								break 'read;
							}
						}
					}
				}
				Err(_) => break,
			}
		}

		// Cleanup on disconnect
		lock_mutex(&self.connections).remove(&conn);
		let reaction = self.manager.disconnect(conn);
		self.deliver(reaction);
		logging::net::disconnected(conn.0);
	}

	pub fn dispatch(&self, conn: ConnectionId, msg: ClientMessage) {
		let reaction = route(&self.manager, conn, msg);
		self.deliver(reaction);
	}

	/// Queues whatever the manager did not send itself (replies that needed
	/// no lobby lock) and arms timers. Must run inside the tokio runtime.
	pub fn deliver(&self, reaction: Reaction) {
		if !reaction.deliveries.is_empty() {
			let connections = lock_mutex(&self.connections);
			for delivery in reaction.deliveries {
				queue(&connections, delivery);
			}
		}

		for timer in reaction.timers {
			let server = self.clone();
			tokio::spawn(async move {
				tokio::time::sleep(timer.delay).await;
				let reaction = server.manager.fire_timer(&timer.code, timer.kind);
				server.deliver(reaction);
			});
		}
	}
}

/// Maps one inbound message onto the lobby manager.
pub fn route(manager: &LobbyManager, conn: ConnectionId, msg: ClientMessage) -> Reaction {
	match msg {
		ClientMessage::CreateLobby { player_name, password } => {
			manager.create_lobby(conn, &player_name, password).1
		}
		ClientMessage::JoinLobby { code, player_name, password } => {
			manager.join_lobby(conn, &code, &player_name, password.as_deref())
		}
		ClientMessage::AddAi { code } => manager.add_ai(conn, &code),
		ClientMessage::RemoveAi { code, ai_id } => manager.remove_ai(conn, &code, &ai_id),
		ClientMessage::ToggleReady { code } => manager.toggle_ready(conn, &code),
		ClientMessage::StartGame { code } => manager.start_game(conn, &code),
		ClientMessage::GameAction { code, action, data } => manager.game_action(conn, &code, action, data),
		ClientMessage::LeaveLobby { code } => manager.leave_lobby(conn, &code),
		ClientMessage::PlayCard { code, card_id, chosen_color } => {
			manager.play_card(conn, &code, card_id, chosen_color)
		}
		ClientMessage::DrawCard { code } => manager.draw_card(conn, &code),
		ClientMessage::PassTurn { code } => manager.pass_turn(conn, &code),
		ClientMessage::CallUno { code } => manager.call_uno(conn, &code),
		ClientMessage::CatchUno { code } => manager.catch_uno(conn, &code),
	}
}

async fn write_loop(conn: ConnectionId, mut writer: OwnedWriteHalf, mut rx: UnboundedReceiver<ServerMessage>) {
	while let Some(msg) = rx.recv().await {
		let data = match encode_message(&msg) {
			Ok(data) => data,
			Err(e) => {
				logging::net::send_failed(conn.0, &e.to_string());
				continue;
			}
		};
		if let Err(e) = writer.write_all(&data).await {
			logging::net::send_failed(conn.0, &e.to_string());
			break;
		}
	}
}
