use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use uno_server::config::ServerConfig;
use uno_server::events::{ConnectionId, GameEvent, Seat};
use uno_server::lobby::{LobbyCode, LobbyManager};
use uno_server::logging;
use uno_server::net::protocol::encode_message;
use uno_server::net::{ClientMessage, GameClient, GameServer, ServerMessage};

const WAIT: Duration = Duration::from_secs(5);

fn test_server() -> GameServer {
	let config = ServerConfig { seed: Some(99), ..ServerConfig::default() };
	GameServer::new(LobbyManager::new(config))
}

/// Starts a server on an ephemeral port. The runtime must outlive the test.
fn spawn_server() -> (Runtime, String) {
	logging::init_for_tests();
	let runtime = Runtime::new().unwrap();
	let listener = runtime.block_on(TcpListener::bind("127.0.0.1:0")).unwrap();
	let addr = listener.local_addr().unwrap().to_string();
	let server = test_server();
	runtime.spawn(async move {
		let _ = server.run_with_listener(listener).await;
	});
	(runtime, addr)
}

fn connect(addr: &str) -> (GameClient, ConnectionId) {
	let client = GameClient::connect(addr).unwrap();
	let welcome = client.wait_for(WAIT, |m| matches!(m, ServerMessage::Welcome { .. }));
	match welcome {
		Some(ServerMessage::Welcome { connection_id }) => (client, connection_id),
		other => panic!("expected welcome, got {:?}", other),
	}
}

fn lobby_code(client: &GameClient) -> LobbyCode {
	match client.wait_for(WAIT, |m| matches!(m, ServerMessage::LobbyCreated(_))) {
		Some(ServerMessage::LobbyCreated(lobby)) => lobby.code,
		other => panic!("expected lobby-created, got {:?}", other),
	}
}

#[test]
fn test_two_players_and_two_ai_over_tcp() {
	let (_runtime, addr) = spawn_server();
	let (mut alice, alice_id) = connect(&addr);
	let (mut bob, bob_id) = connect(&addr);
	assert_ne!(alice_id, bob_id);

	alice.create_lobby("Alice", None).unwrap();
	let code = lobby_code(&alice);

	bob.join_lobby(&code, "Bob", None).unwrap();
	let joined = bob.wait_for(WAIT, |m| matches!(m, ServerMessage::LobbyJoined(_)));
	assert!(joined.is_some());
	let updated = alice.wait_for(WAIT, |m| matches!(m, ServerMessage::LobbyUpdated(l) if l.players.len() == 2));
	assert!(updated.is_some());

	alice.add_ai(&code).unwrap();
	alice.add_ai(&code).unwrap();
	alice.wait_for(WAIT, |m| matches!(m, ServerMessage::LobbyUpdated(l) if l.ai_players.len() == 2)).unwrap();
	bob.toggle_ready(&code).unwrap();
	alice.wait_for(WAIT, |m| matches!(m, ServerMessage::LobbyUpdated(l) if l.players.get(1).is_some_and(|p| p.is_ready))).unwrap();

	alice.start_game(&code).unwrap();
	for (client, seat) in [(&alice, Seat(0)), (&bob, Seat(1))] {
		match client.wait_for(WAIT, |m| matches!(m, ServerMessage::GameStarted(_))) {
			Some(ServerMessage::GameStarted(lobby)) => {
				let view = lobby.game_state.unwrap();
				assert_eq!(view.viewer, Some(seat));
				assert_eq!(view.hand.len(), 7);
				assert_eq!(view.seats.len(), 4);
				assert_eq!(view.discard_count, 1);
				assert_eq!(view.current_seat, Seat(0));
			}
			other => panic!("expected game-started, got {:?}", other),
		}
	}

	bob.game_action(&code, json!("emote"), json!({ "face": "grin" })).unwrap();
	match alice.wait_for(WAIT, |m| matches!(m, ServerMessage::GameAction { .. })) {
		Some(ServerMessage::GameAction { action, data, player_id }) => {
			assert_eq!(action, json!("emote"));
			assert_eq!(data["face"], "grin");
			assert_eq!(player_id, bob_id);
		}
		other => panic!("expected game-action, got {:?}", other),
	}

	// Bob hangs up; his seat keeps playing as the AI.
	drop(bob);
	let left = alice.wait_for(WAIT, |m| matches!(m, ServerMessage::PlayerLeft { .. }));
	assert_eq!(left, Some(ServerMessage::PlayerLeft { player_id: bob_id }));
	let taken = alice.wait_for(WAIT, |m| matches!(
		m,
		ServerMessage::GameUpdated { events, .. } if events.contains(&GameEvent::SeatTakenOver { seat: Seat(1) })
	));
	assert!(taken.is_some());
}

#[test]
fn test_errors_reach_only_the_sender() {
	let (_runtime, addr) = spawn_server();
	let (mut alice, _) = connect(&addr);
	let (mut bob, _) = connect(&addr);

	alice.create_lobby("Alice", Some("pw")).unwrap();
	let code = lobby_code(&alice);

	bob.join_lobby(&code, "Bob", Some("wrong")).unwrap();
	let error = bob.wait_for(WAIT, |m| matches!(m, ServerMessage::JoinError { .. }));
	assert_eq!(error, Some(ServerMessage::JoinError { error: "Incorrect password".into() }));

	bob.start_game(&code).unwrap();
	let error = bob.wait_for(WAIT, |m| matches!(m, ServerMessage::Error { .. }));
	assert_eq!(error, Some(ServerMessage::Error { error: "Only host can start the game".into() }));

	assert!(alice.recv_timeout(Duration::from_millis(200)).is_none());
}

async fn read_message(stream: &mut TcpStream) -> ServerMessage {
	let mut len = [0u8; 4];
	stream.read_exact(&mut len).await.unwrap();
	let mut body = vec![0u8; u32::from_be_bytes(len) as usize];
	stream.read_exact(&mut body).await.unwrap();
	serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_malformed_frames_are_skipped() {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	let server = test_server();
	tokio::spawn(async move {
		let _ = server.run_with_listener(listener).await;
	});

	let mut stream = TcpStream::connect(addr).await.unwrap();
	assert!(matches!(read_message(&mut stream).await, ServerMessage::Welcome { .. }));

	let garbage = b"{\"event\":\"shuffle-the-table\"}";
	let mut frame = (garbage.len() as u32).to_be_bytes().to_vec();
	frame.extend_from_slice(garbage);
	stream.write_all(&frame).await.unwrap();

	let create = ClientMessage::CreateLobby { player_name: "Alice".into(), password: None };
	stream.write_all(&encode_message(&create).unwrap()).await.unwrap();

	match read_message(&mut stream).await {
		ServerMessage::LobbyCreated(lobby) => {
			assert_eq!(lobby.players.len(), 1);
			assert!(!lobby.has_password);
		}
		other => panic!("expected lobby-created, got {:?}", other),
	}
}
