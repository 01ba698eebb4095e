use std::io::{self, Write};
use std::time::Duration;

use clap::Parser;
use uno_server::card::{CardId, Color};
use uno_server::lobby::LobbyCode;
use uno_server::net::{GameClient, ServerMessage};

#[derive(Parser)]
#[command(name = "uno-client")]
#[command(about = "Line-oriented client for an UNO server")]
struct Cli {
	#[arg(short, long, default_value = "127.0.0.1:3001")]
	server: String,

	#[arg(short, long)]
	name: Option<String>,
}

fn print_message(msg: &ServerMessage) {
	match msg {
		ServerMessage::LobbyCreated(lobby) | ServerMessage::LobbyJoined(lobby) => {
			println!("< in lobby {} ({} players, {} AI)", lobby.code, lobby.players.len(), lobby.ai_players.len());
		}
		ServerMessage::GameUpdated { events, state } => {
			for event in events {
				println!("< {}", event.description());
			}
			let hand: Vec<String> = state.hand.iter().map(|c| format!("{}:{}", c.id(), c)).collect();
			println!("< top {} ({}), turn {}, hand [{}]", state.top_card, state.active_color, state.current_seat, hand.join(", "));
		}
		other => println!("< {:?}", other),
	}
}

fn main() -> io::Result<()> {
	let cli = Cli::parse();
	println!("Connecting to {}...", cli.server);

	let mut client = GameClient::connect(&cli.server)?;
	println!("Connected!");

	let name = match cli.name {
		Some(name) => name,
		None => {
			print!("Enter name: ");
			io::stdout().flush()?;
			let mut name = String::new();
			io::stdin().read_line(&mut name)?;
			name.trim().to_string()
		}
	};

	let mut code: Option<LobbyCode> = None;

	loop {
		while let Some(msg) = client.try_recv() {
			if let ServerMessage::LobbyCreated(lobby) | ServerMessage::LobbyJoined(lobby) = &msg {
				code = Some(lobby.code.clone());
			}
			print_message(&msg);
		}

		print!("> ");
		io::stdout().flush()?;

		let mut input = String::new();
		io::stdin().read_line(&mut input)?;
		let words: Vec<&str> = input.split_whitespace().collect();

		let current = code.clone();
		match (words.as_slice(), current.as_ref()) {
			(["create"], _) => client.create_lobby(&name, None)?,
			(["create", password], _) => client.create_lobby(&name, Some(*password))?,
			(["join", c], _) => client.join_lobby(&LobbyCode::new(c), &name, None)?,
			(["join", c, password], _) => client.join_lobby(&LobbyCode::new(c), &name, Some(*password))?,
			(["ai"], Some(code)) => client.add_ai(code)?,
			(["rmai", id], Some(code)) => client.remove_ai(code, id)?,
			(["ready" | "r"], Some(code)) => client.toggle_ready(code)?,
			(["start"], Some(code)) => client.start_game(code)?,
			(["play" | "p", id], Some(code)) | (["play" | "p", id, _], Some(code)) => {
				let Ok(id) = id.parse::<u32>() else {
					println!("Card ids are numbers.");
					continue;
				};
				let color = words.get(2).and_then(|c| c.parse::<Color>().ok());
				client.play_card(code, CardId(id), color)?;
			}
			(["draw" | "d"], Some(code)) => client.draw_card(code)?,
			(["pass"], Some(code)) => client.pass_turn(code)?,
			(["uno" | "u"], Some(code)) => client.call_uno(code)?,
			(["catch" | "c"], Some(code)) => client.catch_uno(code)?,
			(["leave"], Some(current)) => {
				client.leave_lobby(current)?;
				code = None;
			}
			(["quit" | "q"], _) => break,
			(["help" | "h" | "?"], _) => {
				println!("Commands:");
				println!("  create [password]     - Create a lobby");
				println!("  join <code> [pw]      - Join a lobby");
				println!("  ai / rmai <id>        - Add or remove an AI seat (host)");
				println!("  ready, r              - Toggle ready");
				println!("  start                 - Start the game (host)");
				println!("  play <id> [color]     - Play a card, color for wilds");
				println!("  draw, d / pass        - Draw a card / pass on an empty deck");
				println!("  uno, u / catch, c     - Call UNO / catch someone");
				println!("  leave / quit, q       - Leave the lobby / disconnect");
			}
			([], _) => {}
			(_, None) => println!("Join or create a lobby first."),
			_ => println!("Unknown command. Type 'help' for commands."),
		}

		std::thread::sleep(Duration::from_millis(50));
	}

	println!("Disconnected.");
	Ok(())
}
