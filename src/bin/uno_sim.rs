use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use uno_server::ai::{self, PriorityStrategy, Strategy};
use uno_server::card::Deck;
use uno_server::events::{GameEvent, UnoMode};
use uno_server::game::{GameSession, Rules, SeatInfo};
use uno_server::logging;

#[derive(Parser)]
#[command(name = "uno-sim")]
#[command(about = "Play an AI-only game of UNO and print the log")]
struct Cli {
	#[arg(short, long, default_value_t = 4)]
	players: usize,

	#[arg(short, long)]
	seed: Option<u64>,

	/// Stop after this many turns if nobody has won
	#[arg(long, default_value_t = 1000)]
	max_turns: usize,

	#[arg(long)]
	two_player_reverse_skips: bool,

	#[arg(long, env = "RUST_LOG")]
	log: Option<String>,
}

fn print_events(game: &GameSession, events: &[GameEvent]) {
	for event in events {
		let seat = match event {
			GameEvent::CardPlayed { seat, .. }
			| GameEvent::CardsDrawn { seat, .. }
			| GameEvent::TurnPassed { seat }
			| GameEvent::UnoCalled { seat } => Some(*seat),
			_ => None,
		};
		match seat.and_then(|s| game.seats().get(s.0)) {
			Some(info) => println!("  [{}] {}", info.name, event.description()),
			None => println!("  {}", event.description()),
		}
	}
}

fn main() {
	let cli = Cli::parse();
	logging::init(cli.log.as_deref());

	let players = cli.players.clamp(2, 10);
	let mut rng = match cli.seed {
		Some(seed) => StdRng::seed_from_u64(seed),
		None => StdRng::from_os_rng(),
	};

	let seats = (1..=players).map(|i| SeatInfo::ai(format!("AI Player {}", i))).collect();
	let rules = Rules {
		two_player_reverse_skips: cli.two_player_reverse_skips,
		..Rules::default()
	};
	let strategy = PriorityStrategy;

	let mut game = match GameSession::deal(seats, Deck::build(&mut rng), rules) {
		Ok(game) => game,
		Err(e) => {
			eprintln!("Deal failed: {}", e);
			std::process::exit(1);
		}
	};

	println!("=== UNO simulation: {} players, {} ===\n", players, strategy.name());
	println!("Starter: {} (deck {})", game.top_card(), game.deck_len());

	for turn in 1..=cli.max_turns {
		// Computer seats always beat the grace window in a simulation.
		if let Some(pending) = game.pending_uno().filter(|p| p.mode == UnoMode::Call) {
			if let Ok(events) = game.call_uno(pending.target) {
				print_events(&game, &events);
			}
		}

		let seat = game.current_seat();
		println!("Turn {} - {} holds {} cards", turn, game.seats()[seat.0].name, game.hand(seat).len());
		let events = ai::play_turn(&strategy, &mut game, seat);
		print_events(&game, &events);

		if events.is_empty() {
			println!("\nNo move possible, stopping.");
			break;
		}
		if let Some(winner) = game.winner() {
			println!("\n{} wins after {} turns.", game.seats()[winner.0].name, turn);
			break;
		}
	}

	if game.winner().is_none() {
		println!("\nNo winner. Hands: {:?}", game.hand_sizes());
	}
	println!("Cards accounted for: {}", game.total_cards());
}
