mod rules;

pub use rules::{card_priority, most_common_color, PriorityStrategy, Situation};

use crate::card::{CardId, Color};
use crate::events::{GameEvent, Seat};
use crate::game::GameSession;
use crate::logging;

/// Decision contract for computer-controlled seats. The lobby feeds the
/// returned choice through the same entry points a human action uses.
pub trait Strategy: Send + Sync {
	fn name(&self) -> &str;

	/// `None` means no card is playable and the seat must draw.
	fn choose_card(&self, situation: &Situation<'_>) -> Option<CardId>;

	fn choose_color(&self, situation: &Situation<'_>) -> Color {
		most_common_color(situation.hand)
	}
}

/// Takes the turn for `seat` through the same entry points a human uses:
/// the chosen card if the game accepts it, otherwise a draw, otherwise a
/// pass on an empty deck.
pub fn play_turn(strategy: &dyn Strategy, game: &mut GameSession, seat: Seat) -> Vec<GameEvent> {
	let (choice, color) = {
		let situation = Situation::for_seat(game, seat);
		let choice = strategy.choose_card(&situation);
		let wild = choice
			.and_then(|id| situation.hand.iter().find(|c| c.id() == id))
			.is_some_and(|c| c.is_wild());
		let color = wild.then(|| strategy.choose_color(&situation));
		(choice, color)
	};

	let played = choice.and_then(|id| {
		let shown = match color {
			Some(color) => format!("{} as {}", id, color),
			None => id.to_string(),
		};
		logging::game::ai_move(seat.0, strategy.name(), &shown);
		game.play_card(seat, id, color).ok()
	});
	match played {
		Some(events) => events,
		None => game
			.draw_for_turn(seat)
			.or_else(|_| game.pass_turn(seat))
			.unwrap_or_default(),
	}
}
