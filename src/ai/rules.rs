use crate::ai::Strategy;
use crate::card::{can_play, Card, CardId, CardKind, Color};
use crate::events::Seat;
use crate::game::GameSession;
use crate::turn::{self, Direction};

/// Hand counts assumed for a seat the situation knows nothing about.
const UNKNOWN_HAND: usize = 7;

/// What a seat can see when it is its turn.
pub struct Situation<'a> {
	pub seat: Seat,
	pub hand: &'a [Card],
	pub top_card: Card,
	pub active_color: Color,
	pub direction: Direction,
	pub hand_sizes: Vec<usize>,
}

impl<'a> Situation<'a> {
	pub fn for_seat(session: &'a GameSession, seat: Seat) -> Self {
		Self {
			seat,
			hand: session.hand(seat),
			top_card: session.top_card(),
			active_color: session.active_color(),
			direction: session.direction(),
			hand_sizes: session.hand_sizes(),
		}
	}

	pub fn next_hand_size(&self) -> usize {
		let next = turn::next_seat(self.seat, self.direction, self.hand_sizes.len());
		self.hand_sizes.get(next.0).copied().unwrap_or(UNKNOWN_HAND)
	}

	pub fn playable(&self) -> impl Iterator<Item = &'a Card> + '_ {
		self.hand.iter().filter(|c| can_play(c, &self.top_card, self.active_color))
	}
}

/// Most frequent non-wild color; ties go to the color seen first. Red when
/// the hand holds only wilds.
pub fn most_common_color(hand: &[Card]) -> Color {
	let mut counts: Vec<(Color, usize)> = Vec::new();
	for card in hand.iter().filter(|c| !c.color().is_wild()) {
		match counts.iter_mut().find(|(color, _)| *color == card.color()) {
			Some((_, count)) => *count += 1,
			None => counts.push((card.color(), 1)),
		}
	}

	let mut best = (Color::Red, 0);
	for (color, count) in counts {
		if count > best.1 {
			best = (color, count);
		}
	}
	best.0
}

/// Higher scores are played first.
pub fn card_priority(card: &Card, situation: &Situation<'_>) -> i32 {
	let next = situation.next_hand_size();
	let own = situation.hand.len();

	let mut priority = match card.kind() {
		CardKind::Number(v) => v as i32,
		CardKind::Skip => 50 + if next <= 2 { 30 } else { 0 },
		CardKind::Reverse => 45 + if next <= 2 { 25 } else { 0 },
		CardKind::DrawTwo => {
			let mut p = 60;
			if next <= 2 {
				p += 40;
			}
			if next == 1 {
				p += 30;
			}
			p
		}
		CardKind::Wild => 70 - if own > 3 { 20 } else { 0 },
		CardKind::WildDrawFour => {
			let mut p = 80;
			if next <= 2 {
				p += 50;
			}
			if next == 1 {
				p += 40;
			}
			if next > 3 && own > 3 {
				p -= 30;
			}
			p
		}
	};

	if let (Some(a), Some(b)) = (card.value(), situation.top_card.value()) {
		if a == b {
			priority += 15;
		}
	}

	if !card.is_wild() && card.color() != most_common_color(situation.hand) {
		priority += 5;
	}

	priority
}

/// Plays the highest-priority legal card; the first card wins a tie.
#[derive(Debug, Default, Clone, Copy)]
pub struct PriorityStrategy;

impl Strategy for PriorityStrategy {
	fn name(&self) -> &str {
		"priority"
	}

	fn choose_card(&self, situation: &Situation<'_>) -> Option<CardId> {
		let playable: Vec<&Card> = situation.playable().collect();
		if playable.len() == 1 {
			return Some(playable[0].id());
		}

		let mut best: Option<(&Card, i32)> = None;
		for card in playable {
			let score = card_priority(card, situation);
			if best.is_none_or(|(_, top)| score > top) {
				best = Some((card, score));
			}
		}
		best.map(|(card, _)| card.id())
	}
}
