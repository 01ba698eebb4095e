use std::collections::BTreeSet;

use crate::card::{can_play, Card, CardId, CardKind, Color, Deck};
use crate::events::{
	ConnectionId, DrawReason, GameEvent, GameView, PendingUnoView, Phase, Seat, SeatView, UnoMode,
};
use crate::game::{GameError, MoveViolation};
use crate::turn::{self, Direction};

pub const STARTING_HAND: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rules {
	pub hand_size: usize,
	/// House rule: with two players a Reverse hands the turn straight back.
	pub two_player_reverse_skips: bool,
}

impl Default for Rules {
	fn default() -> Self {
		Self {
			hand_size: STARTING_HAND,
			two_player_reverse_skips: false,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Controller {
	Human(ConnectionId),
	Ai,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatInfo {
	pub name: String,
	pub controller: Controller,
}

impl SeatInfo {
	pub fn human(name: impl Into<String>, connection: ConnectionId) -> Self {
		Self {
			name: name.into(),
			controller: Controller::Human(connection),
		}
	}

	pub fn ai(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			controller: Controller::Ai,
		}
	}

	pub fn is_ai(&self) -> bool {
		self.controller == Controller::Ai
	}
}

/// The one seat currently exposed with a single undeclared card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingUno {
	pub target: Seat,
	pub mode: UnoMode,
	pub token: u64,
}

/// Authoritative state of one started game.
///
/// Every mutating call validates fully before touching state, so a rejected
/// action leaves the session exactly as it was. Mutations return the events
/// they caused, in order.
#[derive(Debug, Clone)]
pub struct GameSession {
	deck: Deck,
	discard: Vec<Card>,
	hands: Vec<Vec<Card>>,
	seats: Vec<SeatInfo>,
	current: Seat,
	direction: Direction,
	active_color: Color,
	uno_called: BTreeSet<Seat>,
	pending_uno: Option<PendingUno>,
	phase: Phase,
	winner: Option<Seat>,
	turn_serial: u64,
	next_token: u64,
	rules: Rules,
}

impl GameSession {
	/// Deals `rules.hand_size` cards to each seat in order, then turns up the
	/// earliest non-wild card left in the deck.
	///
	/// Unlike the table rule of throwing away the wilds turned up before the
	/// starter, the wilds passed over stay in the deck in their order, so all
	/// 108 cards remain in play for the whole game.
	pub fn deal(seats: Vec<SeatInfo>, mut deck: Deck, rules: Rules) -> Result<Self, GameError> {
		if deck.len() < seats.len() * rules.hand_size + 1 {
			return Err(GameError::NotEnoughCards);
		}

		let hands: Vec<Vec<Card>> = seats.iter().map(|_| deck.draw(rules.hand_size)).collect();
		let starter = deck
			.take_first_matching(|c| !c.is_wild())
			.ok_or(GameError::NotEnoughCards)?;

		let mut session = Self {
			deck,
			discard: vec![starter],
			hands,
			seats,
			current: Seat(0),
			direction: Direction::Clockwise,
			active_color: starter.color(),
			uno_called: BTreeSet::new(),
			pending_uno: None,
			phase: Phase::Dealt,
			winner: None,
			turn_serial: 0,
			next_token: 0,
			rules,
		};

		let mut events = Vec::new();
		session.check_uno_exposure(&mut events);
		Ok(session)
	}

	pub fn play_card(
		&mut self,
		seat: Seat,
		card_id: CardId,
		chosen_color: Option<Color>,
	) -> Result<Vec<GameEvent>, GameError> {
		self.ensure_turn(seat)?;

		let index = self.hands[seat.0]
			.iter()
			.position(|c| c.id() == card_id)
			.ok_or(GameError::IllegalMove(MoveViolation::CardNotInHand))?;
		let card = self.hands[seat.0][index];

		if !can_play(&card, &self.top_card(), self.active_color) {
			return Err(GameError::IllegalMove(MoveViolation::DoesNotMatch));
		}

		let color = if card.is_wild() {
			match chosen_color {
				Some(c) if !c.is_wild() => c,
				_ => return Err(GameError::IllegalMove(MoveViolation::ColorRequired)),
			}
		} else {
			card.color()
		};

		let mut events = Vec::new();
		self.phase = Phase::InProgress;
		self.hands[seat.0].remove(index);
		self.discard.push(card);
		self.active_color = color;
		events.push(GameEvent::CardPlayed { seat, card, active_color: color });

		if self.hands[seat.0].is_empty() {
			self.winner = Some(seat);
			self.phase = Phase::Over;
			self.pending_uno = None;
			events.push(GameEvent::GameWon { seat });
			return Ok(events);
		}

		if self.hands[seat.0].len() > 1 {
			self.uno_called.remove(&seat);
		}

		match card.kind() {
			CardKind::Skip => self.advance_turn(2, &mut events),
			CardKind::Reverse => {
				self.direction = self.direction.flip();
				events.push(GameEvent::DirectionChanged { direction: self.direction });
				let steps = if self.seats.len() == 2 && self.rules.two_player_reverse_skips { 2 } else { 1 };
				self.advance_turn(steps, &mut events);
			}
			CardKind::DrawTwo => self.punish_next(2, DrawReason::DrawTwo, &mut events),
			CardKind::WildDrawFour => self.punish_next(4, DrawReason::WildDrawFour, &mut events),
			CardKind::Number(_) | CardKind::Wild => self.advance_turn(1, &mut events),
		}

		self.check_uno_exposure(&mut events);
		Ok(events)
	}

	/// Moves up to `count` cards from the deck into a seat's hand, regardless of turn.
	pub fn draw_card(&mut self, seat: Seat, count: usize) -> Result<(Vec<Card>, Vec<GameEvent>), GameError> {
		self.ensure_playing()?;
		self.ensure_seat(seat)?;

		let mut events = Vec::new();
		let drawn = self.draw_into(seat, count, DrawReason::Voluntary, &mut events);
		self.check_uno_exposure(&mut events);
		Ok((drawn, events))
	}

	/// The current player takes one card instead of playing; the turn moves on.
	pub fn draw_for_turn(&mut self, seat: Seat) -> Result<Vec<GameEvent>, GameError> {
		self.ensure_turn(seat)?;
		if self.deck.is_empty() {
			return Err(GameError::NoCardsToDraw);
		}

		let mut events = Vec::new();
		self.phase = Phase::InProgress;
		self.draw_into(seat, 1, DrawReason::Voluntary, &mut events);
		self.advance_turn(1, &mut events);
		self.check_uno_exposure(&mut events);
		Ok(events)
	}

	/// Only allowed once the deck is exhausted, so a stuck player can yield the turn.
	pub fn pass_turn(&mut self, seat: Seat) -> Result<Vec<GameEvent>, GameError> {
		self.ensure_turn(seat)?;
		if !self.deck.is_empty() {
			return Err(GameError::CannotPass);
		}

		let mut events = vec![GameEvent::TurnPassed { seat }];
		self.phase = Phase::InProgress;
		self.advance_turn(1, &mut events);
		Ok(events)
	}

	pub fn call_uno(&mut self, seat: Seat) -> Result<Vec<GameEvent>, GameError> {
		self.ensure_playing()?;
		self.ensure_seat(seat)?;

		let pending = match self.pending_uno {
			Some(p) if p.target == seat => p,
			_ => return Err(GameError::UnoNotPending),
		};
		if pending.mode == UnoMode::Catch {
			return Err(GameError::UnoTooLate);
		}

		let mut events = Vec::new();
		self.uno_called.insert(seat);
		self.pending_uno = None;
		events.push(GameEvent::UnoCalled { seat });
		self.check_uno_exposure(&mut events);
		Ok(events)
	}

	/// First catch during the catch window wins; later ones find nothing pending.
	pub fn catch_uno(&mut self, catcher: Seat) -> Result<Vec<GameEvent>, GameError> {
		self.ensure_playing()?;
		self.ensure_seat(catcher)?;

		let pending = self.pending_uno.ok_or(GameError::UnoNotPending)?;
		if pending.target == catcher {
			return Err(GameError::CannotCatchSelf);
		}
		if pending.mode == UnoMode::Call {
			return Err(GameError::UnoTooEarly);
		}

		let mut events = vec![GameEvent::UnoCaught { target: pending.target, catcher }];
		self.pending_uno = None;
		self.draw_into(pending.target, 2, DrawReason::UnoPenalty, &mut events);
		self.check_uno_exposure(&mut events);
		Ok(events)
	}

	/// Grace window elapsed. Stale tokens are ignored.
	pub fn expire_grace(&mut self, token: u64) -> Vec<GameEvent> {
		match self.pending_uno.as_mut() {
			Some(p) if p.token == token && p.mode == UnoMode::Call && self.winner.is_none() => {
				p.mode = UnoMode::Catch;
				vec![GameEvent::UnoCatchOpened { seat: p.target }]
			}
			_ => Vec::new(),
		}
	}

	/// Hands a seat to the house AI, e.g. when its player leaves mid-game.
	pub fn take_over(&mut self, seat: Seat) -> Result<Vec<GameEvent>, GameError> {
		self.ensure_seat(seat)?;
		let info = &mut self.seats[seat.0];
		if info.is_ai() {
			return Ok(Vec::new());
		}
		info.controller = Controller::Ai;
		Ok(vec![GameEvent::SeatTakenOver { seat }])
	}

	fn punish_next(&mut self, count: usize, reason: DrawReason, events: &mut Vec<GameEvent>) {
		let target = turn::next_seat(self.current, self.direction, self.seats.len());
		self.draw_into(target, count, reason, events);
		self.advance_turn(2, events);
	}

	fn advance_turn(&mut self, steps: usize, events: &mut Vec<GameEvent>) {
		let count = self.seats.len();
		let skipped = (steps > 1).then(|| turn::next_seat(self.current, self.direction, count));
		self.current = turn::advance(self.current, self.direction, count, steps);
		self.turn_serial += 1;
		events.push(GameEvent::TurnChanged { seat: self.current, skipped });
	}

	fn draw_into(
		&mut self,
		seat: Seat,
		count: usize,
		reason: DrawReason,
		events: &mut Vec<GameEvent>,
	) -> Vec<Card> {
		let drawn = self.deck.draw(count);
		if drawn.is_empty() {
			return drawn;
		}

		let hand = &mut self.hands[seat.0];
		hand.extend(drawn.iter().copied());
		if hand.len() > 1 {
			self.uno_called.remove(&seat);
		}
		events.push(GameEvent::CardsDrawn { seat, count: drawn.len(), reason });
		drawn
	}

	/// Keeps the pending exposure while its target still qualifies, otherwise
	/// opens one for the lowest exposed seat.
	fn check_uno_exposure(&mut self, events: &mut Vec<GameEvent>) {
		if self.winner.is_some() {
			self.pending_uno = None;
			return;
		}

		if let Some(pending) = self.pending_uno {
			if self.is_exposed(pending.target) {
				return;
			}
			self.pending_uno = None;
		}

		let exposed = (0..self.hands.len()).map(Seat).find(|&s| self.is_exposed(s));
		if let Some(seat) = exposed {
			self.next_token += 1;
			self.pending_uno = Some(PendingUno {
				target: seat,
				mode: UnoMode::Call,
				token: self.next_token,
			});
			events.push(GameEvent::UnoExposed { seat });
		}
	}

	fn is_exposed(&self, seat: Seat) -> bool {
		self.hands[seat.0].len() == 1 && !self.uno_called.contains(&seat)
	}

	fn ensure_playing(&self) -> Result<(), GameError> {
		if self.winner.is_some() {
			Err(GameError::GameOver)
		} else {
			Ok(())
		}
	}

	fn ensure_seat(&self, seat: Seat) -> Result<(), GameError> {
		if seat.0 < self.hands.len() {
			Ok(())
		} else {
			Err(GameError::UnknownSeat)
		}
	}

	fn ensure_turn(&self, seat: Seat) -> Result<(), GameError> {
		self.ensure_playing()?;
		self.ensure_seat(seat)?;
		if seat != self.current {
			return Err(GameError::IllegalMove(MoveViolation::NotYourTurn));
		}
		Ok(())
	}

	pub fn top_card(&self) -> Card {
		// The starter card is placed at deal time and the pile only grows.
		self.discard[self.discard.len() - 1]
	}

	pub fn active_color(&self) -> Color {
		self.active_color
	}

	pub fn direction(&self) -> Direction {
		self.direction
	}

	pub fn current_seat(&self) -> Seat {
		self.current
	}

	pub fn phase(&self) -> Phase {
		self.phase
	}

	pub fn winner(&self) -> Option<Seat> {
		self.winner
	}

	pub fn is_over(&self) -> bool {
		self.winner.is_some()
	}

	pub fn pending_uno(&self) -> Option<PendingUno> {
		self.pending_uno
	}

	pub fn has_called_uno(&self, seat: Seat) -> bool {
		self.uno_called.contains(&seat)
	}

	/// Bumped on every turn change; lets delayed AI turns detect staleness.
	pub fn turn_serial(&self) -> u64 {
		self.turn_serial
	}

	pub fn seat_count(&self) -> usize {
		self.seats.len()
	}

	pub fn seats(&self) -> &[SeatInfo] {
		&self.seats
	}

	pub fn is_ai(&self, seat: Seat) -> bool {
		self.seats.get(seat.0).is_some_and(SeatInfo::is_ai)
	}

	pub fn seat_of(&self, connection: ConnectionId) -> Option<Seat> {
		self.seats
			.iter()
			.position(|s| s.controller == Controller::Human(connection))
			.map(Seat)
	}

	pub fn hand(&self, seat: Seat) -> &[Card] {
		self.hands.get(seat.0).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn hand_sizes(&self) -> Vec<usize> {
		self.hands.iter().map(Vec::len).collect()
	}

	pub fn deck_len(&self) -> usize {
		self.deck.len()
	}

	pub fn discard_len(&self) -> usize {
		self.discard.len()
	}

	/// Deck, hands and discard pile together; constant for the life of a game.
	pub fn total_cards(&self) -> usize {
		self.deck.len() + self.hands.iter().map(Vec::len).sum::<usize>() + self.discard.len()
	}

	pub fn view_for(&self, viewer: Option<Seat>) -> GameView {
		let seats = self.seats
			.iter()
			.enumerate()
			.map(|(i, info)| SeatView {
				seat: Seat(i),
				name: info.name.clone(),
				card_count: self.hands[i].len(),
				is_ai: info.is_ai(),
				uno_called: self.uno_called.contains(&Seat(i)),
			})
			.collect();

		GameView {
			viewer,
			hand: viewer.map(|s| self.hand(s).to_vec()).unwrap_or_default(),
			seats,
			top_card: self.top_card(),
			active_color: self.active_color,
			direction: self.direction,
			current_seat: self.current,
			deck_count: self.deck.len(),
			discard_count: self.discard.len(),
			pending_uno: self.pending_uno.map(|p| PendingUnoView { target: p.target, mode: p.mode }),
			phase: self.phase,
			winner: self.winner,
		}
	}
}
