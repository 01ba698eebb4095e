use std::collections::VecDeque;
use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

pub const DECK_SIZE: usize = 108;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u32);

impl fmt::Display for CardId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
	Red,
	Blue,
	Green,
	Yellow,
	Wild,
}

impl Color {
	/// Colors a player may name when playing a wild card.
	pub const PLAYABLE: [Color; 4] = [Color::Red, Color::Blue, Color::Green, Color::Yellow];

	pub fn is_wild(self) -> bool {
		self == Color::Wild
	}
}

impl fmt::Display for Color {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Color::Red => "red",
			Color::Blue => "blue",
			Color::Green => "green",
			Color::Yellow => "yellow",
			Color::Wild => "wild",
		};
		f.write_str(name)
	}
}

impl std::str::FromStr for Color {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"red" | "r" => Ok(Color::Red),
			"blue" | "b" => Ok(Color::Blue),
			"green" | "g" => Ok(Color::Green),
			"yellow" | "y" => Ok(Color::Yellow),
			"wild" => Ok(Color::Wild),
			other => Err(format!("unknown color '{}'", other)),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardKind {
	Number(u8),
	Skip,
	Reverse,
	DrawTwo,
	Wild,
	WildDrawFour,
}

impl CardKind {
	pub fn is_wild(self) -> bool {
		matches!(self, CardKind::Wild | CardKind::WildDrawFour)
	}

	pub fn is_action(self) -> bool {
		matches!(self, CardKind::Skip | CardKind::Reverse | CardKind::DrawTwo)
	}
}

/// A single physical card. Identity is the id; color/kind pairs repeat across the deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "CardRepr", try_from = "CardRepr")]
pub struct Card {
	id: CardId,
	color: Color,
	kind: CardKind,
}

impl Card {
	pub fn new(id: CardId, color: Color, kind: CardKind) -> Self {
		Self { id, color, kind }
	}

	pub fn id(&self) -> CardId {
		self.id
	}

	pub fn color(&self) -> Color {
		self.color
	}

	pub fn kind(&self) -> CardKind {
		self.kind
	}

	pub fn value(&self) -> Option<u8> {
		match self.kind {
			CardKind::Number(v) => Some(v),
			_ => None,
		}
	}

	pub fn is_wild(&self) -> bool {
		self.kind.is_wild()
	}
}

impl fmt::Display for Card {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.kind {
			CardKind::Number(v) => write!(f, "{} {}", self.color, v),
			CardKind::Skip => write!(f, "{} skip", self.color),
			CardKind::Reverse => write!(f, "{} reverse", self.color),
			CardKind::DrawTwo => write!(f, "{} draw two", self.color),
			CardKind::Wild => f.write_str("wild"),
			CardKind::WildDrawFour => f.write_str("wild draw four"),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum KindTag {
	Number,
	Skip,
	Reverse,
	DrawTwo,
	Wild,
	WildDrawFour,
}

#[derive(Serialize, Deserialize)]
struct CardRepr {
	id: CardId,
	color: Color,
	#[serde(rename = "type")]
	kind: KindTag,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	value: Option<u8>,
}

impl From<Card> for CardRepr {
	fn from(card: Card) -> Self {
		let kind = match card.kind {
			CardKind::Number(_) => KindTag::Number,
			CardKind::Skip => KindTag::Skip,
			CardKind::Reverse => KindTag::Reverse,
			CardKind::DrawTwo => KindTag::DrawTwo,
			CardKind::Wild => KindTag::Wild,
			CardKind::WildDrawFour => KindTag::WildDrawFour,
		};
		Self {
			id: card.id,
			color: card.color,
			kind,
			value: card.value(),
		}
	}
}

impl TryFrom<CardRepr> for Card {
	type Error = String;

	fn try_from(repr: CardRepr) -> Result<Self, Self::Error> {
		let kind = match (repr.kind, repr.value) {
			(KindTag::Number, Some(v)) if v <= 9 => CardKind::Number(v),
			(KindTag::Number, other) => return Err(format!("number card needs a value 0-9, got {:?}", other)),
			(KindTag::Skip, _) => CardKind::Skip,
			(KindTag::Reverse, _) => CardKind::Reverse,
			(KindTag::DrawTwo, _) => CardKind::DrawTwo,
			(KindTag::Wild, _) => CardKind::Wild,
			(KindTag::WildDrawFour, _) => CardKind::WildDrawFour,
		};
		if kind.is_wild() != repr.color.is_wild() {
			return Err(format!("card {} has color {} but type {:?}", repr.id, repr.color, repr.kind));
		}
		Ok(Card::new(repr.id, repr.color, kind))
	}
}

/// Legality of playing `card` onto `top` while `active_color` is in force.
pub fn can_play(card: &Card, top: &Card, active_color: Color) -> bool {
	if card.is_wild() {
		return true;
	}

	if card.color == active_color || card.color == top.color {
		return true;
	}

	match (card.kind, top.kind) {
		(CardKind::Number(a), CardKind::Number(b)) => a == b,
		(a, b) => a == b,
	}
}

/// Draw pile, consumed from the front.
#[derive(Debug, Clone, Default)]
pub struct Deck {
	cards: VecDeque<Card>,
}

impl Deck {
	/// The canonical 108 cards in construction order, ids 0..108.
	pub fn unshuffled() -> Self {
		let mut cards = Vec::with_capacity(DECK_SIZE);
		let mut next_id = 0u32;
		let mut push = |cards: &mut Vec<Card>, color: Color, kind: CardKind| {
			cards.push(Card::new(CardId(next_id), color, kind));
			next_id += 1;
		};

		for color in Color::PLAYABLE {
			push(&mut cards, color, CardKind::Number(0));
			for value in 1..=9 {
				push(&mut cards, color, CardKind::Number(value));
				push(&mut cards, color, CardKind::Number(value));
			}
			for kind in [CardKind::Skip, CardKind::Reverse, CardKind::DrawTwo] {
				push(&mut cards, color, kind);
				push(&mut cards, color, kind);
			}
		}

		for _ in 0..4 {
			push(&mut cards, Color::Wild, CardKind::Wild);
			push(&mut cards, Color::Wild, CardKind::WildDrawFour);
		}

		Self { cards: cards.into() }
	}

	/// Fresh deck with an unbiased Fisher-Yates shuffle.
	pub fn build<R: Rng + ?Sized>(rng: &mut R) -> Self {
		let mut cards: Vec<Card> = Self::unshuffled().cards.into();
		cards.shuffle(rng);
		Self { cards: cards.into() }
	}

	pub fn from_cards(cards: Vec<Card>) -> Self {
		Self { cards: cards.into() }
	}

	pub fn len(&self) -> usize {
		self.cards.len()
	}

	pub fn is_empty(&self) -> bool {
		self.cards.is_empty()
	}

	pub fn peek(&self) -> Option<&Card> {
		self.cards.front()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Card> {
		self.cards.iter()
	}

	/// Takes up to `count` cards; fewer when the pile runs out.
	pub fn draw(&mut self, count: usize) -> Vec<Card> {
		let n = count.min(self.cards.len());
		self.cards.drain(..n).collect()
	}

	/// Removes the earliest card matching `pred`, leaving the rest in order.
	pub fn take_first_matching<F>(&mut self, pred: F) -> Option<Card>
	where
		F: Fn(&Card) -> bool,
	{
		let index = self.cards.iter().position(pred)?;
		self.cards.remove(index)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;
	use std::collections::HashSet;

	fn card(id: u32, color: Color, kind: CardKind) -> Card {
		Card::new(CardId(id), color, kind)
	}

	#[test]
	fn test_unshuffled_composition() {
		let deck = Deck::unshuffled();
		assert_eq!(deck.len(), DECK_SIZE);

		let numbers = deck.iter().filter(|c| c.value().is_some()).count();
		let actions = deck.iter().filter(|c| c.kind().is_action()).count();
		let wilds = deck.iter().filter(|c| c.is_wild()).count();
		assert_eq!(numbers, 76);
		assert_eq!(actions, 24);
		assert_eq!(wilds, 8);

		for color in Color::PLAYABLE {
			let zeros = deck.iter()
				.filter(|c| c.color() == color && c.value() == Some(0))
				.count();
			assert_eq!(zeros, 1, "one zero per color");
			let sevens = deck.iter()
				.filter(|c| c.color() == color && c.value() == Some(7))
				.count();
			assert_eq!(sevens, 2);
		}
	}

	#[test]
	fn test_build_contains_every_card_once() {
		let mut rng = StdRng::seed_from_u64(7);
		let deck = Deck::build(&mut rng);
		let ids: HashSet<CardId> = deck.iter().map(|c| c.id()).collect();
		assert_eq!(ids.len(), DECK_SIZE);
		assert!(ids.iter().all(|id| id.0 < DECK_SIZE as u32));
	}

	#[test]
	fn test_build_is_not_trivially_ordered() {
		let mut rng = StdRng::seed_from_u64(11);
		let deck = Deck::build(&mut rng);
		let in_place = deck.iter()
			.enumerate()
			.filter(|(i, c)| c.id().0 == *i as u32)
			.count();
		// Expected fixed points of a uniform permutation is 1.
		assert!(in_place < 10, "{} cards left in original position", in_place);
	}

	#[test]
	fn test_shuffle_spreads_first_card() {
		let mut rng = StdRng::seed_from_u64(3);
		let firsts: HashSet<CardId> = (0..200)
			.filter_map(|_| Deck::build(&mut rng).peek().map(|c| c.id()))
			.collect();
		assert!(firsts.len() > 50);
	}

	#[test]
	fn test_draw_caps_at_remaining() {
		let mut deck = Deck::from_cards(vec![
			card(1, Color::Red, CardKind::Number(1)),
			card(2, Color::Red, CardKind::Number(2)),
		]);
		let drawn = deck.draw(5);
		assert_eq!(drawn.len(), 2);
		assert_eq!(drawn[0].id(), CardId(1));
		assert!(deck.is_empty());
		assert!(deck.draw(1).is_empty());
	}

	#[test]
	fn test_take_first_matching_keeps_order() {
		let mut deck = Deck::from_cards(vec![
			card(1, Color::Wild, CardKind::Wild),
			card(2, Color::Wild, CardKind::WildDrawFour),
			card(3, Color::Blue, CardKind::Number(4)),
			card(4, Color::Red, CardKind::Skip),
		]);
		let first = deck.take_first_matching(|c| !c.is_wild()).expect("non-wild");
		assert_eq!(first.id(), CardId(3));
		let rest: Vec<u32> = deck.iter().map(|c| c.id().0).collect();
		assert_eq!(rest, vec![1, 2, 4]);
	}

	#[test]
	fn test_can_play_matches() {
		let top = card(0, Color::Red, CardKind::Number(5));

		assert!(can_play(&card(1, Color::Red, CardKind::Number(9)), &top, Color::Red));
		assert!(can_play(&card(2, Color::Blue, CardKind::Number(5)), &top, Color::Red));
		assert!(!can_play(&card(3, Color::Blue, CardKind::Number(6)), &top, Color::Red));
		assert!(!can_play(&card(4, Color::Blue, CardKind::Skip), &top, Color::Red));
		assert!(can_play(&card(5, Color::Wild, CardKind::Wild), &top, Color::Red));
		assert!(can_play(&card(6, Color::Wild, CardKind::WildDrawFour), &top, Color::Red));
	}

	#[test]
	fn test_can_play_action_type_match() {
		let top = card(0, Color::Green, CardKind::Skip);
		assert!(can_play(&card(1, Color::Yellow, CardKind::Skip), &top, Color::Green));
		assert!(!can_play(&card(2, Color::Yellow, CardKind::Reverse), &top, Color::Green));
	}

	#[test]
	fn test_can_play_after_wild_uses_active_color() {
		let top = card(0, Color::Wild, CardKind::Wild);
		assert!(can_play(&card(1, Color::Blue, CardKind::Number(3)), &top, Color::Blue));
		assert!(!can_play(&card(2, Color::Red, CardKind::Number(3)), &top, Color::Blue));
		// Two wilds share a type.
		assert!(can_play(&card(3, Color::Wild, CardKind::Wild), &top, Color::Blue));
	}

	#[test]
	fn test_card_wire_format() {
		let json = serde_json::to_string(&card(12, Color::Green, CardKind::DrawTwo)).unwrap();
		assert_eq!(json, r#"{"id":12,"color":"green","type":"drawTwo"}"#);

		let number: Card = serde_json::from_str(r#"{"id":3,"color":"red","type":"number","value":4}"#).unwrap();
		assert_eq!(number.value(), Some(4));

		let bad = serde_json::from_str::<Card>(r#"{"id":3,"color":"red","type":"wild"}"#);
		assert!(bad.is_err());
	}

	#[test]
	fn test_color_from_str() {
		assert_eq!("Yellow".parse::<Color>(), Ok(Color::Yellow));
		assert_eq!("g".parse::<Color>(), Ok(Color::Green));
		assert!("purple".parse::<Color>().is_err());
	}
}
