use serde::{Deserialize, Serialize};

use crate::events::Seat;

/// Play direction; serialized as `1` / `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Direction {
	#[default]
	Clockwise,
	CounterClockwise,
}

impl Direction {
	pub fn step(self) -> isize {
		match self {
			Direction::Clockwise => 1,
			Direction::CounterClockwise => -1,
		}
	}

	pub fn flip(self) -> Self {
		match self {
			Direction::Clockwise => Direction::CounterClockwise,
			Direction::CounterClockwise => Direction::Clockwise,
		}
	}
}

impl From<Direction> for i8 {
	fn from(direction: Direction) -> Self {
		direction.step() as i8
	}
}

impl TryFrom<i8> for Direction {
	type Error = String;

	fn try_from(value: i8) -> Result<Self, Self::Error> {
		match value {
			1 => Ok(Direction::Clockwise),
			-1 => Ok(Direction::CounterClockwise),
			other => Err(format!("direction must be 1 or -1, got {}", other)),
		}
	}
}

pub fn next_seat(current: Seat, direction: Direction, player_count: usize) -> Seat {
	if player_count == 0 {
		return current;
	}
	let n = player_count as isize;
	Seat((current.0 as isize + direction.step()).rem_euclid(n) as usize)
}

/// Moves the cursor `steps` seats; a skip is two steps.
pub fn advance(current: Seat, direction: Direction, player_count: usize, steps: usize) -> Seat {
	(0..steps).fold(current, |seat, _| next_seat(seat, direction, player_count))
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_next_seat_wraps() {
		assert_eq!(next_seat(Seat(3), Direction::Clockwise, 4), Seat(0));
		assert_eq!(next_seat(Seat(0), Direction::CounterClockwise, 4), Seat(3));
		assert_eq!(next_seat(Seat(1), Direction::Clockwise, 4), Seat(2));
	}

	#[test]
	fn test_reverse_from_seat_zero_goes_to_last() {
		let direction = Direction::Clockwise.flip();
		assert_eq!(direction, Direction::CounterClockwise);
		assert_eq!(next_seat(Seat(0), direction, 4), Seat(3));
	}

	#[test]
	fn test_skip_from_seat_zero() {
		assert_eq!(advance(Seat(0), Direction::Clockwise, 4, 2), Seat(2));
		assert_eq!(advance(Seat(0), Direction::CounterClockwise, 4, 2), Seat(2));
		assert_eq!(advance(Seat(1), Direction::CounterClockwise, 4, 2), Seat(3));
	}

	#[test]
	fn test_two_players_skip_returns_to_player() {
		assert_eq!(advance(Seat(0), Direction::Clockwise, 2, 2), Seat(0));
		assert_eq!(advance(Seat(1), Direction::CounterClockwise, 2, 2), Seat(1));
	}

	#[test]
	fn test_direction_serializes_as_sign() {
		assert_eq!(serde_json::to_string(&Direction::CounterClockwise).unwrap(), "-1");
		assert_eq!(serde_json::from_str::<Direction>("1").unwrap(), Direction::Clockwise);
		assert!(serde_json::from_str::<Direction>("2").is_err());
	}

	proptest! {
		#[test]
		fn next_seat_stays_in_range(count in 1usize..10, current in 0usize..10, ccw in any::<bool>()) {
			let current = Seat(current % count);
			let direction = if ccw { Direction::CounterClockwise } else { Direction::Clockwise };
			prop_assert!(next_seat(current, direction, count).0 < count);
		}

		#[test]
		fn full_lap_returns_home(count in 1usize..10, current in 0usize..10, ccw in any::<bool>()) {
			let current = Seat(current % count);
			let direction = if ccw { Direction::CounterClockwise } else { Direction::Clockwise };
			prop_assert_eq!(advance(current, direction, count, count), current);
		}

		#[test]
		fn opposite_directions_cancel(count in 1usize..10, current in 0usize..10) {
			let current = Seat(current % count);
			let forward = next_seat(current, Direction::Clockwise, count);
			prop_assert_eq!(next_seat(forward, Direction::CounterClockwise, count), current);
		}
	}
}
