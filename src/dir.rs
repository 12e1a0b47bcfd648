use serde::{Deserialize, Serialize};

/// Absolute heading on the board. Screen convention: `Up` decreases `y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dir {
    Up,
    Right,
    Down,
    Left,
}

impl Dir {
    pub const ALL: [Dir; 4] = [Dir::Up, Dir::Right, Dir::Down, Dir::Left];

    pub fn reverse(self) -> Dir {
        match self {
            Dir::Up => Dir::Down,
            Dir::Right => Dir::Left,
            Dir::Down => Dir::Up,
            Dir::Left => Dir::Right,
        }
    }

    pub fn cw(self) -> Dir {
        match self {
            Dir::Up => Dir::Right,
            Dir::Right => Dir::Down,
            Dir::Down => Dir::Left,
            Dir::Left => Dir::Up,
        }
    }

    pub fn ccw(self) -> Dir {
        match self {
            Dir::Up => Dir::Left,
            Dir::Left => Dir::Down,
            Dir::Down => Dir::Right,
            Dir::Right => Dir::Up,
        }
    }

    pub fn offset(self) -> (i32, i32) {
        match self {
            Dir::Up => (0, -1),
            Dir::Right => (1, 0),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
        }
    }

    /// Value fed to policies: 1..=4 clockwise from `Up`.
    pub fn ordinal(self) -> u8 {
        match self {
            Dir::Up => 1,
            Dir::Right => 2,
            Dir::Down => 3,
            Dir::Left => 4,
        }
    }
}

/// Move relative to the current heading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Turn {
    Left,
    Straight,
    Right,
}

impl Turn {
    pub const ALL: [Turn; 3] = [Turn::Left, Turn::Straight, Turn::Right];

    /// Policy output index: 0 = left, 1 = straight, 2 = right.
    pub fn from_index(idx: usize) -> Option<Turn> {
        Self::ALL.get(idx).copied()
    }

    pub fn index(self) -> usize {
        match self {
            Turn::Left => 0,
            Turn::Straight => 1,
            Turn::Right => 2,
        }
    }

    pub fn apply(self, heading: Dir) -> Dir {
        match self {
            Turn::Left => heading.ccw(),
            Turn::Straight => heading,
            Turn::Right => heading.cw(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotations_are_inverse_and_cycle() {
        for d in Dir::ALL {
            assert_eq!(d.cw().ccw(), d);
            assert_eq!(d.cw().cw(), d.reverse());
            assert_eq!(d.cw().cw().cw().cw(), d);
            let (dx, dy) = d.offset();
            let (rx, ry) = d.reverse().offset();
            assert_eq!((dx + rx, dy + ry), (0, 0));
        }
    }

    #[test]
    fn turn_indices_round_trip_and_reject_out_of_range() {
        for t in Turn::ALL {
            assert_eq!(Turn::from_index(t.index()), Some(t));
        }
        assert_eq!(Turn::from_index(3), None);
    }

    #[test]
    fn left_from_up_faces_left() {
        assert_eq!(Turn::Left.apply(Dir::Up), Dir::Left);
        assert_eq!(Turn::Right.apply(Dir::Up), Dir::Right);
        assert_eq!(Turn::Straight.apply(Dir::Down), Dir::Down);
    }
}
