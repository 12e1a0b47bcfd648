use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// `|ax - bx| + |ay - by|`
    pub fn manhattan(self, other: Pos) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_is_a_metric_on_a_small_grid() {
        let pts: Vec<Pos> = (0..5).flat_map(|x| (0..5).map(move |y| Pos::new(x, y))).collect();
        for &a in &pts {
            assert_eq!(a.manhattan(a), 0);
            for &b in &pts {
                assert_eq!(a.manhattan(b), b.manhattan(a));
                for &c in &pts {
                    assert!(a.manhattan(c) <= a.manhattan(b) + b.manhattan(c));
                }
            }
        }
    }

    #[test]
    fn manhattan_counts_both_axes() {
        assert_eq!(Pos::new(1, 1).manhattan(Pos::new(4, 5)), 7);
    }
}
