use std::collections::VecDeque;

use rand::Rng;

use crate::board::{Board, CellKind};
use crate::dir::{Dir, Turn};
use crate::error::SimError;
use crate::pos::Pos;

/// Result of one movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Ate,
    Moved,
    Collided,
}

/// Snake body as board indices, head first. All cell retyping goes through the board.
#[derive(Clone, Debug)]
pub struct Snake {
    body: VecDeque<usize>,
    heading: Dir,
    spawn_len: usize,
}

impl Snake {
    /// Places the head at `head` and grows the rest of the body behind it,
    /// curving clockwise around anything that is not empty.
    pub fn spawn(board: &mut Board, head: Pos, heading: Dir, length: usize) -> Result<Self, SimError> {
        let length = length.max(1);
        let head_idx = board
            .index(head.x, head.y)
            .filter(|&i| board.kind(i) == CellKind::Empty)
            .ok_or(SimError::HeadOccupied { x: head.x, y: head.y })?;

        board.set_kind(head_idx, CellKind::Head);
        let mut body = VecDeque::with_capacity(length);
        body.push_back(head_idx);

        let mut build_dir = heading.reverse();
        let mut current = head_idx;
        let mut blocked = 0;
        while body.len() < length {
            let next = board
                .adjacent(current, build_dir)
                .filter(|&i| board.kind(i) == CellKind::Empty);
            match next {
                Some(idx) => {
                    board.set_kind(idx, CellKind::Body);
                    body.push_back(idx);
                    current = idx;
                    blocked = 0;
                }
                None => {
                    build_dir = build_dir.cw();
                    blocked += 1;
                    if blocked == Dir::ALL.len() {
                        let placed = body.len();
                        for idx in body {
                            board.set_kind(idx, CellKind::Empty);
                        }
                        return Err(SimError::SpawnBlocked { placed, wanted: length });
                    }
                }
            }
        }

        Ok(Self {
            body,
            heading,
            spawn_len: length,
        })
    }

    pub fn head(&self) -> usize {
        self.body[0]
    }

    pub fn body(&self) -> &VecDeque<usize> {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn spawn_len(&self) -> usize {
        self.spawn_len
    }

    pub fn heading(&self) -> Dir {
        self.heading
    }

    /// Ray-cast from the head: first non-empty cell along `dir` and its distance (>= 1).
    pub fn look(&self, board: &Board, dir: Dir) -> (CellKind, u32) {
        let mut current = self.head();
        let mut dist = 0;
        loop {
            dist += 1;
            match board.adjacent(current, dir) {
                Some(next) if board.kind(next) == CellKind::Empty => current = next,
                Some(next) => return (board.kind(next), dist),
                None => return (CellKind::Wall, dist),
            }
        }
    }

    /// One cell forward along the current heading. A collision leaves the board untouched.
    pub fn advance<R: Rng + ?Sized>(&mut self, board: &mut Board, rng: &mut R) -> Step {
        let head = self.head();
        let Some(target) = board.adjacent(head, self.heading) else {
            return Step::Collided;
        };
        match board.kind(target) {
            CellKind::Food => {
                board.set_kind(head, CellKind::Body);
                board.set_kind(target, CellKind::Head);
                self.body.push_front(target);
                board.place_random_food(rng);
                Step::Ate
            }
            CellKind::Empty => {
                if let Some(tail) = self.body.pop_back() {
                    board.set_kind(tail, CellKind::Empty);
                }
                // A length-one snake just vacated its own head cell.
                if self.body.front() == Some(&head) {
                    board.set_kind(head, CellKind::Body);
                }
                board.set_kind(target, CellKind::Head);
                self.body.push_front(target);
                Step::Moved
            }
            CellKind::Wall | CellKind::Head | CellKind::Body => Step::Collided,
        }
    }

    pub fn turn<R: Rng + ?Sized>(&mut self, board: &mut Board, turn: Turn, rng: &mut R) -> Step {
        self.heading = turn.apply(self.heading);
        self.advance(board, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn centered(board: &mut Board, heading: Dir, len: usize) -> Snake {
        let head = Pos::new(board.width() as i32 / 2, board.height() as i32 / 2);
        Snake::spawn(board, head, heading, len).unwrap()
    }

    fn assert_body_typed(board: &Board, snake: &Snake) {
        assert_eq!(board.kind(snake.head()), CellKind::Head);
        for &idx in snake.body().iter().skip(1) {
            assert_eq!(board.kind(idx), CellKind::Body);
        }
        assert_eq!(board.count(CellKind::Head), 1);
        assert_eq!(
            board.count(CellKind::Head) + board.count(CellKind::Body),
            snake.len()
        );
    }

    #[test]
    fn spawn_grows_behind_the_heading() {
        let mut board = Board::new(30, 30).unwrap();
        let snake = centered(&mut board, Dir::Up, 4);
        let cells: Vec<Pos> = snake.body().iter().map(|&i| board.pos(i)).collect();
        assert_eq!(
            cells,
            vec![Pos::new(15, 15), Pos::new(15, 16), Pos::new(15, 17), Pos::new(15, 18)]
        );
        assert_body_typed(&board, &snake);
    }

    #[test]
    fn spawn_curves_clockwise_at_a_wall() {
        let mut board = Board::new(10, 10).unwrap();
        // Heading down from y=2 builds upward and hits the top wall after one segment.
        let snake = Snake::spawn(&mut board, Pos::new(4, 2), Dir::Down, 4).unwrap();
        let cells: Vec<Pos> = snake.body().iter().map(|&i| board.pos(i)).collect();
        assert_eq!(
            cells,
            vec![Pos::new(4, 2), Pos::new(4, 1), Pos::new(5, 1), Pos::new(6, 1)]
        );
        assert_body_typed(&board, &snake);
    }

    #[test]
    fn spawn_fails_when_boxed_in() {
        let mut board = Board::new(3, 3).unwrap();
        let err = Snake::spawn(&mut board, Pos::new(1, 1), Dir::Up, 2).unwrap_err();
        assert_eq!(err, SimError::SpawnBlocked { placed: 1, wanted: 2 });
        assert_eq!(board.count(CellKind::Head), 0);
        let err = Snake::spawn(&mut board, Pos::new(0, 0), Dir::Up, 2).unwrap_err();
        assert_eq!(err, SimError::HeadOccupied { x: 0, y: 0 });
    }

    #[test]
    fn look_hits_the_wall_in_every_direction() {
        for size in [5, 8, 13] {
            let mut board = Board::new(size, size).unwrap();
            let snake = centered(&mut board, Dir::Up, 1);
            let c = size as u32 / 2;
            let far = size as u32 - 1 - c;
            assert_eq!(snake.look(&board, Dir::Up), (CellKind::Wall, c));
            assert_eq!(snake.look(&board, Dir::Left), (CellKind::Wall, c));
            assert_eq!(snake.look(&board, Dir::Down), (CellKind::Wall, far));
            assert_eq!(snake.look(&board, Dir::Right), (CellKind::Wall, far));
        }
    }

    #[test]
    fn look_sees_own_body_and_food() {
        let mut board = Board::new(30, 30).unwrap();
        let snake = centered(&mut board, Dir::Up, 4);
        assert_eq!(snake.look(&board, Dir::Down), (CellKind::Body, 1));
        assert!(board.place_food_at(12, 15));
        assert_eq!(snake.look(&board, Dir::Left), (CellKind::Food, 3));
    }

    #[test]
    fn advance_into_empty_shifts_the_body() {
        let mut board = Board::new(30, 30).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut snake = centered(&mut board, Dir::Up, 4);
        let old_head = snake.head();
        let old_tail = *snake.body().back().unwrap();

        assert_eq!(snake.advance(&mut board, &mut rng), Step::Moved);

        assert_eq!(board.pos(snake.head()), Pos::new(15, 14));
        assert_eq!(board.kind(old_head), CellKind::Body);
        assert_eq!(board.kind(old_tail), CellKind::Empty);
        assert_eq!(snake.len(), 4);
        assert_body_typed(&board, &snake);
    }

    #[test]
    fn advance_onto_food_grows_and_respawns_food() {
        let mut board = Board::new(30, 30).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut snake = centered(&mut board, Dir::Up, 4);
        assert!(board.place_food_at(15, 14));
        let eaten = board.food().unwrap();

        assert_eq!(snake.advance(&mut board, &mut rng), Step::Ate);

        assert_eq!(snake.head(), eaten);
        assert_eq!(snake.len(), 5);
        assert_eq!(board.count(CellKind::Food), 1);
        assert_ne!(board.food(), Some(eaten));
        assert_body_typed(&board, &snake);
    }

    #[test]
    fn advance_into_wall_changes_nothing() {
        let mut board = Board::new(6, 6).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut snake = Snake::spawn(&mut board, Pos::new(2, 1), Dir::Up, 3).unwrap();
        let before: Vec<CellKind> = board.cells().iter().map(|c| c.kind).collect();

        assert_eq!(snake.advance(&mut board, &mut rng), Step::Collided);

        let after: Vec<CellKind> = board.cells().iter().map(|c| c.kind).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn turning_back_into_the_neck_collides() {
        let mut board = Board::new(30, 30).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut snake = centered(&mut board, Dir::Up, 4);
        assert_eq!(snake.turn(&mut board, Turn::Right, &mut rng), Step::Moved);
        assert_eq!(snake.turn(&mut board, Turn::Right, &mut rng), Step::Moved);
        assert_eq!(snake.turn(&mut board, Turn::Right, &mut rng), Step::Collided);
        assert_eq!(snake.heading(), Dir::Left);
    }

    #[test]
    fn length_tracks_meals_over_a_random_walk() {
        let mut board = Board::new(20, 20).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut snake = centered(&mut board, Dir::Up, 4);
        board.place_random_food(&mut rng);
        let mut meals = 0;
        for _ in 0..500 {
            let turn = Turn::ALL[rng.gen_range(0..3)];
            match snake.turn(&mut board, turn, &mut rng) {
                Step::Collided => break,
                Step::Ate => meals += 1,
                Step::Moved => {}
            }
            assert_eq!(snake.len(), snake.spawn_len() + meals);
            assert_body_typed(&board, &snake);
        }
    }
}
