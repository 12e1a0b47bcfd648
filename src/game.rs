use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::board::{Board, CellKind};
use crate::dir::{Dir, Turn};
use crate::error::SimError;
use crate::pos::Pos;
use crate::snake::{Snake, Step};

pub const STATE_LEN: usize = 13;

/// Sensor vector handed to policies:
/// head x, head y, heading, (kind, distance) looking left/forward/right,
/// body length, food x, food y, distance to food.
pub type SensorState = [f32; STATE_LEN];

/// One board with one snake on it and the RNG that places its food.
pub struct Game {
    board: Board,
    snake: Snake,
    rng: ChaCha8Rng,
    snake_len: usize,
    last_food: Pos,
}

impl Game {
    pub fn new(width: usize, height: usize, snake_len: usize, seed: u64) -> Result<Self, SimError> {
        let mut board = Board::new(width, height)?;
        let snake = Self::spawn_centered(&mut board, snake_len)?;
        let mut g = Self {
            board,
            snake,
            rng: ChaCha8Rng::seed_from_u64(seed),
            snake_len,
            last_food: Pos::new(0, 0),
        };
        g.drop_food();
        Ok(g)
    }

    /// Back to the canonical start: centred snake heading up, one fresh food.
    pub fn reset(&mut self, seed: u64) -> Result<(), SimError> {
        self.board.clear();
        self.snake = Self::spawn_centered(&mut self.board, self.snake_len)?;
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.drop_food();
        Ok(())
    }

    fn spawn_centered(board: &mut Board, snake_len: usize) -> Result<Snake, SimError> {
        let head = Pos::new(board.width() as i32 / 2, board.height() as i32 / 2);
        Snake::spawn(board, head, Dir::Up, snake_len)
    }

    fn drop_food(&mut self) {
        if let Some(idx) = self.board.place_random_food(&mut self.rng) {
            self.last_food = self.board.pos(idx);
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn snake(&self) -> &Snake {
        &self.snake
    }

    pub fn head_pos(&self) -> Pos {
        self.board.pos(self.snake.head())
    }

    /// Current food, or where it was last seen if the board filled up.
    pub fn food_pos(&self) -> Pos {
        self.board.food().map_or(self.last_food, |i| self.board.pos(i))
    }

    pub fn has_food(&self) -> bool {
        self.board.food().is_some()
    }

    pub fn food_distance(&self) -> i32 {
        self.head_pos().manhattan(self.food_pos())
    }

    pub fn look(&self, dir: Dir) -> (CellKind, u32) {
        self.snake.look(&self.board, dir)
    }

    pub fn state(&self) -> SensorState {
        let head = self.head_pos();
        let food = self.food_pos();
        let heading = self.snake.heading();
        let (left_kind, left_dist) = self.look(heading.ccw());
        let (fwd_kind, fwd_dist) = self.look(heading);
        let (right_kind, right_dist) = self.look(heading.cw());
        [
            head.x as f32,
            head.y as f32,
            f32::from(heading.ordinal()),
            f32::from(left_kind.code()),
            left_dist as f32,
            f32::from(fwd_kind.code()),
            fwd_dist as f32,
            f32::from(right_kind.code()),
            right_dist as f32,
            self.snake.len() as f32,
            food.x as f32,
            food.y as f32,
            head.manhattan(food) as f32,
        ]
    }

    pub fn step(&mut self, turn: Turn) -> Step {
        let step = self.snake.turn(&mut self.board, turn, &mut self.rng);
        if let Some(idx) = self.board.food() {
            self.last_food = self.board.pos(idx);
        }
        step
    }
}
