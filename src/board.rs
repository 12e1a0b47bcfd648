use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dir::Dir;
use crate::error::SimError;
use crate::pos::Pos;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    Empty,
    Food,
    Wall,
    Head,
    Body,
}

impl CellKind {
    /// Numeric tag used in the sensor state. Passable cells are positive.
    pub fn code(self) -> i8 {
        match self {
            CellKind::Empty => 1,
            CellKind::Food => 2,
            CellKind::Wall => -1,
            CellKind::Head => -2,
            CellKind::Body => -3,
        }
    }
}

/// One grid square. The position never changes; only `kind` does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub kind: CellKind,
    pub pos: Pos,
}

/// Rectangular grid with a permanent wall ring, addressed by flat index `y * width + x`.
#[derive(Clone, Debug)]
pub struct Board {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    food: Option<usize>,
}

impl Board {
    pub fn new(width: usize, height: usize) -> Result<Self, SimError> {
        if width == 0 || height == 0 {
            return Err(SimError::InvalidDimensions { width, height });
        }
        let cells = (0..height)
            .flat_map(|y| {
                (0..width).map(move |x| Cell {
                    kind: CellKind::Empty,
                    pos: Pos::new(x as i32, y as i32),
                })
            })
            .collect();
        let mut board = Self {
            width,
            height,
            cells,
            food: None,
        };
        board.clear();
        Ok(board)
    }

    /// Walls on the border, everything else empty, no food.
    pub fn clear(&mut self) {
        let (w, h) = (self.width as i32, self.height as i32);
        for cell in &mut self.cells {
            let Pos { x, y } = cell.pos;
            cell.kind = if x == 0 || y == 0 || x == w - 1 || y == h - 1 {
                CellKind::Wall
            } else {
                CellKind::Empty
            };
        }
        self.food = None;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    pub fn kind(&self, idx: usize) -> CellKind {
        self.cells[idx].kind
    }

    pub fn pos(&self, idx: usize) -> Pos {
        self.cells[idx].pos
    }

    pub(crate) fn set_kind(&mut self, idx: usize, kind: CellKind) {
        self.cells[idx].kind = kind;
        if kind == CellKind::Food {
            self.food = Some(idx);
        } else if self.food == Some(idx) {
            self.food = None;
        }
    }

    /// Neighbour one step along `dir`, `None` past the backing array.
    pub fn adjacent(&self, idx: usize, dir: Dir) -> Option<usize> {
        let Pos { x, y } = self.pos(idx);
        let (dx, dy) = dir.offset();
        self.index(x + dx, y + dy)
    }

    pub fn manhattan(&self, a: usize, b: usize) -> i32 {
        self.pos(a).manhattan(self.pos(b))
    }

    pub fn empty_cells(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == CellKind::Empty)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn count(&self, kind: CellKind) -> usize {
        self.cells.iter().filter(|c| c.kind == kind).count()
    }

    pub fn food(&self) -> Option<usize> {
        self.food
    }

    /// Drops food on a uniformly chosen empty cell. Returns `None` when the board is full.
    pub fn place_random_food<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        self.take_food();
        let free = self.empty_cells();
        match free.choose(rng) {
            Some(&idx) => {
                self.set_kind(idx, CellKind::Food);
                Some(idx)
            }
            None => {
                warn!(
                    width = self.width,
                    height = self.height,
                    "no empty cell left for food"
                );
                None
            }
        }
    }

    /// Moves the food to `(x, y)` if that cell is empty.
    pub fn place_food_at(&mut self, x: i32, y: i32) -> bool {
        let Some(idx) = self.index(x, y) else {
            return false;
        };
        if self.kind(idx) != CellKind::Empty {
            return false;
        }
        self.take_food();
        self.set_kind(idx, CellKind::Food);
        true
    }

    fn take_food(&mut self) {
        if let Some(old) = self.food.take() {
            if self.cells[old].kind == CellKind::Food {
                self.cells[old].kind = CellKind::Empty;
            }
        }
    }
}
