//! Snake on a bounded grid, played by parameterised policies that a genetic
//! algorithm improves generation by generation.

pub mod board;
pub mod config;
pub mod dir;
pub mod draw;
pub mod episode;
pub mod error;
pub mod evolve;
pub mod game;
pub mod policy;
pub mod pos;
pub mod snake;
pub mod store;
#[cfg(feature = "gui")]
pub mod viewer;

pub use board::{Board, Cell, CellKind};
pub use config::Config;
pub use dir::{Dir, Turn};
pub use episode::{Budget, Episode, EpisodeStats, FITNESS_OFFSET};
pub use error::{ConfigError, EvolveError, PolicyError, SimError, StoreError};
pub use evolve::{Checkpoint, EvoRun, GenerationReport, Individual, RunSummary};
pub use game::{Game, STATE_LEN, SensorState};
pub use policy::{Controller, MlpPolicy, Policy, PolicyController, RandomController};
pub use pos::Pos;
pub use snake::{Snake, Step};
pub use store::{FitnessHistory, ModelCheckpoint, ModelFile, Store};
