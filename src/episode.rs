use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::game::Game;
use crate::policy::Controller;
use crate::snake::Step;

/// Added to every score so selection weights stay non-negative.
pub const FITNESS_OFFSET: f32 = 250.0;

const FOOD_REWARD: f32 = 50.0;
const DEATH_PENALTY: f32 = 50.0;
const STARVATION_PENALTY: f32 = 50.0;
const CLOSER_CREDIT: f32 = 1.0;
const FARTHER_PENALTY: f32 = 1.5;

/// How long an episode may run without eating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Budget {
    /// Dies after this many steps without food.
    Energy(u32),
    /// Runs until it collides. A policy that never collides never stops.
    Unbounded,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EpisodeStats {
    pub steps: u64,
    pub movement: f32,
    pub food_eaten: u32,
    pub died: bool,
    /// The episode ended by running into a wall or the body.
    pub collided: bool,
    /// The board filled up: no cell was left for the next food.
    pub won: bool,
    pub energy: Option<u32>,
}

impl EpisodeStats {
    pub fn raw_fitness(&self) -> f32 {
        let death = if self.died { DEATH_PENALTY } else { 0.0 };
        FOOD_REWARD * self.food_eaten as f32 + self.movement - death
    }

    /// Raw fitness shifted by [`FITNESS_OFFSET`].
    pub fn score(&self) -> f32 {
        self.raw_fitness() + FITNESS_OFFSET
    }

    pub fn is_over(&self) -> bool {
        self.died || self.won
    }
}

/// A game plus the reward bookkeeping of whoever is playing it.
pub struct Episode {
    game: Game,
    budget: Budget,
    stats: EpisodeStats,
}

impl Episode {
    pub fn new(game: Game, budget: Budget) -> Self {
        let stats = Self::fresh_stats(budget);
        Self { game, budget, stats }
    }

    fn fresh_stats(budget: Budget) -> EpisodeStats {
        EpisodeStats {
            energy: match budget {
                Budget::Energy(max) => Some(max),
                Budget::Unbounded => None,
            },
            ..EpisodeStats::default()
        }
    }

    pub fn reset(&mut self, seed: u64) -> Result<(), SimError> {
        self.game.reset(seed)?;
        self.stats = Self::fresh_stats(self.budget);
        Ok(())
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    pub fn stats(&self) -> &EpisodeStats {
        &self.stats
    }

    pub fn is_over(&self) -> bool {
        self.stats.is_over()
    }

    /// Plays one move. Returns `None` once the episode has ended.
    pub fn step<C: Controller + ?Sized>(&mut self, controller: &mut C) -> Option<Step> {
        if self.is_over() {
            return None;
        }
        let before = self.game.food_distance();
        let turn = controller.choose(&self.game.state());
        let step = self.game.step(turn);

        match self.budget {
            Budget::Energy(max) => {
                let energy = self.stats.energy.get_or_insert(max);
                *energy = energy.saturating_sub(1);
                if step == Step::Ate {
                    self.stats.food_eaten += 1;
                    *energy = max;
                } else if self.game.food_distance() < before {
                    self.stats.movement += CLOSER_CREDIT;
                } else {
                    self.stats.movement -= FARTHER_PENALTY;
                }
            }
            Budget::Unbounded => {
                let change = before - self.game.food_distance();
                if step == Step::Ate {
                    self.stats.food_eaten += 1;
                } else if change > 0 {
                    self.stats.movement += CLOSER_CREDIT;
                } else {
                    self.stats.movement += -FARTHER_PENALTY;
                }
            }
        }

        if step == Step::Collided {
            self.stats.died = true;
            self.stats.collided = true;
        }
        self.stats.steps += 1;

        if self.stats.energy == Some(0) {
            self.stats.died = true;
            self.stats.movement -= STARVATION_PENALTY;
        }
        if step == Step::Ate && !self.game.has_food() {
            self.stats.won = true;
        }
        Some(step)
    }

    /// Plays to the natural end. Unbounded episodes only end on collision.
    pub fn run<C: Controller + ?Sized>(&mut self, controller: &mut C) -> &EpisodeStats {
        while self.step(controller).is_some() {}
        &self.stats
    }

    /// Plays at most `max_steps` moves; true if the episode ended.
    pub fn run_for<C: Controller + ?Sized>(&mut self, controller: &mut C, max_steps: u64) -> bool {
        for _ in 0..max_steps {
            if self.step(controller).is_none() {
                break;
            }
        }
        self.is_over()
    }
}
