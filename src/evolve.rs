//! Generational search over flat parameter vectors.
//!
//! Each generation every individual plays one energy-bounded episode on its own
//! board. Scores are collected in parallel, then the population is rebuilt:
//! the top `elitism × population` vectors are copied unchanged, the rest are
//! single-point crossovers of roulette-selected parents with uniform noise mutation.

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::Config;
use crate::episode::{Budget, Episode, FITNESS_OFFSET};
use crate::error::{ConfigError, EvolveError, StoreError};
use crate::game::Game;
use crate::policy::{Policy, PolicyController};
use crate::store::FitnessHistory;

const GENERATION_PRIME: u64 = 0x9E37_79B9_7F4A_7C15;
const SLOT_PRIME: u64 = 0xC2B2_AE3D_27D4_EB4F;

/// Where periodic snapshots of a run go.
pub trait Checkpoint {
    fn save(&mut self, best: &[f32], history: &FitnessHistory) -> Result<(), StoreError>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct Individual {
    pub params: Vec<f32>,
    /// Raw fitness, offset already removed.
    pub fitness: f32,
    pub generation: usize,
    pub index: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenerationReport {
    /// 1-based.
    pub generation: usize,
    /// Offset scores, one per population slot.
    pub scores: Vec<f32>,
    pub avg: f32,
    pub peak: f32,
    pub best_index: usize,
}

/// Outcome of a finished run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub best: Individual,
    pub history: FitnessHistory,
}

/// One training session: population, per-slot episodes, history and RNG.
pub struct EvoRun<'p, P: Policy + ?Sized> {
    policy: &'p P,
    config: Config,
    population: Vec<Vec<f32>>,
    scores: Vec<f32>,
    episodes: Vec<Episode>,
    generation: usize,
    history: FitnessHistory,
    champion: Option<Individual>,
    seed: u64,
    rng: ChaCha8Rng,
    pool: Option<rayon::ThreadPool>,
}

impl<'p, P: Policy + ?Sized> EvoRun<'p, P> {
    /// Fresh population drawn from the policy's own initialiser.
    pub fn new(policy: &'p P, config: Config) -> Result<Self, EvolveError> {
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let population = (0..config.population)
            .map(|_| policy.init_params(&mut rng))
            .collect();
        Self::assemble(policy, config, population, seed, rng)
    }

    /// Population grown around an existing vector: slot 0 is `params` itself,
    /// the rest are perturbed copies.
    pub fn from_params(policy: &'p P, config: Config, params: &[f32]) -> Result<Self, EvolveError> {
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let range = config.mutation_range;
        let mut population = Vec::with_capacity(config.population);
        population.push(params.to_vec());
        while population.len() < config.population {
            let jittered = params
                .iter()
                .map(|&v| if range > 0.0 { v + rng.gen_range(-range..=range) } else { v })
                .collect();
            population.push(jittered);
        }
        Self::assemble(policy, config, population, seed, rng)
    }

    /// Explicit starting population.
    pub fn with_population(
        policy: &'p P,
        config: Config,
        population: Vec<Vec<f32>>,
    ) -> Result<Self, EvolveError> {
        let seed = config.seed.unwrap_or_else(rand::random);
        let rng = ChaCha8Rng::seed_from_u64(seed);
        Self::assemble(policy, config, population, seed, rng)
    }

    fn assemble(
        policy: &'p P,
        config: Config,
        population: Vec<Vec<f32>>,
        seed: u64,
        rng: ChaCha8Rng,
    ) -> Result<Self, EvolveError> {
        config.validate()?;
        if population.len() != config.population {
            return Err(EvolveError::Config(ConfigError::Invalid(format!(
                "population holds {} vectors, config says {}",
                population.len(),
                config.population
            ))));
        }
        for (index, params) in population.iter().enumerate() {
            policy
                .check_params(params)
                .map_err(|source| EvolveError::Shape { index, source })?;
        }

        let episodes = (0..config.population)
            .map(|_| -> Result<Episode, EvolveError> {
                let game = Game::new(config.grid_width, config.grid_height, config.snake_length, seed)?;
                Ok(Episode::new(game, Budget::Energy(config.energy_max)))
            })
            .collect::<Result<Vec<_>, EvolveError>>()?;

        let pool = if config.threads > 0 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.threads)
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self {
            policy,
            scores: Vec::new(),
            population,
            episodes,
            generation: 0,
            history: FitnessHistory::default(),
            champion: None,
            seed,
            rng,
            pool,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn population(&self) -> &[Vec<f32>] {
        &self.population
    }

    /// Offset scores of the last evaluated generation.
    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    /// Completed generations.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn history(&self) -> &FitnessHistory {
        &self.history
    }

    /// Best individual seen so far across all generations.
    pub fn champion(&self) -> Option<&Individual> {
        self.champion.as_ref()
    }

    fn episode_seed(&self, index: usize) -> u64 {
        self.seed
            ^ (self.generation as u64 + 1).wrapping_mul(GENERATION_PRIME)
            ^ (index as u64 + 1).wrapping_mul(SLOT_PRIME)
    }

    /// Plays every individual once and records the generation's statistics.
    pub fn evaluate(&mut self) -> Result<GenerationReport, EvolveError> {
        let seeds: Vec<u64> = (0..self.population.len())
            .map(|i| self.episode_seed(i))
            .collect();
        let policy = self.policy;
        let population = &self.population;
        let episodes = &mut self.episodes;

        let mut job = || {
            episodes
                .par_iter_mut()
                .zip(population.par_iter())
                .zip(seeds.par_iter())
                .enumerate()
                .map(|(index, ((episode, params), &seed))| -> Result<f32, EvolveError> {
                    let mut controller = PolicyController::new(policy, params)
                        .map_err(|source| EvolveError::Shape { index, source })?;
                    episode.reset(seed)?;
                    let stats = episode.run(&mut controller);
                    debug!(
                        index,
                        fitness = stats.raw_fitness(),
                        steps = stats.steps,
                        food = stats.food_eaten,
                        "evaluated individual"
                    );
                    Ok(stats.score())
                })
                .collect::<Result<Vec<f32>, EvolveError>>()
        };
        let scores = match &self.pool {
            Some(pool) => pool.install(job),
            None => job(),
        }?;

        self.generation += 1;
        let report = summarize(self.generation, scores);
        self.history.push(report.avg, report.peak);

        let best_fitness = report.peak;
        if self
            .champion
            .as_ref()
            .is_none_or(|c| best_fitness > c.fitness)
        {
            self.champion = Some(Individual {
                params: self.population[report.best_index].clone(),
                fitness: best_fitness,
                generation: report.generation,
                index: report.best_index,
            });
        }

        info!(
            generation = report.generation,
            of = self.config.generations,
            avg = report.avg,
            peak = report.peak,
            best = report.best_index,
            "generation finished"
        );
        self.scores = report.scores.clone();
        Ok(report)
    }

    /// Slot indices ordered by score, best first; equal scores keep index order.
    pub fn ranking(&self) -> Vec<usize> {
        let mut idxs: Vec<usize> = (0..self.scores.len()).collect();
        idxs.sort_by(|&a, &b| self.scores[b].total_cmp(&self.scores[a]));
        idxs
    }

    /// Builds the next population from the last evaluation. No-op before the first one.
    pub fn reproduce(&mut self) {
        let size = self.population.len();
        if self.scores.len() != size {
            return;
        }
        let elites = self.config.elite_count().min(size);
        let ranking = self.ranking();

        let mut next: Vec<Vec<f32>> = ranking[..elites]
            .iter()
            .map(|&i| self.population[i].clone())
            .collect();

        let parents = roulette(&self.scores, self.config.parents, &mut self.rng);
        let mut k = 0;
        while next.len() < size {
            let a = &self.population[parents[k % parents.len()]];
            let b = &self.population[parents[(k + 1) % parents.len()]];
            let mut child = crossover(a, b, &mut self.rng);
            mutate(
                &mut child,
                self.config.mutation_rate,
                self.config.mutation_range,
                &mut self.rng,
            );
            next.push(child);
            k += 1;
        }
        self.population = next;
    }

    /// Evaluates and, unless this was the final generation, breeds the next one.
    pub fn next_generation(&mut self) -> Result<GenerationReport, EvolveError> {
        self.next_generation_with(&mut None)
    }

    fn next_generation_with(
        &mut self,
        checkpoint: &mut Option<&mut dyn Checkpoint>,
    ) -> Result<GenerationReport, EvolveError> {
        let report = self.evaluate()?;
        let last = self.generation >= self.config.generations;
        let every = self.config.checkpoint_every;
        if let Some(cp) = checkpoint.as_mut() {
            if every > 0 && report.generation % every == 0 && !last {
                info!(generation = report.generation, "saving progress");
                cp.save(&self.population[report.best_index], &self.history)?;
            }
        }
        if !last {
            self.reproduce();
        }
        Ok(report)
    }

    /// Runs the configured number of generations, then saves the champion.
    pub fn run(&mut self, mut checkpoint: Option<&mut dyn Checkpoint>) -> Result<RunSummary, EvolveError> {
        while self.generation < self.config.generations {
            self.next_generation_with(&mut checkpoint)?;
        }

        let best = self.champion.clone().ok_or_else(|| {
            EvolveError::Config(ConfigError::Invalid("no generations were run".into()))
        })?;
        if let Some(cp) = checkpoint {
            cp.save(&best.params, &self.history)?;
        }
        info!(
            generation = best.generation,
            index = best.index,
            fitness = best.fitness,
            "best individual"
        );
        Ok(RunSummary {
            best,
            history: self.history.clone(),
        })
    }
}

fn summarize(generation: usize, scores: Vec<f32>) -> GenerationReport {
    let mut best_index = 0;
    for (i, &s) in scores.iter().enumerate() {
        if s > scores[best_index] {
            best_index = i;
        }
    }
    let n = scores.len().max(1) as f32;
    let avg = scores.iter().sum::<f32>() / n - FITNESS_OFFSET;
    let peak = scores.get(best_index).copied().unwrap_or(0.0) - FITNESS_OFFSET;
    GenerationReport {
        generation,
        scores,
        avg,
        peak,
        best_index,
    }
}

/// Fitness-proportionate sampling with replacement. Negative scores weigh zero;
/// if nothing has weight the draw is uniform.
pub fn roulette<R: Rng + ?Sized>(scores: &[f32], count: usize, rng: &mut R) -> Vec<usize> {
    if scores.is_empty() {
        return Vec::new();
    }
    let weights: Vec<f32> = scores
        .iter()
        .map(|&s| if s.is_finite() { s.max(0.0) } else { 0.0 })
        .collect();
    match WeightedIndex::new(&weights) {
        Ok(dist) => (0..count).map(|_| dist.sample(rng)).collect(),
        Err(_) => (0..count).map(|_| rng.gen_range(0..scores.len())).collect(),
    }
}

/// Single-point crossover: head of `a`, tail of `b`. Both parts are non-empty
/// whenever the vectors hold at least two genes.
pub fn crossover<R: Rng + ?Sized>(a: &[f32], b: &[f32], rng: &mut R) -> Vec<f32> {
    debug_assert_eq!(a.len(), b.len());
    if a.len() < 2 {
        return a.to_vec();
    }
    let point = rng.gen_range(1..a.len());
    a[..point].iter().chain(&b[point..]).copied().collect()
}

/// Adds uniform noise in `[-range, range]` to each gene with probability `rate`.
pub fn mutate<R: Rng + ?Sized>(genes: &mut [f32], rate: f32, range: f32, rng: &mut R) {
    if rate <= 0.0 || range <= 0.0 {
        return;
    }
    for g in genes {
        if rng.r#gen::<f32>() < rate {
            *g += rng.gen_range(-range..=range);
        }
    }
}
