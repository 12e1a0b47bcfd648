use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use snake_evolve::{
    Budget, Config, Episode, EvoRun, FITNESS_OFFSET, Game, MlpPolicy, ModelCheckpoint, ModelFile,
    Policy, PolicyController, RandomController, Store,
};

/// Cap for unbounded random episodes; a walker that survives this long is stopped.
const RANDOM_STEP_CAP: u64 = 1_000_000;

#[derive(Parser, Debug)]
#[command(
    name = "snake-evolve",
    version,
    about = "Evolve neural snake players with a genetic algorithm"
)]
struct Cli {
    /// Directory holding `models/` and `statbackup/`.
    #[arg(long, global = true, env = "SNAKE_EVOLVE_HOME", default_value = ".")]
    root: PathBuf,

    /// JSON settings file; missing fields take their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a freshly initialised model.
    New {
        #[arg(short, long)]
        name: String,
        /// Hidden layer widths.
        #[arg(short, long, num_args = 0.., default_values_t = [16usize, 16])]
        layers: Vec<usize>,
        #[arg(long)]
        seed: Option<u64>,
        /// Replace an existing model of the same name.
        #[arg(long)]
        force: bool,
    },
    /// Train an existing model and overwrite it with the best individual found.
    Train {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        generations: Option<usize>,
        #[arg(short, long)]
        population: Option<usize>,
        #[arg(long)]
        parents: Option<usize>,
        /// Evaluation threads, 0 for one per core.
        #[arg(long)]
        threads: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Play one energy-bounded episode with a stored model.
    Play {
        #[arg(short, long)]
        name: String,
        /// Watch the episode in a window (needs the `gui` feature).
        #[arg(long)]
        gui: bool,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Average fitness of a uniformly random player without an energy limit.
    Random {
        #[arg(short, long, default_value_t = 100)]
        trials: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Summarise stored fitness histories.
    Stats {
        #[arg(required = true, num_args = 1..)]
        names: Vec<String>,
    },
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let store = Store::new(&cli.root);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::New {
            name,
            layers,
            seed,
            force,
        } => new_command(&store, &name, layers, seed, force),
        Command::Train {
            name,
            generations,
            population,
            parents,
            threads,
            seed,
        } => {
            let mut config = config;
            if let Some(g) = generations {
                config.generations = g;
            }
            if let Some(p) = population {
                config.population = p;
            }
            if let Some(m) = parents {
                config.parents = m;
            }
            if let Some(t) = threads {
                config.threads = t;
            }
            if seed.is_some() {
                config.seed = seed;
            }
            config.validate().context("invalid training settings")?;
            train_command(&store, &name, config)
        }
        Command::Play { name, gui, seed } => play_command(&store, &name, &config, gui, seed),
        Command::Random { trials, seed } => random_command(&config, trials, seed),
        Command::Stats { names } => stats_command(&store, &names),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn load_policy(store: &Store, name: &str) -> Result<(MlpPolicy, Vec<f32>)> {
    let model = store
        .load_model(name)
        .with_context(|| format!("model `{name}` could not be loaded"))?;
    let policy = MlpPolicy::new(model.hidden).context("stored architecture is invalid")?;
    policy
        .check_params(&model.params)
        .with_context(|| format!("model `{name}` does not match its architecture"))?;
    Ok((policy, model.params))
}

fn new_command(store: &Store, name: &str, layers: Vec<usize>, seed: Option<u64>, force: bool) -> Result<()> {
    if store.model_exists(name)? && !force {
        bail!("model `{name}` already exists (use --force to replace it)");
    }
    let policy = MlpPolicy::new(layers)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed.unwrap_or_else(rand::random));
    let params = policy.init_params(&mut rng);
    store.save_model(
        name,
        &ModelFile {
            hidden: policy.hidden().to_vec(),
            params,
        },
    )?;
    println!(
        "created `{name}` with layers {:?} ({} parameters)",
        policy.hidden(),
        policy.param_count()
    );
    Ok(())
}

fn train_command(store: &Store, name: &str, config: Config) -> Result<()> {
    let (policy, params) = load_policy(store, name)?;
    let mut run = EvoRun::from_params(&policy, config, &params)?;
    info!(
        name,
        seed = run.seed(),
        population = run.config().population,
        generations = run.config().generations,
        "training"
    );
    let mut checkpoint = ModelCheckpoint::new(store, name, policy.hidden())?;
    let summary = run.run(Some(&mut checkpoint))?;

    println!(
        "best fitness {:.1} (generation {}, slot {}); saved as `{name}`",
        summary.best.fitness, summary.best.generation, summary.best.index
    );
    if let (Some(avg), Some(peak)) = (summary.history.avg.last(), summary.history.peak.last()) {
        println!("final generation: avg {avg:.1}, peak {peak:.1}");
    }
    Ok(())
}

fn play_command(store: &Store, name: &str, config: &Config, gui: bool, seed: Option<u64>) -> Result<()> {
    let (policy, params) = load_policy(store, name)?;
    let seed = seed.unwrap_or_else(rand::random);
    let game = Game::new(config.grid_width, config.grid_height, config.snake_length, seed)?;
    let mut episode = Episode::new(game, Budget::Energy(config.energy_max));
    let mut controller = PolicyController::new(policy, &params)?;

    if gui {
        return show(store, name, episode, controller, seed);
    }

    let stats = episode.run(&mut controller);
    let outcome = if stats.won {
        "filled the board"
    } else if stats.collided {
        "crashed"
    } else {
        "starved"
    };
    println!(
        "`{name}` {outcome} after {} steps: food {}, fitness {:.1}",
        stats.steps,
        stats.food_eaten,
        stats.raw_fitness()
    );
    Ok(())
}

#[cfg(feature = "gui")]
fn show(
    store: &Store,
    name: &str,
    episode: Episode,
    controller: PolicyController<MlpPolicy>,
    seed: u64,
) -> Result<()> {
    let history = match store.load_history(name) {
        Ok(history) => history.avg,
        Err(err) => {
            warn!(%err, "no fitness history to chart");
            Vec::new()
        }
    };
    snake_evolve::viewer::run_windowed(episode, controller, seed, history)
}

#[cfg(not(feature = "gui"))]
fn show(
    _store: &Store,
    _name: &str,
    _episode: Episode,
    _controller: PolicyController<MlpPolicy>,
    _seed: u64,
) -> Result<()> {
    bail!("this build has no window support; rebuild with `--features gui`")
}

fn random_command(config: &Config, trials: usize, seed: Option<u64>) -> Result<()> {
    if trials == 0 {
        bail!("--trials must be at least 1");
    }
    let seed = seed.unwrap_or_else(rand::random);
    let results = (0..trials)
        .into_par_iter()
        .map(|trial| -> Result<(f32, u32, u64)> {
            let trial_seed = seed.wrapping_add(trial as u64);
            let game = Game::new(config.grid_width, config.grid_height, config.snake_length, trial_seed)?;
            let mut episode = Episode::new(game, Budget::Unbounded);
            let mut controller = RandomController::new(ChaCha8Rng::seed_from_u64(!trial_seed));
            if !episode.run_for(&mut controller, RANDOM_STEP_CAP) {
                warn!(trial, "random walker still alive after {RANDOM_STEP_CAP} steps");
            }
            let stats = episode.stats();
            Ok((stats.raw_fitness(), stats.food_eaten, stats.steps))
        })
        .collect::<Result<Vec<_>>>()?;

    let n = results.len() as f32;
    let fitness = results.iter().map(|r| r.0).sum::<f32>() / n;
    let food = results.iter().map(|r| r.1 as f32).sum::<f32>() / n;
    let steps = results.iter().map(|r| r.2 as f32).sum::<f32>() / n;
    println!("random baseline over {trials} trials: fitness {fitness:.2}, food {food:.2}, steps {steps:.1}");
    println!("(offset score {:.2})", fitness + FITNESS_OFFSET);
    Ok(())
}

fn stats_command(store: &Store, names: &[String]) -> Result<()> {
    println!(
        "{:<20} {:>6} {:>10} {:>10} {:>10} {:>10}",
        "MODEL", "GENS", "LAST AVG", "LAST PEAK", "BEST AVG", "BEST PEAK"
    );
    for name in names {
        let history = store
            .load_history(name)
            .with_context(|| format!("no fitness history for `{name}`"))?;
        let best = |v: &[f32]| v.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let last = |v: &[f32]| v.last().copied().unwrap_or(f32::NAN);
        println!(
            "{:<20} {:>6} {:>10.1} {:>10.1} {:>10.1} {:>10.1}",
            name,
            history.len(),
            last(&history.avg),
            last(&history.peak),
            best(&history.avg),
            best(&history.peak)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn root_and_config_are_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "snake-evolve",
            "train",
            "--name",
            "runner",
            "--root",
            "runs",
            "--config",
            "small.json",
            "--generations",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.root, PathBuf::from("runs"));
        assert_eq!(cli.config, Some(PathBuf::from("small.json")));
        match cli.command {
            Command::Train { name, generations, .. } => {
                assert_eq!(name, "runner");
                assert_eq!(generations, Some(3));
            }
            other => panic!("parsed {other:?}"),
        }
    }
}
