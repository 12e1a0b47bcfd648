use snake_evolve::{
    Budget, CellKind, Checkpoint, Config, Controller, Episode, EvoRun, FitnessHistory, Game,
    MlpPolicy, ModelCheckpoint, ModelFile, Policy, PolicyController, Pos, SensorState, Step, Store,
    StoreError, Turn,
};

fn tiny_config() -> Config {
    Config {
        grid_width: 10,
        grid_height: 10,
        snake_length: 3,
        energy_max: 60,
        population: 6,
        generations: 4,
        parents: 3,
        checkpoint_every: 2,
        threads: 1,
        seed: Some(7),
        ..Config::default()
    }
}

#[derive(Default)]
struct Recorder {
    saves: Vec<(usize, Vec<f32>)>,
}

impl Checkpoint for Recorder {
    fn save(&mut self, best: &[f32], history: &FitnessHistory) -> Result<(), StoreError> {
        self.saves.push((history.len(), best.to_vec()));
        Ok(())
    }
}

struct Always(Turn);

impl Controller for Always {
    fn choose(&mut self, _state: &SensorState) -> Turn {
        self.0
    }
}

#[test]
fn checkpoints_follow_the_configured_cadence() {
    let policy = MlpPolicy::new(vec![4]).unwrap();
    let mut run = EvoRun::new(&policy, tiny_config()).unwrap();
    let mut recorder = Recorder::default();
    let summary = run.run(Some(&mut recorder)).unwrap();

    // generation 2 mid-run, then the champion once the run ends
    let lens: Vec<usize> = recorder.saves.iter().map(|(len, _)| *len).collect();
    assert_eq!(lens, vec![2, 4]);
    assert_eq!(recorder.saves[1].1, summary.best.params);
    assert_eq!(summary.history.len(), 4);
}

#[test]
fn training_a_stored_model_rewrites_it_and_its_history() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::new(dir.path());
    let policy = MlpPolicy::new(vec![5, 3]).unwrap();
    let mut rng = <rand_chacha::ChaCha8Rng as rand::SeedableRng>::seed_from_u64(1);
    let initial = policy.init_params(&mut rng);
    store
        .save_model(
            "runner",
            &ModelFile {
                hidden: policy.hidden().to_vec(),
                params: initial.clone(),
            },
        )
        .unwrap();

    let loaded = store.load_model("runner").unwrap();
    let mut run = EvoRun::from_params(&policy, tiny_config(), &loaded.params).unwrap();
    let mut checkpoint = ModelCheckpoint::new(&store, "runner", policy.hidden()).unwrap();
    let summary = run.run(Some(&mut checkpoint)).unwrap();

    let saved = store.load_model("runner").unwrap();
    assert_eq!(saved.hidden, vec![5, 3]);
    assert_eq!(saved.params, summary.best.params);
    assert_eq!(saved.params.len(), policy.param_count());

    let history = store.load_history("runner").unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history, summary.history);
    let avg = std::fs::read_to_string(dir.path().join("statbackup/runner/avg.csv")).unwrap();
    assert_eq!(avg.lines().count(), 4);
}

#[test]
fn invalid_names_never_reach_the_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::new(dir.path());
    assert!(matches!(
        ModelCheckpoint::new(&store, "../up", &[4]),
        Err(StoreError::InvalidName(_))
    ));
    assert!(!dir.path().join("models").exists());
}

#[test]
fn eating_on_a_full_size_board() {
    let game = Game::new(30, 30, 4, 21).unwrap();
    let mut episode = Episode::new(game, Budget::Energy(300));
    episode.game_mut().board_mut().place_food_at(15, 14);
    assert_eq!(episode.game().food_pos(), Pos::new(15, 14));

    assert_eq!(episode.step(&mut Always(Turn::Straight)), Some(Step::Ate));
    let stats = episode.stats();
    assert_eq!(stats.food_eaten, 1);
    assert_eq!(stats.energy, Some(300));
    assert_eq!(episode.game().snake().len(), 5);
    assert_eq!(episode.game().board().count(CellKind::Food), 1);
    assert_eq!(episode.game().head_pos().y, 14);
}

#[test]
fn a_stored_policy_plays_deterministically() {
    let policy = MlpPolicy::new(vec![8]).unwrap();
    let mut rng = <rand_chacha::ChaCha8Rng as rand::SeedableRng>::seed_from_u64(3);
    let params = policy.init_params(&mut rng);

    let play = |seed| {
        let game = Game::new(20, 20, 4, seed).unwrap();
        let mut episode = Episode::new(game, Budget::Energy(100));
        let mut controller = PolicyController::new(&policy, &params).unwrap();
        episode.run(&mut controller).clone()
    };
    let a = play(99);
    let b = play(99);
    assert_eq!(a, b);
    assert!(a.is_over());
}
