//! On-disk layout:
//!
//! ```text
//! <root>/models/<name>.json           hidden layer widths + flat parameters
//! <root>/statbackup/<name>/avg.csv     one average fitness per generation
//! <root>/statbackup/<name>/peak.csv    one peak fitness per generation
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StoreError;
use crate::evolve::Checkpoint;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    pub hidden: Vec<usize>,
    pub params: Vec<f32>,
}

/// Offset-corrected fitness per completed generation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FitnessHistory {
    pub avg: Vec<f32>,
    pub peak: Vec<f32>,
}

impl FitnessHistory {
    pub fn push(&mut self, avg: f32, peak: f32) {
        self.avg.push(avg);
        self.peak.push(peak);
    }

    pub fn len(&self) -> usize {
        self.avg.len()
    }

    pub fn is_empty(&self) -> bool {
        self.avg.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn check_name(name: &str) -> Result<(), StoreError> {
        let ok = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if ok {
            Ok(())
        } else {
            Err(StoreError::InvalidName(name.to_string()))
        }
    }

    pub fn model_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        Self::check_name(name)?;
        Ok(self.root.join("models").join(format!("{name}.json")))
    }

    pub fn history_dir(&self, name: &str) -> Result<PathBuf, StoreError> {
        Self::check_name(name)?;
        Ok(self.root.join("statbackup").join(name))
    }

    pub fn model_exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.model_path(name)?.is_file())
    }

    pub fn save_model(&self, name: &str, model: &ModelFile) -> Result<(), StoreError> {
        let path = self.model_path(name)?;
        let json = serde_json::to_string_pretty(model).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        write_file(&path, &json)?;
        info!(name, params = model.params.len(), path = %path.display(), "saved model");
        Ok(())
    }

    pub fn load_model(&self, name: &str) -> Result<ModelFile, StoreError> {
        let path = self.model_path(name)?;
        let text = read_file(&path)?;
        serde_json::from_str(&text).map_err(|source| StoreError::Json { path, source })
    }

    pub fn save_history(&self, name: &str, history: &FitnessHistory) -> Result<(), StoreError> {
        let dir = self.history_dir(name)?;
        write_file(&dir.join("avg.csv"), &format_series(&history.avg))?;
        write_file(&dir.join("peak.csv"), &format_series(&history.peak))?;
        Ok(())
    }

    pub fn load_history(&self, name: &str) -> Result<FitnessHistory, StoreError> {
        let dir = self.history_dir(name)?;
        Ok(FitnessHistory {
            avg: parse_series(&dir.join("avg.csv"))?,
            peak: parse_series(&dir.join("peak.csv"))?,
        })
    }
}

/// Saves the run's best vector as model `name` and its fitness history next to it.
pub struct ModelCheckpoint<'a> {
    store: &'a Store,
    name: String,
    hidden: Vec<usize>,
}

impl<'a> ModelCheckpoint<'a> {
    pub fn new(store: &'a Store, name: &str, hidden: &[usize]) -> Result<Self, StoreError> {
        Store::check_name(name)?;
        Ok(Self {
            store,
            name: name.to_string(),
            hidden: hidden.to_vec(),
        })
    }
}

impl Checkpoint for ModelCheckpoint<'_> {
    fn save(&mut self, best: &[f32], history: &FitnessHistory) -> Result<(), StoreError> {
        self.store.save_history(&self.name, history)?;
        self.store.save_model(
            &self.name,
            &ModelFile {
                hidden: self.hidden.clone(),
                params: best.to_vec(),
            },
        )
    }
}

fn format_series(values: &[f32]) -> String {
    let mut out = String::with_capacity(values.len() * 12);
    for v in values {
        out.push_str(&v.to_string());
        out.push('\n');
    }
    out
}

fn parse_series(path: &Path) -> Result<Vec<f32>, StoreError> {
    let text = read_file(path)?;
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            line.trim().parse::<f32>().map_err(|_| StoreError::Number {
                path: path.to_path_buf(),
                line: i + 1,
                text: line.to_string(),
            })
        })
        .collect()
}

fn read_file(path: &Path) -> Result<String, StoreError> {
    fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, contents: &str) -> Result<(), StoreError> {
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, contents).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_and_history_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let model = ModelFile {
            hidden: vec![8],
            params: vec![0.25, -1.5, 3.0],
        };
        store.save_model("snek_1", &model).unwrap();
        assert!(store.model_exists("snek_1").unwrap());
        assert_eq!(store.load_model("snek_1").unwrap(), model);

        let mut history = FitnessHistory::default();
        history.push(-12.5, 40.0);
        history.push(3.75, 101.5);
        store.save_history("snek_1", &history).unwrap();
        assert_eq!(store.load_history("snek_1").unwrap(), history);
        let raw = fs::read_to_string(dir.path().join("statbackup/snek_1/avg.csv")).unwrap();
        assert_eq!(raw, "-12.5\n3.75\n");
    }

    #[test]
    fn malformed_names_are_rejected() {
        let store = Store::new("unused");
        for name in ["", "../escape", "a b", "x/y"] {
            assert!(matches!(
                store.model_path(name),
                Err(StoreError::InvalidName(_))
            ));
        }
    }

    #[test]
    fn missing_files_and_bad_numbers_fail_loudly() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        assert!(matches!(store.load_model("nope"), Err(StoreError::Io { .. })));

        let stats = dir.path().join("statbackup/bad");
        fs::create_dir_all(&stats).unwrap();
        fs::write(stats.join("avg.csv"), "1.0\nabc\n").unwrap();
        fs::write(stats.join("peak.csv"), "1.0\n").unwrap();
        match store.load_history("bad") {
            Err(StoreError::Number { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {other:?}"),
        }
    }
}
