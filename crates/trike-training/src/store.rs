//! Persistence of evolution runs and the leaderboard.
//!
//! The optimizer never touches the filesystem itself. It receives a [`RunStore`] for the
//! per-run artifact and a [`LeaderboardStore`] for the best-ever genomes, so tests can
//! pass the in-memory adapters and the CLI the JSON ones. Both are generic over the
//! evolved [`Genome`]; each genome keeps its own leaderboard file.
//!
//! # Files
//!
//! - `evolution_results_<timestamp>.json` in the output directory: the whole run, rewritten
//!   after every generation. The timestamp has millisecond resolution, so back-to-back
//!   runs get separate files
//! - the leaderboard file: at most [`LEADERBOARD_CAPACITY`] entries sorted by fitness,
//!   rewritten (never appended) at the end of each run

use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write as _},
    marker::PhantomData,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trike_ai::EnsembleWeights;

use crate::{evolution::EvolutionRun, genome::Genome};

/// Entries kept by a leaderboard.
pub const LEADERBOARD_CAPACITY: usize = 5;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum StoreError {
    #[display("failed to access {}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("failed to read or write JSON {}", path.display())]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Saves snapshots of a running evolution.
pub trait RunStore<G = EnsembleWeights> {
    /// Persists the run so far, replacing any earlier snapshot of the same run.
    fn save_run(&mut self, run: &EvolutionRun<G>) -> Result<(), StoreError>;
}

/// Loads and saves the best-ever genomes.
pub trait LeaderboardStore<G = EnsembleWeights> {
    /// Current entries. A leaderboard that was never saved is empty.
    fn load(&self) -> Result<Vec<LeaderboardEntry<G>>, StoreError>;

    fn save(&mut self, entries: &[LeaderboardEntry<G>]) -> Result<(), StoreError>;
}

/// A genome on the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry<G = EnsembleWeights> {
    pub name: String,
    pub weights: G,
    pub fitness: f64,
    pub generation: usize,
    pub recorded_at: DateTime<Utc>,
}

impl<G: Genome> LeaderboardEntry<G> {
    /// Entry named after its fitness, e.g. `Evolved 83`.
    #[must_use]
    pub fn evolved(weights: G, fitness: f64, generation: usize) -> Self {
        Self {
            name: format!("Evolved {:.0}", (fitness * 100.0).floor()),
            weights,
            fitness,
            generation,
            recorded_at: Utc::now(),
        }
    }
}

/// Adds `entry`, sorts by fitness descending and keeps the top
/// [`LEADERBOARD_CAPACITY`].
///
/// Among equal fitness, earlier entries stay ahead.
pub fn insert_entry<G>(entries: &mut Vec<LeaderboardEntry<G>>, entry: LeaderboardEntry<G>) {
    entries.push(entry);
    entries.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
    entries.truncate(LEADERBOARD_CAPACITY);
}

/// Writes each run to `evolution_results_<timestamp>.json` in a directory.
#[derive(Debug, Clone)]
pub struct JsonRunStore {
    dir: PathBuf,
}

impl JsonRunStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn path_for<G>(&self, run: &EvolutionRun<G>) -> PathBuf {
        self.dir.join(format!(
            "evolution_results_{}.json",
            run.started_at.format("%Y%m%d_%H%M%S_%3f")
        ))
    }
}

impl<G: Genome> RunStore<G> for JsonRunStore {
    fn save_run(&mut self, run: &EvolutionRun<G>) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        write_json(&self.path_for(run), run)
    }
}

/// Leaderboard kept in one JSON file.
#[derive(Debug, Clone)]
pub struct JsonLeaderboardStore<G = EnsembleWeights> {
    path: PathBuf,
    genome: PhantomData<fn() -> G>,
}

impl<G: Genome> JsonLeaderboardStore<G> {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            genome: PhantomData,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<G: Genome> LeaderboardStore<G> for JsonLeaderboardStore<G> {
    fn load(&self) -> Result<Vec<LeaderboardEntry<G>>, StoreError> {
        if !self.path.exists() {
            return Ok(vec![]);
        }
        read_json(&self.path)
    }

    fn save(&mut self, entries: &[LeaderboardEntry<G>]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_owned(),
                source,
            })?;
        }
        write_json(&self.path, entries)
    }
}

/// Keeps every saved snapshot in memory.
#[derive(Debug, Clone)]
pub struct InMemoryRunStore<G = EnsembleWeights> {
    snapshots: Vec<EvolutionRun<G>>,
}

impl<G: Genome> Default for InMemoryRunStore<G> {
    fn default() -> Self {
        Self { snapshots: vec![] }
    }
}

impl<G: Genome> InMemoryRunStore<G> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshots(&self) -> &[EvolutionRun<G>] {
        &self.snapshots
    }

    #[must_use]
    pub fn latest(&self) -> Option<&EvolutionRun<G>> {
        self.snapshots.last()
    }
}

impl<G: Genome> RunStore<G> for InMemoryRunStore<G> {
    fn save_run(&mut self, run: &EvolutionRun<G>) -> Result<(), StoreError> {
        self.snapshots.push(run.clone());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct InMemoryLeaderboardStore<G = EnsembleWeights> {
    entries: Vec<LeaderboardEntry<G>>,
}

impl<G: Genome> Default for InMemoryLeaderboardStore<G> {
    fn default() -> Self {
        Self { entries: vec![] }
    }
}

impl<G: Genome> InMemoryLeaderboardStore<G> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> &[LeaderboardEntry<G>] {
        &self.entries
    }
}

impl<G: Genome> LeaderboardStore<G> for InMemoryLeaderboardStore<G> {
    fn load(&self) -> Result<Vec<LeaderboardEntry<G>>, StoreError> {
        Ok(self.entries.clone())
    }

    fn save(&mut self, entries: &[LeaderboardEntry<G>]) -> Result<(), StoreError> {
        self.entries = entries.to_vec();
        Ok(())
    }
}

fn read_json<T>(path: &Path) -> Result<T, StoreError>
where
    T: for<'de> Deserialize<'de>,
{
    let file = File::open(path).map_err(|source| StoreError::Io {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| StoreError::Format {
        path: path.to_owned(),
        source,
    })
}

fn write_json<T>(path: &Path, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
{
    let io_err = |source| StoreError::Io {
        path: path.to_owned(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| StoreError::Format {
        path: path.to_owned(),
        source,
    })?;
    writeln!(writer).map_err(io_err)?;
    writer.flush().map_err(io_err)
}

#[cfg(test)]
mod tests {
    use trike_ai::strategic::StrategyWeights;

    use super::*;
    use crate::evolution::EvolutionConfig;

    fn entry(fitness: f64) -> LeaderboardEntry {
        LeaderboardEntry::evolved(EnsembleWeights::CHAMPION, fitness, 1)
    }

    #[test]
    fn test_leaderboard_capped_and_sorted() {
        let mut entries = vec![];
        for fitness in [0.3, 0.9, 0.1, 0.5, 0.7, 0.2, 0.8] {
            insert_entry(&mut entries, entry(fitness));
        }
        let fitness: Vec<f64> = entries.iter().map(|e| e.fitness).collect();
        assert_eq!(fitness, [0.9, 0.8, 0.7, 0.5, 0.3]);
    }

    #[test]
    fn test_evolved_name() {
        assert_eq!(entry(0.836).name, "Evolved 83");
        assert_eq!(entry(1.0).name, "Evolved 100");
    }

    #[test]
    fn test_runs_in_the_same_second_get_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonRunStore::new(dir.path());
        let started = DateTime::parse_from_rfc3339("2026-10-19T08:30:05.120Z")
            .unwrap()
            .with_timezone(&Utc);
        let run = |started_at| EvolutionRun {
            started_at,
            genome: "ensemble".to_owned(),
            config: EvolutionConfig::<EnsembleWeights>::default(),
            hall_of_fame: vec![],
            generations: vec![],
        };
        let first = run(started);
        let second = run(started + chrono::Duration::milliseconds(250));

        assert_eq!(
            store.path_for(&first),
            dir.path().join("evolution_results_20261019_083005_120.json")
        );
        assert_ne!(store.path_for(&first), store.path_for(&second));
        store.save_run(&first).unwrap();
        store.save_run(&second).unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_json_leaderboard_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store: JsonLeaderboardStore =
            JsonLeaderboardStore::new(dir.path().join("nested").join("board.json"));
        assert!(store.load().unwrap().is_empty());

        let entries = vec![entry(0.75), entry(0.5)];
        store.save(&entries).unwrap();
        assert_eq!(store.load().unwrap(), entries);

        store.save(&entries[1..]).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn test_json_leaderboard_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        fs::write(&path, "not json").unwrap();
        let store: JsonLeaderboardStore = JsonLeaderboardStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Format { .. })));
    }

    #[test]
    fn test_strategy_leaderboard_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strategic.json");
        let mut store: JsonLeaderboardStore<StrategyWeights> = JsonLeaderboardStore::new(&path);
        let entries = vec![LeaderboardEntry::evolved(StrategyWeights::BALANCED, 0.6, 3)];
        store.save(&entries).unwrap();
        assert_eq!(store.load().unwrap(), entries);

        let other: JsonLeaderboardStore = JsonLeaderboardStore::new(&path);
        assert!(matches!(other.load(), Err(StoreError::Format { .. })));
    }
}
