use rand::{Rng as _, SeedableRng as _, seq::IndexedRandom as _};
use rand_pcg::Pcg32;
use trike_engine::{Cell, GameState};

use crate::Agent;

/// Plays a uniformly random legal move.
#[derive(Debug, Clone)]
pub struct RandomAgent {
    name: String,
    rng: Pcg32,
}

impl Default for RandomAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomAgent {
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(rand::rng().random())
    }

    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            name: "Random".to_owned(),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<S: GameState> Agent<S> for RandomAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_move(&mut self, state: &S) -> Option<Cell> {
        state.legal_moves().choose(&mut self.rng).copied()
    }
}
