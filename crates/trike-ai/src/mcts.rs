//! UCT Monte-Carlo tree search.
//!
//! Each iteration walks down the tree picking the child with the best UCT score,
//! expands one untried move, plays a uniformly random rollout to the end of the game
//! and propagates the result back to the root.
//!
//! # Tree Layout
//!
//! The tree is an arena: nodes live in one `Vec` and refer to their parent and children
//! by index. The whole tree is dropped after each decision.
//!
//! # Win Accounting
//!
//! A node's `wins` are counted for the player to move in that node: 1 for a win, 0.5 for
//! a tie and 0 for a loss. When a parent ranks its children it looks at the game from
//! its own mover's side, which is the opponent of the child's mover, so the exploitation
//! term is `1 - child.wins / child.visits`.

use rand::{Rng as _, SeedableRng as _, seq::IndexedRandom as _};
use rand_pcg::Pcg32;
use trike_engine::{Cell, GameState, Player};

use crate::{Agent, opening::opening_move};

pub const DEFAULT_ITERATIONS: u32 = 1000;
pub const DEFAULT_EXPLORATION: f64 = 1.41;

#[derive(Debug, Clone)]
struct Node<S> {
    state: S,
    mv: Option<Cell>,
    parent: Option<usize>,
    children: Vec<usize>,
    untried: Vec<Cell>,
    player: Player,
    visits: u32,
    wins: f64,
}

impl<S: GameState> Node<S> {
    fn new(state: S, mv: Option<Cell>, parent: Option<usize>) -> Self {
        let untried = state.legal_moves();
        let player = state.current_player();
        Self {
            state,
            mv,
            parent,
            children: vec![],
            untried,
            player,
            visits: 0,
            wins: 0.0,
        }
    }
}

/// Statistics of one root child after a search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChildStats {
    pub mv: Cell,
    pub visits: u32,
    pub wins: f64,
}

/// The tree built by one call to [`MctsAgent::search`].
#[derive(Debug, Clone)]
pub struct SearchTree<S> {
    nodes: Vec<Node<S>>,
}

impl<S: GameState> SearchTree<S> {
    const ROOT: usize = 0;

    fn new(state: S) -> Self {
        Self {
            nodes: vec![Node::new(state, None, None)],
        }
    }

    #[must_use]
    pub fn root_visits(&self) -> u32 {
        self.nodes[Self::ROOT].visits
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn root_children(&self) -> impl Iterator<Item = ChildStats> + '_ {
        self.nodes[Self::ROOT].children.iter().filter_map(|&i| {
            let node = &self.nodes[i];
            Some(ChildStats {
                mv: node.mv?,
                visits: node.visits,
                wins: node.wins,
            })
        })
    }

    /// Most visited root child. The first one wins ties.
    #[must_use]
    pub fn best_move(&self) -> Option<Cell> {
        let mut best: Option<ChildStats> = None;
        for child in self.root_children() {
            if best.is_none_or(|b| child.visits > b.visits) {
                best = Some(child);
            }
        }
        best.map(|c| c.mv)
    }

    fn uct(&self, parent: usize, child: usize, exploration: f64) -> f64 {
        let parent_visits = f64::from(self.nodes[parent].visits);
        let node = &self.nodes[child];
        if node.visits == 0 {
            return f64::INFINITY;
        }
        let visits = f64::from(node.visits);
        let exploitation = 1.0 - node.wins / visits;
        exploitation + exploration * (parent_visits.ln() / visits).sqrt()
    }

    fn select(&self, exploration: f64) -> usize {
        let mut current = Self::ROOT;
        loop {
            let node = &self.nodes[current];
            if !node.untried.is_empty() || node.children.is_empty() {
                return current;
            }
            let mut best = node.children[0];
            let mut best_score = f64::NEG_INFINITY;
            for &child in &node.children {
                let score = self.uct(current, child, exploration);
                if score > best_score {
                    best = child;
                    best_score = score;
                }
            }
            current = best;
        }
    }

    fn expand(&mut self, index: usize, rng: &mut Pcg32) -> usize {
        let node = &mut self.nodes[index];
        if node.untried.is_empty() {
            return index;
        }
        let pick = rng.random_range(0..node.untried.len());
        let mv = node.untried.swap_remove(pick);
        let state = node.state.apply(mv);
        let child = self.nodes.len();
        self.nodes.push(Node::new(state, Some(mv), Some(index)));
        self.nodes[index].children.push(child);
        child
    }

    fn backpropagate(&mut self, from: usize, outcome: [u32; 2]) {
        let mut current = Some(from);
        while let Some(index) = current {
            let node = &mut self.nodes[index];
            node.visits += 1;
            node.wins += result_for(outcome, node.player);
            current = node.parent;
        }
    }
}

fn result_for(outcome: [u32; 2], player: Player) -> f64 {
    let own = outcome[player.index()];
    let other = outcome[player.opponent().index()];
    match own.cmp(&other) {
        std::cmp::Ordering::Greater => 1.0,
        std::cmp::Ordering::Equal => 0.5,
        std::cmp::Ordering::Less => 0.0,
    }
}

#[derive(Debug, Clone)]
pub struct MctsAgent {
    name: String,
    iterations: u32,
    exploration: f64,
    rng: Pcg32,
}

impl Default for MctsAgent {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

impl MctsAgent {
    #[must_use]
    pub fn new(iterations: u32) -> Self {
        Self::with_seed(iterations, rand::rng().random())
    }

    #[must_use]
    pub fn with_seed(iterations: u32, seed: u64) -> Self {
        Self {
            name: format!("MCTS ({iterations} iterations)"),
            iterations,
            exploration: DEFAULT_EXPLORATION,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration;
        self
    }

    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Runs the configured number of iterations from `state` and returns the tree.
    pub fn search<S: GameState>(&mut self, state: &S) -> SearchTree<S> {
        let mut tree = SearchTree::new(state.clone());
        for _ in 0..self.iterations {
            let leaf = tree.select(self.exploration);
            let node = tree.expand(leaf, &mut self.rng);
            let outcome = self.rollout(tree.nodes[node].state.clone());
            tree.backpropagate(node, outcome);
        }
        tree
    }

    fn rollout<S: GameState>(&mut self, mut state: S) -> [u32; 2] {
        while !state.is_terminal() {
            let Some(&mv) = state.legal_moves().choose(&mut self.rng) else {
                break;
            };
            state = state.apply(mv);
        }
        state.outcome()
    }
}

impl<S: GameState> Agent<S> for MctsAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_move(&mut self, state: &S) -> Option<Cell> {
        if let Some(mv) = opening_move(state) {
            return Some(mv);
        }
        if let Some(mv) = self.search(state).best_move() {
            return Some(mv);
        }
        state.legal_moves().choose(&mut self.rng).copied()
    }
}
