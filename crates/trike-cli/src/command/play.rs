use rand::Rng as _;
use trike_ai::{
    Agent,
    arena::{MatchConfig, MatchResult, MatchRunner, Seat},
};
use trike_engine::{Cell, GameState as _, Player, TrikeState};

use crate::agent_spec::AgentSpec;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct PlayArg {
    /// Agent moving first
    first: AgentSpec,
    /// Agent moving second
    second: AgentSpec,
    #[arg(long, default_value_t = 7)]
    board_size: u8,
    #[arg(long)]
    pie_rule: bool,
    #[arg(long)]
    seed: Option<u64>,
}

/// Prints every move and the resulting board before passing the move on.
struct Narrated {
    inner: Box<dyn Agent<TrikeState>>,
    seat: Seat,
}

impl Agent<TrikeState> for Narrated {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn choose_move(&mut self, state: &TrikeState) -> Option<Cell> {
        let mv = self.inner.choose_move(state);
        match mv {
            Some(mv) => {
                eprintln!(
                    "{:3}. [{}] {} ({}) plays {mv}",
                    state.turn() + 1,
                    self.seat,
                    self.inner.name(),
                    state.current_player(),
                );
                if let Ok(next) = state.try_apply(mv) {
                    eprintln!("{}", render(&next));
                }
            }
            None => eprintln!("     [{}] {} has no move", self.seat, self.inner.name()),
        }
        mv
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}

pub(crate) fn run(arg: &PlayArg) -> anyhow::Result<()> {
    let seed = arg.seed.unwrap_or_else(|| rand::rng().random());
    let mut a = Narrated {
        inner: arg.first.build(arg.board_size, seed)?,
        seat: Seat::A,
    };
    let mut b = Narrated {
        inner: arg.second.build(arg.board_size, seed.wrapping_add(1))?,
        seat: Seat::B,
    };
    let runner = MatchRunner::new(MatchConfig {
        board_size: arg.board_size,
        pie_rule: arg.pie_rule,
        ..MatchConfig::default()
    });

    let outcome = runner.play::<TrikeState>(&mut a, &mut b);

    eprintln!();
    if outcome.swapped {
        eprintln!("Seat B took over the opening under the pie rule");
    }
    let name = |seat| match seat {
        Seat::A => a.name(),
        Seat::B => b.name(),
    };
    match outcome.result {
        MatchResult::Winner(seat) => eprintln!("Winner: [{seat}] {}", name(seat)),
        MatchResult::Draw => eprintln!("Draw"),
        MatchResult::Timeout => eprintln!("Game stopped: turn or time limit reached"),
        MatchResult::Error => eprintln!("Game aborted by an agent error"),
    }
    eprintln!(
        "Score: [A] {} - [B] {} after {} moves",
        outcome.scores.0, outcome.scores.1, outcome.turns
    );
    Ok(())
}

/// Renders the triangle row by row, `r` descending, with the pawn in brackets.
fn render(state: &TrikeState) -> String {
    let size = state.board_size();
    let mut out = String::new();
    for r in (0..size).rev() {
        out.push_str(&" ".repeat(usize::from(r)));
        for q in 0..size - r {
            let cell = Cell::new(q, r);
            let mark = match state.marker(cell) {
                Some(Player::First) => 'X',
                Some(Player::Second) => 'O',
                None => '.',
            };
            if state.pawn() == Some(cell) {
                out.push_str(&format!("[{mark}]"));
            } else {
                out.push_str(&format!(" {mark} "));
            }
        }
        out.push('\n');
    }
    out
}
