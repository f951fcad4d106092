//! Board geometry.
//!
//! Cells use axial hex coordinates `(q, r)`. A board of side `n` contains exactly the
//! cells with `q + r < n`, which forms a triangle with corners `(0, 0)`, `(n - 1, 0)` and
//! `(0, n - 1)`.
//!
//! ```text
//! r=0   (0,0) (1,0) (2,0)
//! r=1   (0,1) (1,1)
//! r=2   (0,2)
//! ```

pub use self::{board::*, cell::*};

mod board;
mod cell;
