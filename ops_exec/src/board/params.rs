//! Parameters structure for the board mapper

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters describing the arena board.
///
/// The board is a square, origin-centred grid of `cells_per_side` cells along
/// each edge, each cell being `cell_size_m` on a side. Rows are lettered from
/// the southern edge, so `cells_per_side` may not exceed 26.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    /// Number of cells along each edge of the board.
    pub cells_per_side: usize,

    /// The side length of a single cell.
    ///
    /// Units: meters
    pub cell_size_m: f64,

    /// Offset subtracted before floor division so that a point sitting
    /// exactly on a grid line is counted in one cell only.
    pub boundary_epsilon: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Half the side length of the board.
    ///
    /// The board spans `[-half_span_m, half_span_m]` on both world axes.
    pub fn half_span_m(&self) -> f64 {
        self.cells_per_side as f64 * self.cell_size_m / 2.0
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            cells_per_side: 12,
            cell_size_m: 0.5,
            boundary_epsilon: 1e-6,
        }
    }
}
