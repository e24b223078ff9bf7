//! Board mapper module
//!
//! Pure functions mapping world coordinates onto the labelled cells
//! ("quadrants") of the arena board and back. A quadrant is addressed by a
//! row letter (from the southern edge) and a 1-based column number (from the
//! western edge), for example `A1` is the south-west corner cell.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;

// Internal
pub use params::Params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One cell of the board, derived on demand from a world point.
#[derive(Debug, Clone, PartialEq)]
pub struct Quadrant {

    /// 0-based row index, counted from the southern edge.
    pub row: usize,

    /// 0-based column index, counted from the western edge.
    pub column: usize,

    /// Display label, row letter followed by 1-based column number.
    pub label: String,

    /// The world-frame centre of the cell.
    ///
    /// Units: meters
    pub centre_m: Vector2<f64>,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Map a world point onto the board cell containing it.
///
/// Returns `None` for any point on or outside the board boundary. A point
/// sitting exactly on an interior grid line is counted in the cell to its
/// south/west only.
pub fn world_to_quadrant(point_m: Vector2<f64>, params: &Params) -> Option<Quadrant> {
    let half_span = params.half_span_m();

    if !point_m.x.is_finite() || !point_m.y.is_finite() {
        return None;
    }

    if point_m.x.abs() >= half_span || point_m.y.abs() >= half_span {
        return None;
    }

    let column = ((point_m.x + half_span - params.boundary_epsilon)
        / params.cell_size_m)
        .floor();
    let row = ((point_m.y + half_span - params.boundary_epsilon)
        / params.cell_size_m)
        .floor();

    if column < 0.0
        || column >= params.cells_per_side as f64
        || row < 0.0
        || row >= params.cells_per_side as f64
    {
        return None;
    }

    let row = row as usize;
    let column = column as usize;

    Some(Quadrant {
        row,
        column,
        label: quadrant_label(row, column),
        centre_m: cell_centre(row, column, params),
    })
}

/// Get the world-frame centre of the cell at the given indices.
///
/// Returns `None` if either index falls outside the board.
pub fn quadrant_centre(row: usize, column: usize, params: &Params) -> Option<Vector2<f64>> {
    if row >= params.cells_per_side || column >= params.cells_per_side {
        return None;
    }

    Some(cell_centre(row, column, params))
}

/// Get the display label of the cell at the given indices.
pub fn quadrant_label(row: usize, column: usize) -> String {
    format!("{}{}", row_letter(row), column + 1)
}

/// Clamp a world point into the board.
///
/// Points outside the boundary are pulled back onto it, points inside are
/// returned unchanged.
pub fn clamp_to_board(point_m: Vector2<f64>, params: &Params) -> Vector2<f64> {
    let half_span = params.half_span_m();

    Vector2::new(
        point_m.x.clamp(-half_span, half_span),
        point_m.y.clamp(-half_span, half_span),
    )
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn cell_centre(row: usize, column: usize, params: &Params) -> Vector2<f64> {
    let half_span = params.half_span_m();

    Vector2::new(
        -half_span + (column as f64 + 0.5) * params.cell_size_m,
        -half_span + (row as f64 + 0.5) * params.cell_size_m,
    )
}

fn row_letter(row: usize) -> char {
    // Params docs bound cells_per_side to 26, anything beyond is a config
    // error surfaced as '?' rather than a panic
    if row < 26 {
        (b'A' + row as u8) as char
    } else {
        '?'
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_south_west_corner_is_a1() {
        let params = Params::default();
        let quad = world_to_quadrant(Vector2::new(-2.9, -2.9), &params).unwrap();

        assert_eq!(quad.label, "A1");
        assert_eq!(quad.row, 0);
        assert_eq!(quad.column, 0);
        assert!((quad.centre_m - Vector2::new(-2.75, -2.75)).norm() < 1e-9);
    }

    #[test]
    fn test_round_trip_within_half_cell() {
        let params = Params::default();
        let max_err = params.cell_size_m / 2.0 * std::f64::consts::SQRT_2 + 1e-9;

        for &(x, y) in &[
            (0.0, 0.0),
            (0.1, -0.1),
            (2.9, 2.9),
            (-1.3, 0.7),
            (-2.999, 2.999),
        ] {
            let point = Vector2::new(x, y);
            let quad = world_to_quadrant(point, &params).unwrap();
            let centre = quadrant_centre(quad.row, quad.column, &params).unwrap();
            assert!((centre - point).norm() <= max_err, "point {:?}", point);
            assert_eq!(centre, quad.centre_m);
        }
    }

    #[test]
    fn test_outside_board_is_none() {
        let params = Params::default();

        assert!(world_to_quadrant(Vector2::new(3.0, 0.0), &params).is_none());
        assert!(world_to_quadrant(Vector2::new(-3.0, 0.0), &params).is_none());
        assert!(world_to_quadrant(Vector2::new(0.0, 3.1), &params).is_none());
        assert!(world_to_quadrant(Vector2::new(-4.0, -4.0), &params).is_none());
        assert!(world_to_quadrant(Vector2::new(f64::NAN, 0.0), &params).is_none());
    }

    #[test]
    fn test_grid_line_counted_once() {
        let params = Params::default();

        // A point exactly on the line between columns 10 and 11 falls in the
        // western of the two cells
        let quad = world_to_quadrant(Vector2::new(2.5, 0.0), &params).unwrap();
        assert_eq!(quad.column, 10);
    }

    #[test]
    fn test_quadrant_centre_bounds() {
        let params = Params::default();

        assert!(quadrant_centre(11, 11, &params).is_some());
        assert!(quadrant_centre(12, 0, &params).is_none());
        assert!(quadrant_centre(0, 12, &params).is_none());
    }

    #[test]
    fn test_clamp_to_board() {
        let params = Params::default();

        let inside = Vector2::new(1.0, -1.0);
        assert_eq!(clamp_to_board(inside, &params), inside);

        let outside = Vector2::new(5.0, -10.0);
        assert_eq!(clamp_to_board(outside, &params), Vector2::new(3.0, -3.0));
    }
}
