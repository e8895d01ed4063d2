use nalgebra::Vector2;
use tracing::warn;

use crate::lj_pot::PeriodicBox;

/// Factor `n` into `(rows, cols)` with `rows` the largest divisor of `n` not exceeding `sqrt(n)`.
///
/// A prime `n` yields `(1, n)`: the lattice collapses to a single row.
pub fn grid_dimensions(n: usize) -> (usize, usize) {
    if n == 0 {
        return (0, 0);
    }
    let mut rows = (n as f64).sqrt() as usize;
    // float sqrt can land one off for large n
    while (rows + 1) * (rows + 1) <= n {
        rows += 1;
    }
    while rows * rows > n {
        rows -= 1;
    }
    while n % rows != 0 {
        rows -= 1;
    }
    (rows, n / rows)
}

/// Staggered (brick) lattice of `n` sites filling the periodic box.
///
/// Odd rows are shifted by half a column spacing relative to even rows. Sites are
/// returned row-major and already wrapped into `[0, Lx) x [0, Ly)`.
pub fn brick_lattice(n: usize, cell: &PeriodicBox) -> Vec<Vector2<f64>> {
    let (rows, cols) = grid_dimensions(n);
    if rows == 1 && n > 3 {
        warn!(n, "particle count has no non-trivial divisor, lattice degenerates to one row");
    }

    let row_spacing = cell.ly() / rows as f64;
    let col_spacing = cell.lx() / cols as f64;
    let half = 0.5 * col_spacing;
    let quarter = 0.5 * half;

    let mut sites = Vec::with_capacity(n);
    for row in 0..rows {
        let stagger = if row % 2 == 0 { 0.0 } else { half };
        for col in 0..cols {
            let x = col_spacing * (col as f64 - 0.5) + stagger - quarter;
            let y = row_spacing * (row as f64 - 0.5);
            sites.push(cell.wrap(Vector2::new(x, y)));
        }
    }
    sites
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_grid_dimensions_square_and_rectangular() {
        assert_eq!(grid_dimensions(16), (4, 4));
        assert_eq!(grid_dimensions(12), (3, 4));
        assert_eq!(grid_dimensions(18), (3, 6));
        assert_eq!(grid_dimensions(1), (1, 1));
    }

    #[test]
    fn test_grid_dimensions_prime_degenerates() {
        assert_eq!(grid_dimensions(13), (1, 13));
        assert_eq!(grid_dimensions(2), (1, 2));
    }

    #[test]
    fn test_brick_lattice_inside_box() {
        let cell = PeriodicBox::new(4.0, 2.0 * 3f64.sqrt());
        let sites = brick_lattice(16, &cell);
        assert_eq!(sites.len(), 16);
        for s in &sites {
            assert!(s.x >= 0.0 && s.x < cell.lx());
            assert!(s.y >= 0.0 && s.y < cell.ly());
        }
    }

    #[test]
    fn test_brick_lattice_stagger() {
        let cell = PeriodicBox::new(4.0, 4.0);
        let sites = brick_lattice(16, &cell);
        // row 1 is shifted by half a column spacing (0.5) against row 0
        let dx = cell.separation(sites[4] - sites[0]);
        assert_relative_eq!(dx.x.abs(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(dx.y.abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_row_lattice() {
        let cell = PeriodicBox::new(7.0, 1.0);
        let sites = brick_lattice(7, &cell);
        let y0 = sites[0].y;
        assert!(sites.iter().all(|s| (s.y - y0).abs() < 1e-12));
        let dx = cell.separation(sites[1] - sites[0]);
        assert_relative_eq!(dx.x.abs(), 1.0, epsilon = 1e-12);
    }
}
