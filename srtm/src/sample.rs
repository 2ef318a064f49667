//! Bilinear sampling over a tile's elevation grid.

use crate::{C, VOID};

/// Standard bilinear blend of the four posts surrounding a fractional
/// grid position.
///
/// Fractions are clamped to `[0, N-1]` so edge queries never index out
/// of the grid; the clamped corner indices collapse onto the edge posts.
/// Void posts are substituted with 0 m, a deliberately lossy policy
/// applied uniformly everywhere voids can appear.
pub(crate) fn bilinear(samples: &[i16], dimension: usize, frac_row: C, frac_col: C) -> C {
    let max = (dimension - 1) as C;
    let row = frac_row.clamp(0.0, max);
    let col = frac_col.clamp(0.0, max);

    let r0 = row.floor() as usize;
    let c0 = col.floor() as usize;
    let r1 = (r0 + 1).min(dimension - 1);
    let c1 = (c0 + 1).min(dimension - 1);

    let fy = row - r0 as C;
    let fx = col - c0 as C;

    let v00 = post(samples, dimension, r0, c0);
    let v10 = post(samples, dimension, r0, c1);
    let v01 = post(samples, dimension, r1, c0);
    let v11 = post(samples, dimension, r1, c1);

    v00 * (1.0 - fx) * (1.0 - fy)
        + v10 * fx * (1.0 - fy)
        + v01 * (1.0 - fx) * fy
        + v11 * fx * fy
}

fn post(samples: &[i16], dimension: usize, row: usize, col: usize) -> C {
    match samples[row * dimension + col] {
        VOID => 0.0,
        sample => C::from(sample),
    }
}
