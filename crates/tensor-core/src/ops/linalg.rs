// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Native dense linear algebra over floating-point cells.
//!
//! These are the kernels the specialized product nodes call when every
//! input shares one floating cell type; other cell types go through the
//! strided `f64` loops in the nodes themselves.

use num_traits::Float;

/// Dot product of two equally long slices.
#[inline]
pub fn dot<T: Float>(a: &[T], b: &[T]) -> T {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .fold(T::zero(), |acc, (&x, &y)| acc + x * y)
}

/// Vector–matrix product: `out[i] = Σ_j vector[j] · matrix(i, j)`.
///
/// `vector` has the common size `n`, `out` has the result size `m`. With
/// `common_inner` the matrix is stored `[m][n]` (common dimension varies
/// fastest), otherwise `[n][m]`.
pub fn vector_matrix<T: Float>(vector: &[T], matrix: &[T], out: &mut [T], common_inner: bool) {
    let n = vector.len();
    let m = out.len();
    debug_assert_eq!(matrix.len(), n * m);

    if common_inner {
        for (i, o) in out.iter_mut().enumerate() {
            *o = dot(vector, &matrix[i * n..(i + 1) * n]);
        }
    } else {
        // Row-wise saxpy keeps the inner loop sequential in memory.
        out.iter_mut().for_each(|x| *x = T::zero());
        for (j, &v) in vector.iter().enumerate() {
            let row = &matrix[j * m..(j + 1) * m];
            for (o, &w) in out.iter_mut().zip(row) {
                *o = *o + v * w;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot() {
        assert_eq!(dot(&[1.0f32, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0);
        assert_eq!(dot::<f64>(&[], &[]), 0.0);
    }

    #[test]
    fn test_vector_matrix_both_layouts() {
        // M = [[1, 2, 3], [4, 5, 6]] as m=2 rows over the common n=3.
        let vector = [1.0f64, 0.5, 2.0];
        let inner = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let outer = [1.0, 4.0, 2.0, 5.0, 3.0, 6.0];

        let mut a = [0.0; 2];
        vector_matrix(&vector, &inner, &mut a, true);
        let mut b = [0.0; 2];
        vector_matrix(&vector, &outer, &mut b, false);

        assert_eq!(a, [8.0, 18.5]);
        assert_eq!(a, b);
    }
}
