//! Structure-of-arrays plane storage for the device backend.
//!
//! Lays planes out transposed so that, for a fixed plane slot `j` and
//! component `c`, the values for every point in the batch are contiguous —
//! the access pattern a coalesced SIMT kernel load would want. Index
//! formula: `P[4*refsize*j + refsize*c + i]`, exactly as specified.

pub struct PlaneSoa {
    data: Vec<f32>,
    refsize: usize,
    p_max: usize,
}

impl PlaneSoa {
    pub fn new(refsize: usize, p_max: usize) -> Self {
        PlaneSoa {
            data: vec![0.0; 4 * refsize * p_max],
            refsize,
            p_max,
        }
    }

    fn index(&self, j: usize, c: usize, i: usize) -> usize {
        debug_assert!(j < self.p_max);
        debug_assert!(c < 4);
        debug_assert!(i < self.refsize);
        4 * self.refsize * j + self.refsize * c + i
    }

    /// Writes plane slot `j`'s four components for point `i` in this batch.
    pub fn set_plane(&mut self, i: usize, j: usize, plane: [f32; 4]) {
        for c in 0..4 {
            let idx = self.index(j, c, i);
            self.data[idx] = plane[c];
        }
    }

    pub fn get_plane(&self, i: usize, j: usize) -> [f32; 4] {
        let mut out = [0.0f32; 4];
        for (c, slot) in out.iter_mut().enumerate() {
            *slot = self.data[self.index(j, c, i)];
        }
        out
    }

    pub fn refsize(&self) -> usize {
        self.refsize
    }

    pub fn p_max(&self) -> usize {
        self.p_max
    }
}
