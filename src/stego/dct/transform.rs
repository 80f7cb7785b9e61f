use std::f64::consts::PI;

use crate::config::BLOCK_SIZE;

/// One 8x8 block of samples or coefficients, indexed `[row][col]`.
pub type Block = [[f64; BLOCK_SIZE]; BLOCK_SIZE];

/// Precomputed cosine and normalization tables for the 8x8 DCT-II.
#[derive(Debug, Clone)]
pub struct DctTables {
    /// `cosine[u][x] = cos((2x + 1) * u * PI / 16)`
    cosine: Block,
    /// `alpha[u] = 1/sqrt(2)` for u = 0, else 1.
    alpha: [f64; BLOCK_SIZE],
}

impl DctTables {
    pub fn new() -> Self {
        let mut cosine = [[0.0f64; BLOCK_SIZE]; BLOCK_SIZE];
        for (u, row) in cosine.iter_mut().enumerate() {
            for (x, value) in row.iter_mut().enumerate() {
                *value = ((2 * x + 1) as f64 * u as f64 * PI / (2.0 * BLOCK_SIZE as f64)).cos();
            }
        }

        let mut alpha = [1.0f64; BLOCK_SIZE];
        alpha[0] = 1.0 / 2.0_f64.sqrt();

        Self { cosine, alpha }
    }

    /// Forward 2-D DCT: `output[u][v] = 1/4 a(u) a(v) sum_x sum_y input[x][y] cos_u(x) cos_v(y)`.
    ///
    /// Evaluated separably; `scratch` holds the row pass.
    pub fn forward(&self, input: &Block, output: &mut Block, scratch: &mut Block) {
        for u in 0..BLOCK_SIZE {
            for y in 0..BLOCK_SIZE {
                let mut sum = 0.0;
                for x in 0..BLOCK_SIZE {
                    sum += input[x][y] * self.cosine[u][x];
                }
                scratch[u][y] = sum;
            }
        }

        for u in 0..BLOCK_SIZE {
            for v in 0..BLOCK_SIZE {
                let mut sum = 0.0;
                for y in 0..BLOCK_SIZE {
                    sum += scratch[u][y] * self.cosine[v][y];
                }
                output[u][v] = 0.25 * self.alpha[u] * self.alpha[v] * sum;
            }
        }
    }

    /// Single forward coefficient `(u, v)`, for readers that only need a few.
    pub fn coefficient(&self, input: &Block, u: usize, v: usize) -> f64 {
        let mut sum = 0.0;
        for x in 0..BLOCK_SIZE {
            let cu = self.cosine[u][x];
            for y in 0..BLOCK_SIZE {
                sum += input[x][y] * cu * self.cosine[v][y];
            }
        }
        0.25 * self.alpha[u] * self.alpha[v] * sum
    }

    /// Inverse 2-D DCT: `output[x][y] = 1/4 sum_u sum_v a(u) a(v) input[u][v] cos_u(x) cos_v(y)`.
    pub fn inverse(&self, input: &Block, output: &mut Block, scratch: &mut Block) {
        for x in 0..BLOCK_SIZE {
            for v in 0..BLOCK_SIZE {
                let mut sum = 0.0;
                for u in 0..BLOCK_SIZE {
                    sum += self.alpha[u] * input[u][v] * self.cosine[u][x];
                }
                scratch[x][v] = sum;
            }
        }

        for x in 0..BLOCK_SIZE {
            for y in 0..BLOCK_SIZE {
                let mut sum = 0.0;
                for v in 0..BLOCK_SIZE {
                    sum += self.alpha[v] * scratch[x][v] * self.cosine[v][y];
                }
                output[x][y] = 0.25 * sum;
            }
        }
    }
}

impl Default for DctTables {
    fn default() -> Self {
        Self::new()
    }
}
