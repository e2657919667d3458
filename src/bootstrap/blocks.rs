//! Circular moving-block resampling.
//!
//! Residuals of a growth-curve fit are serially correlated (reporting
//! batches, weekday effects), so resampling them one at a time would
//! understate forecast uncertainty. We instead copy contiguous blocks of
//! length `ℓ` from random start positions, wrapping at the end, until the
//! resampled series has the original length. With `ℓ = 1` this is plain
//! i.i.d. residual resampling.

use std::str::FromStr;

use rand::Rng;
use serde::Serialize;

/// Block-length rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockLength {
    Fixed(usize),
    /// `⌈n^(1/3)⌉`.
    CubeRoot,
}

impl Default for BlockLength {
    fn default() -> Self {
        BlockLength::CubeRoot
    }
}

impl BlockLength {
    /// Concrete block length for a series of `n` residuals, clipped to `[1, n]`.
    pub fn resolve(self, n: usize) -> usize {
        let raw = match self {
            BlockLength::Fixed(len) => len,
            BlockLength::CubeRoot => {
                let root = (n as f64).cbrt();
                // Perfect cubes must not round up past their root.
                let nearest = root.round();
                if (root - nearest).abs() < 1e-9 {
                    nearest as usize
                } else {
                    root.ceil() as usize
                }
            }
        };
        raw.clamp(1, n.max(1))
    }
}

impl std::fmt::Display for BlockLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockLength::Fixed(len) => write!(f, "{len}"),
            BlockLength::CubeRoot => f.write_str("auto"),
        }
    }
}

impl FromStr for BlockLength {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "cuberoot" | "cube-root" => Ok(BlockLength::CubeRoot),
            other => match other.parse::<usize>() {
                Ok(0) => Err("block length must be >= 1".to_string()),
                Ok(len) => Ok(BlockLength::Fixed(len)),
                Err(_) => Err(format!("expected 'auto' or a positive integer, got '{s}'")),
            },
        }
    }
}

/// Build one resampled residual series of the same length as `residuals`.
pub fn resample_blocks<R: Rng + ?Sized>(residuals: &[f64], block_len: usize, rng: &mut R) -> Vec<f64> {
    let n = residuals.len();
    let mut out = Vec::with_capacity(n);
    if n == 0 {
        return out;
    }
    let block_len = block_len.clamp(1, n);

    while out.len() < n {
        let start = rng.gen_range(0..n);
        for k in 0..block_len {
            if out.len() == n {
                break;
            }
            out.push(residuals[(start + k) % n]);
        }
    }
    out
}
