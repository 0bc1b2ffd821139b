//! Seeded fractal value noise.
//!
//! A lattice of pseudo-random values is smoothly interpolated and summed
//! over octaves. Output lies in `[-1, 1]` and depends only on the seed, the
//! settings and the sample position.

use rand::{Rng, RngExt};

/// Shape of a [`NoiseField`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NoiseSettings {
    /// Lattice cells per grid unit for the first octave.
    pub frequency: f64,
    /// Number of summed octaves; 1 disables the fractal sum.
    pub octaves: u32,
    /// Frequency multiplier between octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between octaves.
    pub gain: f64,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            frequency: 0.01,
            octaves: 1,
            lacunarity: 2.0,
            gain: 0.5,
        }
    }
}

/// A deterministic 2D noise field.
#[derive(Debug, Clone)]
pub struct NoiseField {
    seed: u64,
    settings: NoiseSettings,
}

impl NoiseField {
    pub fn new(seed: u64, settings: NoiseSettings) -> Self {
        Self { seed, settings }
    }

    /// Create a field with a seed drawn from `rng`.
    pub fn from_rng(rng: &mut impl Rng, settings: NoiseSettings) -> Self {
        Self::new(rng.random::<u64>(), settings)
    }

    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Sample the field at `(x, y)`. The result lies in `[-1, 1]`.
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let s = &self.settings;
        let octaves = s.octaves.max(1);
        let mut freq = s.frequency;
        let mut amp = 1.0;
        let mut total = 0.0;
        let mut norm = 0.0;
        for octave in 0..octaves {
            let salt = self.seed.wrapping_add(u64::from(octave).wrapping_mul(0x9E37_79B9_7F4A_7C15));
            total += amp * value_noise(salt, x * freq, y * freq);
            norm += amp;
            freq *= s.lacunarity;
            amp *= s.gain;
        }
        if norm > 0.0 {
            (total / norm).clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Bilinear interpolation of lattice values with a smoothstep fade.
fn value_noise(seed: u64, x: f64, y: f64) -> f64 {
    let x0 = x.floor();
    let y0 = y.floor();
    let tx = fade(x - x0);
    let ty = fade(y - y0);
    let ix = x0 as i64;
    let iy = y0 as i64;

    let v00 = lattice(seed, ix, iy);
    let v10 = lattice(seed, ix + 1, iy);
    let v01 = lattice(seed, ix, iy + 1);
    let v11 = lattice(seed, ix + 1, iy + 1);

    let top = lerp(v00, v10, tx);
    let bottom = lerp(v01, v11, tx);
    lerp(top, bottom, ty)
}

#[inline]
fn fade(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Pseudo-random value in `[-1, 1]` for one lattice point.
fn lattice(seed: u64, ix: i64, iy: i64) -> f64 {
    let mut h = seed
        ^ (ix as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (iy as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    // splitmix64 finalizer
    h = (h ^ (h >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    h ^= h >> 31;
    (h >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0
}
