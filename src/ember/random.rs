use nalgebra::Vector3;
use rand::{thread_rng, Rng};

/// A stream of uniform samples consumed by the integrator. Two implementations
/// exist so they can be swapped at runtime and compared; both draw from the
/// same distribution.
pub trait RandomSource {
    /// Next uniform float in `[0, 1)`.
    fn next_float(&mut self) -> f32;

    /// Mixes a salt into the stream, if the source supports it. Used to
    /// decorrelate samples across bounces.
    fn perturb(&mut self, _salt: u32) {}

    /// Uniformly distributed direction on the unit sphere. Draws three floats
    /// mapped to `[-1, 1)`; a draw too short to normalize is thrown away and
    /// taken again.
    fn in_unit_sphere(&mut self) -> Vector3<f32> {
        loop {
            let v = Vector3::new(
                self.next_float() * 2.0 - 1.0,
                self.next_float() * 2.0 - 1.0,
                self.next_float() * 2.0 - 1.0,
            );

            let length_squared = v.magnitude_squared();
            if length_squared > f32::EPSILON {
                return v / length_squared.sqrt();
            }
        }
    }
}

/// PCG-style integer hash generator. Fully deterministic: the same seed always
/// produces the same bit-identical sequence, with no global state. The seed is
/// owned by the caller and threaded per pixel per frame.
pub struct PcgRandom {
    state: u32,
}

impl PcgRandom {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }
}

impl RandomSource for PcgRandom {
    fn next_float(&mut self) -> f32 {
        self.state = pcg_hash(self.state);
        self.state as f32 / u32::MAX as f32
    }

    fn perturb(&mut self, salt: u32) {
        self.state = self.state.wrapping_add(salt);
    }
}

fn pcg_hash(input: u32) -> u32 {
    let state = input.wrapping_mul(747796405).wrapping_add(2891336453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277803737);
    (word >> 22) ^ word
}

/// Comparison source backed by the rand crate's thread-local generator.
/// Statistically equivalent to [`PcgRandom`] but not reproducible across runs.
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_float(&mut self) -> f32 {
        thread_rng().gen_range(0.0..1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = PcgRandom::new(0xdead_beef);
        let mut b = PcgRandom::new(0xdead_beef);

        for _ in 0..256 {
            assert_eq!(a.next_float().to_bits(), b.next_float().to_bits());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = PcgRandom::new(1);
        let mut b = PcgRandom::new(2);

        let a_draws: Vec<u32> = (0..8).map(|_| a.next_float().to_bits()).collect();
        let b_draws: Vec<u32> = (0..8).map(|_| b.next_float().to_bits()).collect();
        assert_ne!(a_draws, b_draws);
    }

    #[test]
    fn floats_stay_in_unit_interval() {
        let mut rng = PcgRandom::new(7);
        for _ in 0..10_000 {
            let value = rng.next_float();
            assert!((0.0..=1.0).contains(&value));
        }
    }

    #[test]
    fn histogram_is_roughly_uniform() {
        const BUCKETS: usize = 16;
        const DRAWS: usize = 64_000;

        let mut rng = PcgRandom::new(42);
        let mut histogram = [0usize; BUCKETS];
        for _ in 0..DRAWS {
            let bucket = ((rng.next_float() * BUCKETS as f32) as usize).min(BUCKETS - 1);
            histogram[bucket] += 1;
        }

        let expected = DRAWS / BUCKETS;
        for (bucket, &count) in histogram.iter().enumerate() {
            let deviation = (count as f32 - expected as f32).abs() / expected as f32;
            assert!(
                deviation < 0.1,
                "bucket {bucket} holds {count}, expected about {expected}"
            );
        }
    }

    #[test]
    fn unit_sphere_directions_are_normalized() {
        let mut rng = PcgRandom::new(99);
        for _ in 0..1_000 {
            let direction = rng.in_unit_sphere();
            assert!((direction.magnitude() - 1.0).abs() < 1e-5);
        }
    }

    /// Source scripted to open with a draw that maps to the zero vector.
    struct Scripted {
        values: Vec<f32>,
        cursor: usize,
    }

    impl RandomSource for Scripted {
        fn next_float(&mut self) -> f32 {
            let value = self.values[self.cursor];
            self.cursor += 1;
            value
        }
    }

    #[test]
    fn degenerate_direction_is_resampled() {
        // 0.5 maps to 0.0 after the [-1, 1) remap, so the first triple is the
        // zero vector and must be discarded.
        let mut rng = Scripted {
            values: vec![0.5, 0.5, 0.5, 1.0, 0.5, 0.5],
            cursor: 0,
        };

        let direction = rng.in_unit_sphere();
        assert!(direction.x.is_finite());
        assert!((direction - Vector3::new(1.0, 0.0, 0.0)).magnitude() < 1e-6);
        assert_eq!(rng.cursor, 6);
    }

    #[test]
    fn thread_random_stays_in_unit_interval() {
        let mut rng = ThreadRandom;
        for _ in 0..1_000 {
            let value = rng.next_float();
            assert!((0.0..1.0).contains(&value));
        }
    }
}
