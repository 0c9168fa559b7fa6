//! Seeded Mersenne Twister for reproducible chart jitter
//!
//! MT19937 with the reference `init_genrand` seeding, so a given seed always
//! places strip-plot points at the same horizontal offsets.

/// 32-bit Mersenne Twister (MT19937)
#[derive(Clone)]
pub struct MersenneTwister {
    state: [u32; 624],
    index: usize,
}

impl MersenneTwister {
    const N: usize = 624;
    const M: usize = 397;
    const MATRIX_A: u32 = 0x9908B0DF;
    const UPPER_MASK: u32 = 0x80000000;
    const LOWER_MASK: u32 = 0x7FFFFFFF;

    pub fn new(seed: u32) -> Self {
        let mut state = [0u32; Self::N];
        state[0] = seed;
        for i in 1..Self::N {
            let prev = state[i - 1];
            state[i] = 1812433253_u32
                .wrapping_mul(prev ^ (prev >> 30))
                .wrapping_add(i as u32);
        }
        Self {
            state,
            index: Self::N,
        }
    }

    fn twist(&mut self) {
        for i in 0..Self::N {
            let y = (self.state[i] & Self::UPPER_MASK)
                | (self.state[(i + 1) % Self::N] & Self::LOWER_MASK);
            let mut next = self.state[(i + Self::M) % Self::N] ^ (y >> 1);
            if y & 1 != 0 {
                next ^= Self::MATRIX_A;
            }
            self.state[i] = next;
        }
        self.index = 0;
    }

    pub fn next_u32(&mut self) -> u32 {
        if self.index >= Self::N {
            self.twist();
        }
        let mut y = self.state[self.index];
        self.index += 1;

        y ^= y >> 11;
        y ^= (y << 7) & 0x9D2C5680;
        y ^= (y << 15) & 0xEFC60000;
        y ^= y >> 18;
        y
    }

    /// Uniform value in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / 4294967296.0
    }

    /// Uniform value in [low, high)
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// `n` offsets uniform in [-width, width)
    pub fn jitter(&mut self, n: usize, width: f64) -> Vec<f64> {
        (0..n).map(|_| self.uniform(-width, width)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_sequence() {
        // first outputs of the reference implementation seeded with 5489
        let mut mt = MersenneTwister::new(5489);
        assert_eq!(mt.next_u32(), 3499211612);
        assert_eq!(mt.next_u32(), 581869302);
        assert_eq!(mt.next_u32(), 3890346734);
    }

    #[test]
    fn test_same_seed_same_jitter() {
        let a = MersenneTwister::new(42).jitter(50, 0.2);
        let b = MersenneTwister::new(42).jitter(50, 0.2);
        assert_eq!(a, b);
        assert!(a.iter().all(|&x| (-0.2..0.2).contains(&x)));
        assert_ne!(a, MersenneTwister::new(43).jitter(50, 0.2));
    }
}
