use rand::RngCore;

/// Increment added to the mulberry32 state on every draw
const MULBERRY_INCREMENT: u32 = 0x6D2B_79F5;

/// 2^32, maps a `u32` onto `[0, 1)`
const U32_RANGE: f64 = 4_294_967_296.0;

/// One mulberry32 step: returns (output, next state).
///
/// Kept as a free function so callers that want to thread the state by hand
/// can do so; `SeededRng` is the convenient wrapper.
pub fn mulberry32(state: u32) -> (u32, u32) {
    let next = state.wrapping_add(MULBERRY_INCREMENT);
    let mut t = next;
    t = (t ^ (t >> 15)).wrapping_mul(t | 1);
    t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
    (t ^ (t >> 14), next)
}

/// Deterministic generator seeded from a single `u32`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededRng {
    state: u32,
}

impl SeededRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Uniform float in `[0, 1)`
    pub fn unit(&mut self) -> f64 {
        unit(self)
    }

    /// Uniform float in `[min, max)`
    pub fn range(&mut self, min: f64, max: f64) -> f64 {
        self.unit() * (max - min) + min
    }

    /// Uniformly pick one element of a non-empty slice
    pub fn pick<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        if items.is_empty() {
            return None;
        }
        let idx = (self.unit() * items.len() as f64) as usize;
        items.get(idx.min(items.len() - 1)).copied()
    }
}

impl RngCore for SeededRng {
    fn next_u32(&mut self) -> u32 {
        let (out, next) = mulberry32(self.state);
        self.state = next;
        out
    }

    fn next_u64(&mut self) -> u64 {
        let hi = self.next_u32() as u64;
        let lo = self.next_u32() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Uniform float in `[0, 1)` from one 32-bit draw
pub fn unit<R: RngCore + ?Sized>(rng: &mut R) -> f64 {
    rng.next_u32() as f64 / U32_RANGE
}

/// Pick a value with probability proportional to its weight.
///
/// Negative weights count as zero. Returns `None` for an empty list or when
/// every weight is zero; neither case consumes a draw.
pub fn weighted_choice<T: Clone, R: RngCore + ?Sized>(
    rng: &mut R,
    entries: &[(T, f64)],
) -> Option<T> {
    let total: f64 = entries.iter().map(|(_, w)| w.max(0.0)).sum();
    if entries.is_empty() || total <= 0.0 {
        return None;
    }

    let target = unit(rng) * total;
    let mut cumulative = 0.0;
    for (value, weight) in entries {
        cumulative += weight.max(0.0);
        if target <= cumulative {
            return Some(value.clone());
        }
    }

    // floating point overrun
    entries.last().map(|(value, _)| value.clone())
}
