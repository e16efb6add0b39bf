use sha2::{Digest, Sha256};

/// Fixed-size bloom filter over strings
///
/// Sized from the expected number of items and a target false-positive rate.
/// Bit positions come from double hashing the two halves of a SHA-256 digest.
#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: Vec<u64>,
    num_bits: u64,
    num_hashes: u32,
}

impl BloomFilter {
    /// Creates a filter for `expected_items` at the given false-positive rate
    ///
    /// # Arguments
    ///
    /// * `expected_items` - Number of items the filter should hold
    /// * `false_positive_rate` - Target rate, in (0, 1)
    pub fn with_rate(expected_items: usize, false_positive_rate: f64) -> Self {
        let n = expected_items.max(1) as f64;
        let p = false_positive_rate.clamp(f64::MIN_POSITIVE, 0.5);
        let ln2 = std::f64::consts::LN_2;

        let num_bits = (-(n * p.ln()) / (ln2 * ln2)).ceil().max(64.0) as u64;
        let num_hashes = ((num_bits as f64 / n) * ln2).round().clamp(1.0, 32.0) as u32;

        let words = num_bits.div_ceil(64) as usize;
        Self {
            bits: vec![0; words],
            num_bits,
            num_hashes,
        }
    }

    /// Number of bits in the filter
    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    /// Number of hash functions applied per item
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Returns true if the item may have been inserted
    ///
    /// False means the item was definitely never inserted.
    pub fn contains(&self, item: &str) -> bool {
        self.positions(item).all(|bit| self.get(bit))
    }

    /// Inserts an item, returning true if any bit changed
    ///
    /// A false return means the filter already reported the item as present.
    pub fn insert(&mut self, item: &str) -> bool {
        let positions: Vec<u64> = self.positions(item).collect();
        let mut changed = false;
        for bit in positions {
            changed |= self.set(bit);
        }
        changed
    }

    fn positions(&self, item: &str) -> impl Iterator<Item = u64> {
        let digest = Sha256::digest(item.as_bytes());
        let mut h1 = [0u8; 8];
        let mut h2 = [0u8; 8];
        h1.copy_from_slice(&digest[0..8]);
        h2.copy_from_slice(&digest[8..16]);

        let h1 = u64::from_le_bytes(h1);
        let h2 = u64::from_le_bytes(h2) | 1;
        let m = self.num_bits;

        (0..self.num_hashes as u64).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % m)
    }

    fn get(&self, bit: u64) -> bool {
        self.bits[(bit / 64) as usize] & (1 << (bit % 64)) != 0
    }

    fn set(&mut self, bit: u64) -> bool {
        let word = &mut self.bits[(bit / 64) as usize];
        let mask = 1 << (bit % 64);
        let was_clear = *word & mask == 0;
        *word |= mask;
        was_clear
    }
}
