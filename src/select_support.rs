//! Sampled select over a shared bitvector.
//!
//! Stores the position of every 64th occurrence of the pattern bit and
//! scans whole words in between. `PAT` selects ones (`true`) or zeros
//! (`false`); `select` is 1-based, as in the rank/select literature.

use std::io::{Read, Write};
use std::sync::Arc;

use anyhow::{ensure, Result};
use bitvec::prelude::*;

use crate::util::{low_mask, select_in_word, word_at, CountingWriter};

const SAMPLE_EVERY: usize = 64;

pub type Select1 = SelectSupport<true>;
pub type Select0 = SelectSupport<false>;

#[derive(Debug, Clone, Default)]
pub struct SelectSupport<const PAT: bool = true> {
    bv: Option<Arc<BitVec<u64, Lsb0>>>,
    cnt: usize,
    samples: Vec<u64>,
}

/// Word `widx` with non-pattern bits cleared and bits past the end masked.
#[inline]
fn pattern_word<const PAT: bool>(words: &[u64], len_bits: usize, widx: usize) -> u64 {
    if widx * 64 >= len_bits {
        return 0;
    }
    let w = word_at(words, len_bits, widx);
    let w = if PAT { w } else { !w };
    let rem = len_bits - widx * 64;
    if rem < 64 {
        w & low_mask(rem as u32)
    } else {
        w
    }
}

impl<const PAT: bool> SelectSupport<PAT> {
    pub fn new(bv: Arc<BitVec<u64, Lsb0>>) -> Self {
        let mut ss = Self::default();
        ss.set_vector(bv);
        ss
    }

    /// Rebind to a bitvector and rebuild the position samples for it.
    pub fn set_vector(&mut self, bv: Arc<BitVec<u64, Lsb0>>) {
        self.bv = Some(bv);
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let bv = self.bv.as_ref().expect("SelectSupport not bound to a bitvector");
        let words = bv.as_raw_slice();
        let len_bits = bv.len();
        self.cnt = 0;
        self.samples.clear();
        for widx in 0..(len_bits + 63) / 64 {
            let mut w = pattern_word::<PAT>(words, len_bits, widx);
            while w != 0 {
                if self.cnt % SAMPLE_EVERY == 0 {
                    self.samples
                        .push((widx * 64) as u64 + w.trailing_zeros() as u64);
                }
                self.cnt += 1;
                w &= w - 1;
            }
        }
    }

    /// Total occurrences of the pattern bit.
    pub fn count(&self) -> usize {
        self.cnt
    }

    /// Position of the k-th occurrence of the pattern bit (k is 1-based).
    pub fn select(&self, k: usize) -> usize {
        assert!(
            k >= 1 && k <= self.cnt,
            "select({k}) out of range 1..={}",
            self.cnt
        );
        let bv = self.bv.as_ref().expect("SelectSupport not bound to a bitvector");
        let words = bv.as_raw_slice();
        let len_bits = bv.len();

        let start = self.samples[(k - 1) / SAMPLE_EVERY] as usize;
        let mut need = ((k - 1) % SAMPLE_EVERY) as u32;
        if need == 0 {
            return start;
        }

        let mut widx = start >> 6;
        let mut w =
            pattern_word::<PAT>(words, len_bits, widx) & !low_mask((start & 63) as u32 + 1);
        loop {
            let ones = w.count_ones();
            if ones >= need {
                return widx * 64 + select_in_word(w, need) as usize;
            }
            need -= ones;
            widx += 1;
            w = pattern_word::<PAT>(words, len_bits, widx);
        }
    }

    pub fn serialize(&self, writer: &mut (impl Write + ?Sized)) -> Result<u64> {
        let mut cw = CountingWriter::new(writer);
        bincode::serialize_into(&mut cw, &self.cnt)?;
        bincode::serialize_into(&mut cw, &(self.samples.len() as u64))?;
        cw.write_all(bytemuck::cast_slice(&self.samples))?;
        Ok(cw.written())
    }

    pub fn load(reader: &mut (impl Read + ?Sized), bv: Arc<BitVec<u64, Lsb0>>) -> Result<Self> {
        let cnt: usize = bincode::deserialize_from(&mut *reader)?;
        let samples_len: u64 = bincode::deserialize_from(&mut *reader)?;
        ensure!(
            samples_len as usize == (cnt + SAMPLE_EVERY - 1) / SAMPLE_EVERY,
            "corrupt select support: {samples_len} samples for {cnt} occurrences"
        );
        let mut samples = vec![0u64; samples_len as usize];
        reader.read_exact(bytemuck::cast_slice_mut(&mut samples))?;
        Ok(Self {
            bv: Some(bv),
            cnt,
            samples,
        })
    }
}

impl<const PAT: bool> PartialEq for SelectSupport<PAT> {
    fn eq(&self, other: &Self) -> bool {
        self.cnt == other.cnt && self.samples == other.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::SplitMix64;

    fn naive_select<const PAT: bool>(bv: &BitVec<u64, Lsb0>, k: usize) -> usize {
        let mut seen = 0;
        for (i, b) in bv.iter().enumerate() {
            if *b == PAT {
                seen += 1;
                if seen == k {
                    return i;
                }
            }
        }
        panic!("not enough occurrences");
    }

    #[test]
    fn select1_small() {
        let mut bv: BitVec<u64, Lsb0> = BitVec::new();
        bv.extend([false, true, true, false, true, false, false, true]);
        let bv = Arc::new(bv);
        let ss = Select1::new(bv.clone());
        assert_eq!(ss.count(), 4);
        assert_eq!(ss.select(1), 1);
        assert_eq!(ss.select(2), 2);
        assert_eq!(ss.select(3), 4);
        assert_eq!(ss.select(4), 7);
    }

    #[test]
    fn select0_counts_complement() {
        // 70 bits so the complement of the tail word must be masked
        let mut bv: BitVec<u64, Lsb0> = BitVec::new();
        for i in 0..70 {
            bv.push(i % 3 == 0);
        }
        let bv = Arc::new(bv);
        let ss = Select0::new(bv.clone());
        assert_eq!(ss.count(), 70 - bv.count_ones());
        for k in 1..=ss.count() {
            assert_eq!(ss.select(k), naive_select::<false>(&bv, k), "k={k}");
        }
    }

    #[test]
    fn matches_naive_stress() {
        let mut rng = SplitMix64::new(0xACE);
        for n in [1usize, 64, 65, 640, 5000] {
            let mut bv: BitVec<u64, Lsb0> = BitVec::with_capacity(n);
            for _ in 0..n {
                bv.push(rng.next_u64() % 4 != 0);
            }
            let bv = Arc::new(bv);
            let ss = Select1::new(bv.clone());
            for k in 1..=ss.count() {
                assert_eq!(ss.select(k), naive_select::<true>(&bv, k), "n={n} k={k}");
            }
        }
    }

    #[test]
    fn serialize_roundtrip() {
        let mut rng = SplitMix64::new(3);
        let mut bv: BitVec<u64, Lsb0> = BitVec::new();
        for _ in 0..900 {
            bv.push(rng.next_u64() % 2 == 0);
        }
        let bv = Arc::new(bv);
        let ss = Select1::new(bv.clone());

        let mut buf = Vec::new();
        let written = ss.serialize(&mut buf).unwrap();
        assert_eq!(written as usize, buf.len());

        let loaded = Select1::load(&mut buf.as_slice(), bv.clone()).unwrap();
        assert_eq!(ss, loaded);
        for k in (1..=ss.count()).step_by(13) {
            assert_eq!(ss.select(k), loaded.select(k));
        }
    }
}
