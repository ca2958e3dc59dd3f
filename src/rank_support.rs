//! Constant-time rank over a shared bitvector.
//!
//! Two-level directory: an absolute ones-count per 512-bit superblock plus
//! a relative in-superblock count per 64-bit word. The support holds a
//! non-owning handle to the bitvector it indexes; after the owning
//! structure is reloaded, `set_vector` must rebind it before use.

use std::io::{Read, Write};
use std::sync::Arc;

use anyhow::{ensure, Result};
use bitvec::prelude::*;

use crate::util::{low_mask, word_at, CountingWriter};

const WORDS_PER_SUPERBLOCK: usize = 8; // 512 bits

#[derive(Debug, Clone, Default)]
pub struct RankSupport {
    bv: Option<Arc<BitVec<u64, Lsb0>>>,
    len_bits: usize,
    superblock: Vec<u64>,
    rel: Vec<u16>,
}

impl RankSupport {
    pub fn new(bv: Arc<BitVec<u64, Lsb0>>) -> Self {
        let mut rs = Self::default();
        rs.set_vector(bv);
        rs
    }

    /// Rebind to a bitvector and rebuild the directory for it.
    pub fn set_vector(&mut self, bv: Arc<BitVec<u64, Lsb0>>) {
        self.len_bits = bv.len();
        self.bv = Some(bv);
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let Some(bv) = &self.bv else {
            return;
        };
        let words = bv.as_raw_slice();
        let n_words = words.len();
        self.superblock = vec![0; n_words / WORDS_PER_SUPERBLOCK + 1];
        self.rel = vec![0; n_words + 1];

        let mut abs: u64 = 0;
        let mut in_super: u64 = 0;
        for i in 0..=n_words {
            if i % WORDS_PER_SUPERBLOCK == 0 {
                abs += in_super;
                self.superblock[i / WORDS_PER_SUPERBLOCK] = abs;
                in_super = 0;
            }
            self.rel[i] = in_super as u16;
            if i < n_words {
                in_super += word_at(words, self.len_bits, i).count_ones() as u64;
            }
        }
    }

    /// Ones in `[0, idx)`; `idx` may equal the bitvector length.
    pub fn rank1(&self, idx: usize) -> usize {
        assert!(idx <= self.len_bits, "rank index {idx} past {}", self.len_bits);
        let bv = self.bv.as_ref().expect("RankSupport not bound to a bitvector");
        let words = bv.as_raw_slice();
        let w = idx >> 6;
        let mut ones =
            self.superblock[w / WORDS_PER_SUPERBLOCK] as usize + self.rel[w] as usize;
        let k = (idx & 63) as u32;
        if k != 0 {
            ones += (word_at(words, self.len_bits, w) & low_mask(k)).count_ones() as usize;
        }
        ones
    }

    #[inline]
    pub fn rank0(&self, idx: usize) -> usize {
        idx - self.rank1(idx)
    }

    pub fn serialize(&self, writer: &mut (impl Write + ?Sized)) -> Result<u64> {
        let mut cw = CountingWriter::new(writer);
        bincode::serialize_into(&mut cw, &self.len_bits)?;
        bincode::serialize_into(&mut cw, &self.superblock)?;
        bincode::serialize_into(&mut cw, &(self.rel.len() as u64))?;
        cw.write_all(bytemuck::cast_slice(&self.rel))?;
        Ok(cw.written())
    }

    /// Reads a directory back and binds it to `bv`. The directory must have
    /// been built for a bitvector of the same length.
    pub fn load(reader: &mut (impl Read + ?Sized), bv: Arc<BitVec<u64, Lsb0>>) -> Result<Self> {
        let len_bits: usize = bincode::deserialize_from(&mut *reader)?;
        ensure!(
            len_bits == bv.len(),
            "rank directory built for {} bits, bound to {}",
            len_bits,
            bv.len()
        );
        let superblock: Vec<u64> = bincode::deserialize_from(&mut *reader)?;
        let rel_len: u64 = bincode::deserialize_from(&mut *reader)?;
        let mut rel = vec![0u16; rel_len as usize];
        reader.read_exact(bytemuck::cast_slice_mut(&mut rel))?;
        Ok(Self {
            bv: Some(bv),
            len_bits,
            superblock,
            rel,
        })
    }
}

impl PartialEq for RankSupport {
    fn eq(&self, other: &Self) -> bool {
        self.len_bits == other.len_bits
            && self.superblock == other.superblock
            && self.rel == other.rel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::SplitMix64;

    fn naive_rank1(bv: &BitVec<u64, Lsb0>, idx: usize) -> usize {
        bv[..idx].count_ones()
    }

    #[test]
    fn matches_naive_small() {
        let mut bv: BitVec<u64, Lsb0> = BitVec::new();
        bv.extend([true, false, true, true, false, false, true, false]);
        let bv = Arc::new(bv);
        let rs = RankSupport::new(bv.clone());
        for i in 0..=bv.len() {
            assert_eq!(rs.rank1(i), naive_rank1(&bv, i), "idx={i}");
        }
    }

    #[test]
    fn matches_naive_across_superblocks() {
        let mut rng = SplitMix64::new(0xBEEF);
        for n in [0usize, 1, 63, 64, 65, 511, 512, 513, 4096, 5000] {
            let mut bv: BitVec<u64, Lsb0> = BitVec::with_capacity(n);
            for _ in 0..n {
                bv.push(rng.next_u64() % 3 == 0);
            }
            let bv = Arc::new(bv);
            let rs = RankSupport::new(bv.clone());
            for i in 0..=n {
                assert_eq!(rs.rank1(i), naive_rank1(&bv, i), "n={n} idx={i}");
                assert_eq!(rs.rank0(i), i - naive_rank1(&bv, i), "n={n} idx={i}");
            }
        }
    }

    #[test]
    fn serialize_roundtrip() {
        let mut rng = SplitMix64::new(99);
        let mut bv: BitVec<u64, Lsb0> = BitVec::new();
        for _ in 0..1000 {
            bv.push(rng.next_u64() % 2 == 0);
        }
        let bv = Arc::new(bv);
        let rs = RankSupport::new(bv.clone());

        let mut buf = Vec::new();
        let written = rs.serialize(&mut buf).unwrap();
        assert_eq!(written as usize, buf.len());

        let loaded = RankSupport::load(&mut buf.as_slice(), bv.clone()).unwrap();
        assert_eq!(rs, loaded);
        for i in (0..=bv.len()).step_by(37) {
            assert_eq!(rs.rank1(i), loaded.rank1(i));
        }
    }

    #[test]
    fn load_rejects_length_mismatch() {
        let bv = Arc::new(BitVec::<u64, Lsb0>::repeat(true, 100));
        let rs = RankSupport::new(bv);
        let mut buf = Vec::new();
        rs.serialize(&mut buf).unwrap();
        let other = Arc::new(BitVec::<u64, Lsb0>::repeat(true, 99));
        assert!(RankSupport::load(&mut buf.as_slice(), other).is_err());
    }
}
