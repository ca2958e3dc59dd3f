//! BWT-driven suffix-array sampling: marks every `dens`-th text position
//! plus every suffix whose preceding character belongs to a configured
//! sample-char set. The extra marks let the enclosing index stop an LF
//! walk early whenever it crosses one of those characters.

use std::collections::BTreeSet;
use std::io::{Read, Write};
use std::sync::Arc;

use anyhow::{ensure, Result};
use bitvec::prelude::*;

use crate::cache::{self, CacheConfig};
use crate::int_vector::IntVector;
use crate::rank_support::RankSupport;
use crate::sa_sampling::{MemberVisitor, SaSampling};
use crate::util::{index_width, CountingWriter};

#[derive(Debug, Clone, Default)]
pub struct BwtSampling {
    samples: IntVector,
    marked: Arc<BitVec<u64, Lsb0>>,
    rank_marked: RankSupport,
    dens: usize,
}

impl SaSampling for BwtSampling {
    const TEXT_ORDER: bool = false;

    fn build(config: &CacheConfig, dens: usize) -> Result<Self> {
        ensure!(dens >= 1, "sample stride must be at least 1");
        let sa = cache::load_from_cache(cache::KEY_SA, config)?;
        let bwt = cache::load_from_cache(cache::KEY_BWT, config)?;
        ensure!(
            sa.len() == bwt.len(),
            "suffix array and BWT disagree on length ({} vs {})",
            sa.len(),
            bwt.len()
        );
        let n = sa.len();

        // A missing sample-char entry just means no extra marks.
        let mut sample_chars = BTreeSet::new();
        if config.exists(cache::KEY_SAMPLE_CHAR) {
            for c in cache::load_from_cache(cache::KEY_SAMPLE_CHAR, config)?.iter() {
                sample_chars.insert(c);
            }
        }

        let mut marked: BitVec<u64, Lsb0> = BitVec::repeat(false, n);
        let mut cnt = 0;
        for i in 0..n {
            if sa.get(i) % dens as u64 == 0 || sample_chars.contains(&bwt.get(i)) {
                marked.set(i, true);
                cnt += 1;
            }
        }
        log::debug!("{cnt} of {n} suffixes marked ({} sample chars)", sample_chars.len());

        let mut samples = IntVector::new(cnt, index_width(n))?;
        let mut k = 0;
        for i in 0..n {
            if marked[i] {
                samples.set(k, sa.get(i));
                k += 1;
            }
        }

        let marked = Arc::new(marked);
        let rank_marked = RankSupport::new(marked.clone());
        Ok(Self {
            samples,
            marked,
            rank_marked,
            dens,
        })
    }

    fn is_sampled(&self, i: usize) -> bool {
        self.marked[i]
    }

    fn value(&self, i: usize) -> u64 {
        debug_assert!(self.is_sampled(i));
        self.samples.get(self.rank_marked.rank1(i))
    }

    fn sample_dens(&self) -> usize {
        self.dens
    }

    fn serialize_members(&self, writer: &mut dyn Write, visit: MemberVisitor) -> Result<u64> {
        let mut cw = CountingWriter::new(writer);
        bincode::serialize_into(&mut cw, &self.dens)?;
        visit("dens", cw.written());
        let bytes = self.samples.serialize(&mut cw)?;
        visit("samples", bytes);
        let before = cw.written();
        bincode::serialize_into(&mut cw, &(*self.marked))?;
        visit("marked", cw.written() - before);
        let bytes = self.rank_marked.serialize(&mut cw)?;
        visit("rank_marked", bytes);
        Ok(cw.written())
    }

    fn load(reader: &mut dyn Read) -> Result<Self> {
        let dens: usize = bincode::deserialize_from(&mut *reader)?;
        ensure!(dens >= 1, "corrupt sampling: zero stride");
        let samples = IntVector::load(&mut *reader)?;
        let marked: BitVec<u64, Lsb0> = bincode::deserialize_from(&mut *reader)?;
        let marked = Arc::new(marked);
        let rank_marked = RankSupport::load(&mut *reader, marked.clone())?;
        Ok(Self {
            samples,
            marked,
            rank_marked,
            dens,
        })
    }
}

impl BwtSampling {
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }
}

impl PartialEq for BwtSampling {
    fn eq(&self, other: &Self) -> bool {
        self.samples == other.samples
            && self.marked == other.marked
            && self.rank_marked == other.rank_marked
            && self.dens == other.dens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{bwt, random_text, suffix_array, CacheFixture, SplitMix64};

    // Text = ABCDEFABCDEF$, SA = [12,6,0,7,1,8,2,9,3,10,4,11,5],
    // BWT = [F,F,$,A,A,B,B,C,C,D,D,E,E]
    const TEXT: &[u8] = b"ABCDEFABCDEF$";

    #[test]
    fn worked_example_dens_4_chars_be() {
        let fx = CacheFixture::new("bwt_example", TEXT)
            .with_bwt(TEXT)
            .with_sample_chars(b"BE");
        let s = BwtSampling::build(&fx.config, 4).unwrap();

        let sa = suffix_array(TEXT);
        let marked: Vec<usize> = (0..13).filter(|&i| s.is_sampled(i)).collect();
        assert_eq!(marked, vec![0, 2, 5, 6, 10, 11, 12]);
        for i in marked {
            assert_eq!(s.value(i), sa[i] as u64, "i={i}");
        }
        assert!(!s.text_order());
    }

    #[test]
    fn without_sample_chars_marks_stride_only() {
        let fx = CacheFixture::new("bwt_no_chars", TEXT).with_bwt(TEXT);
        let s = BwtSampling::build(&fx.config, 4).unwrap();
        let sa = suffix_array(TEXT);
        for (i, &sa_i) in sa.iter().enumerate() {
            assert_eq!(s.is_sampled(i), sa_i % 4 == 0, "i={i}");
        }
    }

    #[test]
    fn mark_predicate_on_random_text() {
        let mut rng = SplitMix64::new(17);
        let text = random_text(&mut rng, 180);
        let sa = suffix_array(&text);
        let b = bwt(&text, &sa);
        let fx = CacheFixture::new("bwt_random", &text)
            .with_bwt(&text)
            .with_sample_chars(b"ab");
        let s = BwtSampling::build(&fx.config, 5).unwrap();
        for i in 0..sa.len() {
            let expect = sa[i] % 5 == 0 || b[i] == b'a' || b[i] == b'b';
            assert_eq!(s.is_sampled(i), expect, "i={i}");
            if expect {
                assert_eq!(s.value(i), sa[i] as u64);
            }
        }
    }

    #[test]
    fn missing_bwt_fails() {
        let fx = CacheFixture::new("bwt_missing", TEXT);
        assert!(BwtSampling::build(&fx.config, 4).is_err());
    }

    #[test]
    fn serialize_roundtrip() {
        let fx = CacheFixture::new("bwt_roundtrip", TEXT)
            .with_bwt(TEXT)
            .with_sample_chars(b"BE");
        let s = BwtSampling::build(&fx.config, 4).unwrap();

        let mut buf = Vec::new();
        let written = s.serialize(&mut buf).unwrap();
        assert_eq!(written as usize, buf.len());

        let loaded = BwtSampling::load(&mut buf.as_slice()).unwrap();
        assert_eq!(s, loaded);
        for i in 0..13 {
            assert_eq!(s.is_sampled(i), loaded.is_sampled(i));
            if s.is_sampled(i) {
                assert_eq!(s.value(i), loaded.value(i));
            }
        }
    }
}
