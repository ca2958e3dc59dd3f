//! Text-order suffix-array sampling: samples at every `dens`-th text
//! position, with a bitvector marking which suffix-array indices carry a
//! sample. The sample values are stored divided by the stride, which is
//! what makes the matched inverse support possible.

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
pub struct TextOrderSampling {
    samples: Arc<IntVector>,
    marked: Arc<BitVec<u64, Lsb0>>,
    rank_marked: RankSupport,
    dens: usize,
}

impl SaSampling for TextOrderSampling {
    const TEXT_ORDER: bool = true;

    fn build(config: &CacheConfig, dens: usize) -> Result<Self> {
        ensure!(dens >= 1, "sample stride must be at least 1");
        let sa = cache::load_from_cache(cache::KEY_SA, config)?;
        let n = sa.len();
        log::debug!("marking every {dens}-th text position across {n} suffixes");

        let mut marked: BitVec<u64, Lsb0> = BitVec::repeat(false, n);
        let mut samples = IntVector::new((n + dens - 1) / dens, index_width(n / dens))?;
        let mut cnt = 0;
        for i in 0..n {
            let sa_i = sa.get(i);
            if sa_i % dens as u64 == 0 {
                marked.set(i, true);
                samples.set(cnt, sa_i / dens as u64);
                cnt += 1;
            }
        }

        let marked = Arc::new(marked);
        let rank_marked = RankSupport::new(marked.clone());
        Ok(Self {
            samples: Arc::new(samples),
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
        self.samples.get(self.rank_marked.rank1(i)) * self.dens as u64
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
        let samples = Arc::new(IntVector::load(&mut *reader)?);
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

impl TextOrderSampling {
    /// The stored (stride-divided) sample at condensed position k; the
    /// matched inverse support reads the samples in this form.
    pub fn condensed(&self, k: usize) -> u64 {
        self.samples.get(k)
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn marked(&self) -> &Arc<BitVec<u64, Lsb0>> {
        &self.marked
    }

    pub fn samples(&self) -> &Arc<IntVector> {
        &self.samples
    }
}

impl PartialEq for TextOrderSampling {
    fn eq(&self, other: &Self) -> bool {
        self.samples == other.samples
            && self.marked == other.marked
            && self.rank_marked == other.rank_marked
            && self.dens == other.dens
    }
}
