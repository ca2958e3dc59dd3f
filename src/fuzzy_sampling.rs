//! Run-aware ("fuzzy") suffix-array sampling.
//!
//! Within a block of `dens` consecutive text positions any single sample
//! suffices, so the build picks the one whose ISA value extends a globally
//! non-decreasing sequence whenever possible. The chosen text positions
//! are marked on the ISA side, their suffix-array indices on the SA side,
//! and the block-to-rank assignment is kept as a permutation in a wavelet
//! tree, which is what lets the matched inverse support recover ISA
//! samples without storing them.

use std::io::{Read, Write};
use std::sync::Arc;

use anyhow::{ensure, Result};
use bitvec::prelude::*;

use crate::cache::{self, CacheConfig};
use crate::rank_support::RankSupport;
use crate::sa_sampling::{MemberVisitor, SaSampling};
use crate::select_support::Select1;
use crate::util::CountingWriter;
use crate::wavelet_tree::WaveletTree;

#[derive(Debug, Clone, Default)]
pub struct FuzzySampling {
    marked_sa: Arc<BitVec<u64, Lsb0>>,
    rank_marked_sa: RankSupport,
    marked_isa: Arc<BitVec<u64, Lsb0>>,
    select_marked_isa: Select1,
    inv_perm: WaveletTree,
    dens: usize,
}

impl SaSampling for FuzzySampling {
    const TEXT_ORDER: bool = true;

    fn build(config: &CacheConfig, dens: usize) -> Result<Self> {
        ensure!(dens >= 1, "sample stride must be at least 1");
        if !config.exists(cache::KEY_ISA) {
            cache::construct_isa(config)?;
        }
        let isa = cache::load_from_cache(cache::KEY_ISA, config)?;
        let n = isa.len();
        let blocks = (n + dens - 1) / dens;

        let mut marked_isa: BitVec<u64, Lsb0> = BitVec::repeat(false, n);
        let mut marked_sa: BitVec<u64, Lsb0> = BitVec::repeat(false, n);
        let mut chosen = Vec::with_capacity(blocks);
        let mut runs = 1usize;
        let mut min_prev = 0u64;

        let mut i = 0;
        while i < n {
            let end = (i + dens).min(n);
            // smallest ISA value in the block, and the smallest one that
            // still extends the current non-decreasing run
            let mut pos_min = i;
            let mut pos_cnd = if isa.get(i) >= min_prev { i } else { n };
            for j in i + 1..end {
                if isa.get(j) < isa.get(pos_min) {
                    pos_min = j;
                }
                if isa.get(j) >= min_prev && (pos_cnd == n || isa.get(j) < isa.get(pos_cnd)) {
                    pos_cnd = j;
                }
            }
            if pos_cnd == n {
                // the run cannot be extended in this block; start a new one
                pos_cnd = pos_min;
                runs += 1;
            }
            min_prev = isa.get(pos_cnd);
            marked_isa.set(pos_cnd, true);
            chosen.push(min_prev);
            marked_sa.set(min_prev as usize, true);
            i = end;
        }
        log::debug!("fuzzy sampling chose {blocks} samples forming {runs} increasing runs");

        let marked_sa = Arc::new(marked_sa);
        let rank_marked_sa = RankSupport::new(marked_sa.clone());

        // rank-compress the chosen SA indices into [0, blocks)
        let condensed: Vec<u64> = chosen
            .iter()
            .map(|&v| rank_marked_sa.rank1(v as usize) as u64)
            .collect();
        let inv_perm = WaveletTree::new(&condensed, blocks.max(1) as u64)?;

        let marked_isa = Arc::new(marked_isa);
        let select_marked_isa = Select1::new(marked_isa.clone());
        Ok(Self {
            marked_sa,
            rank_marked_sa,
            marked_isa,
            select_marked_isa,
            inv_perm,
            dens,
        })
    }

    fn is_sampled(&self, i: usize) -> bool {
        self.marked_sa[i]
    }

    fn value(&self, i: usize) -> u64 {
        debug_assert!(self.is_sampled(i));
        let r = self.rank_marked_sa.rank1(i) as u64;
        let block = self.inv_perm.select(r, 1);
        self.select_marked_isa.select(block + 1) as u64
    }

    fn sample_dens(&self) -> usize {
        self.dens
    }

    fn serialize_members(&self, writer: &mut dyn Write, visit: MemberVisitor) -> Result<u64> {
        let mut cw = CountingWriter::new(writer);
        bincode::serialize_into(&mut cw, &self.dens)?;
        visit("dens", cw.written());
        let before = cw.written();
        bincode::serialize_into(&mut cw, &(*self.marked_sa))?;
        visit("marked_sa", cw.written() - before);
        let bytes = self.rank_marked_sa.serialize(&mut cw)?;
        visit("rank_marked_sa", bytes);
        let before = cw.written();
        bincode::serialize_into(&mut cw, &(*self.marked_isa))?;
        visit("marked_isa", cw.written() - before);
        let bytes = self.select_marked_isa.serialize(&mut cw)?;
        visit("select_marked_isa", bytes);
        let bytes = self.inv_perm.serialize(&mut cw)?;
        visit("inv_perm", bytes);
        Ok(cw.written())
    }

    fn load(reader: &mut dyn Read) -> Result<Self> {
        let dens: usize = bincode::deserialize_from(&mut *reader)?;
        ensure!(dens >= 1, "corrupt sampling: zero stride");
        let marked_sa: BitVec<u64, Lsb0> = bincode::deserialize_from(&mut *reader)?;
        let marked_sa = Arc::new(marked_sa);
        let rank_marked_sa = RankSupport::load(&mut *reader, marked_sa.clone())?;
        let marked_isa: BitVec<u64, Lsb0> = bincode::deserialize_from(&mut *reader)?;
        let marked_isa = Arc::new(marked_isa);
        let select_marked_isa = Select1::load(&mut *reader, marked_isa.clone())?;
        let inv_perm = WaveletTree::load(&mut *reader)?;
        Ok(Self {
            marked_sa,
            rank_marked_sa,
            marked_isa,
            select_marked_isa,
            inv_perm,
            dens,
        })
    }
}

impl FuzzySampling {
    /// The block-to-rank permutation entry for block k (condensed form,
    /// consumed by the matched inverse support).
    pub fn inv(&self, k: usize) -> u64 {
        self.inv_perm.access(k)
    }

    /// Number of blocks (= number of samples).
    pub fn size(&self) -> usize {
        self.inv_perm.len()
    }

    /// Text position of the k-th chosen sample (k is 1-based).
    pub fn marked_isa_select(&self, k: usize) -> usize {
        self.select_marked_isa.select(k)
    }

    pub fn marked_sa(&self) -> &Arc<BitVec<u64, Lsb0>> {
        &self.marked_sa
    }
}

impl PartialEq for FuzzySampling {
    fn eq(&self, other: &Self) -> bool {
        self.marked_sa == other.marked_sa
            && self.rank_marked_sa == other.rank_marked_sa
            && self.marked_isa == other.marked_isa
            && self.select_marked_isa == other.select_marked_isa
            && self.inv_perm == other.inv_perm
            && self.dens == other.dens
    }
}
