//! Inverse-permutation support.
//!
//! Answers pi^{-1}(i) over a shared `IntVector` permutation by walking the
//! cycle that contains i. On every cycle longer than `SHORTCUT` steps,
//! each `SHORTCUT`-th element is marked and stores a pointer `SHORTCUT`
//! steps backwards, so a walk takes amortized O(SHORTCUT) applications of
//! the permutation.

use std::io::{Read, Write};
use std::sync::Arc;

use anyhow::Result;
use bitvec::prelude::*;

use crate::int_vector::IntVector;
use crate::rank_support::RankSupport;
use crate::util::{index_width, CountingWriter};

const SHORTCUT: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct InvPermSupport {
    perm: Option<Arc<IntVector>>,
    marked: Arc<BitVec<u64, Lsb0>>,
    rank_marked: RankSupport,
    back_pointer: IntVector,
}

impl InvPermSupport {
    pub fn new(perm: Arc<IntVector>) -> Self {
        let mut ip = Self::default();
        ip.set_vector(perm);
        ip
    }

    /// Rebind to a permutation and rebuild the cycle shortcuts for it.
    pub fn set_vector(&mut self, perm: Arc<IntVector>) {
        let n = perm.len();
        let mut marked: BitVec<u64, Lsb0> = BitVec::repeat(false, n);
        let mut visited: BitVec<u64, Lsb0> = BitVec::repeat(false, n);
        let mut shortcuts: Vec<(usize, u64)> = Vec::new();

        let mut cycle = Vec::new();
        for i in 0..n {
            if visited[i] {
                continue;
            }
            cycle.clear();
            let mut j = i;
            loop {
                visited.set(j, true);
                cycle.push(j);
                j = perm.get(j) as usize;
                if j == i {
                    break;
                }
            }
            if cycle.len() > SHORTCUT {
                let len = cycle.len();
                for k in (0..len).step_by(SHORTCUT) {
                    let pos = cycle[k];
                    let back = cycle[(k + len - SHORTCUT) % len];
                    marked.set(pos, true);
                    shortcuts.push((pos, back as u64));
                }
            }
        }

        let marked = Arc::new(marked);
        let rank_marked = RankSupport::new(marked.clone());
        let mut back_pointer = IntVector::new(shortcuts.len(), index_width(n))
            .expect("index width is always in range");
        for &(pos, back) in &shortcuts {
            back_pointer.set(rank_marked.rank1(pos), back);
        }

        self.perm = Some(perm);
        self.marked = marked;
        self.rank_marked = rank_marked;
        self.back_pointer = back_pointer;
    }

    /// Number of elements in the permutation.
    pub fn size(&self) -> usize {
        self.marked.len()
    }

    /// pi^{-1}(i): the position that maps to `i`.
    pub fn get(&self, i: usize) -> u64 {
        let perm = self
            .perm
            .as_ref()
            .expect("InvPermSupport not bound to a permutation");
        debug_assert!(i < perm.len());
        let mut j = i;
        loop {
            let next = perm.get(j) as usize;
            if next == i {
                return j as u64;
            }
            if self.marked[next] {
                // jump behind the marked element and finish with a plain walk
                let mut k = self.back_pointer.get(self.rank_marked.rank1(next)) as usize;
                loop {
                    let step = perm.get(k) as usize;
                    if step == i {
                        return k as u64;
                    }
                    k = step;
                }
            }
            j = next;
        }
    }

    pub fn serialize(&self, writer: &mut (impl Write + ?Sized)) -> Result<u64> {
        let mut cw = CountingWriter::new(writer);
        bincode::serialize_into(&mut cw, &(*self.marked))?;
        self.rank_marked.serialize(&mut cw)?;
        self.back_pointer.serialize(&mut cw)?;
        Ok(cw.written())
    }

    /// Reads the shortcuts back and binds them to `perm`, which must be the
    /// permutation the support was built for.
    pub fn load(reader: &mut (impl Read + ?Sized), perm: Arc<IntVector>) -> Result<Self> {
        let marked: BitVec<u64, Lsb0> = bincode::deserialize_from(&mut *reader)?;
        let marked = Arc::new(marked);
        let rank_marked = RankSupport::load(&mut *reader, marked.clone())?;
        let back_pointer = IntVector::load(reader)?;
        Ok(Self {
            perm: Some(perm),
            marked,
            rank_marked,
            back_pointer,
        })
    }
}

impl PartialEq for InvPermSupport {
    fn eq(&self, other: &Self) -> bool {
        self.marked == other.marked && self.back_pointer == other.back_pointer
    }
}
