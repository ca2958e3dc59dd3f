//! Balanced wavelet tree over unsigned integers in `[0, sigma)`.
//!
//! Nodes are linked by index into a flat vector; each node owns its bit
//! partition plus rank and select supports over it. Supports `access`,
//! `rank(c, i)` and `select(c, k)` in O(log sigma) node visits.

use std::io::{Read, Write};
use std::sync::Arc;

use anyhow::{ensure, Result};
use bitvec::prelude::*;

use crate::rank_support::RankSupport;
use crate::select_support::{Select0, Select1};
use crate::util::CountingWriter;

#[derive(Debug, Clone)]
struct Node {
    lo: u64,
    hi: u64, // exclusive
    mid: u64,
    bits: Arc<BitVec<u64, Lsb0>>,
    rank: RankSupport,
    sel0: Select0,
    sel1: Select1,
    left: Option<usize>,
    right: Option<usize>,
}

impl Node {
    fn with_bits(lo: u64, hi: u64, bits: Arc<BitVec<u64, Lsb0>>) -> Self {
        Self {
            lo,
            hi,
            mid: lo + (hi - lo) / 2,
            rank: RankSupport::new(bits.clone()),
            sel0: Select0::new(bits.clone()),
            sel1: Select1::new(bits.clone()),
            bits,
            left: None,
            right: None,
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.lo == other.lo
            && self.hi == other.hi
            && self.bits == other.bits
            && self.left == other.left
            && self.right == other.right
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveletTree {
    nodes: Vec<Node>,
    n: usize,
    sigma: u64,
}

impl WaveletTree {
    /// Builds the tree for `data` with values in `[0, sigma)`.
    pub fn new(data: &[u64], sigma: u64) -> Result<Self> {
        ensure!(sigma >= 1, "alphabet must be non-empty");
        for &v in data {
            ensure!(v < sigma, "value {v} out of range [0,{sigma})");
        }
        let mut wt = WaveletTree {
            nodes: Vec::new(),
            n: data.len(),
            sigma,
        };
        wt.build_rec(data, 0, sigma);
        Ok(wt)
    }

    fn build_rec(&mut self, seq: &[u64], lo: u64, hi: u64) -> usize {
        let mid = lo + (hi - lo) / 2;

        if hi - lo == 1 {
            let bits = Arc::new(BitVec::new());
            self.nodes.push(Node::with_bits(lo, hi, bits));
            return self.nodes.len() - 1;
        }

        let mut bits: BitVec<u64, Lsb0> = BitVec::with_capacity(seq.len());
        let mut left_vals = Vec::new();
        let mut right_vals = Vec::new();
        for &v in seq {
            let go_right = v >= mid;
            bits.push(go_right);
            if go_right {
                right_vals.push(v);
            } else {
                left_vals.push(v);
            }
        }

        let node_idx = self.nodes.len();
        self.nodes.push(Node::with_bits(lo, hi, Arc::new(bits)));

        let left = self.build_rec(&left_vals, lo, mid);
        let right = self.build_rec(&right_vals, mid, hi);
        self.nodes[node_idx].left = Some(left);
        self.nodes[node_idx].right = Some(right);
        node_idx
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn access(&self, i: usize) -> u64 {
        assert!(i < self.n, "index out of bounds: {i} >= {}", self.n);
        let mut node_idx = 0;
        let mut pos = i;
        loop {
            let node = &self.nodes[node_idx];
            if node.hi - node.lo == 1 {
                return node.lo;
            }
            if node.bits[pos] {
                pos = node.rank.rank1(pos);
                node_idx = node.right.expect("internal node must have right");
            } else {
                pos = node.rank.rank0(pos);
                node_idx = node.left.expect("internal node must have left");
            }
        }
    }

    /// Occurrences of `c` in `data[0..i)`.
    pub fn rank(&self, c: u64, i: usize) -> usize {
        if i == 0 || i > self.n || c >= self.sigma {
            return 0;
        }
        let mut node_idx = 0;
        let mut pref = i;
        loop {
            let node = &self.nodes[node_idx];
            if node.hi - node.lo == 1 {
                return pref;
            }
            if c < node.mid {
                pref = node.rank.rank0(pref);
                node_idx = node.left.expect("internal node must have left");
            } else {
                pref = node.rank.rank1(pref);
                node_idx = node.right.expect("internal node must have right");
            }
            if pref == 0 {
                return 0;
            }
        }
    }

    /// Position of the k-th occurrence of `c` (k is 1-based). The
    /// occurrence must exist.
    pub fn select(&self, c: u64, k: usize) -> usize {
        debug_assert!(k >= 1, "select takes 1-based k");
        debug_assert!(
            self.rank(c, self.n) >= k,
            "select({c}, {k}) beyond {} occurrences",
            self.rank(c, self.n)
        );
        self.select_rec(0, c, k)
    }

    fn select_rec(&self, node_idx: usize, c: u64, k: usize) -> usize {
        let node = &self.nodes[node_idx];
        if node.hi - node.lo == 1 {
            return k - 1;
        }
        if c < node.mid {
            let p = self.select_rec(node.left.expect("internal node must have left"), c, k);
            node.sel0.select(p + 1)
        } else {
            let p = self.select_rec(node.right.expect("internal node must have right"), c, k);
            node.sel1.select(p + 1)
        }
    }

    pub fn serialize(&self, writer: &mut (impl Write + ?Sized)) -> Result<u64> {
        let mut cw = CountingWriter::new(writer);
        bincode::serialize_into(&mut cw, &self.n)?;
        bincode::serialize_into(&mut cw, &self.sigma)?;
        bincode::serialize_into(&mut cw, &(self.nodes.len() as u64))?;
        for node in &self.nodes {
            bincode::serialize_into(&mut cw, &node.lo)?;
            bincode::serialize_into(&mut cw, &node.hi)?;
            bincode::serialize_into(&mut cw, &(*node.bits))?;
            node.rank.serialize(&mut cw)?;
            node.sel0.serialize(&mut cw)?;
            node.sel1.serialize(&mut cw)?;
            bincode::serialize_into(&mut cw, &node.left.map_or(u64::MAX, |v| v as u64))?;
            bincode::serialize_into(&mut cw, &node.right.map_or(u64::MAX, |v| v as u64))?;
        }
        Ok(cw.written())
    }

    pub fn load(reader: &mut (impl Read + ?Sized)) -> Result<Self> {
        let n: usize = bincode::deserialize_from(&mut *reader)?;
        let sigma: u64 = bincode::deserialize_from(&mut *reader)?;
        let nodes_len: u64 = bincode::deserialize_from(&mut *reader)?;
        let mut nodes = Vec::with_capacity(nodes_len as usize);
        for _ in 0..nodes_len {
            let lo: u64 = bincode::deserialize_from(&mut *reader)?;
            let hi: u64 = bincode::deserialize_from(&mut *reader)?;
            ensure!(lo < hi, "corrupt wavelet node: empty range {lo}..{hi}");
            let bits: BitVec<u64, Lsb0> = bincode::deserialize_from(&mut *reader)?;
            let bits = Arc::new(bits);
            let rank = RankSupport::load(&mut *reader, bits.clone())?;
            let sel0 = Select0::load(&mut *reader, bits.clone())?;
            let sel1 = Select1::load(&mut *reader, bits.clone())?;
            let left: u64 = bincode::deserialize_from(&mut *reader)?;
            let right: u64 = bincode::deserialize_from(&mut *reader)?;
            nodes.push(Node {
                lo,
                hi,
                mid: lo + (hi - lo) / 2,
                bits,
                rank,
                sel0,
                sel1,
                left: (left != u64::MAX).then_some(left as usize),
                right: (right != u64::MAX).then_some(right as usize),
            });
        }
        Ok(Self { nodes, n, sigma })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::SplitMix64;

    fn naive_rank(data: &[u64], c: u64, i: usize) -> usize {
        data[..i].iter().filter(|&&v| v == c).count()
    }

    fn naive_select(data: &[u64], c: u64, k: usize) -> usize {
        let mut seen = 0;
        for (i, &v) in data.iter().enumerate() {
            if v == c {
                seen += 1;
                if seen == k {
                    return i;
                }
            }
        }
        panic!("not enough occurrences");
    }

    #[test]
    fn single_symbol_alphabet() {
        let data = vec![0u64; 5];
        let wt = WaveletTree::new(&data, 1).unwrap();
        assert_eq!(wt.access(3), 0);
        assert_eq!(wt.rank(0, 5), 5);
        assert_eq!(wt.select(0, 4), 3);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(WaveletTree::new(&[0, 3], 3).is_err());
        assert!(WaveletTree::new(&[], 0).is_err());
    }

    #[test]
    fn access_rank_select_match_naive() {
        let mut rng = SplitMix64::new(0xC0FFEE);
        let sigma = 37u64;
        let data: Vec<u64> = (0..800).map(|_| rng.next_u64() % sigma).collect();
        let wt = WaveletTree::new(&data, sigma).unwrap();

        for (i, &v) in data.iter().enumerate() {
            assert_eq!(wt.access(i), v, "access({i})");
        }
        for i in (0..=data.len()).step_by(17) {
            for c in 0..sigma {
                assert_eq!(wt.rank(c, i), naive_rank(&data, c, i), "rank({c},{i})");
            }
        }
        for c in 0..sigma {
            let occ = naive_rank(&data, c, data.len());
            for k in 1..=occ {
                assert_eq!(wt.select(c, k), naive_select(&data, c, k), "select({c},{k})");
            }
        }
    }

    #[test]
    fn select_inverts_permutations() {
        // the fuzzy sampling stores a permutation; every value occurs once
        let perm = [4u64, 2, 0, 5, 1, 3];
        let wt = WaveletTree::new(&perm, 6).unwrap();
        for (i, &v) in perm.iter().enumerate() {
            assert_eq!(wt.select(v, 1), i);
        }
    }

    #[test]
    fn serialize_roundtrip() {
        let mut rng = SplitMix64::new(11);
        let data: Vec<u64> = (0..300).map(|_| rng.next_u64() % 11).collect();
        let wt = WaveletTree::new(&data, 11).unwrap();

        let mut buf = Vec::new();
        let written = wt.serialize(&mut buf).unwrap();
        assert_eq!(written as usize, buf.len());

        let loaded = WaveletTree::load(&mut buf.as_slice()).unwrap();
        assert_eq!(wt, loaded);
        for (i, &v) in data.iter().enumerate() {
            assert_eq!(loaded.access(i), v);
        }
    }

    #[test]
    fn load_rejects_truncated_stream() {
        let wt = WaveletTree::new(&[1, 0, 2], 3).unwrap();
        let mut buf = Vec::new();
        wt.serialize(&mut buf).unwrap();
        buf.truncate(buf.len() / 2);
        assert!(WaveletTree::load(&mut buf.as_slice()).is_err());
    }
}
