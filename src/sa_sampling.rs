//! Suffix-array sampling strategies.
//!
//! A compressed suffix array stores `SA[i]` only at a sampled subset of
//! indices and reconstructs the rest through the LF/Psi mapping of the
//! enclosing index. Every strategy here answers the same three questions:
//! is index i sampled, what is `SA[i]` when it is, and are the samples
//! taken at text-order strides (which decides the compatible inverse
//! supports).

use std::io::{Read, Write};

use anyhow::{ensure, Result};

use crate::cache::{self, CacheConfig};
use crate::int_vector::IntVector;
use crate::util::{index_width, CountingWriter};

/// Byte-size visitor for the members written by `serialize_members`.
/// Purely diagnostic; it never changes what is written.
pub type MemberVisitor<'a> = &'a mut dyn FnMut(&'static str, u64);

pub trait SaSampling: Sized {
    /// Samples taken at regular strides of the text (`true`) or of the
    /// suffix-array index (`false`).
    const TEXT_ORDER: bool;

    /// Builds the sampling from the cached suffix array (and whatever else
    /// the strategy needs) with stride `dens`. The cache is streamed once.
    fn build(config: &CacheConfig, dens: usize) -> Result<Self>;

    fn is_sampled(&self, i: usize) -> bool;

    /// `SA[i]`; requires `is_sampled(i)`.
    fn value(&self, i: usize) -> u64;

    fn sample_dens(&self) -> usize;

    fn serialize_members(&self, writer: &mut dyn Write, visit: MemberVisitor) -> Result<u64>;

    fn serialize(&self, writer: &mut dyn Write) -> Result<u64> {
        self.serialize_members(writer, &mut |_, _| {})
    }

    fn load(reader: &mut dyn Read) -> Result<Self>;

    fn text_order(&self) -> bool {
        Self::TEXT_ORDER
    }
}

/// Samples at every `dens`-th suffix-array index. No mark bitvector is
/// needed: index i is sampled iff `i % dens == 0`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaOrderSampling {
    samples: IntVector,
    dens: usize,
}

impl SaSampling for SaOrderSampling {
    const TEXT_ORDER: bool = false;

    fn build(config: &CacheConfig, dens: usize) -> Result<Self> {
        ensure!(dens >= 1, "sample stride must be at least 1");
        let sa = cache::load_from_cache(cache::KEY_SA, config)?;
        let n = sa.len();
        let mut samples = IntVector::new((n + dens - 1) / dens, index_width(n))?;
        for (k, i) in (0..n).step_by(dens).enumerate() {
            samples.set(k, sa.get(i));
        }
        Ok(Self { samples, dens })
    }

    fn is_sampled(&self, i: usize) -> bool {
        i % self.dens == 0
    }

    fn value(&self, i: usize) -> u64 {
        debug_assert!(self.is_sampled(i));
        self.samples.get(i / self.dens)
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
        Ok(cw.written())
    }

    fn load(reader: &mut dyn Read) -> Result<Self> {
        let dens: usize = bincode::deserialize_from(&mut *reader)?;
        ensure!(dens >= 1, "corrupt sampling: zero stride");
        let samples = IntVector::load(reader)?;
        Ok(Self { samples, dens })
    }
}

impl SaOrderSampling {
    /// Number of stored samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
