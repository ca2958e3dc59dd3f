//! Inverse-suffix-array sampling supports.
//!
//! `PlainIsaSampling` stores strided ISA samples outright and pairs with
//! the suffix-order strategy. The other two supports store almost nothing:
//! they reconstruct ISA samples from the members of their companion
//! text-order strategy, and therefore require equal SA and ISA strides.
//! Both hold non-owning back-references that must be rebound after the
//! companion is copied, moved or reloaded.

use std::io::{Read, Write};
use std::sync::Arc;

use anyhow::{ensure, Result};

use crate::cache::{self, CacheConfig};
use crate::fuzzy_sampling::FuzzySampling;
use crate::int_vector::IntVector;
use crate::inv_perm_support::InvPermSupport;
use crate::sa_sampling::{MemberVisitor, SaSampling};
use crate::select_support::Select1;
use crate::text_order_sampling::TextOrderSampling;
use crate::util::{index_width, CountingWriter};

pub trait IsaSampling: Sized {
    /// The stored ISA sample for the block containing text position i.
    fn value(&self, i: usize) -> u64;

    /// The sample at or before text position i, as `(ISA value, position)`.
    fn sample_leq(&self, i: usize) -> (u64, usize);

    /// The sample at or after text position i, as `(ISA value, position)`;
    /// wraps around past the last sample.
    fn sample_geq(&self, i: usize) -> (u64, usize);

    fn sample_dens(&self) -> usize;

    fn serialize_members(&self, writer: &mut dyn Write, visit: MemberVisitor) -> Result<u64>;

    fn serialize(&self, writer: &mut dyn Write) -> Result<u64> {
        self.serialize_members(writer, &mut |_, _| {})
    }
}

/// Strided ISA samples: entry k is the suffix-array index of text position
/// `k * dens`. Pairs with `SaOrderSampling`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlainIsaSampling {
    iv: IntVector,
    dens: usize,
}

impl PlainIsaSampling {
    pub fn build(config: &CacheConfig, dens: usize) -> Result<Self> {
        ensure!(dens >= 1, "sample stride must be at least 1");
        let sa = cache::load_from_cache(cache::KEY_SA, config)?;
        let n = sa.len();
        let mut iv = if n >= 1 {
            IntVector::new((n - 1) / dens + 1, index_width(n))?
        } else {
            IntVector::default()
        };
        for i in 0..n {
            let sa_i = sa.get(i);
            if sa_i % dens as u64 == 0 {
                iv.set((sa_i / dens as u64) as usize, i as u64);
            }
        }
        Ok(Self { iv, dens })
    }

    pub fn load(reader: &mut dyn Read) -> Result<Self> {
        let dens: usize = bincode::deserialize_from(&mut *reader)?;
        ensure!(dens >= 1, "corrupt sampling: zero stride");
        let iv = IntVector::load(reader)?;
        Ok(Self { iv, dens })
    }

    pub fn len(&self) -> usize {
        self.iv.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iv.is_empty()
    }
}

impl IsaSampling for PlainIsaSampling {
    fn value(&self, i: usize) -> u64 {
        self.iv.get(i / self.dens)
    }

    fn sample_leq(&self, i: usize) -> (u64, usize) {
        let ci = i / self.dens;
        (self.iv.get(ci), ci * self.dens)
    }

    fn sample_geq(&self, i: usize) -> (u64, usize) {
        let ci = (i / self.dens + 1) % self.iv.len();
        (self.iv.get(ci), ci * self.dens)
    }

    fn sample_dens(&self) -> usize {
        self.dens
    }

    fn serialize_members(&self, writer: &mut dyn Write, visit: MemberVisitor) -> Result<u64> {
        let mut cw = CountingWriter::new(writer);
        bincode::serialize_into(&mut cw, &self.dens)?;
        visit("dens", cw.written());
        let bytes = self.iv.serialize(&mut cw)?;
        visit("samples", bytes);
        Ok(cw.written())
    }
}

/// ISA support on top of `TextOrderSampling`: inverts the companion's
/// condensed samples and maps back through its mark bitvector, so no ISA
/// values are stored at all.
#[derive(Debug, Clone, Default)]
pub struct TextOrderIsaSupport {
    select_marked: Select1,
    inv_perm: InvPermSupport,
    dens: usize,
}

impl TextOrderIsaSupport {
    pub fn new(sa_sample: &TextOrderSampling, dens: usize) -> Result<Self> {
        ensure!(dens >= 1, "sample stride must be at least 1");
        ensure!(
            sa_sample.sample_dens() == dens,
            "matched ISA support requires equal strides (sa {}, isa {dens})",
            sa_sample.sample_dens()
        );
        Ok(Self {
            select_marked: Select1::new(sa_sample.marked().clone()),
            inv_perm: InvPermSupport::new(sa_sample.samples().clone()),
            dens,
        })
    }

    /// Rebind both back-references after the companion moved or was
    /// reloaded. Must run before any query touches this support again.
    pub fn rebind(&mut self, sa_sample: &TextOrderSampling) {
        self.select_marked.set_vector(sa_sample.marked().clone());
        self.inv_perm.set_vector(sa_sample.samples().clone());
    }

    pub fn load(reader: &mut dyn Read, sa_sample: &TextOrderSampling) -> Result<Self> {
        let dens: usize = bincode::deserialize_from(&mut *reader)?;
        ensure!(dens >= 1, "corrupt sampling: zero stride");
        ensure!(
            sa_sample.sample_dens() == dens,
            "matched ISA support requires equal strides (sa {}, isa {dens})",
            sa_sample.sample_dens()
        );
        let select_marked = Select1::load(&mut *reader, sa_sample.marked().clone())?;
        let inv_perm = InvPermSupport::load(&mut *reader, sa_sample.samples().clone())?;
        Ok(Self {
            select_marked,
            inv_perm,
            dens,
        })
    }

    fn value_at_block(&self, ci: usize) -> u64 {
        self.select_marked
            .select(self.inv_perm.get(ci) as usize + 1) as u64
    }
}

impl IsaSampling for TextOrderIsaSupport {
    fn value(&self, i: usize) -> u64 {
        self.value_at_block(i / self.dens)
    }

    fn sample_leq(&self, i: usize) -> (u64, usize) {
        let ci = i / self.dens;
        (self.value_at_block(ci), ci * self.dens)
    }

    fn sample_geq(&self, i: usize) -> (u64, usize) {
        let ci = (i / self.dens + 1) % self.inv_perm.size();
        (self.value_at_block(ci), ci * self.dens)
    }

    fn sample_dens(&self) -> usize {
        self.dens
    }

    fn serialize_members(&self, writer: &mut dyn Write, visit: MemberVisitor) -> Result<u64> {
        let mut cw = CountingWriter::new(writer);
        bincode::serialize_into(&mut cw, &self.dens)?;
        visit("dens", cw.written());
        let bytes = self.select_marked.serialize(&mut cw)?;
        visit("select_marked", bytes);
        let bytes = self.inv_perm.serialize(&mut cw)?;
        visit("inv_perm", bytes);
        Ok(cw.written())
    }
}

impl PartialEq for TextOrderIsaSupport {
    fn eq(&self, other: &Self) -> bool {
        self.select_marked == other.select_marked
            && self.inv_perm == other.inv_perm
            && self.dens == other.dens
    }
}

/// ISA support on top of `FuzzySampling`: delegates to the companion's
/// internal permutation and adds only a select over its SA-side marks.
#[derive(Debug, Clone, Default)]
pub struct FuzzyIsaSupport {
    sa: Option<Arc<FuzzySampling>>,
    select_marked_sa: Select1,
    dens: usize,
}

impl FuzzyIsaSupport {
    pub fn new(sa_sample: Arc<FuzzySampling>, dens: usize) -> Result<Self> {
        ensure!(dens >= 1, "sample stride must be at least 1");
        ensure!(
            sa_sample.sample_dens() == dens,
            "matched ISA support requires equal strides (sa {}, isa {dens})",
            sa_sample.sample_dens()
        );
        let select_marked_sa = Select1::new(sa_sample.marked_sa().clone());
        Ok(Self {
            sa: Some(sa_sample),
            select_marked_sa,
            dens,
        })
    }

    /// Rebind the companion handle after it moved or was reloaded. Must
    /// run before any query touches this support again.
    pub fn rebind(&mut self, sa_sample: Arc<FuzzySampling>) {
        self.select_marked_sa.set_vector(sa_sample.marked_sa().clone());
        self.sa = Some(sa_sample);
    }

    pub fn load(reader: &mut dyn Read, sa_sample: Arc<FuzzySampling>) -> Result<Self> {
        let dens: usize = bincode::deserialize_from(&mut *reader)?;
        ensure!(dens >= 1, "corrupt sampling: zero stride");
        ensure!(
            sa_sample.sample_dens() == dens,
            "matched ISA support requires equal strides (sa {}, isa {dens})",
            sa_sample.sample_dens()
        );
        let select_marked_sa = Select1::load(&mut *reader, sa_sample.marked_sa().clone())?;
        Ok(Self {
            sa: Some(sa_sample),
            select_marked_sa,
            dens,
        })
    }

    fn companion(&self) -> &FuzzySampling {
        self.sa
            .as_deref()
            .expect("FuzzyIsaSupport not bound to its sampling")
    }
}

impl IsaSampling for FuzzyIsaSupport {
    fn value(&self, i: usize) -> u64 {
        self.companion().inv(i)
    }

    fn sample_leq(&self, i: usize) -> (u64, usize) {
        let sa = self.companion();
        let mut ci = i / self.dens;
        let mut j = sa.marked_isa_select(ci + 1);
        if j > i {
            ci = if ci > 0 { ci - 1 } else { sa.size() - 1 };
            j = sa.marked_isa_select(ci + 1);
        }
        (
            self.select_marked_sa.select(sa.inv(ci) as usize + 1) as u64,
            j,
        )
    }

    fn sample_geq(&self, i: usize) -> (u64, usize) {
        let sa = self.companion();
        let mut ci = i / self.dens;
        let mut j = sa.marked_isa_select(ci + 1);
        if j < i {
            ci = if ci < sa.size() - 1 { ci + 1 } else { 0 };
            j = sa.marked_isa_select(ci + 1);
        }
        (
            self.select_marked_sa.select(sa.inv(ci) as usize + 1) as u64,
            j,
        )
    }

    fn sample_dens(&self) -> usize {
        self.dens
    }

    fn serialize_members(&self, writer: &mut dyn Write, visit: MemberVisitor) -> Result<u64> {
        let mut cw = CountingWriter::new(writer);
        bincode::serialize_into(&mut cw, &self.dens)?;
        visit("dens", cw.written());
        let bytes = self.select_marked_sa.serialize(&mut cw)?;
        visit("select_marked_sa", bytes);
        Ok(cw.written())
    }
}

impl PartialEq for FuzzyIsaSupport {
    fn eq(&self, other: &Self) -> bool {
        self.select_marked_sa == other.select_marked_sa && self.dens == other.dens
    }
}
