//! Bit-packed vector of fixed-width unsigned integers.
//!
//! This is the storage type for all sample arrays and for the cache files
//! the sampling strategies are built from: every cache file is one
//! serialized `IntVector`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::util::{low_mask, CountingWriter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntVector {
    len: usize,
    width: u8,
    words: Vec<u64>,
}

impl Default for IntVector {
    fn default() -> Self {
        Self {
            len: 0,
            width: 1,
            words: Vec::new(),
        }
    }
}

fn words_for(len: usize, width: u8) -> usize {
    (len * width as usize + 63) / 64
}

impl IntVector {
    /// Zero-filled vector of `len` integers of `width` bits each.
    pub fn new(len: usize, width: u8) -> Result<Self> {
        ensure!(
            (1..=64).contains(&width),
            "integer width {width} out of range 1..=64"
        );
        Ok(Self {
            len,
            width,
            words: vec![0u64; words_for(len, width)],
        })
    }

    pub fn from_slice(values: &[u64], width: u8) -> Result<Self> {
        let mut iv = Self::new(values.len(), width)?;
        for (i, &v) in values.iter().enumerate() {
            iv.set(i, v);
        }
        Ok(iv)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn width(&self) -> u8 {
        self.width
    }

    #[inline]
    pub fn get(&self, idx: usize) -> u64 {
        assert!(idx < self.len, "index {idx} out of bounds ({})", self.len);
        let w = self.width as usize;
        let off = idx * w;
        let word = off >> 6;
        let shift = off & 63;
        let mask = low_mask(self.width as u32);
        if shift + w <= 64 {
            (self.words[word] >> shift) & mask
        } else {
            ((self.words[word] >> shift) | (self.words[word + 1] << (64 - shift))) & mask
        }
    }

    /// Stores the low `width` bits of `value` at `idx`. Bits outside the
    /// logical range stay zero so that equality is value equality.
    #[inline]
    pub fn set(&mut self, idx: usize, value: u64) {
        assert!(idx < self.len, "index {idx} out of bounds ({})", self.len);
        let w = self.width as usize;
        let mask = low_mask(self.width as u32);
        let value = value & mask;
        let off = idx * w;
        let word = off >> 6;
        let shift = off & 63;
        self.words[word] &= !(mask << shift);
        self.words[word] |= value << shift;
        if shift + w > 64 {
            let hi_shift = 64 - shift;
            self.words[word + 1] &= !(mask >> hi_shift);
            self.words[word + 1] |= value >> hi_shift;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    pub fn serialize(&self, writer: &mut (impl Write + ?Sized)) -> Result<u64> {
        let mut cw = CountingWriter::new(writer);
        bincode::serialize_into(&mut cw, self)?;
        Ok(cw.written())
    }

    pub fn load(reader: &mut (impl Read + ?Sized)) -> Result<Self> {
        let iv: IntVector = bincode::deserialize_from(reader)?;
        ensure!(
            (1..=64).contains(&iv.width),
            "corrupt integer vector: width {}",
            iv.width
        );
        ensure!(
            iv.words.len() == words_for(iv.len, iv.width),
            "corrupt integer vector: {} words for {} values of width {}",
            iv.words.len(),
            iv.len,
            iv.width
        );
        Ok(iv)
    }

    pub fn store_to_file(&self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut out = BufWriter::new(file);
        self.serialize(&mut out)?;
        out.flush()?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        Self::load(&mut BufReader::new(file))
    }
}
