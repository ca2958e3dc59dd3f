//! Build-time cache of integer-vector files shared with the enclosing
//! index. Every cache entry is one serialized [`IntVector`] named by a key
//! and an instance id.

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};

use crate::int_vector::IntVector;
use crate::util::index_width;

pub const KEY_SA: &str = "sa";
pub const KEY_ISA: &str = "isa";
pub const KEY_BWT: &str = "bwt";
pub const KEY_SAMPLE_CHAR: &str = "sample_char";

/// Names the directory and instance id under which cache files live.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    dir: PathBuf,
    id: String,
}

impl CacheConfig {
    pub fn new(dir: impl Into<PathBuf>, id: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            id: id.into(),
        }
    }

    pub fn file_name(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.iv", key, self.id))
    }

    pub fn exists(&self, key: &str) -> bool {
        self.file_name(key).is_file()
    }
}

pub fn store_to_cache(v: &IntVector, key: &str, config: &CacheConfig) -> Result<()> {
    v.store_to_file(&config.file_name(key))
        .with_context(|| format!("storing cache entry {key}"))
}

pub fn load_from_cache(key: &str, config: &CacheConfig) -> Result<IntVector> {
    let path = config.file_name(key);
    ensure!(
        path.is_file(),
        "cache entry {key} is missing ({})",
        path.display()
    );
    IntVector::load_from_file(&path).with_context(|| format!("loading cache entry {key}"))
}

/// Builds and caches the inverse suffix array from the cached suffix array.
pub fn construct_isa(config: &CacheConfig) -> Result<()> {
    let sa = load_from_cache(KEY_SA, config)
        .context("the inverse suffix array is derived from the suffix array")?;
    let n = sa.len();
    log::info!("constructing inverse suffix array over {n} positions");
    let mut isa = IntVector::new(n, index_width(n))?;
    for (i, s) in sa.iter().enumerate() {
        isa.set(s as usize, i as u64);
    }
    store_to_cache(&isa, KEY_ISA, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{widen, CacheFixture};

    #[test]
    fn store_then_load() {
        let fx = CacheFixture::new("cache_store", b"mississippi$");
        let loaded = load_from_cache(KEY_SA, &fx.config).unwrap();
        let sa = crate::testutil::suffix_array(b"mississippi$");
        assert_eq!(loaded.iter().collect::<Vec<_>>(), widen(&sa));
    }

    #[test]
    fn missing_entry_is_an_error() {
        let fx = CacheFixture::new("cache_missing", b"abc");
        let err = load_from_cache(KEY_BWT, &fx.config).unwrap_err();
        assert!(err.to_string().contains("bwt"));
    }

    #[test]
    fn construct_isa_inverts_sa() {
        let text = b"abracadabra$";
        let fx = CacheFixture::new("cache_isa", text);
        assert!(!fx.config.exists(KEY_ISA));
        construct_isa(&fx.config).unwrap();
        let isa = load_from_cache(KEY_ISA, &fx.config).unwrap();
        let sa = crate::testutil::suffix_array(text);
        for (i, &s) in sa.iter().enumerate() {
            assert_eq!(isa.get(s), i as u64);
        }
    }

    #[test]
    fn construct_isa_without_sa_fails() {
        let fx = CacheFixture::empty("cache_isa_missing");
        assert!(construct_isa(&fx.config).is_err());
    }
}
