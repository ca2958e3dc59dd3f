//! Suffix-array and inverse-suffix-array sampling structures for
//! compressed suffix arrays.
//!
//! A compressed suffix array keeps only a sampled subset of `SA`/`ISA`
//! entries and reconstructs the rest through the LF/Psi mapping of the
//! enclosing index. This crate implements that sampling layer: four
//! suffix-array sampling strategies (suffix-order, text-order, BWT-driven
//! and run-aware "fuzzy" sampling) and their matched inverse supports,
//! built once from cached `SA`/`ISA`/`BWT` integer-vector files and then
//! queried immutably.
//!
//! After construction every structure is safe to query from multiple
//! threads. The rank/select and inverse-permutation supports hold
//! non-owning handles to the vectors they index; after a companion
//! structure is reloaded from disk, those handles are rebound via the
//! `load`/`rebind` methods before any query runs.

pub mod bwt_sampling;
pub mod cache;
pub mod fuzzy_sampling;
pub mod int_vector;
pub mod inv_perm_support;
pub mod isa_sampling;
pub mod rank_support;
pub mod sa_sampling;
pub mod select_support;
pub mod text_order_sampling;
pub mod util;
pub mod wavelet_tree;

#[cfg(test)]
pub(crate) mod testutil;

pub use bwt_sampling::BwtSampling;
pub use cache::{CacheConfig, KEY_BWT, KEY_ISA, KEY_SA, KEY_SAMPLE_CHAR};
pub use fuzzy_sampling::FuzzySampling;
pub use int_vector::IntVector;
pub use inv_perm_support::InvPermSupport;
pub use isa_sampling::{FuzzyIsaSupport, IsaSampling, PlainIsaSampling, TextOrderIsaSupport};
pub use rank_support::RankSupport;
pub use sa_sampling::{SaOrderSampling, SaSampling};
pub use select_support::{Select0, Select1, SelectSupport};
pub use text_order_sampling::TextOrderSampling;
pub use wavelet_tree::WaveletTree;
