use std::sync::Arc;
use std::time::Instant;

use rand_xoshiro::{
    rand_core::{RngCore, SeedableRng},
    Xoshiro256PlusPlus,
};

use csa_sds::cache::{self, CacheConfig};
use csa_sds::int_vector::IntVector;
use csa_sds::isa_sampling::{FuzzyIsaSupport, IsaSampling, TextOrderIsaSupport};
use csa_sds::sa_sampling::{SaOrderSampling, SaSampling};
use csa_sds::util::index_width;
use csa_sds::{FuzzySampling, TextOrderSampling};

const N: usize = 100_000;
const DENS: usize = 32;
const N_QUERIES: usize = 1_000_000;

fn main() {
    let dir = std::env::temp_dir().join(format!("csa_sds_bench_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let config = CacheConfig::new(&dir, "bench");

    println!("Generating random text of length {N} and its suffix array...");
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(123);
    let mut text: Vec<u8> = (0..N).map(|_| b'a' + (rng.next_u64() % 4) as u8).collect();
    text.push(b'$');
    let mut sa: Vec<usize> = (0..text.len()).collect();
    sa.sort_by(|&a, &b| text[a..].cmp(&text[b..]));

    let packed: Vec<u64> = sa.iter().map(|&v| v as u64).collect();
    let iv = IntVector::from_slice(&packed, index_width(text.len())).unwrap();
    cache::store_to_cache(&iv, cache::KEY_SA, &config).unwrap();

    benchmark_sa_order(&config);
    benchmark_text_order(&config, text.len());
    benchmark_fuzzy(&config, text.len());

    let _ = std::fs::remove_dir_all(&dir);
}

fn query_positions(n: usize, seed: u64) -> Vec<usize> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    (0..N_QUERIES).map(|_| rng.next_u64() as usize % n).collect()
}

fn benchmark_sa_order(config: &CacheConfig) {
    print!("Building SaOrderSampling... ");
    let start = Instant::now();
    let s = SaOrderSampling::build(config, DENS).unwrap();
    println!("done in {:.1} ms", start.elapsed().as_secs_f64() * 1e3);

    let positions = query_positions(s.len(), 777);
    let start = Instant::now();
    let mut sum = 0u64;
    for &p in &positions {
        sum += s.value(p * DENS);
    }
    println!("Sum of sampled values: {sum}");
    let per_query = start.elapsed().as_secs_f64() / N_QUERIES as f64;
    println!("Average time per sa-order query: {:.2} ns", per_query * 1e9);
}

fn benchmark_text_order(config: &CacheConfig, n: usize) {
    print!("Building TextOrderSampling + inverse support... ");
    let start = Instant::now();
    let s = TextOrderSampling::build(config, DENS).unwrap();
    let isa = TextOrderIsaSupport::new(&s, DENS).unwrap();
    println!("done in {:.1} ms", start.elapsed().as_secs_f64() * 1e3);

    let positions = query_positions(n, 778);
    let start = Instant::now();
    let mut sum = 0u64;
    for &p in &positions {
        if s.is_sampled(p) {
            sum += s.value(p);
        }
    }
    println!("Sum over sampled indices: {sum}");
    let per_query = start.elapsed().as_secs_f64() / N_QUERIES as f64;
    println!("Average time per text-order query: {:.2} ns", per_query * 1e9);

    let start = Instant::now();
    let mut sum = 0u64;
    for &p in &positions {
        sum += isa.value(p);
    }
    println!("Sum of ISA samples: {sum}");
    let per_query = start.elapsed().as_secs_f64() / N_QUERIES as f64;
    println!("Average time per inverse query: {:.2} ns", per_query * 1e9);
}

fn benchmark_fuzzy(config: &CacheConfig, n: usize) {
    print!("Building FuzzySampling + inverse support... ");
    let start = Instant::now();
    let s = Arc::new(FuzzySampling::build(config, DENS).unwrap());
    let isa = FuzzyIsaSupport::new(s.clone(), DENS).unwrap();
    println!("done in {:.1} ms", start.elapsed().as_secs_f64() * 1e3);

    let positions = query_positions(n, 779);
    let start = Instant::now();
    let mut sum = 0u64;
    for &p in &positions {
        if s.is_sampled(p) {
            sum += s.value(p);
        }
    }
    println!("Sum over sampled indices: {sum}");
    let per_query = start.elapsed().as_secs_f64() / N_QUERIES as f64;
    println!("Average time per fuzzy query: {:.2} ns", per_query * 1e9);

    let start = Instant::now();
    let mut sum = 0u64;
    for &p in &positions {
        sum += isa.sample_leq(p).0;
    }
    println!("Sum of neighbouring samples: {sum}");
    let per_query = start.elapsed().as_secs_f64() / N_QUERIES as f64;
    println!("Average time per sample_leq query: {:.2} ns", per_query * 1e9);
}
