// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/ethash.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file implements the host side of Ethash: the epoch seed chain, light
// cache generation, dataset item derivation from the light cache and
// hashimoto_light. EthashOracle wraps these as a HashOracle so GPU hits can be
// re-evaluated on the CPU before submission.
//
// Tree Location:
// - src/core/ethash.rs (Ethash light evaluation)
// - Depends on: sha3 crate (Keccak-256/512)

use log::{debug, info};
use sha3::{Digest, Keccak256, Keccak512};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::core::epoch::{self, HASH_BYTES, MIX_BYTES};
use crate::core::oracle::{HashOracle, LightCache, OracleError};
use crate::core::types::{H256, HashResult, WorkPackage};

const LOG_TARGET: &str = "progpow::miner::ethash";

pub const CACHE_ROUNDS: usize = 3;
pub const DATASET_PARENTS: u32 = 256;
pub const ACCESSES: u32 = 64;

const FNV_PRIME: u32 = 0x0100_0193;
const NODE_WORDS: usize = (HASH_BYTES / 4) as usize;
const MIX_WORDS: usize = (MIX_BYTES / 4) as usize;

type Node = [u32; NODE_WORDS];

#[inline]
fn fnv(a: u32, b: u32) -> u32 {
    a.wrapping_mul(FNV_PRIME) ^ b
}

fn keccak256(data: &[u8]) -> H256 {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

fn keccak512(data: &[u8]) -> [u8; 64] {
    let mut out = [0u8; 64];
    out.copy_from_slice(&Keccak512::digest(data));
    out
}

fn node_from_bytes(bytes: &[u8]) -> Node {
    let mut node = [0u32; NODE_WORDS];
    for (word, chunk) in node.iter_mut().zip(bytes.chunks_exact(4)) {
        *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    node
}

fn node_to_bytes(node: &Node) -> [u8; 64] {
    let mut bytes = [0u8; 64];
    for (chunk, word) in bytes.chunks_exact_mut(4).zip(node.iter()) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    bytes
}

fn keccak512_node(node: &Node) -> Node {
    node_from_bytes(&keccak512(&node_to_bytes(node)))
}

fn cache_node(cache: &[u8], index: usize) -> Node {
    let start = index * HASH_BYTES as usize;
    node_from_bytes(&cache[start..start + HASH_BYTES as usize])
}

/// Seed hash of an epoch: Keccak-256 applied `epoch` times to 32 zero bytes
pub fn seed_hash(epoch: u32) -> H256 {
    let mut seed = [0u8; 32];
    for _ in 0..epoch {
        seed = keccak256(&seed);
    }
    seed
}

/// Generate a light cache of `size` bytes from `seed`
pub fn make_cache(size: u64, seed: &H256) -> Vec<u8> {
    let n = (size / HASH_BYTES) as usize;
    if n == 0 {
        return Vec::new();
    }

    let mut nodes: Vec<[u8; 64]> = Vec::with_capacity(n);
    nodes.push(keccak512(seed));
    for i in 1..n {
        let next = keccak512(&nodes[i - 1]);
        nodes.push(next);
    }

    // RandMemoHash
    for _ in 0..CACHE_ROUNDS {
        for i in 0..n {
            let v = u32::from_le_bytes([nodes[i][0], nodes[i][1], nodes[i][2], nodes[i][3]]) as usize % n;
            let prev = nodes[(i + n - 1) % n];
            let mut mixed = [0u8; 64];
            for (k, byte) in mixed.iter_mut().enumerate() {
                *byte = prev[k] ^ nodes[v][k];
            }
            nodes[i] = keccak512(&mixed);
        }
    }

    nodes.concat()
}

/// Derive dataset node `index` from the light cache
pub fn calc_dataset_item(cache: &[u8], index: u32) -> Node {
    let n = cache.len() / HASH_BYTES as usize;
    let mut mix = cache_node(cache, index as usize % n);
    mix[0] ^= index;
    mix = keccak512_node(&mix);

    for j in 0..DATASET_PARENTS {
        let parent = fnv(index ^ j, mix[j as usize % NODE_WORDS]) as usize % n;
        let parent_node = cache_node(cache, parent);
        for (word, parent_word) in mix.iter_mut().zip(parent_node.iter()) {
            *word = fnv(*word, *parent_word);
        }
    }

    keccak512_node(&mix)
}

/// Ethash evaluation using only the light cache
pub fn hashimoto_light(full_size: u64, cache: &[u8], header: &H256, nonce: u64) -> HashResult {
    let pages = (full_size / MIX_BYTES) as u32;

    let mut seed_input = [0u8; 40];
    seed_input[..32].copy_from_slice(header);
    seed_input[32..].copy_from_slice(&nonce.to_le_bytes());
    let seed_bytes = keccak512(&seed_input);
    let seed = node_from_bytes(&seed_bytes);

    let mut mix = [0u32; MIX_WORDS];
    for (i, word) in mix.iter_mut().enumerate() {
        *word = seed[i % NODE_WORDS];
    }

    for i in 0..ACCESSES {
        let page = fnv(i ^ seed[0], mix[i as usize % MIX_WORDS]) % pages;
        let first = calc_dataset_item(cache, page * 2);
        let second = calc_dataset_item(cache, page * 2 + 1);
        for k in 0..NODE_WORDS {
            mix[k] = fnv(mix[k], first[k]);
            mix[k + NODE_WORDS] = fnv(mix[k + NODE_WORDS], second[k]);
        }
    }

    let mut mix_hash = [0u8; 32];
    for (i, chunk) in mix_hash.chunks_exact_mut(4).enumerate() {
        let compressed = fnv(fnv(fnv(mix[4 * i], mix[4 * i + 1]), mix[4 * i + 2]), mix[4 * i + 3]);
        chunk.copy_from_slice(&compressed.to_le_bytes());
    }

    let mut final_input = [0u8; 96];
    final_input[..64].copy_from_slice(&seed_bytes);
    final_input[64..].copy_from_slice(&mix_hash);

    HashResult {
        value: keccak256(&final_input),
        mix_hash,
    }
}

/// Ethash light-client oracle, keeps the two most recent epochs' caches
pub struct EthashOracle {
    caches: Mutex<VecDeque<Arc<LightCache>>>,
}

impl EthashOracle {
    const RETAINED_EPOCHS: usize = 2;

    pub fn new() -> Self {
        Self {
            caches: Mutex::new(VecDeque::with_capacity(Self::RETAINED_EPOCHS)),
        }
    }

    fn cached(&self, epoch: u32) -> Option<Arc<LightCache>> {
        let caches = self.caches.lock().unwrap_or_else(PoisonError::into_inner);
        caches.iter().find(|c| c.epoch == epoch).cloned()
    }
}

impl Default for EthashOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl HashOracle for EthashOracle {
    fn light_cache(&self, epoch: u32) -> Result<Arc<LightCache>, OracleError> {
        if let Some(cache) = self.cached(epoch) {
            return Ok(cache);
        }

        let size = epoch::cache_size(epoch);
        info!(target: LOG_TARGET, "Generating light cache for epoch {} ({} bytes)", epoch, size);
        let start = Instant::now();
        let data = make_cache(size, &seed_hash(epoch));
        if data.is_empty() {
            return Err(OracleError::LightCacheUnavailable {
                epoch,
                message: "cache size rounds to zero nodes".to_string(),
            });
        }
        debug!(target: LOG_TARGET, "Light cache for epoch {} ready in {}ms", epoch, start.elapsed().as_millis());

        let cache = Arc::new(LightCache::new(epoch, data));
        let mut caches = self.caches.lock().unwrap_or_else(PoisonError::into_inner);
        // another thread may have generated it meanwhile
        if let Some(existing) = caches.iter().find(|c| c.epoch == epoch) {
            return Ok(Arc::clone(existing));
        }
        if caches.len() == Self::RETAINED_EPOCHS {
            caches.pop_front();
        }
        caches.push_back(Arc::clone(&cache));
        Ok(cache)
    }

    fn evaluate(&self, work: &WorkPackage, nonce: u64) -> Result<HashResult, OracleError> {
        let cache = self.light_cache(work.epoch)?;
        let full_size = epoch::dataset_size(work.epoch);
        Ok(hashimoto_light(full_size, &cache.data, &work.header, nonce))
    }
}

// Changelog:
// - v1.0.0 (2025-07-02): Ethash light evaluation.
//   - seed_hash, make_cache (3 RandMemoHash rounds), calc_dataset_item
//     (256 parents) and hashimoto_light (64 accesses).
//   - EthashOracle keeps the last two epochs' caches behind a mutex.
