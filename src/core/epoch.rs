// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/epoch.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// Epoch and period arithmetic plus the Ethash cache/dataset size functions.
// Dataset and light-cache sizes are pure functions of the epoch.
//
// Tree Location:
// - src/core/epoch.rs (epoch, period and dataset sizing)

/// Blocks per Ethash epoch
pub const EPOCH_LENGTH: u64 = 30_000;

/// Blocks per ProgPoW period (period-specific kernel constants)
pub const PROGPOW_PERIOD_LENGTH: u64 = 50;

/// ProgPoW lanes per hash
pub const PROGPOW_LANES: u64 = 16;

/// ProgPoW 32-bit words loaded from the DAG per lane and loop
pub const PROGPOW_DAG_LOADS: u64 = 4;

pub const HASH_BYTES: u64 = 64;
pub const MIX_BYTES: u64 = 128;
pub const WORD_BYTES: u64 = 4;

pub const CACHE_BYTES_INIT: u64 = 1 << 24;
pub const CACHE_BYTES_GROWTH: u64 = 1 << 17;
pub const DATASET_BYTES_INIT: u64 = 1 << 30;
pub const DATASET_BYTES_GROWTH: u64 = 1 << 23;

/// Epoch for a block number
pub fn epoch_of(block_number: u64) -> u32 {
    (block_number / EPOCH_LENGTH) as u32
}

/// ProgPoW period seed for a block number
pub fn period_seed(block_number: u64) -> u64 {
    block_number / PROGPOW_PERIOD_LENGTH
}

/// Light cache size in bytes for an epoch
pub fn cache_size(epoch: u32) -> u64 {
    let mut size = CACHE_BYTES_INIT + CACHE_BYTES_GROWTH * epoch as u64 - HASH_BYTES;
    while !is_prime(size / HASH_BYTES) {
        size -= 2 * HASH_BYTES;
    }
    size
}

/// Full dataset (DAG) size in bytes for an epoch
pub fn dataset_size(epoch: u32) -> u64 {
    let mut size = DATASET_BYTES_INIT + DATASET_BYTES_GROWTH * epoch as u64 - MIX_BYTES;
    while !is_prime(size / MIX_BYTES) {
        size -= 2 * MIX_BYTES;
    }
    size
}

fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut divisor = 3u64;
    while divisor * divisor <= n {
        if n % divisor == 0 {
            return false;
        }
        divisor += 2;
    }
    true
}


// Changelog:
// - v1.0.0 (2025-07-02): Initial epoch/period module.
