// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/oracle.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// Boundary to the hash-function internals. The worker never evaluates
// Ethash/ProgPoW itself; it asks an oracle for the light cache of an epoch and
// for the host-side hash of a reported nonce.
//
// Tree Location:
// - src/core/oracle.rs (HashOracle trait, LightCache)
// - Implemented by: src/core/ethash.rs

use std::sync::Arc;
use thiserror::Error;

use crate::core::types::{HashResult, WorkPackage};

#[derive(Error, Debug, Clone)]
pub enum OracleError {
    #[error("Light cache for epoch {epoch} is unavailable: {message}")]
    LightCacheUnavailable { epoch: u32, message: String },

    #[error("Hash evaluation failed for nonce {nonce:#018x}: {message}")]
    EvaluationFailed { nonce: u64, message: String },
}

/// Light cache of one epoch, stored as little-endian 64-byte nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightCache {
    pub epoch: u32,
    pub data: Vec<u8>,
}

impl LightCache {
    pub const NODE_BYTES: usize = 64;

    pub fn new(epoch: u32, data: Vec<u8>) -> Self {
        Self { epoch, data }
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of 64-byte nodes (the kernels' `LIGHT_WORDS`)
    pub fn node_count(&self) -> usize {
        self.data.len() / Self::NODE_BYTES
    }
}

/// Deterministic, thread-safe hash oracle
pub trait HashOracle: Send + Sync {
    /// Light cache for an epoch; derived solely from the epoch number
    fn light_cache(&self, epoch: u32) -> Result<Arc<LightCache>, OracleError>;

    /// Full host-side evaluation of `nonce` against the package header/epoch
    fn evaluate(&self, work: &WorkPackage, nonce: u64) -> Result<HashResult, OracleError>;
}

// Changelog:
// - v1.0.0 (2025-07-02): HashOracle trait and LightCache container.
