// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/types.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file defines core data structures for the miner: work packages handed
// out by the work source, solutions handed back, and the hash results produced
// by the verification oracle.
//
// Tree Location:
// - src/core/types.rs (core data structures)
// - Depends on: serde, uint (via difficulty)

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::core::difficulty::{self, U256};
use crate::core::epoch::EPOCH_LENGTH;

/// 32-byte hash as produced by Keccak-256 and friends
pub type H256 = [u8; 32];

/// Immutable snapshot of the work currently offered by the work source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkPackage {
    /// Identifier assigned by the work source (pool job id, template id)
    pub job_id: String,

    /// Header hash the nonce is searched against
    pub header: H256,

    /// Dataset epoch
    pub epoch: u32,

    /// Block number, source of the ProgPoW period seed
    pub block_number: u64,

    /// Maximum accepted hash value (exclusive)
    pub boundary: U256,

    /// Number of high-order nonce bytes reserved by the work source
    pub ex_size_bytes: u8,

    /// Externally assigned nonce prefix, only meaningful when `ex_size_bytes > 0`
    pub start_nonce: u64,
}

impl WorkPackage {
    /// Create a package with no extra-nonce reservation
    pub fn new(job_id: impl Into<String>, header: H256, epoch: u32, block_number: u64, boundary: U256) -> Self {
        Self {
            job_id: job_id.into(),
            header,
            epoch,
            block_number,
            boundary,
            ex_size_bytes: 0,
            start_nonce: 0,
        }
    }

    /// Reserve the top `ex_size_bytes` of the nonce for the work source
    pub fn with_extra_nonce(mut self, start_nonce: u64, ex_size_bytes: u8) -> Self {
        self.start_nonce = start_nonce;
        self.ex_size_bytes = ex_size_bytes;
        self
    }

    /// Truncated target compared by the GPU kernels
    pub fn gpu_target(&self) -> u64 {
        difficulty::gpu_target(&self.boundary)
    }

    /// Short header prefix for log lines
    pub fn header_prefix(&self) -> String {
        hex::encode(&self.header[..4])
    }
}

/// A verified nonce ready for submission
#[derive(Debug, Clone)]
pub struct Solution {
    /// Winning nonce
    pub nonce: u64,

    /// Mix digest computed by the oracle
    pub mix_hash: H256,

    /// Package the nonce was found under
    pub work: Arc<WorkPackage>,

    /// Discovery timestamp
    pub found_at: Instant,

    /// Index of the device that reported the nonce
    pub device_index: usize,
}

impl Solution {
    /// Age of this solution
    pub fn age(&self) -> std::time::Duration {
        self.found_at.elapsed()
    }
}

/// Result of a host-side hash evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashResult {
    /// Final hash compared against the boundary (big-endian number)
    pub value: H256,

    /// Mix digest submitted alongside the nonce
    pub mix_hash: H256,
}

/// Work template as stored in `--work-file`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkTemplate {
    /// Template identifier
    #[serde(default)]
    pub job_id: String,

    /// Hex-encoded 32-byte header hash
    pub header: String,

    /// Epoch; derived from the block number when omitted
    #[serde(default)]
    pub epoch: Option<u32>,

    /// Block number
    pub block_number: u64,

    /// Hex-encoded boundary (big-endian, up to 32 bytes)
    pub boundary: String,

    /// Extra-nonce byte count
    #[serde(default)]
    pub ex_size_bytes: u8,

    /// Extra-nonce prefix as a decimal JSON number
    #[serde(default)]
    pub start_nonce: Option<u64>,
}

impl WorkTemplate {
    /// Decode into a work package
    pub fn into_package(self) -> Result<WorkPackage, String> {
        let header_bytes = hex::decode(self.header.trim_start_matches("0x"))
            .map_err(|e| format!("Invalid header hex: {}", e))?;
        let header: H256 = header_bytes
            .as_slice()
            .try_into()
            .map_err(|_| format!("Header must be 32 bytes, got {}", header_bytes.len()))?;
        let boundary =
            difficulty::parse_boundary(&self.boundary).map_err(|e| format!("Invalid boundary hex: {}", e))?;
        if boundary.is_zero() {
            return Err("Boundary must be non-zero".to_string());
        }
        let epoch = self
            .epoch
            .unwrap_or((self.block_number / EPOCH_LENGTH) as u32);

        Ok(WorkPackage::new(self.job_id, header, epoch, self.block_number, boundary)
            .with_extra_nonce(self.start_nonce.unwrap_or(0), self.ex_size_bytes))
    }
}

// Changelog:
// - v1.0.0 (2025-07-02): Ethash/ProgPoW work and solution types.
//   - Replaced PoolJob/MiningJob/Share with WorkPackage/Solution.
//   - Added HashResult for the verification oracle.
//   - Added WorkTemplate (serde) for --work-file.
