// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/verifier.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// Host-side check of GPU hits. The kernels only compare the upper 64 bits of
// the boundary; a hit becomes a Solution only after the oracle's full hash is
// strictly below the full 256-bit boundary.
//
// Tree Location:
// - src/miner/verifier.rs (host verification of GPU hits)
// - Depends on: log

use log::{debug, warn};
use std::sync::Arc;
use std::time::Instant;

use crate::core::difficulty;
use crate::core::oracle::{HashOracle, OracleError};
use crate::core::types::{H256, Solution, WorkPackage};

const LOG_TARGET: &str = "progpow::miner::verifier";

#[derive(Debug, Clone)]
pub enum Verdict {
    Accepted(Solution),
    /// Recomputed hash is not below the boundary
    Rejected { nonce: u64, value: H256 },
    /// The oracle could not evaluate the nonce
    Failed { nonce: u64, error: OracleError },
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted(_))
    }
}

pub struct SolutionVerifier {
    oracle: Arc<dyn HashOracle>,
    device_index: usize,
}

impl SolutionVerifier {
    pub fn new(oracle: Arc<dyn HashOracle>, device_index: usize) -> Self {
        Self { oracle, device_index }
    }

    pub fn verify(&self, work: &Arc<WorkPackage>, nonce: u64) -> Verdict {
        let result = match self.oracle.evaluate(work, nonce) {
            Ok(result) => result,
            Err(error) => {
                warn!(target: LOG_TARGET, "cl-{} could not verify nonce {:#018x}: {}", self.device_index, nonce, error);
                return Verdict::Failed { nonce, error };
            }
        };

        if difficulty::hash_below_boundary(&result.value, &work.boundary) {
            debug!(target: LOG_TARGET, "cl-{} nonce {:#018x} verified", self.device_index, nonce);
            Verdict::Accepted(Solution {
                nonce,
                mix_hash: result.mix_hash,
                work: Arc::clone(work),
                found_at: Instant::now(),
                device_index: self.device_index,
            })
        } else {
            Verdict::Rejected {
                nonce,
                value: result.value,
            }
        }
    }
}

// Changelog:
// - v1.0.0 (2025-07-02): Full-width host verification of GPU hits.
