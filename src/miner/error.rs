// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/error.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// Errors a worker run can end with.
//
// Tree Location:
// - src/miner/error.rs (MinerError)
// - Depends on: thiserror

use thiserror::Error;

use crate::core::oracle::OracleError;
use crate::miner::gpu::backend::BackendError;
use crate::miner::kernel_source::KernelSourceError;
use crate::miner::nonce::NonceError;

#[derive(Error, Debug)]
pub enum MinerError {
    #[error("Kernel build failed on {device}: {message}")]
    BuildFailure { device: String, message: String, log: String },

    #[error("{device} has insufficient GPU memory: {available} bytes found < {required} bytes required")]
    InsufficientDeviceMemory { device: String, available: u64, required: u64 },

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Hash oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Kernel source unavailable: {0}")]
    KernelSource(#[from] KernelSourceError),

    #[error("Nonce space unavailable: {0}")]
    Nonce(#[from] NonceError),
}

impl MinerError {
    /// Initialization failures that leave the device disabled. Everything
    /// else ends the current run and may be restarted by a supervisor.
    pub fn disables_device(&self) -> bool {
        matches!(
            self,
            MinerError::BuildFailure { .. }
                | MinerError::InsufficientDeviceMemory { .. }
                | MinerError::KernelSource(_)
                | MinerError::Nonce(_)
        )
    }
}

// Changelog:
// - v1.0.0 (2025-07-02): Worker error taxonomy.
//   - Nonce variant for devices outside the extra-nonce index field.
