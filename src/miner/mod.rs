// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/mod.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file is the module declaration for the per-device worker engine.
//
// Tree Location:
// - src/miner/mod.rs (miner module entry point)
// - Submodules: algorithm, coordination, dataset, error, factory, farm, gpu,
//   kernel_source, nonce, stats, verifier, work_source, worker

pub mod algorithm;
pub mod coordination;
pub mod dataset;
pub mod error;
pub mod factory;
pub mod farm;
pub mod gpu;
pub mod kernel_source;
pub mod nonce;
pub mod stats;
pub mod verifier;
pub mod work_source;
pub mod worker;

// Re-export key types for convenience
pub use algorithm::{AlgorithmVariant, Ethash, ProgPow};
pub use coordination::{MiningContext, SequentialLoadCoordinator, StopSignal};
pub use dataset::{DatasetManager, DispatchParams, Transition};
pub use error::MinerError;
pub use farm::{DeviceOutcome, Farm};
pub use stats::DeviceStats;
pub use verifier::{SolutionVerifier, Verdict};
pub use work_source::{SharedWorkSource, WorkSource};
pub use worker::{MinerWorker, WorkerState};

// Changelog:
// - v1.0.0 (2025-07-02): Worker engine modules replace the CPU/GPU SHA3x
//   miners.
