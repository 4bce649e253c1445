// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/lib.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file serves as the main library entry point for the ProgPoW/Ethash
// miner. It exports the core types, the worker engine and utilities used by
// the ppminer binary and by integration tests.
//
// Tree Location:
// - src/lib.rs (root library file)
// - Exports modules: core, miner, utils

pub mod core;
pub mod miner;
pub mod utils;

// Re-export commonly used types at the crate root for convenience
pub use crate::core::{AlgorithmKind, HashOracle, MinerSettings, Solution, WorkPackage};
pub use crate::miner::{Farm, MinerError, MinerWorker, SharedWorkSource};

// Changelog:
// - v1.0.0 (2025-07-02): Library root for the Ethash/ProgPoW worker engine.
//   - Dropped benchmark, help and pool modules.
