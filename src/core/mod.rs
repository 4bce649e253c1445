// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/mod.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file is the module declaration for the core functionality of the miner:
// work types, boundary arithmetic, epoch math, the hash oracle boundary and
// configuration.

pub mod config;
pub mod difficulty;
pub mod epoch;
pub mod ethash;
pub mod oracle;
pub mod types;

// Re-export the most commonly used items
pub use config::{AlgorithmKind, Args, DagLoadMode, MinerSettings};
pub use difficulty::U256;
pub use ethash::EthashOracle;
pub use oracle::{HashOracle, LightCache, OracleError};
pub use types::{H256, HashResult, Solution, WorkPackage, WorkTemplate};

// Changelog:
// - v1.0.0 (2025-07-02): Ethash/ProgPoW core.
//   - Dropped sha3x and sha256 hashing modules.
//   - Added epoch, ethash, oracle and config modules.
