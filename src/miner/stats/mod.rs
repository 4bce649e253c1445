// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/stats/mod.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file is the module declaration for per-device statistics.
//
// Tree Location:
// - src/miner/stats/mod.rs (stats module entry point)
// - Submodules: device_stats

pub mod device_stats;

pub use device_stats::DeviceStats;

// Changelog:
// - v1.0.0 (2025-07-02): Replaced miner/thread/GPU-info stats with DeviceStats.
