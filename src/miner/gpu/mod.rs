// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/gpu/mod.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file is the module entry point for GPU access. The backend capability
// is always available; the OpenCL realisation is compiled with the "gpu"
// feature flag.

pub mod backend;

// OpenCL is only available when the "gpu" feature is enabled
#[cfg(feature = "gpu")]
pub mod opencl;

pub use backend::{
    BackendError, BufferAccess, BufferId, ComputeBackend, DeviceInfo, DeviceKick, KernelArg, KernelKind,
};

#[cfg(feature = "gpu")]
pub use opencl::{OpenClBackend, OpenClDevice};

// Changelog:
// - v1.0.0 (2025-07-02): Backend capability plus feature-gated OpenCL.
//   - Removed GpuManager/GpuMiner and the status/information files.
