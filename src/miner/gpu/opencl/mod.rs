// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// File: src/miner/gpu/opencl/mod.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// OpenCL module - device enumeration and the opencl3 ComputeBackend

pub mod backend;
pub mod device;

// Re-export key types
pub use backend::{OpenClBackend, OpenClKick};
pub use device::OpenClDevice;
