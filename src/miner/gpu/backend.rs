// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/gpu/backend.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file defines the compute backend capability the worker engine drives:
// buffer allocation, program build, positional kernel arguments, kernel
// dispatch, buffer transfers and synchronisation. One backend instance is
// bound to exactly one device.
//
// Tree Location:
// - src/miner/gpu/backend.rs (ComputeBackend trait and its vocabulary)
// - Implemented by: src/miner/gpu/opencl/backend.rs, tests/common/mod.rs

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by backend operations
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    #[error("Program build failed: {message}")]
    BuildFailure { message: String, log: String },

    #[error("{operation} failed: {message}")]
    Runtime { operation: &'static str, message: String },

    #[error("Backend has not been opened")]
    NotOpened,

    #[error("Unknown buffer {0}")]
    UnknownBuffer(BufferId),

    #[error("Kernel {0:?} has not been built")]
    KernelMissing(KernelKind),
}

impl BackendError {
    pub fn runtime(operation: &'static str, message: impl fmt::Display) -> Self {
        BackendError::Runtime {
            operation,
            message: message.to_string(),
        }
    }
}

/// Opaque handle of a device buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The two kernels every algorithm variant provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelKind {
    Search,
    DatasetBuild,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferAccess {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// Value bound to a kernel argument position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelArg {
    Buffer(BufferId),
    U32(u32),
    U64(u64),
}

/// Static device attributes queried once at enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub vendor: String,
    pub platform_id: u32,
    pub global_mem_size: u64,
    pub max_work_group_size: usize,
    /// NVIDIA compute capability (major, minor), `None` for other vendors
    pub compute_capability: Option<(u32, u32)>,
}

impl DeviceInfo {
    /// `major * 10 + minor`, 0 when unknown
    pub fn compute_code(&self) -> u32 {
        self.compute_capability
            .map(|(major, minor)| major * 10 + minor)
            .unwrap_or(0)
    }

    /// Platform-specific compiler options
    pub fn build_options(&self) -> String {
        match self.compute_capability {
            Some(_) => {
                let max_regs = if self.compute_code() >= 35 { 72 } else { 63 };
                format!("-cl-nv-maxrregcount={}", max_regs)
            }
            None => String::new(),
        }
    }

    pub fn memory_gb(&self) -> f64 {
        self.global_mem_size as f64 / (1024.0 * 1024.0 * 1024.0)
    }
}

/// Device-side interrupt, callable from any thread
pub trait DeviceKick: Send + Sync {
    /// Ask a running search kernel to exit early
    fn kick(&self);
}

/// Hardware compute API bound to one device
pub trait ComputeBackend: Send {
    fn device_info(&self) -> &DeviceInfo;

    /// Create the context and in-order command queue
    fn open(&mut self) -> Result<(), BackendError>;

    /// Compile `source` and (re)create the named kernels. Arguments bound to
    /// previous kernel objects are discarded.
    fn build_program(
        &mut self,
        source: &str,
        options: &str,
        kernels: &[(KernelKind, &str)],
    ) -> Result<(), BackendError>;

    fn allocate(&mut self, size: usize, access: BufferAccess) -> Result<BufferId, BackendError>;

    fn release(&mut self, buffer: BufferId) -> Result<(), BackendError>;

    fn set_kernel_arg(&mut self, kernel: KernelKind, index: u32, arg: KernelArg) -> Result<(), BackendError>;

    fn enqueue_kernel(&mut self, kernel: KernelKind, global: usize, local: usize) -> Result<(), BackendError>;

    /// Non-blocking writes may complete after return; the data is kept alive
    /// by the backend until the next `finish`
    fn write_buffer(&mut self, buffer: BufferId, blocking: bool, offset: usize, data: &[u8])
    -> Result<(), BackendError>;

    /// Blocking read
    fn read_buffer(&mut self, buffer: BufferId, offset: usize, out: &mut [u8]) -> Result<(), BackendError>;

    /// Wait for every enqueued operation
    fn finish(&mut self) -> Result<(), BackendError>;

    fn kicker(&self) -> Arc<dyn DeviceKick>;
}


// Changelog:
// - v1.0.0 (2025-07-02): ComputeBackend capability extracted from the
//   OpenCL engine so workers are generic over the device API.
