// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/kernel_source.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file produces the OpenCL text that gets compiled per (epoch, period):
// base kernel sources loaded from the kernel directory, ProgPoW period
// kernels from a generator, and the `#define NAME VALUE` block prepended
// before every build. The generated text can be dumped for inspection.
//
// Tree Location:
// - src/miner/kernel_source.rs (kernel text and definitions)
// - Depends on: thiserror

use log::{debug, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const LOG_TARGET: &str = "progpow::miner::kernel_source";

#[derive(Error, Debug)]
pub enum KernelSourceError {
    #[error("Kernel source {path:?} could not be read")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No period kernel generator configured for ProgPoW")]
    MissingPeriodGenerator,

    #[error("Period kernel for seed {seed} unavailable: {message}")]
    PeriodUnavailable { seed: u64, message: String },
}

/// Named numeric constants substituted into kernel source.
///
/// Each name maps to exactly one value; setting a name twice keeps the last
/// value. Rendering is sorted by name so the output does not depend on the
/// order definitions were added in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KernelDefinitions {
    values: BTreeMap<String, u64>,
}

impl KernelDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: u64) -> &mut Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `#define` block followed by `body`
    pub fn render(&self, body: &str) -> String {
        let mut code = String::with_capacity(body.len() + self.values.len() * 32);
        for (name, value) in &self.values {
            code.push_str(&format!("#define {} {}\n", name, value));
        }
        code.push_str(body);
        code
    }
}

/// Best-effort write of the generated kernel; failures are only logged
pub fn dump_kernel(path: &Path, code: &str) {
    match fs::write(path, code) {
        Ok(()) => debug!(target: LOG_TARGET, "Kernel source written to {:?}", path),
        Err(e) => warn!(target: LOG_TARGET, "Could not write kernel source to {:?}: {}", path, e),
    }
}

/// Base OpenCL sources shipped in the kernel directory
#[derive(Debug, Clone)]
pub struct KernelLibrary {
    dir: PathBuf,
}

impl KernelLibrary {
    pub const ETHASH_FILE: &'static str = "ethash.cl";
    pub const PROGPOW_FILE: &'static str = "progpow.cl";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load(&self, file: &str) -> Result<String, KernelSourceError> {
        let path = self.dir.join(file);
        fs::read_to_string(&path).map_err(|source| KernelSourceError::Io { path, source })
    }

    pub fn ethash(&self) -> Result<String, KernelSourceError> {
        self.load(Self::ETHASH_FILE)
    }

    pub fn progpow(&self) -> Result<String, KernelSourceError> {
        self.load(Self::PROGPOW_FILE)
    }
}

/// Supplier of the period-specific ProgPoW kernel prefix
pub trait PeriodKernelGenerator: Send + Sync {
    fn period_source(&self, period_seed: u64) -> Result<String, KernelSourceError>;
}

/// Reads pre-generated `progpow_period_<seed>.cl` files
#[derive(Debug, Clone)]
pub struct FilePeriodKernels {
    dir: PathBuf,
}

impl FilePeriodKernels {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn file_name(period_seed: u64) -> String {
        format!("progpow_period_{}.cl", period_seed)
    }
}

impl PeriodKernelGenerator for FilePeriodKernels {
    fn period_source(&self, period_seed: u64) -> Result<String, KernelSourceError> {
        let path = self.dir.join(Self::file_name(period_seed));
        fs::read_to_string(&path).map_err(|e| KernelSourceError::PeriodUnavailable {
            seed: period_seed,
            message: format!("{:?}: {}", path, e),
        })
    }
}


// Changelog:
// - v1.0.0 (2025-07-02): Kernel definitions, kernel library and period
//   kernel files. Replaces the embedded sha3x.cl include.
