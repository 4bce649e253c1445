// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/config.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file defines the command-line arguments of the ppminer binary and the
// MinerSettings struct that carries runtime tuning into the worker engine.
//
// Tree Location:
// - src/core/config.rs (CLI arguments and runtime settings)
// - Depends on: clap

use clap::Parser;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Proof-of-work algorithm family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmKind {
    Ethash,
    ProgPow,
}

impl AlgorithmKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AlgorithmKind::Ethash => "ethash",
            AlgorithmKind::ProgPow => "progpow",
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlgorithmKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ethash" => Ok(AlgorithmKind::Ethash),
            "progpow" => Ok(AlgorithmKind::ProgPow),
            other => Err(format!("Unsupported algorithm '{}'. Use 'ethash' or 'progpow'", other)),
        }
    }
}

/// How devices schedule their dataset builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DagLoadMode {
    /// Every device builds as soon as it has work
    #[default]
    Parallel,
    /// Devices build one at a time in device-index order
    Sequential,
}

impl FromStr for DagLoadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "parallel" => Ok(DagLoadMode::Parallel),
            "sequential" => Ok(DagLoadMode::Sequential),
            other => Err(format!("Unknown DAG load mode '{}'. Use 'parallel' or 'sequential'", other)),
        }
    }
}

/// Runtime values handed to every worker through the mining context
#[derive(Debug, Clone)]
pub struct MinerSettings {
    pub workgroup_size: usize,
    /// Initial global work size; rounded up to a workgroup multiple per device
    pub initial_global_work_size: usize,
    pub dag_load_mode: DagLoadMode,
    /// Where the generated kernel source is written, `None` disables the dump
    pub kernel_dump_path: Option<PathBuf>,
    pub idle_backoff: Duration,
    pub sequential_poll_interval: Duration,
}

impl MinerSettings {
    pub const DEFAULT_WORKGROUP_SIZE: usize = 256;
    pub const DEFAULT_GLOBAL_WORK_MULTIPLIER: usize = 2048;
    pub const DEFAULT_KERNEL_DUMP: &'static str = "kernel.cl";
}

impl Default for MinerSettings {
    fn default() -> Self {
        Self {
            workgroup_size: Self::DEFAULT_WORKGROUP_SIZE,
            initial_global_work_size: Self::DEFAULT_GLOBAL_WORK_MULTIPLIER * Self::DEFAULT_WORKGROUP_SIZE,
            dag_load_mode: DagLoadMode::Parallel,
            kernel_dump_path: Some(PathBuf::from(Self::DEFAULT_KERNEL_DUMP)),
            idle_backoff: Duration::from_secs(3),
            sequential_poll_interval: Duration::from_secs(1),
        }
    }
}

/// Command-line arguments for the ProgPoW/Ethash GPU miner
#[derive(Parser, Debug)]
#[command(
    name = "ppminer",
    author = "ProgPoW Mining Team",
    version = "1.0.0",
    about = "Multi-device OpenCL miner for Ethash and ProgPoW",
    long_about = "ppminer drives one OpenCL search worker per GPU. Each worker builds the epoch\n\
                  dataset (DAG) on its device, searches its own slice of the nonce space and\n\
                  verifies every GPU hit on the host before handing it to the work source.\n\n\
                  Note: ppminer only links the Ethash light verifier. --algo progpow is accepted\n\
                  by the engine but the binary exits at startup until an external ProgPoW hash\n\
                  oracle is provided.\n\n\
                  Examples:\n\
                    Benchmark Ethash at block 0: ppminer --benchmark 0\n\
                    Mine a work file on GPUs 0 and 2: ppminer --work-file work.json --devices 0,2\n\
                    One-at-a-time DAG loading: ppminer --dag-load-mode sequential --benchmark 1000000"
)]
pub struct Args {
    #[arg(long, default_value = "ethash", value_name = "ALGO", help = "Algorithm to mine: ethash or progpow")]
    pub algo: String,

    #[arg(
        long,
        default_value = "kernels/opencl",
        value_name = "DIR",
        help = "Directory holding ethash.cl, progpow.cl and progpow_period_<seed>.cl"
    )]
    pub kernel_dir: PathBuf,

    #[arg(
        long,
        value_delimiter = ',',
        value_name = "LIST",
        help = "Comma-separated device indices to mine on (default: all GPUs)"
    )]
    pub devices: Vec<usize>,

    #[arg(long, default_value = "256", value_name = "THREADS", help = "OpenCL workgroup (local) size")]
    pub workgroup_size: usize,

    #[arg(
        long,
        default_value = "2048",
        value_name = "N",
        help = "Initial global work size as a multiple of the workgroup size"
    )]
    pub global_work_multiplier: usize,

    #[arg(
        long,
        default_value = "parallel",
        value_name = "MODE",
        help = "DAG build scheduling: parallel or sequential (one device at a time, in index order)"
    )]
    pub dag_load_mode: String,

    #[arg(long, value_name = "FILE", help = "JSON work template to mine")]
    pub work_file: Option<PathBuf>,

    #[arg(long, value_name = "BLOCK", help = "Benchmark against a synthetic package at this block number")]
    pub benchmark: Option<u64>,

    #[arg(long, default_value = "false", help = "Do not write the generated kernel source to kernel.cl")]
    pub no_kernel_dump: bool,

    #[arg(long, default_value = "info", value_name = "LEVEL", help = "Log level: error, warn, info, debug, trace")]
    pub log_level: String,

    #[arg(long, value_name = "FILE", help = "Also write logs to this file")]
    pub log_file: Option<PathBuf>,

    #[arg(long, default_value = "10", value_name = "SECONDS", help = "Seconds between hashrate summaries")]
    pub stats_interval: u64,
}

impl Args {
    /// Validate arguments and return helpful errors
    pub fn validate(&self) -> Result<(), String> {
        self.algorithm()?;
        self.dag_load_mode()?;

        if self.work_file.is_none() && self.benchmark.is_none() {
            return Err("Nothing to mine. Use --work-file FILE or --benchmark BLOCK".to_string());
        }
        if self.work_file.is_some() && self.benchmark.is_some() {
            return Err("--work-file and --benchmark are mutually exclusive".to_string());
        }
        if self.workgroup_size == 0 || !self.workgroup_size.is_power_of_two() {
            return Err(format!("Workgroup size must be a power of two, got {}", self.workgroup_size));
        }
        if self.global_work_multiplier == 0 {
            return Err("Global work multiplier must be greater than 0".to_string());
        }
        if self.stats_interval == 0 {
            return Err("Stats interval must be greater than 0 seconds".to_string());
        }
        if !matches!(
            self.log_level.to_lowercase().as_str(),
            "error" | "warn" | "info" | "debug" | "trace"
        ) {
            return Err(format!("Unknown log level '{}'", self.log_level));
        }

        Ok(())
    }

    pub fn algorithm(&self) -> Result<AlgorithmKind, String> {
        self.algo.parse()
    }

    pub fn dag_load_mode(&self) -> Result<DagLoadMode, String> {
        self.dag_load_mode.parse()
    }

    /// Runtime settings derived from the arguments
    pub fn settings(&self) -> Result<MinerSettings, String> {
        Ok(MinerSettings {
            workgroup_size: self.workgroup_size,
            initial_global_work_size: self.global_work_multiplier * self.workgroup_size,
            dag_load_mode: self.dag_load_mode()?,
            kernel_dump_path: if self.no_kernel_dump {
                None
            } else {
                Some(PathBuf::from(MinerSettings::DEFAULT_KERNEL_DUMP))
            },
            ..MinerSettings::default()
        })
    }
}


// Changelog:
// - v1.0.0 (2025-07-02): ppminer arguments.
//   - Replaced pool/wallet/thread options with device, kernel and DAG options.
//   - Added MinerSettings so the engine never reads CLI types directly.
//   - Help text notes the binary has no built-in ProgPoW oracle.
