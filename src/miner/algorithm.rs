// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/algorithm.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// Algorithm variants injected into the generic worker. A variant knows its
// kernel source, its dataset sizing and the definitions its kernels expect;
// the worker and dataset manager never branch on the algorithm themselves.
//
// Tree Location:
// - src/miner/algorithm.rs (Ethash and ProgPoW variants)
// - Used by: src/miner/dataset.rs, src/miner/factory.rs

use std::sync::Arc;

use crate::core::config::AlgorithmKind;
use crate::core::epoch::{self, PROGPOW_DAG_LOADS, PROGPOW_LANES, WORD_BYTES};
use crate::miner::kernel_source::{KernelSourceError, PeriodKernelGenerator};

pub const SEARCH_KERNEL: &str = "ethash_search";
pub const DATASET_KERNEL: &str = "ethash_calculate_dag_item";

/// Kernel source generator and dataset sizing for one algorithm
pub trait AlgorithmVariant: Send + Sync {
    fn kind(&self) -> AlgorithmKind;

    /// Period seed for variable-kernel algorithms, `None` for fixed kernels
    fn period_seed(&self, block_number: u64) -> Option<u64>;

    fn dataset_bytes(&self, epoch: u32) -> u64 {
        epoch::dataset_size(epoch)
    }

    /// Element count the search kernel indexes the dataset by
    fn dataset_elements(&self, dataset_bytes: u64) -> u64;

    fn dataset_bytes_definition(&self) -> &'static str;

    fn dataset_elements_definition(&self) -> &'static str;

    /// Algorithm-specific constants beyond the common set
    fn extra_definitions(&self) -> Vec<(&'static str, u64)> {
        Vec::new()
    }

    /// Kernel text (without definitions) for the block's period
    fn kernel_source(&self, block_number: u64) -> Result<String, KernelSourceError>;

    fn search_kernel_name(&self) -> &'static str {
        SEARCH_KERNEL
    }

    fn dataset_kernel_name(&self) -> &'static str {
        DATASET_KERNEL
    }
}

/// Fixed-kernel Ethash
pub struct Ethash {
    source: Arc<String>,
}

impl Ethash {
    pub const ACCESSES: u64 = 64;
    pub const THREADS_PER_HASH: u64 = 8;

    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: Arc::new(source.into()),
        }
    }
}

impl AlgorithmVariant for Ethash {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::Ethash
    }

    fn period_seed(&self, _block_number: u64) -> Option<u64> {
        None
    }

    fn dataset_elements(&self, dataset_bytes: u64) -> u64 {
        dataset_bytes / epoch::MIX_BYTES
    }

    fn dataset_bytes_definition(&self) -> &'static str {
        "DAG_BYTES"
    }

    fn dataset_elements_definition(&self) -> &'static str {
        "DAG_SIZE"
    }

    fn extra_definitions(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("ACCESSES", Self::ACCESSES),
            ("THREADS_PER_HASH", Self::THREADS_PER_HASH),
        ]
    }

    fn kernel_source(&self, _block_number: u64) -> Result<String, KernelSourceError> {
        Ok(self.source.as_ref().clone())
    }
}

/// ProgPoW: period kernel prefix + base source, regenerated every period
pub struct ProgPow {
    source: Arc<String>,
    periods: Option<Arc<dyn PeriodKernelGenerator>>,
}

impl ProgPow {
    /// Bytes per dataset element: lanes x DAG loads x 32-bit words
    pub const ELEMENT_BYTES: u64 = PROGPOW_LANES * PROGPOW_DAG_LOADS * WORD_BYTES;

    pub fn new(source: impl Into<String>, periods: Option<Arc<dyn PeriodKernelGenerator>>) -> Self {
        Self {
            source: Arc::new(source.into()),
            periods,
        }
    }
}

impl AlgorithmVariant for ProgPow {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::ProgPow
    }

    fn period_seed(&self, block_number: u64) -> Option<u64> {
        Some(epoch::period_seed(block_number))
    }

    fn dataset_elements(&self, dataset_bytes: u64) -> u64 {
        dataset_bytes / Self::ELEMENT_BYTES
    }

    fn dataset_bytes_definition(&self) -> &'static str {
        "PROGPOW_DAG_BYTES"
    }

    fn dataset_elements_definition(&self) -> &'static str {
        "PROGPOW_DAG_ELEMENTS"
    }

    fn kernel_source(&self, block_number: u64) -> Result<String, KernelSourceError> {
        let periods = self.periods.as_ref().ok_or(KernelSourceError::MissingPeriodGenerator)?;
        let mut code = periods.period_source(epoch::period_seed(block_number))?;
        code.push_str(&self.source);
        Ok(code)
    }
}


// Changelog:
// - v1.0.0 (2025-07-02): Ethash and ProgPoW variants.
