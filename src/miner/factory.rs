// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/factory.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// Composes an algorithm variant and a backend into a MinerWorker.
//
// Tree Location:
// - src/miner/factory.rs (variant and worker construction)
// - Depends on: log

use log::info;
use std::sync::Arc;

use crate::core::config::AlgorithmKind;
use crate::core::oracle::HashOracle;
use crate::miner::algorithm::{AlgorithmVariant, Ethash, ProgPow};
use crate::miner::coordination::MiningContext;
use crate::miner::gpu::backend::ComputeBackend;
use crate::miner::kernel_source::{KernelLibrary, KernelSourceError, PeriodKernelGenerator};
use crate::miner::work_source::WorkSource;
use crate::miner::worker::MinerWorker;

const LOG_TARGET: &str = "progpow::miner::factory";

/// Load the base kernel source for `kind` and wrap it in its variant
pub fn build_variant(
    kind: AlgorithmKind,
    library: &KernelLibrary,
    periods: Option<Arc<dyn PeriodKernelGenerator>>,
) -> Result<Arc<dyn AlgorithmVariant>, KernelSourceError> {
    let variant: Arc<dyn AlgorithmVariant> = match kind {
        AlgorithmKind::Ethash => Arc::new(Ethash::new(library.ethash()?)),
        AlgorithmKind::ProgPow => {
            if periods.is_none() {
                return Err(KernelSourceError::MissingPeriodGenerator);
            }
            Arc::new(ProgPow::new(library.progpow()?, periods))
        }
    };
    info!(target: LOG_TARGET, "Loaded {} kernels from {:?}", kind, library.dir());
    Ok(variant)
}

/// Build a worker and count it against its variant's instance counter
pub fn create_worker<B: ComputeBackend>(
    index: usize,
    backend: B,
    variant: Arc<dyn AlgorithmVariant>,
    oracle: Arc<dyn HashOracle>,
    work_source: Arc<dyn WorkSource>,
    context: Arc<MiningContext>,
) -> MinerWorker<B> {
    let instance = context.register_instance(variant.kind());
    info!(target: LOG_TARGET,
        "cl-{} {} worker #{} on {}",
        index,
        variant.kind(),
        instance,
        backend.device_info().name
    );
    MinerWorker::new(index, backend, variant, oracle, work_source, context)
}

// Changelog:
// - v1.0.0 (2025-07-02): Variant/backend composition.
