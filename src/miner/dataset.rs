// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/dataset.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file owns the device-resident dataset of one worker: it decides when an
// epoch or period transition needs kernel or DAG work, compiles the kernels
// with their per-epoch definitions, allocates the light cache, DAG, header and
// result buffers, and generates the DAG chunk by chunk.
//
// Tree Location:
// - src/miner/dataset.rs (DAG lifecycle and kernel builds)
// - Depends on: log

use log::{debug, info, warn};
use std::time::Instant;

use crate::core::config::DagLoadMode;
use crate::core::oracle::HashOracle;
use crate::core::types::WorkPackage;
use crate::miner::algorithm::AlgorithmVariant;
use crate::miner::coordination::{MiningContext, StopSignal};
use crate::miner::error::MinerError;
use crate::miner::gpu::backend::{BackendError, BufferAccess, BufferId, ComputeBackend, KernelArg, KernelKind};
use crate::miner::kernel_source::{self, KernelDefinitions};
use crate::utils::format::FormatUtils;

const LOG_TARGET: &str = "progpow::miner::dataset";

/// Maximum hits one search launch can report
pub const MAX_OUTPUTS: u32 = 1;

/// Result buffer words: `[count, gid[MAX_OUTPUTS], abort]`
pub const SEARCH_BUFFER_WORDS: usize = MAX_OUTPUTS as usize + 2;
pub const SEARCH_BUFFER_BYTES: usize = SEARCH_BUFFER_WORDS * 4;

/// Byte offset of the abort word in the result buffer
pub const ABORT_WORD_OFFSET: usize = (MAX_OUTPUTS as usize + 1) * 4;

pub const HEADER_BYTES: usize = 32;

/// Bytes per DAG node produced by one dataset-build work item
pub const DAG_NODE_BYTES: u64 = 64;

/// Search kernel argument positions
pub mod search_args {
    pub const RESULTS: u32 = 0;
    pub const HEADER: u32 = 1;
    pub const DATASET: u32 = 2;
    pub const START_NONCE: u32 = 3;
    pub const TARGET: u32 = 4;
    pub const ISOLATE: u32 = 5;
}

/// Dataset-build kernel argument positions
pub mod dag_args {
    pub const START: u32 = 0;
    pub const LIGHT: u32 = 1;
    pub const DATASET: u32 = 2;
    pub const ISOLATE: u32 = 3;
}

/// Launch geometry; `global_work_size` is always a multiple of `workgroup_size`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchParams {
    pub workgroup_size: usize,
    pub global_work_size: usize,
}

impl DispatchParams {
    /// Round the initial global size up to the next workgroup multiple
    pub fn new(workgroup_size: usize, initial_global_work_size: usize) -> Self {
        let workgroup_size = workgroup_size.max(1);
        let global_work_size = initial_global_work_size.max(1).div_ceil(workgroup_size) * workgroup_size;
        Self {
            workgroup_size,
            global_work_size,
        }
    }
}

/// What a package needs done to the device before searching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub new_epoch: bool,
    pub new_period: bool,
}

/// Dataset identity currently loaded on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BoundDataset {
    epoch: u32,
    period_seed: Option<u64>,
}

/// Buffers owned by one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceBuffers {
    pub light: BufferId,
    pub dataset: BufferId,
    pub header: BufferId,
    pub search: BufferId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareOutcome {
    Ready,
    /// Stopped while waiting for a build slot or while generating the DAG
    Cancelled,
}

/// Has the package changed in a way the search must react to?
pub fn work_changed(variant: &dyn AlgorithmVariant, previous: &WorkPackage, next: &WorkPackage) -> bool {
    previous.header != next.header
        || previous.epoch != next.epoch
        || variant.period_seed(previous.block_number) != variant.period_seed(next.block_number)
}

pub struct DatasetManager {
    device_index: usize,
    dispatch: DispatchParams,
    buffers: Option<DeviceBuffers>,
    bound: Option<BoundDataset>,
}

impl DatasetManager {
    pub fn new(device_index: usize, dispatch: DispatchParams) -> Self {
        Self {
            device_index,
            dispatch,
            buffers: None,
            bound: None,
        }
    }

    pub fn dispatch(&self) -> DispatchParams {
        self.dispatch
    }

    pub fn buffers(&self) -> Option<DeviceBuffers> {
        self.buffers
    }

    pub fn loaded_epoch(&self) -> Option<u32> {
        self.bound.map(|b| b.epoch)
    }

    /// Dataset work required for `work`, `None` when the loaded dataset and
    /// kernels already match. Fixed-kernel variants tie the period to the epoch.
    pub fn transition_for(&self, variant: &dyn AlgorithmVariant, work: &WorkPackage) -> Option<Transition> {
        let period_seed = variant.period_seed(work.block_number);
        let (new_epoch, new_period) = match self.bound {
            None => (true, true),
            Some(bound) => {
                let new_epoch = bound.epoch != work.epoch;
                let new_period = match period_seed {
                    Some(_) => bound.period_seed != period_seed,
                    None => new_epoch,
                };
                (new_epoch, new_period)
            }
        };
        if new_epoch || new_period {
            Some(Transition { new_epoch, new_period })
        } else {
            None
        }
    }

    /// Bring kernels and dataset in line with `work`
    #[allow(clippy::too_many_arguments)]
    pub fn prepare<B: ComputeBackend>(
        &mut self,
        backend: &mut B,
        variant: &dyn AlgorithmVariant,
        oracle: &dyn HashOracle,
        context: &MiningContext,
        stop: &StopSignal,
        work: &WorkPackage,
        transition: Transition,
    ) -> Result<PrepareOutcome, MinerError> {
        // the slot is released when this guard drops, on success or failure
        let _slot = match context.settings().dag_load_mode {
            DagLoadMode::Sequential => match context.sequential().wait_for_turn(self.device_index, stop) {
                Some(slot) => Some(slot),
                None => return Ok(PrepareOutcome::Cancelled),
            },
            DagLoadMode::Parallel => None,
        };

        let period_seed = variant.period_seed(work.block_number);
        info!(target: LOG_TARGET,
            "cl-{} New epoch {} / period {}",
            self.device_index,
            work.epoch,
            period_seed.map_or_else(|| "-".to_string(), |p| p.to_string())
        );

        let light = oracle.light_cache(work.epoch)?;
        let dataset_bytes = variant.dataset_bytes(work.epoch);

        self.build_kernels(backend, variant, context, work, dataset_bytes, light.node_count() as u64)?;

        let device = backend.device_info().clone();
        if device.global_mem_size < dataset_bytes {
            warn!(target: LOG_TARGET,
                "cl-{} OpenCL device {} has insufficient GPU memory. {} bytes of memory found < {} bytes of memory required",
                self.device_index, device.name, device.global_mem_size, dataset_bytes
            );
            return Err(MinerError::InsufficientDeviceMemory {
                device: device.name,
                available: device.global_mem_size,
                required: dataset_bytes,
            });
        }

        if let (false, Some(buffers)) = (transition.new_epoch, self.buffers) {
            // period change only: same DAG, fresh kernels need their arguments again
            self.bind_search_buffers(backend, &buffers)?;
            backend.write_buffer(buffers.search, true, 0, &[0u8; SEARCH_BUFFER_BYTES])?;
            self.bound = Some(BoundDataset {
                epoch: work.epoch,
                period_seed,
            });
            debug!(target: LOG_TARGET, "cl-{} period kernels rebuilt, DAG reused", self.device_index);
            return Ok(PrepareOutcome::Ready);
        }

        // the old dataset is invalid from here until generation completes
        self.bound = None;
        self.release_buffers(backend)?;

        info!(target: LOG_TARGET, "cl-{} Creating light cache buffer, size {}", self.device_index, light.len());
        let light_buffer = backend.allocate(light.len(), BufferAccess::ReadOnly)?;
        info!(target: LOG_TARGET, "cl-{} Creating DAG buffer, size {}", self.device_index, dataset_bytes);
        let dataset_buffer = backend.allocate(dataset_bytes as usize, BufferAccess::ReadWrite)?;
        debug!(target: LOG_TARGET, "cl-{} Creating buffer for header", self.device_index);
        let header_buffer = backend.allocate(HEADER_BYTES, BufferAccess::ReadOnly)?;
        debug!(target: LOG_TARGET, "cl-{} Creating mining buffer", self.device_index);
        let search_buffer = backend.allocate(SEARCH_BUFFER_BYTES, BufferAccess::ReadWrite)?;

        let buffers = DeviceBuffers {
            light: light_buffer,
            dataset: dataset_buffer,
            header: header_buffer,
            search: search_buffer,
        };
        self.buffers = Some(buffers);

        debug!(target: LOG_TARGET, "cl-{} Writing light cache buffer", self.device_index);
        backend.write_buffer(buffers.light, true, 0, &light.data)?;
        backend.write_buffer(buffers.search, true, 0, &[0u8; SEARCH_BUFFER_BYTES])?;
        self.bind_search_buffers(backend, &buffers)?;

        if !self.generate_dataset(backend, &buffers, dataset_bytes, stop)? {
            return Ok(PrepareOutcome::Cancelled);
        }

        self.bound = Some(BoundDataset {
            epoch: work.epoch,
            period_seed,
        });
        Ok(PrepareOutcome::Ready)
    }

    fn build_kernels<B: ComputeBackend>(
        &self,
        backend: &mut B,
        variant: &dyn AlgorithmVariant,
        context: &MiningContext,
        work: &WorkPackage,
        dataset_bytes: u64,
        light_words: u64,
    ) -> Result<(), MinerError> {
        let device = backend.device_info().clone();

        let mut definitions = KernelDefinitions::new();
        definitions
            .set("GROUP_SIZE", self.dispatch.workgroup_size as u64)
            .set(variant.dataset_bytes_definition(), dataset_bytes)
            .set(variant.dataset_elements_definition(), variant.dataset_elements(dataset_bytes))
            .set("LIGHT_WORDS", light_words)
            .set("MAX_OUTPUTS", MAX_OUTPUTS as u64)
            .set("PLATFORM", device.platform_id as u64)
            .set("COMPUTE", device.compute_code() as u64);
        for (name, value) in variant.extra_definitions() {
            definitions.set(name, value);
        }

        let code = definitions.render(&variant.kernel_source(work.block_number)?);
        if let Some(path) = &context.settings().kernel_dump_path {
            kernel_source::dump_kernel(path, &code);
        }

        let options = device.build_options();
        let kernels = [
            (KernelKind::Search, variant.search_kernel_name()),
            (KernelKind::DatasetBuild, variant.dataset_kernel_name()),
        ];
        match backend.build_program(&code, &options, &kernels) {
            Ok(()) => {
                info!(target: LOG_TARGET, "cl-{} {} kernels built for {}", self.device_index, variant.kind(), device.name);
                Ok(())
            }
            Err(BackendError::BuildFailure { message, log }) => {
                warn!(target: LOG_TARGET, "cl-{} Build info: {}", self.device_index, log);
                Err(MinerError::BuildFailure {
                    device: device.name,
                    message,
                    log,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn bind_search_buffers<B: ComputeBackend>(&self, backend: &mut B, buffers: &DeviceBuffers) -> Result<(), BackendError> {
        backend.set_kernel_arg(KernelKind::Search, search_args::HEADER, KernelArg::Buffer(buffers.header))?;
        backend.set_kernel_arg(KernelKind::Search, search_args::DATASET, KernelArg::Buffer(buffers.dataset))?;
        backend.set_kernel_arg(KernelKind::Search, search_args::ISOLATE, KernelArg::U32(0))
    }

    fn release_buffers<B: ComputeBackend>(&mut self, backend: &mut B) -> Result<(), BackendError> {
        if let Some(old) = self.buffers.take() {
            for buffer in [old.light, old.dataset, old.header, old.search] {
                backend.release(buffer)?;
            }
        }
        Ok(())
    }

    /// Run the dataset-build kernel over every DAG node, one chunk of the
    /// global work size at a time. Returns false when stopped midway.
    fn generate_dataset<B: ComputeBackend>(
        &self,
        backend: &mut B,
        buffers: &DeviceBuffers,
        dataset_bytes: u64,
        stop: &StopSignal,
    ) -> Result<bool, BackendError> {
        let global = self.dispatch.global_work_size;
        let work_items = dataset_bytes / DAG_NODE_BYTES;
        let runs = work_items.div_ceil(global as u64);

        backend.set_kernel_arg(KernelKind::DatasetBuild, dag_args::LIGHT, KernelArg::Buffer(buffers.light))?;
        backend.set_kernel_arg(KernelKind::DatasetBuild, dag_args::DATASET, KernelArg::Buffer(buffers.dataset))?;
        backend.set_kernel_arg(KernelKind::DatasetBuild, dag_args::ISOLATE, KernelArg::U32(!0u32))?;

        let start = Instant::now();
        for run in 0..runs {
            if stop.is_stopped() {
                info!(target: LOG_TARGET, "cl-{} DAG generation cancelled after {}/{} chunks", self.device_index, run, runs);
                return Ok(false);
            }
            let offset = (run * global as u64) as u32;
            backend.set_kernel_arg(KernelKind::DatasetBuild, dag_args::START, KernelArg::U32(offset))?;
            backend.enqueue_kernel(KernelKind::DatasetBuild, global, self.dispatch.workgroup_size)?;
            backend.finish()?;
        }

        info!(target: LOG_TARGET,
            "cl-{} {} of DAG data generated in {}ms",
            self.device_index,
            FormatUtils::format_gb(dataset_bytes),
            start.elapsed().as_millis()
        );
        Ok(true)
    }
}


// Changelog:
// - v1.0.0 (2025-07-02): Dataset manager.
//   - Epoch/period transition detection, period-only rebuild keeps buffers.
//   - Kernel definitions rendered per build, optional kernel dump.
//   - Chunked DAG generation with a finish after every chunk.
