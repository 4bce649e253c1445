// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/worker.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file implements MinerWorker, the per-device search loop. Each worker
// owns one backend, polls the work source, keeps the dataset in line with the
// current package and runs a two-stage pipeline: while launch N runs on the
// GPU, the host interprets the result of launch N-1 and verifies any hit.
//
// Tree Location:
// - src/miner/worker.rs (per-device work loop)
// - Depends on: log

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::core::oracle::HashOracle;
use crate::core::types::WorkPackage;
use crate::miner::algorithm::AlgorithmVariant;
use crate::miner::coordination::{MiningContext, StopSignal};
use crate::miner::dataset::{
    self, DatasetManager, DispatchParams, PrepareOutcome, SEARCH_BUFFER_BYTES, search_args,
};
use crate::miner::error::MinerError;
use crate::miner::gpu::backend::{BackendError, BufferId, ComputeBackend, DeviceKick, KernelArg, KernelKind};
use crate::miner::nonce;
use crate::miner::stats::DeviceStats;
use crate::miner::verifier::{SolutionVerifier, Verdict};
use crate::miner::work_source::WorkSource;

const LOG_TARGET: &str = "progpow::miner::worker";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    AwaitingDevice = 0,
    Idle = 1,
    DatasetReady = 2,
    Searching = 3,
    ReportingSolution = 4,
    Stopped = 5,
    Aborted = 6,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::AwaitingDevice,
            1 => WorkerState::Idle,
            2 => WorkerState::DatasetReady,
            3 => WorkerState::Searching,
            4 => WorkerState::ReportingSolution,
            5 => WorkerState::Stopped,
            _ => WorkerState::Aborted,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Stopped | WorkerState::Aborted)
    }
}

/// Worker state readable from other threads
#[derive(Clone)]
pub struct WorkerStatus(Arc<AtomicU8>);

impl WorkerStatus {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(WorkerState::AwaitingDevice as u8)))
    }

    pub fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }
}

/// A search launch whose result has not been read yet
#[derive(Debug, Clone)]
struct Launch {
    work: Arc<WorkPackage>,
    start_nonce: u64,
}

/// Dispatch stage N, interpret stage N-1
#[derive(Debug, Default)]
struct SearchPipeline {
    in_flight: Option<Launch>,
}

impl SearchPipeline {
    /// Forget the pending launch; its result counter has been cleared
    fn discard(&mut self) {
        self.in_flight = None;
    }

    fn launched(&mut self, launch: Launch) {
        self.in_flight = Some(launch);
    }

    /// Read the previous launch's result. A reported gid is relative to that
    /// launch's start nonce; only the first output is used.
    fn collect<B: ComputeBackend>(
        &self,
        backend: &mut B,
        search_buffer: BufferId,
    ) -> Result<Option<(Arc<WorkPackage>, u64)>, BackendError> {
        let Some(launch) = &self.in_flight else {
            return Ok(None);
        };

        let mut raw = [0u8; SEARCH_BUFFER_BYTES];
        backend.read_buffer(search_buffer, 0, &mut raw)?;
        let count = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        if count == 0 {
            return Ok(None);
        }

        let gid = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
        backend.write_buffer(search_buffer, false, 0, &0u32.to_le_bytes())?;
        Ok(Some((Arc::clone(&launch.work), launch.start_nonce.wrapping_add(gid as u64))))
    }
}

/// Per-device search engine, generic over the compute backend
pub struct MinerWorker<B: ComputeBackend> {
    index: usize,
    backend: B,
    variant: Arc<dyn AlgorithmVariant>,
    oracle: Arc<dyn HashOracle>,
    work_source: Arc<dyn WorkSource>,
    context: Arc<MiningContext>,
    stop: StopSignal,
    stats: Arc<DeviceStats>,
    status: WorkerStatus,
    dataset: DatasetManager,
    verifier: SolutionVerifier,
}

impl<B: ComputeBackend> MinerWorker<B> {
    pub fn new(
        index: usize,
        backend: B,
        variant: Arc<dyn AlgorithmVariant>,
        oracle: Arc<dyn HashOracle>,
        work_source: Arc<dyn WorkSource>,
        context: Arc<MiningContext>,
    ) -> Self {
        let settings = context.settings();
        let dispatch = DispatchParams::new(settings.workgroup_size, settings.initial_global_work_size);
        if dispatch.global_work_size != settings.initial_global_work_size {
            debug!(target: LOG_TARGET,
                "cl-{} global work size rounded up from {} to {}",
                index, settings.initial_global_work_size, dispatch.global_work_size
            );
        }
        let stats = Arc::new(DeviceStats::new(index, backend.device_info().name.clone()));
        Self {
            index,
            backend,
            verifier: SolutionVerifier::new(Arc::clone(&oracle), index),
            variant,
            oracle,
            work_source,
            context,
            stop: StopSignal::new(),
            stats,
            status: WorkerStatus::new(),
            dataset: DatasetManager::new(index, dispatch),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn device_name(&self) -> &str {
        &self.backend.device_info().name
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn kicker(&self) -> Arc<dyn DeviceKick> {
        self.backend.kicker()
    }

    pub fn stats(&self) -> Arc<DeviceStats> {
        Arc::clone(&self.stats)
    }

    pub fn status(&self) -> WorkerStatus {
        self.status.clone()
    }

    pub fn dispatch(&self) -> DispatchParams {
        self.dataset.dispatch()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run until stopped or until an unrecoverable error
    pub fn run(&mut self) -> Result<(), MinerError> {
        self.status.set(WorkerState::AwaitingDevice);
        let result = self.open().and_then(|_| self.work_loop());
        match &result {
            Ok(()) => {
                self.status.set(WorkerState::Stopped);
                info!(target: LOG_TARGET, "cl-{} stopped", self.index);
            }
            Err(e) => {
                self.status.set(WorkerState::Aborted);
                if e.disables_device() {
                    error!(target: LOG_TARGET, "cl-{} disabled: {}", self.index, e);
                } else {
                    error!(target: LOG_TARGET, "cl-{} aborted: {}", self.index, e);
                }
            }
        }
        result
    }

    fn open(&mut self) -> Result<(), MinerError> {
        self.backend.open()?;
        let info = self.backend.device_info();
        info!(target: LOG_TARGET,
            "cl-{} Using device: {} ({}, {:.1} GB)",
            self.index,
            info.name,
            info.vendor,
            info.memory_gb()
        );
        Ok(())
    }

    fn search_buffer(&self) -> Result<BufferId, BackendError> {
        self.dataset
            .buffers()
            .map(|b| b.search)
            .ok_or_else(|| BackendError::runtime("search", "device buffers not allocated"))
    }

    fn work_loop(&mut self) -> Result<(), MinerError> {
        let mut pipeline = SearchPipeline::default();
        let mut current: Option<Arc<WorkPackage>> = None;
        let mut next_start: u64 = 0;
        let global = self.dataset.dispatch().global_work_size;
        let local = self.dataset.dispatch().workgroup_size;

        while !self.stop.is_stopped() {
            let Some(work) = self.work_source.current_work() else {
                self.status.set(WorkerState::Idle);
                info!(target: LOG_TARGET, "cl-{} No work. Pause for 3 s.", self.index);
                self.stop.wait_timeout(self.context.settings().idle_backoff);
                continue;
            };

            let changed = current
                .as_ref()
                .is_none_or(|previous| dataset::work_changed(self.variant.as_ref(), previous, &work));

            if changed {
                debug!(target: LOG_TARGET,
                    "cl-{} New work: header={}.. target={:064x}",
                    self.index,
                    work.header_prefix(),
                    work.boundary
                );

                if let Some(transition) = self.dataset.transition_for(self.variant.as_ref(), &work) {
                    let outcome = self.dataset.prepare(
                        &mut self.backend,
                        self.variant.as_ref(),
                        self.oracle.as_ref(),
                        &self.context,
                        &self.stop,
                        &work,
                        transition,
                    )?;
                    if outcome == PrepareOutcome::Cancelled {
                        break;
                    }
                }
                self.status.set(WorkerState::DatasetReady);

                let buffers = self
                    .dataset
                    .buffers()
                    .ok_or_else(|| BackendError::runtime("search", "device buffers not allocated"))?;
                let target = work.gpu_target();
                self.backend.write_buffer(buffers.header, false, 0, &work.header)?;
                self.backend.write_buffer(buffers.search, false, 0, &0u32.to_le_bytes())?;
                self.backend
                    .set_kernel_arg(KernelKind::Search, search_args::RESULTS, KernelArg::Buffer(buffers.search))?;
                self.backend
                    .set_kernel_arg(KernelKind::Search, search_args::TARGET, KernelArg::U64(target))?;

                let scrambler = self.work_source.nonce_scrambler();
                next_start = nonce::device_start_nonce(&work, self.index, scrambler)?;
                pipeline.discard();

                if let Some(elapsed) = self.context.work_switch_elapsed() {
                    debug!(target: LOG_TARGET, "cl-{} Switch time {}ms.", self.index, elapsed.as_millis());
                }
            }

            let search_buffer = self.search_buffer()?;
            let hit = pipeline.collect(&mut self.backend, search_buffer)?;

            self.backend
                .set_kernel_arg(KernelKind::Search, search_args::START_NONCE, KernelArg::U64(next_start))?;
            self.backend.enqueue_kernel(KernelKind::Search, global, local)?;
            self.status.set(WorkerState::Searching);

            // verified on the CPU while the launch above runs
            if let Some((hit_work, nonce)) = hit {
                self.report(&hit_work, nonce);
            }

            pipeline.launched(Launch {
                work: Arc::clone(&work),
                start_nonce: next_start,
            });
            current = Some(work);
            next_start = next_start.wrapping_add(global as u64);
            self.stats.record_hashes(global as u64);

            // pending non-blocking writes reference host memory
            self.backend.finish()?;
        }

        self.backend.finish()?;
        Ok(())
    }

    fn report(&mut self, work: &Arc<WorkPackage>, nonce: u64) {
        self.status.set(WorkerState::ReportingSolution);
        match self.verifier.verify(work, nonce) {
            Verdict::Accepted(solution) => {
                info!(target: LOG_TARGET,
                    "cl-{} 🎉 Solution found: job {} nonce {:#018x}",
                    self.index, work.job_id, nonce
                );
                self.stats.record_solution();
                self.work_source.submit(solution);
            }
            Verdict::Rejected { nonce, value } => {
                warn!(target: LOG_TARGET,
                    "cl-{} FAILURE: GPU gave incorrect result! nonce {:#018x} hash {}",
                    self.index,
                    nonce,
                    hex::encode(value)
                );
                self.stats.record_false_positive();
            }
            Verdict::Failed { .. } => {
                self.stats.record_false_positive();
            }
        }
        self.status.set(WorkerState::Searching);
    }
}

// Changelog:
// - v1.0.0 (2025-07-02): Generic per-device worker loop.
//   - Replaces the async per-GPU mining loop with a blocking thread loop
//     driving a ComputeBackend.
//   - Explicit two-stage search pipeline and shared worker state.
