// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: tests/common/mod.rs
// Version: 1.0.0
// Developer: Test Implementation
//
// Shared fixtures for the integration tests: a scripted in-memory
// ComputeBackend, a recording hash oracle, a static period kernel generator
// and short-interval miner settings.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use progpow_miner::core::oracle::{HashOracle, LightCache, OracleError};
use progpow_miner::core::types::{H256, HashResult, WorkPackage};
use progpow_miner::core::{DagLoadMode, MinerSettings};
use progpow_miner::miner::dataset::search_args;
use progpow_miner::miner::gpu::backend::{
    BackendError, BufferAccess, BufferId, ComputeBackend, DeviceInfo, DeviceKick, KernelArg, KernelKind,
};
use progpow_miner::miner::kernel_source::{KernelSourceError, PeriodKernelGenerator};

/// Buffers above this size are tracked by size only
const MAX_BACKED_BUFFER: usize = 1 << 20;

pub const ETHASH_SOURCE: &str = "__kernel void ethash_search() {}\n__kernel void ethash_calculate_dag_item() {}\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open,
    Build,
    Allocate { id: BufferId, size: usize },
    Release(BufferId),
    SetArg { kernel: KernelKind, index: u32, arg: KernelArg },
    Enqueue { kernel: KernelKind, global: usize, local: usize },
    Write { id: BufferId, blocking: bool, offset: usize, data: Vec<u8> },
    Read(BufferId),
    Finish,
}

#[derive(Debug, Clone)]
pub struct Build {
    pub source: String,
    pub options: String,
}

/// Shared event log across several mock devices
pub type Timeline = Arc<Mutex<Vec<(&'static str, usize)>>>;

type SearchHook = Box<dyn FnMut(u64) + Send>;

#[derive(Default)]
pub struct MockState {
    pub calls: Vec<Call>,
    pub builds: Vec<Build>,
    pub buffers: HashMap<BufferId, Vec<u8>>,
    pub sizes: HashMap<BufferId, usize>,
    pub args: HashMap<(KernelKind, u32), KernelArg>,
    pub next_id: u64,
    pub search_launches: u64,
    /// Start nonce of every search launch, in order
    pub search_starts: Vec<u64>,
    pub dataset_launches: u64,
    /// launch number (1-based) -> gid reported by that launch
    pub hits: HashMap<u64, u32>,
    pub fail_build: bool,
    pub on_search: Option<SearchHook>,
    pub timeline: Option<(Timeline, usize)>,
}

impl MockState {
    pub fn allocations(&self) -> Vec<BufferId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Allocate { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn releases(&self) -> Vec<BufferId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Release(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn arg(&self, kernel: KernelKind, index: u32) -> Option<KernelArg> {
        self.args.get(&(kernel, index)).copied()
    }

    pub fn buffer_word(&self, id: BufferId, word: usize) -> u32 {
        let data = &self.buffers[&id];
        let at = word * 4;
        u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
    }

    fn record(&self, event: &'static str) {
        if let Some((timeline, index)) = &self.timeline {
            timeline.lock().unwrap().push((event, *index));
        }
    }
}

#[derive(Default)]
pub struct CountingKick {
    pub kicks: AtomicUsize,
}

impl DeviceKick for CountingKick {
    fn kick(&self) {
        self.kicks.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-memory device; clones share state so tests can inspect a backend
/// after it moved into a worker
pub struct MockBackend {
    info: DeviceInfo,
    pub state: Arc<Mutex<MockState>>,
    pub kick: Arc<CountingKick>,
}

impl MockBackend {
    pub fn new(name: &str) -> Self {
        Self::with_memory(name, 8 << 30)
    }

    pub fn with_memory(name: &str, global_mem_size: u64) -> Self {
        Self {
            info: DeviceInfo {
                name: name.to_string(),
                vendor: "Mock".to_string(),
                platform_id: 3,
                global_mem_size,
                max_work_group_size: 1024,
                compute_capability: Some((8, 6)),
            },
            state: Arc::new(Mutex::new(MockState::default())),
            kick: Arc::new(CountingKick::default()),
        }
    }

    pub fn handle(&self) -> Arc<Mutex<MockState>> {
        Arc::clone(&self.state)
    }

    pub fn kicks(&self) -> Arc<CountingKick> {
        Arc::clone(&self.kick)
    }

    /// Report `gid` from search launch number `launch` (1-based)
    pub fn hit_on_launch(self, launch: u64, gid: u32) -> Self {
        self.state.lock().unwrap().hits.insert(launch, gid);
        self
    }

    pub fn failing_build(self) -> Self {
        self.state.lock().unwrap().fail_build = true;
        self
    }

    pub fn on_search(self, hook: impl FnMut(u64) + Send + 'static) -> Self {
        self.state.lock().unwrap().on_search = Some(Box::new(hook));
        self
    }

    pub fn with_timeline(self, timeline: Timeline, index: usize) -> Self {
        self.state.lock().unwrap().timeline = Some((timeline, index));
        self
    }
}

impl ComputeBackend for MockBackend {
    fn device_info(&self) -> &DeviceInfo {
        &self.info
    }

    fn open(&mut self) -> Result<(), BackendError> {
        self.state.lock().unwrap().calls.push(Call::Open);
        Ok(())
    }

    fn build_program(&mut self, source: &str, options: &str, _kernels: &[(KernelKind, &str)]) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Build);
        state.record("build");
        if state.fail_build {
            return Err(BackendError::BuildFailure {
                message: "CL_BUILD_PROGRAM_FAILURE".to_string(),
                log: "error: use of undeclared identifier".to_string(),
            });
        }
        state.args.clear();
        state.builds.push(Build {
            source: source.to_string(),
            options: options.to_string(),
        });
        Ok(())
    }

    fn allocate(&mut self, size: usize, _access: BufferAccess) -> Result<BufferId, BackendError> {
        let mut state = self.state.lock().unwrap();
        let id = BufferId(state.next_id);
        state.next_id += 1;
        if size <= MAX_BACKED_BUFFER {
            state.buffers.insert(id, vec![0u8; size]);
        }
        state.sizes.insert(id, size);
        state.calls.push(Call::Allocate { id, size });
        Ok(id)
    }

    fn release(&mut self, buffer: BufferId) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Release(buffer));
        state.buffers.remove(&buffer);
        state
            .sizes
            .remove(&buffer)
            .map(|_| ())
            .ok_or(BackendError::UnknownBuffer(buffer))
    }

    fn set_kernel_arg(&mut self, kernel: KernelKind, index: u32, arg: KernelArg) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        if let KernelArg::Buffer(id) = arg {
            if !state.sizes.contains_key(&id) {
                return Err(BackendError::UnknownBuffer(id));
            }
        }
        state.calls.push(Call::SetArg { kernel, index, arg });
        state.args.insert((kernel, index), arg);
        Ok(())
    }

    fn enqueue_kernel(&mut self, kernel: KernelKind, global: usize, local: usize) -> Result<(), BackendError> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        if state.builds.is_empty() {
            return Err(BackendError::KernelMissing(kernel));
        }
        state.calls.push(Call::Enqueue { kernel, global, local });

        match kernel {
            KernelKind::DatasetBuild => {
                state.dataset_launches += 1;
                state.record("dag");
                Ok(())
            }
            KernelKind::Search => {
                state.search_launches += 1;
                state.record("search");
                let launch = state.search_launches;
                if let Some(KernelArg::U64(start)) = state.args.get(&(KernelKind::Search, search_args::START_NONCE)) {
                    state.search_starts.push(*start);
                }
                if let Some(gid) = state.hits.get(&launch).copied() {
                    if let Some(KernelArg::Buffer(id)) = state.args.get(&(KernelKind::Search, search_args::RESULTS)) {
                        if let Some(data) = state.buffers.get_mut(id) {
                            data[0..4].copy_from_slice(&1u32.to_le_bytes());
                            data[4..8].copy_from_slice(&gid.to_le_bytes());
                        }
                    }
                }
                if let Some(hook) = state.on_search.as_mut() {
                    hook(launch);
                }
                Ok(())
            }
        }
    }

    fn write_buffer(&mut self, buffer: BufferId, blocking: bool, offset: usize, data: &[u8]) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        if !state.sizes.contains_key(&buffer) {
            return Err(BackendError::UnknownBuffer(buffer));
        }
        if let Some(target) = state.buffers.get_mut(&buffer) {
            target[offset..offset + data.len()].copy_from_slice(data);
        }
        state.calls.push(Call::Write {
            id: buffer,
            blocking,
            offset,
            data: if data.len() <= 64 { data.to_vec() } else { Vec::new() },
        });
        Ok(())
    }

    fn read_buffer(&mut self, buffer: BufferId, offset: usize, out: &mut [u8]) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Read(buffer));
        let data = state.buffers.get(&buffer).ok_or(BackendError::UnknownBuffer(buffer))?;
        out.copy_from_slice(&data[offset..offset + out.len()]);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), BackendError> {
        self.state.lock().unwrap().calls.push(Call::Finish);
        Ok(())
    }

    fn kicker(&self) -> Arc<dyn DeviceKick> {
        Arc::clone(&self.kick) as Arc<dyn DeviceKick>
    }
}

/// Oracle returning a fixed hash value and recording every evaluation
pub struct MockOracle {
    pub value: H256,
    pub mix_hash: H256,
    pub evaluations: Mutex<Vec<(H256, u32, u64)>>,
    pub light_requests: Mutex<Vec<u32>>,
}

impl MockOracle {
    pub fn returning(value: H256) -> Self {
        Self {
            value,
            mix_hash: [0x5a; 32],
            evaluations: Mutex::new(Vec::new()),
            light_requests: Mutex::new(Vec::new()),
        }
    }

    /// Every nonce hashes to zero, always below any boundary
    pub fn accepting() -> Self {
        Self::returning([0u8; 32])
    }

    /// Every nonce hashes to the maximum value, never below a boundary
    pub fn rejecting() -> Self {
        Self::returning([0xff; 32])
    }
}

impl HashOracle for MockOracle {
    fn light_cache(&self, epoch: u32) -> Result<Arc<LightCache>, OracleError> {
        self.light_requests.lock().unwrap().push(epoch);
        Ok(Arc::new(LightCache::new(epoch, vec![epoch as u8; LightCache::NODE_BYTES * 4])))
    }

    fn evaluate(&self, work: &WorkPackage, nonce: u64) -> Result<HashResult, OracleError> {
        self.evaluations.lock().unwrap().push((work.header, work.epoch, nonce));
        Ok(HashResult {
            value: self.value,
            mix_hash: self.mix_hash,
        })
    }
}

/// Period kernels that only name their seed
pub struct TestPeriods;

impl PeriodKernelGenerator for TestPeriods {
    fn period_source(&self, period_seed: u64) -> Result<String, KernelSourceError> {
        Ok(format!("// period {}\n", period_seed))
    }
}

pub fn test_settings(dag_load_mode: DagLoadMode) -> MinerSettings {
    MinerSettings {
        workgroup_size: 256,
        initial_global_work_size: 2048 * 256,
        dag_load_mode,
        kernel_dump_path: None,
        idle_backoff: Duration::from_millis(20),
        sequential_poll_interval: Duration::from_millis(5),
    }
}

/// Poll `condition` every few milliseconds for up to two seconds
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..400 {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

// Changelog:
// - v1.0.0 (2025-07-02): Mock backend and oracle for engine tests.
