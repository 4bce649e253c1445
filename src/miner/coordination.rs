// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/coordination.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file holds the state shared by all workers of one farm: the mining
// context (settings, nonce scrambler, instance counters, work-switch clock),
// the sequential DAG load barrier and the stop signal each worker observes.
//
// Tree Location:
// - src/miner/coordination.rs (cross-worker coordination)
// - Depends on: rand

use log::{debug, info};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::core::config::{AlgorithmKind, MinerSettings};

const LOG_TARGET: &str = "progpow::miner::coordination";

struct StopInner {
    stopped: AtomicBool,
    lock: Mutex<()>,
    condvar: Condvar,
}

/// Cooperative stop flag whose waits return as soon as it is raised
#[derive(Clone)]
pub struct StopSignal {
    inner: Arc<StopInner>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StopInner {
                stopped: AtomicBool::new(false),
                lock: Mutex::new(()),
                condvar: Condvar::new(),
            }),
        }
    }

    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        let _guard = self.inner.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.inner.condvar.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Sleep up to `timeout`; returns true when the signal was raised
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.inner.lock.lock().unwrap_or_else(PoisonError::into_inner);
        while !self.is_stopped() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let (next, _) = self
                .inner
                .condvar
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            guard = next;
        }
        self.is_stopped()
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Barrier that serialises dataset builds in worker-index order
pub struct SequentialLoadCoordinator {
    next_slot: AtomicUsize,
    poll_interval: Duration,
}

/// Held while a worker builds its dataset; releases the next slot on drop,
/// whether the build succeeded or not
pub struct BuildSlot<'a> {
    coordinator: &'a SequentialLoadCoordinator,
    device_index: usize,
}

impl Drop for BuildSlot<'_> {
    fn drop(&mut self) {
        let next = self.coordinator.next_slot.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(target: LOG_TARGET, "cl-{} released DAG build slot, next slot {}", self.device_index, next);
    }
}

impl SequentialLoadCoordinator {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            next_slot: AtomicUsize::new(0),
            poll_interval,
        }
    }

    pub fn next_slot(&self) -> usize {
        self.next_slot.load(Ordering::SeqCst)
    }

    /// Block until every lower-indexed worker has finished its build.
    ///
    /// There is no timeout: a predecessor that never finishes stalls this
    /// worker until `stop` is raised, in which case `None` is returned.
    pub fn wait_for_turn(&self, device_index: usize, stop: &StopSignal) -> Option<BuildSlot<'_>> {
        let mut announced = false;
        while self.next_slot() < device_index {
            if !announced {
                info!(target: LOG_TARGET,
                    "cl-{} waiting for DAG build slot (current slot {})",
                    device_index,
                    self.next_slot()
                );
                announced = true;
            }
            if stop.wait_timeout(self.poll_interval) {
                return None;
            }
        }
        Some(BuildSlot {
            coordinator: self,
            device_index,
        })
    }
}

/// Process-wide state shared by every worker of a farm
pub struct MiningContext {
    settings: MinerSettings,
    sequential: SequentialLoadCoordinator,
    nonce_scrambler: AtomicU64,
    ethash_instances: AtomicUsize,
    progpow_instances: AtomicUsize,
    work_switch: Mutex<Option<Instant>>,
}

impl MiningContext {
    pub fn new(settings: MinerSettings) -> Self {
        let sequential = SequentialLoadCoordinator::new(settings.sequential_poll_interval);
        Self {
            settings,
            sequential,
            nonce_scrambler: AtomicU64::new(rand::random()),
            ethash_instances: AtomicUsize::new(0),
            progpow_instances: AtomicUsize::new(0),
            work_switch: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &MinerSettings {
        &self.settings
    }

    pub fn sequential(&self) -> &SequentialLoadCoordinator {
        &self.sequential
    }

    pub fn nonce_scrambler(&self) -> u64 {
        self.nonce_scrambler.load(Ordering::SeqCst)
    }

    pub fn set_nonce_scrambler(&self, scrambler: u64) {
        self.nonce_scrambler.store(scrambler, Ordering::SeqCst);
    }

    /// Pick a fresh random scrambler and return it
    pub fn reseed_nonce_scrambler(&self) -> u64 {
        let scrambler = rand::random();
        self.set_nonce_scrambler(scrambler);
        debug!(target: LOG_TARGET, "Nonce scrambler reseeded to {:#018x}", scrambler);
        scrambler
    }

    fn instances(&self, kind: AlgorithmKind) -> &AtomicUsize {
        match kind {
            AlgorithmKind::Ethash => &self.ethash_instances,
            AlgorithmKind::ProgPow => &self.progpow_instances,
        }
    }

    /// Count a new worker of `kind`; returns its per-variant instance number
    pub fn register_instance(&self, kind: AlgorithmKind) -> usize {
        self.instances(kind).fetch_add(1, Ordering::SeqCst)
    }

    pub fn instance_count(&self, kind: AlgorithmKind) -> usize {
        self.instances(kind).load(Ordering::SeqCst)
    }

    /// Start the work-switch clock (new package published)
    pub fn mark_work_switch(&self) {
        *self.work_switch.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }

    pub fn work_switch_elapsed(&self) -> Option<Duration> {
        let started = *self.work_switch.lock().unwrap_or_else(PoisonError::into_inner);
        started.map(|start| start.elapsed())
    }
}


// Changelog:
// - v1.0.0 (2025-07-02): Shared mining context, stop signal and the
//   sequential DAG load barrier.
