// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/farm.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file supervises the workers: one named OS thread per device, a stop
// that also kicks every device out of a running kernel, and a join that
// reports each device's outcome independently.
//
// Tree Location:
// - src/miner/farm.rs (worker threads)
// - Depends on: std::thread

use log::{debug, error, info, warn};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::miner::coordination::StopSignal;
use crate::miner::error::MinerError;
use crate::miner::gpu::backend::{BackendError, ComputeBackend, DeviceKick};
use crate::miner::nonce::MAX_MINERS;
use crate::miner::stats::DeviceStats;
use crate::miner::worker::{MinerWorker, WorkerState, WorkerStatus};

const LOG_TARGET: &str = "progpow::miner::farm";

/// How one device's worker ended
#[derive(Debug)]
pub struct DeviceOutcome {
    pub index: usize,
    pub device_name: String,
    pub result: Result<(), MinerError>,
}

impl DeviceOutcome {
    /// Device left disabled by an initialization failure
    pub fn is_disabled(&self) -> bool {
        matches!(&self.result, Err(e) if e.disables_device())
    }
}

pub struct DeviceHandle {
    pub index: usize,
    pub device_name: String,
    stop: StopSignal,
    kicker: Arc<dyn DeviceKick>,
    stats: Arc<DeviceStats>,
    status: WorkerStatus,
    thread: JoinHandle<Result<(), MinerError>>,
}

impl DeviceHandle {
    pub fn stats(&self) -> Arc<DeviceStats> {
        Arc::clone(&self.stats)
    }

    pub fn state(&self) -> WorkerState {
        self.status.get()
    }

    fn stop(&self) {
        self.stop.stop();
        self.kicker.kick();
    }
}

pub struct Farm {
    devices: Vec<DeviceHandle>,
}

impl Farm {
    /// Spawn one `gpu-<index>` thread per worker
    pub fn start<B: ComputeBackend + 'static>(workers: Vec<MinerWorker<B>>) -> io::Result<Self> {
        if workers.len() > MAX_MINERS {
            warn!(target: LOG_TARGET,
                "{} devices exceed the {} the extra-nonce layout can separate; workers past that are disabled on extra-nonce work",
                workers.len(),
                MAX_MINERS
            );
        }

        let mut devices = Vec::with_capacity(workers.len());
        for mut worker in workers {
            let index = worker.index();
            let device_name = worker.device_name().to_string();
            let stop = worker.stop_signal();
            let kicker = worker.kicker();
            let stats = worker.stats();
            let status = worker.status();

            debug!(target: LOG_TARGET, "Launching worker thread gpu-{} for {}", index, device_name);
            let thread = thread::Builder::new()
                .name(format!("gpu-{}", index))
                .spawn(move || worker.run())?;

            devices.push(DeviceHandle {
                index,
                device_name,
                stop,
                kicker,
                stats,
                status,
                thread,
            });
        }

        info!(target: LOG_TARGET, "🚀 {} worker thread(s) launched", devices.len());
        Ok(Self { devices })
    }

    pub fn devices(&self) -> &[DeviceHandle] {
        &self.devices
    }

    pub fn stats(&self) -> Vec<Arc<DeviceStats>> {
        self.devices.iter().map(|d| d.stats()).collect()
    }

    /// True once every worker reached Stopped or Aborted
    pub fn all_finished(&self) -> bool {
        self.devices.iter().all(|d| d.state().is_terminal())
    }

    /// Raise every stop signal and kick every device
    pub fn stop(&self) {
        info!(target: LOG_TARGET, "Stopping {} worker(s)", self.devices.len());
        for device in &self.devices {
            device.stop();
        }
    }

    /// Wait for every worker; one outcome per device
    pub fn join(self) -> Vec<DeviceOutcome> {
        self.devices
            .into_iter()
            .map(|device| {
                let result = device.thread.join().unwrap_or_else(|_| {
                    Err(MinerError::Backend(BackendError::runtime("worker thread", "panicked")))
                });
                match &result {
                    Ok(()) => info!(target: LOG_TARGET, "cl-{} {} finished", device.index, device.device_name),
                    Err(e) => error!(target: LOG_TARGET, "cl-{} {} failed: {}", device.index, device.device_name, e),
                }
                DeviceOutcome {
                    index: device.index,
                    device_name: device.device_name,
                    result,
                }
            })
            .collect()
    }
}

// Changelog:
// - v1.0.0 (2025-07-02): Thread-per-device farm, replacing the GPU manager's
//   tokio-runtime-per-thread launcher.
