// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/stats/device_stats.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file implements per-device statistics: hashes dispatched, running and
// peak hashrate, verified solutions and GPU false positives. Workers update
// it from their own thread; the stats printer reads it concurrently.
//
// Tree Location:
// - src/miner/stats/device_stats.rs (per-device statistics)
// - Depends on: std

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::utils::format::FormatUtils;

pub struct DeviceStats {
    device_index: usize,
    device_name: String,
    pub hashes_computed: AtomicU64,
    pub solutions_found: AtomicU64,
    pub false_positives: AtomicU64,
    pub peak_hashrate: AtomicU64,
    last_solution_time: Mutex<Option<Instant>>,
    current_hashrate: Mutex<f64>,
    start_time: Instant,
}

impl DeviceStats {
    pub fn new(device_index: usize, device_name: impl Into<String>) -> Self {
        Self {
            device_index,
            device_name: device_name.into(),
            hashes_computed: AtomicU64::new(0),
            solutions_found: AtomicU64::new(0),
            false_positives: AtomicU64::new(0),
            peak_hashrate: AtomicU64::new(0),
            last_solution_time: Mutex::new(None),
            current_hashrate: Mutex::new(0.0),
            start_time: Instant::now(),
        }
    }

    pub fn device_index(&self) -> usize {
        self.device_index
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Count one kernel launch worth of hashes and refresh the rates
    pub fn record_hashes(&self, hashes: u64) {
        let total = self.hashes_computed.fetch_add(hashes, Ordering::Relaxed) + hashes;
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let rate = total as f64 / elapsed;
            *self.current_hashrate.lock().unwrap_or_else(PoisonError::into_inner) = rate;
            self.peak_hashrate.fetch_max(rate as u64, Ordering::Relaxed);
        }
    }

    pub fn record_solution(&self) {
        self.solutions_found.fetch_add(1, Ordering::Relaxed);
        *self.last_solution_time.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }

    pub fn record_false_positive(&self) {
        self.false_positives.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hashrate(&self) -> f64 {
        *self.current_hashrate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn peak_hashrate(&self) -> f64 {
        self.peak_hashrate.load(Ordering::Relaxed) as f64
    }

    pub fn solutions(&self) -> u64 {
        self.solutions_found.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.false_positives.load(Ordering::Relaxed)
    }

    pub fn since_last_solution(&self) -> Option<Duration> {
        let last = *self.last_solution_time.lock().unwrap_or_else(PoisonError::into_inner);
        last.map(|t| t.elapsed())
    }

    /// One-line summary for the periodic stats printer
    pub fn summary(&self) -> String {
        let last = self
            .since_last_solution()
            .map(FormatUtils::format_duration)
            .unwrap_or_else(|| "never".to_string());
        format!(
            "cl-{} {} | {} (peak {}) | solutions {} | false positives {} | last {}",
            self.device_index,
            self.device_name,
            FormatUtils::format_hashrate(self.hashrate()),
            FormatUtils::format_hashrate(self.peak_hashrate()),
            self.solutions(),
            self.rejected(),
            last
        )
    }
}


// Changelog:
// - v1.0.0 (2025-07-02): Per-device stats adapted from per-thread share stats.
//   - Shares become verified solutions and GPU false positives.
//   - Peak tracking via fetch_max; dropped share dots and difficulty tracking.
