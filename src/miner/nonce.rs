// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/nonce.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// Nonce-space partitioning. Every worker gets its own window of the 64-bit
// nonce space so devices never search the same nonce for one package.
//
// Tree Location:
// - src/miner/nonce.rs (per-device start nonces)
// - Depends on: log, thiserror

use log::warn;
use thiserror::Error;

use crate::core::types::WorkPackage;

const LOG_TARGET: &str = "progpow::miner::nonce";

/// log2 of the number of workers the extra-nonce layout can address
pub const LOG2_MAX_MINERS: u32 = 5;
pub const MAX_MINERS: usize = 1 << LOG2_MAX_MINERS;

/// Width of the window each worker owns when no extra-nonce is reserved
pub const DEVICE_WINDOW_BITS: u32 = 40;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NonceError {
    #[error("Device index {device_index} does not fit the {bits}-bit field below a {ex_size_bytes}-byte extra-nonce")]
    DeviceIndexOutOfRange {
        device_index: usize,
        ex_size_bytes: u8,
        bits: u32,
    },
}

/// `scrambler + (device_index << 40)`, wrapping at 64 bits
pub fn start_nonce(device_index: usize, scrambler: u64) -> u64 {
    scrambler.wrapping_add((device_index as u64) << DEVICE_WINDOW_BITS)
}

/// Bit position of the device index when `ex_size_bytes` high bytes are
/// reserved by the work source; `None` when no room is left for an index
pub fn extra_nonce_shift(ex_size_bytes: u8) -> Option<u32> {
    64u32.checked_sub(LOG2_MAX_MINERS + 8 * ex_size_bytes as u32)
}

/// Device index packed directly below the extra-nonce field. Indices past
/// `MAX_MINERS` would spill into the reserved bytes and are refused.
pub fn extra_nonce_start(device_index: usize, package_start: u64, ex_size_bytes: u8) -> Result<u64, NonceError> {
    if device_index >= MAX_MINERS {
        return Err(NonceError::DeviceIndexOutOfRange {
            device_index,
            ex_size_bytes,
            bits: LOG2_MAX_MINERS,
        });
    }
    match extra_nonce_shift(ex_size_bytes) {
        Some(shift) => Ok(package_start | ((device_index as u64) << shift)),
        None => {
            warn!(target: LOG_TARGET,
                "Extra-nonce of {} bytes leaves no room for a device index, using package start nonce",
                ex_size_bytes
            );
            Ok(package_start)
        }
    }
}

/// Start nonce of a worker for a package
pub fn device_start_nonce(work: &WorkPackage, device_index: usize, scrambler: u64) -> Result<u64, NonceError> {
    if work.ex_size_bytes == 0 {
        return Ok(start_nonce(device_index, scrambler));
    }

    if let Some(shift) = extra_nonce_shift(work.ex_size_bytes) {
        if shift < DEVICE_WINDOW_BITS {
            warn!(target: LOG_TARGET,
                "Extra-nonce of {} bytes shrinks each device window to 2^{} nonces",
                work.ex_size_bytes, shift
            );
        }
    }
    extra_nonce_start(device_index, work.start_nonce, work.ex_size_bytes)
}


// Changelog:
// - v1.0.0 (2025-07-02): Per-device nonce windows with extra-nonce support.
//   - Device indices past MAX_MINERS are refused in extra-nonce mode.
