// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/difficulty.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file contains the 256-bit boundary arithmetic used by the miner: the
// truncated 64-bit prefix handed to GPU kernels, the full-width comparison
// used by host verification, and conversions between difficulty and boundary.

use log::{debug, warn};
use uint::construct_uint;

use crate::core::types::H256;

const LOG_TARGET: &str = "progpow::miner::difficulty";

construct_uint! {
    pub struct U256(4);
}

/// Upper 64 bits of the boundary, the value GPU kernels compare against.
///
/// A zero prefix would make every kernel comparison fail, so it is clamped to 1
/// and the full-width check on the host still decides.
pub fn gpu_target(boundary: &U256) -> u64 {
    let prefix = (*boundary >> 192).low_u64();
    if prefix == 0 {
        warn!(target: LOG_TARGET, "Boundary {:064x} has a zero upper word, clamping GPU target to 1", boundary);
        return 1;
    }
    prefix
}

/// Interpret a 32-byte hash as a big-endian 256-bit number.
pub fn hash_value(hash: &H256) -> U256 {
    U256::from_big_endian(hash)
}

/// Full-width check: a hash is acceptable only when strictly below the boundary.
pub fn hash_below_boundary(hash: &H256, boundary: &U256) -> bool {
    let value = hash_value(hash);
    debug!(target: LOG_TARGET,
        "Hash check: hash={:064x}, boundary={:064x}",
        value, boundary
    );
    value < *boundary
}

/// Boundary for a given difficulty: `2^256 / difficulty`, saturating at `U256::MAX`.
pub fn difficulty_to_boundary(difficulty: u64) -> U256 {
    if difficulty <= 1 {
        return U256::MAX;
    }
    let boundary = U256::MAX / U256::from(difficulty);
    debug!(target: LOG_TARGET, "Difficulty {} -> boundary: {:064x}", difficulty, boundary);
    boundary
}

/// Difficulty represented by a boundary, saturating at `u64::MAX`.
pub fn boundary_to_difficulty(boundary: &U256) -> u64 {
    if boundary.is_zero() {
        warn!(target: LOG_TARGET, "Zero boundary has no finite difficulty");
        return u64::MAX;
    }
    let quotient = U256::MAX / *boundary;
    if quotient > U256::from(u64::MAX) {
        u64::MAX
    } else {
        quotient.low_u64()
    }
}

/// Parse a hex boundary (optional `0x` prefix, up to 64 digits, big-endian).
pub fn parse_boundary(boundary_hex: &str) -> Result<U256, hex::FromHexError> {
    let trimmed = boundary_hex.trim_start_matches("0x");
    let padded = format!("{:0>64}", trimmed);
    let bytes = hex::decode(padded)?;
    if bytes.len() != 32 {
        return Err(hex::FromHexError::InvalidStringLength);
    }
    Ok(U256::from_big_endian(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_target_takes_upper_word() {
        let boundary = U256::from(0x0000_0000_ffff_0000u64) << 192;
        assert_eq!(gpu_target(&boundary), 0x0000_0000_ffff_0000);
        assert_eq!(gpu_target(&U256::MAX), u64::MAX);
    }

    #[test]
    fn gpu_target_never_zero() {
        assert_eq!(gpu_target(&U256::from(12345u64)), 1);
    }

    #[test]
    fn boundary_compare_is_strict() {
        let mut hash = [0u8; 32];
        hash[31] = 10;
        assert!(hash_below_boundary(&hash, &U256::from(11u64)));
        assert!(!hash_below_boundary(&hash, &U256::from(10u64)));
    }

    #[test]
    fn parse_short_boundary_pads_left() {
        let boundary = parse_boundary("0x00000000ffff").unwrap();
        assert_eq!(boundary, U256::from(0xffffu64));
    }
}

// Changelog:
// - v1.0.0 (2025-07-02): Boundary helpers for Ethash/ProgPoW.
//   - Kept the construct_uint U256 from the SHA3x difficulty module.
//   - Added gpu_target (upper 64 bits) and strict hash_below_boundary.
//   - Dropped SHA-256 nbits/target parsing.
