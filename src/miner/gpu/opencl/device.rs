// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// File: src/miner/gpu/opencl/device.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// OpenCL device enumeration - detects GPU devices across all platforms and
// captures the attributes the worker needs (memory, platform, NVIDIA compute
// capability).

use anyhow::{Error, Result};
use log::{debug, error, info, warn};
use opencl3::{
    device::{CL_DEVICE_TYPE_GPU, Device},
    platform::get_platforms,
};

use crate::miner::gpu::backend::DeviceInfo;

const LOG_TARGET: &str = "progpow::miner::opencl::device";

/// Kernel `PLATFORM` values
pub mod platform_ids {
    pub const UNKNOWN: u32 = 0;
    pub const AMD: u32 = 1;
    pub const CLOVER: u32 = 2;
    pub const NVIDIA: u32 = 3;
    pub const INTEL: u32 = 4;
}

/// Map an OpenCL platform name to its kernel platform id
pub fn platform_id(platform_name: &str) -> u32 {
    let name = platform_name.to_lowercase();
    if name.contains("nvidia") {
        platform_ids::NVIDIA
    } else if name.contains("amd") || name.contains("advanced micro devices") {
        platform_ids::AMD
    } else if name.contains("clover") {
        platform_ids::CLOVER
    } else if name.contains("intel") {
        platform_ids::INTEL
    } else {
        platform_ids::UNKNOWN
    }
}

/// OpenCL GPU device
#[derive(Debug, Clone)]
pub struct OpenClDevice {
    pub device_id: u32,
    pub platform_name: String,
    pub max_compute_units: u32,
    pub info: DeviceInfo,
    pub device: Device,
}

impl OpenClDevice {
    pub fn new(device: Device, device_id: u32, platform_name: String) -> Self {
        let name = device.name().unwrap_or_else(|_| "Unknown Device".to_string());
        let vendor = device.vendor().unwrap_or_else(|_| "Unknown Vendor".to_string());
        let max_work_group_size = device.max_work_group_size().unwrap_or(256);
        let max_compute_units = device.max_compute_units().unwrap_or(1);
        let global_mem_size = device.global_mem_size().unwrap_or(0);
        let platform_id = platform_id(&platform_name);

        let compute_capability = if platform_id == platform_ids::NVIDIA {
            match (device.compute_capability_major_nv(), device.compute_capability_minor_nv()) {
                (Ok(major), Ok(minor)) => Some((major, minor)),
                _ => None,
            }
        } else {
            None
        };

        debug!(target: LOG_TARGET,
            "Created OpenCL device: {} (CU: {}, WG: {}, CC: {:?})",
            name, max_compute_units, max_work_group_size, compute_capability
        );

        Self {
            device_id,
            platform_name,
            max_compute_units,
            info: DeviceInfo {
                name,
                vendor,
                platform_id,
                global_mem_size,
                max_work_group_size,
                compute_capability,
            },
            device,
        }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Detect all available OpenCL GPU devices
    pub fn detect_devices() -> Result<Vec<OpenClDevice>> {
        debug!(target: LOG_TARGET, "Starting OpenCL device detection");

        let platforms = get_platforms().map_err(|e| {
            error!(target: LOG_TARGET, "Failed to get OpenCL platforms: {}", e);
            Error::msg(format!("OpenCL platform detection failed: {}", e))
        })?;

        if platforms.is_empty() {
            warn!(target: LOG_TARGET, "No OpenCL platforms found");
            return Ok(Vec::new());
        }

        info!(target: LOG_TARGET, "Found {} OpenCL platform(s)", platforms.len());

        let mut all_devices = Vec::new();
        let mut device_counter = 0;

        for platform in platforms {
            let platform_name = platform.name().unwrap_or_else(|_| "Unknown Platform".to_string());
            debug!(target: LOG_TARGET, "Checking platform: {}", platform_name);

            match platform.get_devices(CL_DEVICE_TYPE_GPU) {
                Ok(devices) => {
                    for device_cl_id in devices {
                        let device = OpenClDevice::new(Device::new(device_cl_id), device_counter, platform_name.clone());
                        info!(target: LOG_TARGET,
                            "Detected OpenCL device {}: {}",
                            device_counter,
                            device.info_string()
                        );
                        all_devices.push(device);
                        device_counter += 1;
                    }
                }
                Err(e) => {
                    debug!(target: LOG_TARGET, "No GPU devices found on platform {}: {}", platform_name, e);
                }
            }
        }

        if all_devices.is_empty() {
            warn!(target: LOG_TARGET, "No OpenCL GPU devices detected");
        }

        Ok(all_devices)
    }

    /// Get device info string for display
    pub fn info_string(&self) -> String {
        format!(
            "{} (Platform: {}, CU: {}, WG: {}, MEM: {:.1} GB)",
            self.info.name,
            self.platform_name,
            self.max_compute_units,
            self.info.max_work_group_size,
            self.info.memory_gb()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_names_map_to_ids() {
        assert_eq!(platform_id("NVIDIA CUDA"), platform_ids::NVIDIA);
        assert_eq!(platform_id("AMD Accelerated Parallel Processing"), platform_ids::AMD);
        assert_eq!(platform_id("Clover"), platform_ids::CLOVER);
        assert_eq!(platform_id("Portable Computing Language"), platform_ids::UNKNOWN);
    }
}

// Changelog:
// - v1.0.0 (2025-07-02): Device attributes for DAG mining.
//   - Added platform id and NVIDIA compute capability into DeviceInfo.
//   - Dropped integrated/dedicated classification.
