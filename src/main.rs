// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// File: src/main.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// ppminer: enumerate OpenCL GPUs, start one worker per device on a work
// file or a synthetic benchmark package, print stats until Ctrl-C.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use log::{error, info, warn};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use progpow_miner::core::{
    AlgorithmKind, Args, EthashOracle, HashOracle, WorkPackage, WorkTemplate, difficulty, epoch,
};
use progpow_miner::miner::factory::{build_variant, create_worker};
use progpow_miner::miner::gpu::{OpenClBackend, OpenClDevice};
use progpow_miner::miner::kernel_source::{FilePeriodKernels, KernelLibrary, PeriodKernelGenerator};
use progpow_miner::miner::{Farm, MiningContext, SharedWorkSource, WorkSource};
use progpow_miner::utils::format::FormatUtils;
use progpow_miner::utils::logging::init_logging;

const LOG_TARGET: &str = "progpow::ppminer";

/// Benchmark boundary: roughly one hit per 2^32 nonces
const BENCHMARK_DIFFICULTY: u64 = 1 << 32;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Validate arguments
    if let Err(err) = args.validate() {
        eprintln!("❌ Error: {}", err);
        std::process::exit(1);
    }

    init_logging(&args.log_level, args.log_file.as_deref())?;

    let kind = args.algorithm().map_err(|e| anyhow!(e))?;
    let settings = args.settings().map_err(|e| anyhow!(e))?;
    let oracle = oracle_for(kind)?;
    let package = load_package(&args)?;

    let devices = select_devices(OpenClDevice::detect_devices()?, &args.devices)?;

    let periods: Arc<dyn PeriodKernelGenerator> = Arc::new(FilePeriodKernels::new(&args.kernel_dir));
    let variant = build_variant(kind, &KernelLibrary::new(&args.kernel_dir), Some(periods))?;

    let context = Arc::new(MiningContext::new(settings));
    let work_source = Arc::new(SharedWorkSource::new(Arc::clone(&context)));
    let solutions = work_source.solutions();

    let workers = devices
        .into_iter()
        .enumerate()
        .map(|(index, device)| {
            create_worker(
                index,
                OpenClBackend::new(device),
                Arc::clone(&variant),
                Arc::clone(&oracle),
                Arc::clone(&work_source) as Arc<dyn WorkSource>,
                Arc::clone(&context),
            )
        })
        .collect::<Vec<_>>();

    work_source.set_work(Some(package));
    let farm = Farm::start(workers).context("Failed to start worker threads")?;

    let mut stats_interval = tokio::time::interval(Duration::from_secs(args.stats_interval));
    let mut poll_interval = tokio::time::interval(Duration::from_millis(250));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!(target: LOG_TARGET, "Ctrl-C received, shutting down");
                break;
            }
            _ = stats_interval.tick() => {
                let stats = farm.stats();
                let total: f64 = stats.iter().map(|s| s.hashrate()).sum();
                info!(target: LOG_TARGET, "📊 Total {}", FormatUtils::format_hashrate(total));
                for device in stats {
                    info!(target: LOG_TARGET, "   {}", device.summary());
                }
            }
            _ = poll_interval.tick() => {
                while let Ok(solution) = solutions.try_recv() {
                    info!(target: LOG_TARGET,
                        "✅ cl-{} solution job {} nonce {:#018x} mix {} ({}ms)",
                        solution.device_index,
                        solution.work.job_id,
                        solution.nonce,
                        hex::encode(solution.mix_hash),
                        solution.age().as_millis()
                    );
                }
                if farm.all_finished() {
                    warn!(target: LOG_TARGET, "All workers have exited");
                    break;
                }
            }
        }
    }

    farm.stop();
    let outcomes = tokio::task::spawn_blocking(move || farm.join()).await?;
    let disabled = outcomes.iter().filter(|o| o.is_disabled()).count();
    for outcome in &outcomes {
        if let Err(e) = &outcome.result {
            error!(target: LOG_TARGET, "cl-{} {}: {}", outcome.index, outcome.device_name, e);
        }
    }
    if !outcomes.is_empty() && disabled == outcomes.len() {
        bail!("No device could be initialised");
    }
    Ok(())
}

/// Host-side verifier for the selected algorithm
fn oracle_for(kind: AlgorithmKind) -> Result<Arc<dyn HashOracle>> {
    match kind {
        AlgorithmKind::Ethash => Ok(Arc::new(EthashOracle::new())),
        AlgorithmKind::ProgPow => {
            bail!("ProgPoW hash verification needs an external oracle; ppminer only links the Ethash light oracle")
        }
    }
}

fn load_package(args: &Args) -> Result<WorkPackage> {
    if let Some(path) = &args.work_file {
        return load_work_file(path);
    }
    let block_number = args.benchmark.unwrap_or(0);
    let header: [u8; 32] = rand::random();
    info!(target: LOG_TARGET, "🏁 Benchmark package at block {}", block_number);
    Ok(WorkPackage::new(
        "benchmark",
        header,
        epoch::epoch_of(block_number),
        block_number,
        difficulty::difficulty_to_boundary(BENCHMARK_DIFFICULTY),
    ))
}

fn load_work_file(path: &Path) -> Result<WorkPackage> {
    let text = fs::read_to_string(path).with_context(|| format!("Could not read work file {:?}", path))?;
    let template: WorkTemplate =
        serde_json::from_str(&text).with_context(|| format!("Invalid work file {:?}", path))?;
    template.into_package().map_err(|e| anyhow!(e))
}

fn select_devices(detected: Vec<OpenClDevice>, wanted: &[usize]) -> Result<Vec<OpenClDevice>> {
    if detected.is_empty() {
        bail!("No OpenCL GPU devices found");
    }
    if wanted.is_empty() {
        return Ok(detected);
    }
    let available = detected.len();
    let selected: Vec<_> = detected
        .into_iter()
        .enumerate()
        .filter(|(index, _)| wanted.contains(index))
        .map(|(_, device)| device)
        .collect();
    if selected.len() != wanted.len() {
        bail!("Requested devices {:?} but only {} device(s) detected", wanted, available);
    }
    Ok(selected)
}

// Changelog:
// - v1.0.0 (2025-07-02): ppminer entry point.
//   - Single gpu build instead of cpu/gpu/hybrid feature mains.
//   - Work file or benchmark package, farm supervision, Ctrl-C shutdown.
