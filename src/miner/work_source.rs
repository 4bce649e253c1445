// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/work_source.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file defines the WorkSource boundary workers poll for packages and
// submit solutions to, plus SharedWorkSource, the in-process implementation
// used by the binary: an RwLock snapshot of the current package and an
// unbounded crossbeam channel for solutions.
//
// Tree Location:
// - src/miner/work_source.rs (work/solution exchange)
// - Depends on: crossbeam

use crossbeam::channel::{Receiver, Sender, unbounded};
use log::{debug, info, warn};
use std::sync::{Arc, PoisonError, RwLock};

use crate::core::types::{Solution, WorkPackage};
use crate::miner::coordination::MiningContext;

const LOG_TARGET: &str = "progpow::miner::work_source";

/// Thread-safe provider of work and sink for solutions
pub trait WorkSource: Send + Sync {
    /// Latest package, `None` when there is nothing to mine
    fn current_work(&self) -> Option<Arc<WorkPackage>>;

    /// Fire-and-forget; must not block on slow consumers
    fn submit(&self, solution: Solution);

    fn nonce_scrambler(&self) -> u64;
}

pub struct SharedWorkSource {
    context: Arc<MiningContext>,
    current: RwLock<Option<Arc<WorkPackage>>>,
    solution_tx: Sender<Solution>,
    solution_rx: Receiver<Solution>,
}

impl SharedWorkSource {
    pub fn new(context: Arc<MiningContext>) -> Self {
        let (solution_tx, solution_rx) = unbounded();
        Self {
            context,
            current: RwLock::new(None),
            solution_tx,
            solution_rx,
        }
    }

    /// Publish a new package (or clear it) and start the work-switch clock
    pub fn set_work(&self, work: Option<WorkPackage>) {
        match &work {
            Some(w) => info!(target: LOG_TARGET,
                "New work {} header {}.. epoch {} block {}",
                w.job_id,
                w.header_prefix(),
                w.epoch,
                w.block_number
            ),
            None => debug!(target: LOG_TARGET, "Work cleared"),
        }
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = work.map(Arc::new);
        self.context.mark_work_switch();
    }

    /// Receiving end of submitted solutions
    pub fn solutions(&self) -> Receiver<Solution> {
        self.solution_rx.clone()
    }
}

impl WorkSource for SharedWorkSource {
    fn current_work(&self) -> Option<Arc<WorkPackage>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn submit(&self, solution: Solution) {
        if let Err(e) = self.solution_tx.send(solution) {
            warn!(target: LOG_TARGET, "Solution dropped, no receiver: nonce {:#018x}", e.0.nonce);
        }
    }

    fn nonce_scrambler(&self) -> u64 {
        self.context.nonce_scrambler()
    }
}

// Changelog:
// - v1.0.0 (2025-07-02): WorkSource trait and in-process SharedWorkSource,
//   replacing the pool job broadcast/share channel pair.
