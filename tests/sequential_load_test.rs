// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: tests/sequential_load_test.rs
// Version: 1.0.0
// Developer: Test Implementation
//
// This file checks one-at-a-time DAG loading: build slots are granted in
// worker-index order, a stalled predecessor blocks its successors until stop,
// and a sequential farm never overlaps two dataset builds.

mod common;

#[cfg(test)]
mod tests {
    use crate::common::{self, ETHASH_SOURCE, MockBackend, MockOracle, Timeline};
    use progpow_miner::core::difficulty;
    use progpow_miner::core::{DagLoadMode, HashOracle, WorkPackage};
    use progpow_miner::miner::algorithm::{AlgorithmVariant, Ethash};
    use progpow_miner::miner::factory::create_worker;
    use progpow_miner::miner::{Farm, MiningContext, SequentialLoadCoordinator, SharedWorkSource, StopSignal, WorkSource};
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn slots_are_granted_in_index_order() {
        let coordinator = Arc::new(SequentialLoadCoordinator::new(Duration::from_millis(2)));
        let order = Arc::new(Mutex::new(Vec::new()));
        let stop = StopSignal::new();

        // start in reverse so the scheduler cannot hand out the order for free
        let handles: Vec<_> = (0..4)
            .rev()
            .map(|index| {
                let coordinator = Arc::clone(&coordinator);
                let order = Arc::clone(&order);
                let stop = stop.clone();
                thread::spawn(move || {
                    let slot = coordinator.wait_for_turn(index, &stop).expect("slot granted");
                    order.lock().unwrap().push(index);
                    thread::sleep(Duration::from_millis(5));
                    drop(slot);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(coordinator.next_slot(), 4);
    }

    #[test]
    fn stalled_predecessor_blocks_until_stop() {
        let coordinator = Arc::new(SequentialLoadCoordinator::new(Duration::from_millis(2)));
        let stop = StopSignal::new();
        let (tx, rx) = mpsc::channel();

        let waiter = {
            let coordinator = Arc::clone(&coordinator);
            let stop = stop.clone();
            thread::spawn(move || {
                let granted = coordinator.wait_for_turn(1, &stop).is_some();
                tx.send(granted).unwrap();
            })
        };

        // worker 0 never builds
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        stop.stop();
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(false));
        waiter.join().unwrap();
        assert_eq!(coordinator.next_slot(), 0);
    }

    #[test]
    fn failed_build_still_releases_the_slot() {
        let coordinator = SequentialLoadCoordinator::new(Duration::from_millis(2));
        let stop = StopSignal::new();

        let attempt = || -> Result<(), String> {
            let _slot = coordinator.wait_for_turn(0, &stop).ok_or("cancelled")?;
            Err("build failed".to_string())
        };
        assert!(attempt().is_err());
        assert_eq!(coordinator.next_slot(), 1);
        assert!(coordinator.wait_for_turn(1, &stop).is_some());
    }

    #[test]
    fn sequential_farm_never_overlaps_builds() {
        let context = Arc::new(MiningContext::new(common::test_settings(DagLoadMode::Sequential)));
        let source = Arc::new(SharedWorkSource::new(Arc::clone(&context)));
        source.set_work(Some(WorkPackage::new(
            "job",
            [7u8; 32],
            0,
            0,
            difficulty::difficulty_to_boundary(1000),
        )));
        let variant: Arc<dyn AlgorithmVariant> = Arc::new(Ethash::new(ETHASH_SOURCE));
        let oracle: Arc<dyn HashOracle> = Arc::new(MockOracle::accepting());
        let timeline: Timeline = Arc::new(Mutex::new(Vec::new()));

        let backends: Vec<_> = (0..3)
            .map(|i| MockBackend::new(&format!("mock-{}", i)).with_timeline(Arc::clone(&timeline), i))
            .collect();
        let states: Vec<_> = backends.iter().map(|b| b.handle()).collect();
        let workers = backends
            .into_iter()
            .enumerate()
            .map(|(i, backend)| {
                create_worker(
                    i,
                    backend,
                    Arc::clone(&variant),
                    Arc::clone(&oracle),
                    Arc::clone(&source) as Arc<dyn WorkSource>,
                    Arc::clone(&context),
                )
            })
            .collect();

        let farm = Farm::start(workers).unwrap();
        assert!(common::wait_until(|| states.iter().all(|s| s.lock().unwrap().search_launches > 0)));
        farm.stop();
        assert!(farm.join().iter().all(|o| o.result.is_ok()));

        let events = timeline.lock().unwrap().clone();
        let position = |event: &str, index: usize, last: bool| {
            let mut matches = events.iter().enumerate().filter(|(_, e)| e.0 == event && e.1 == index);
            let found = if last { matches.last() } else { matches.next() };
            found.map(|(p, _)| p).expect("event recorded")
        };
        for index in 1..3 {
            assert!(
                position("build", index, false) > position("dag", index - 1, true),
                "cl-{} built before cl-{} finished its DAG",
                index,
                index - 1
            );
        }
        assert_eq!(context.sequential().next_slot(), 3);
    }
}

// Changelog:
// - v1.0.0 (2025-07-02): Sequential DAG load tests.
