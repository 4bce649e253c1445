// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// This project, progpow-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: tests/dataset_test.rs
// Version: 1.0.0
// Developer: Test Implementation
//
// This file covers DatasetManager: epoch and period transitions, kernel
// definitions, the memory check, build failures, the kernel dump and
// cancelled DAG generation.

mod common;

#[cfg(test)]
mod tests {
    use crate::common::{self, Call, ETHASH_SOURCE, MockBackend, MockOracle, TestPeriods};
    use progpow_miner::core::difficulty;
    use progpow_miner::core::epoch;
    use progpow_miner::core::{DagLoadMode, MinerSettings, WorkPackage};
    use progpow_miner::miner::algorithm::{AlgorithmVariant, Ethash, ProgPow};
    use progpow_miner::miner::dataset::{
        DatasetManager, DispatchParams, PrepareOutcome, SEARCH_BUFFER_BYTES, Transition, dag_args, search_args,
    };
    use progpow_miner::miner::gpu::{KernelArg, KernelKind};
    use progpow_miner::miner::{MinerError, MiningContext, StopSignal};
    use std::sync::Arc;
    use tempfile::tempdir;

    const GLOBAL: u64 = 2048 * 256;

    fn package(header: u8, block_number: u64) -> WorkPackage {
        WorkPackage::new(
            "job",
            [header; 32],
            epoch::epoch_of(block_number),
            block_number,
            difficulty::difficulty_to_boundary(1000),
        )
    }

    fn manager(settings: &MinerSettings) -> DatasetManager {
        DatasetManager::new(0, DispatchParams::new(settings.workgroup_size, settings.initial_global_work_size))
    }

    fn progpow() -> ProgPow {
        ProgPow::new("__kernel void ethash_search() {}\n", Some(Arc::new(TestPeriods)))
    }

    fn prepare(
        manager: &mut DatasetManager,
        backend: &mut MockBackend,
        variant: &dyn AlgorithmVariant,
        context: &MiningContext,
        work: &WorkPackage,
    ) -> Result<PrepareOutcome, MinerError> {
        let transition = manager.transition_for(variant, work).expect("transition required");
        manager.prepare(
            backend,
            variant,
            &MockOracle::accepting(),
            context,
            &StopSignal::new(),
            work,
            transition,
        )
    }

    fn define_count(source: &str, name: &str) -> usize {
        source.matches(&format!("#define {} ", name)).count()
    }

    #[test]
    fn first_package_builds_everything() {
        let context = MiningContext::new(common::test_settings(DagLoadMode::Parallel));
        let mut manager = manager(context.settings());
        let mut backend = MockBackend::new("mock");
        let variant = Ethash::new(ETHASH_SOURCE);

        let outcome = prepare(&mut manager, &mut backend, &variant, &context, &package(1, 0)).unwrap();
        assert_eq!(outcome, PrepareOutcome::Ready);
        assert_eq!(manager.loaded_epoch(), Some(0));

        let buffers = manager.buffers().unwrap();
        let state = backend.state.lock().unwrap();
        assert_eq!(state.builds.len(), 1);
        assert_eq!(state.sizes[&buffers.light], 256);
        assert_eq!(state.sizes[&buffers.dataset], epoch::dataset_size(0) as usize);
        assert_eq!(state.sizes[&buffers.header], 32);
        assert_eq!(state.sizes[&buffers.search], SEARCH_BUFFER_BYTES);

        // light cache copied to the device
        assert_eq!(state.buffers[&buffers.light], vec![0u8; 256]);

        let nodes = epoch::dataset_size(0) / 64;
        assert_eq!(state.dataset_launches, nodes.div_ceil(GLOBAL));

        assert_eq!(state.arg(KernelKind::Search, search_args::HEADER), Some(KernelArg::Buffer(buffers.header)));
        assert_eq!(state.arg(KernelKind::Search, search_args::DATASET), Some(KernelArg::Buffer(buffers.dataset)));
        assert_eq!(state.arg(KernelKind::Search, search_args::ISOLATE), Some(KernelArg::U32(0)));
        assert_eq!(state.arg(KernelKind::DatasetBuild, dag_args::LIGHT), Some(KernelArg::Buffer(buffers.light)));
        assert_eq!(state.arg(KernelKind::DatasetBuild, dag_args::ISOLATE), Some(KernelArg::U32(!0u32)));
        assert_eq!(
            state.arg(KernelKind::DatasetBuild, dag_args::START),
            Some(KernelArg::U32(((state.dataset_launches - 1) * GLOBAL) as u32))
        );
    }

    #[test]
    fn every_dag_chunk_is_finished_before_the_next() {
        let context = MiningContext::new(common::test_settings(DagLoadMode::Parallel));
        let mut manager = manager(context.settings());
        let mut backend = MockBackend::new("mock");
        prepare(&mut manager, &mut backend, &Ethash::new(ETHASH_SOURCE), &context, &package(1, 0)).unwrap();

        let state = backend.state.lock().unwrap();
        let calls = &state.calls;
        for (i, call) in calls.iter().enumerate() {
            if let Call::Enqueue { kernel: KernelKind::DatasetBuild, global, local } = call {
                assert_eq!(*global as u64, GLOBAL);
                assert_eq!(*local, 256);
                assert_eq!(calls[i + 1], Call::Finish);
            }
        }
    }

    #[test]
    fn definitions_are_rendered_once_each() {
        let context = MiningContext::new(common::test_settings(DagLoadMode::Parallel));
        let mut manager = manager(context.settings());
        let mut backend = MockBackend::new("mock");
        prepare(&mut manager, &mut backend, &Ethash::new(ETHASH_SOURCE), &context, &package(1, 0)).unwrap();

        let state = backend.state.lock().unwrap();
        let build = &state.builds[0];
        let bytes = epoch::dataset_size(0);
        for (name, value) in [
            ("GROUP_SIZE", 256),
            ("DAG_BYTES", bytes),
            ("DAG_SIZE", bytes / 128),
            ("LIGHT_WORDS", 4),
            ("MAX_OUTPUTS", 1),
            ("PLATFORM", 3),
            ("COMPUTE", 86),
            ("ACCESSES", 64),
            ("THREADS_PER_HASH", 8),
        ] {
            assert_eq!(define_count(&build.source, name), 1, "{} defined once", name);
            assert!(build.source.contains(&format!("#define {} {}\n", name, value)), "{} = {}", name, value);
        }
        assert!(build.source.ends_with(ETHASH_SOURCE));
        assert_eq!(build.options, "-cl-nv-maxrregcount=72");
    }

    #[test]
    fn progpow_definitions_use_element_size() {
        let context = MiningContext::new(common::test_settings(DagLoadMode::Parallel));
        let mut manager = manager(context.settings());
        let mut backend = MockBackend::new("mock");
        prepare(&mut manager, &mut backend, &progpow(), &context, &package(1, 120)).unwrap();

        let state = backend.state.lock().unwrap();
        let source = &state.builds[0].source;
        let bytes = epoch::dataset_size(0);
        assert!(source.contains(&format!("#define PROGPOW_DAG_BYTES {}\n", bytes)));
        assert!(source.contains(&format!("#define PROGPOW_DAG_ELEMENTS {}\n", bytes / 256)));
        assert_eq!(define_count(source, "DAG_SIZE"), 0);
        assert!(source.contains("// period 2\n"));
    }

    #[test]
    fn period_change_rebuilds_kernels_but_keeps_dataset() {
        let context = MiningContext::new(common::test_settings(DagLoadMode::Parallel));
        let mut manager = manager(context.settings());
        let mut backend = MockBackend::new("mock");
        let variant = progpow();

        prepare(&mut manager, &mut backend, &variant, &context, &package(1, 0)).unwrap();
        let first = manager.buffers().unwrap();
        let dag_runs = backend.state.lock().unwrap().dataset_launches;

        // dirty the result buffer as a finished search would
        backend.state.lock().unwrap().buffers.get_mut(&first.search).unwrap()[0] = 1;

        let next = package(1, 50);
        assert_eq!(
            manager.transition_for(&variant, &next),
            Some(Transition {
                new_epoch: false,
                new_period: true
            })
        );
        let outcome = prepare(&mut manager, &mut backend, &variant, &context, &next).unwrap();
        assert_eq!(outcome, PrepareOutcome::Ready);
        assert_eq!(manager.buffers(), Some(first));

        let state = backend.state.lock().unwrap();
        assert_eq!(state.builds.len(), 2);
        assert!(state.builds[1].source.contains("// period 1\n"));
        assert_eq!(state.allocations().len(), 4);
        assert!(state.releases().is_empty());
        assert_eq!(state.dataset_launches, dag_runs);
        assert_eq!(state.buffers[&first.search], vec![0u8; SEARCH_BUFFER_BYTES]);
        assert_eq!(state.arg(KernelKind::Search, search_args::HEADER), Some(KernelArg::Buffer(first.header)));
        assert_eq!(state.arg(KernelKind::Search, search_args::DATASET), Some(KernelArg::Buffer(first.dataset)));
        assert_eq!(state.arg(KernelKind::Search, search_args::ISOLATE), Some(KernelArg::U32(0)));
    }

    #[test]
    fn epoch_change_replaces_buffers() {
        let context = MiningContext::new(common::test_settings(DagLoadMode::Parallel));
        let mut manager = manager(context.settings());
        let mut backend = MockBackend::new("mock");
        let variant = Ethash::new(ETHASH_SOURCE);

        prepare(&mut manager, &mut backend, &variant, &context, &package(1, 0)).unwrap();
        let first = manager.buffers().unwrap();
        prepare(&mut manager, &mut backend, &variant, &context, &package(1, 30_000)).unwrap();
        let second = manager.buffers().unwrap();

        assert_eq!(manager.loaded_epoch(), Some(1));
        let state = backend.state.lock().unwrap();
        assert_eq!(state.releases(), vec![first.light, first.dataset, first.header, first.search]);
        for id in [second.light, second.dataset, second.header, second.search] {
            assert!(![first.light, first.dataset, first.header, first.search].contains(&id));
        }
        assert_eq!(state.sizes[&second.dataset], epoch::dataset_size(1) as usize);
    }

    #[test]
    fn no_transition_for_unchanged_dataset() {
        let context = MiningContext::new(common::test_settings(DagLoadMode::Parallel));
        let mut manager = manager(context.settings());
        let mut backend = MockBackend::new("mock");

        let ethash = Ethash::new(ETHASH_SOURCE);
        prepare(&mut manager, &mut backend, &ethash, &context, &package(1, 0)).unwrap();
        // new header and a block in another ProgPoW period: Ethash ignores both
        assert_eq!(manager.transition_for(&ethash, &package(2, 75)), None);

        let mut manager = manager_for_progpow(&context, &mut backend);
        assert_eq!(manager.transition_for(&progpow(), &package(3, 49)), None);
        assert!(manager.transition_for(&progpow(), &package(3, 50)).is_some());
    }

    fn manager_for_progpow(context: &MiningContext, backend: &mut MockBackend) -> DatasetManager {
        let mut manager = manager(context.settings());
        prepare(&mut manager, backend, &progpow(), context, &package(1, 0)).unwrap();
        manager
    }

    #[test]
    fn insufficient_memory_is_reported_before_allocation() {
        let context = MiningContext::new(common::test_settings(DagLoadMode::Parallel));
        let mut manager = manager(context.settings());
        let mut backend = MockBackend::with_memory("small", 1 << 20);

        let err = prepare(&mut manager, &mut backend, &Ethash::new(ETHASH_SOURCE), &context, &package(1, 0))
            .unwrap_err();
        match &err {
            MinerError::InsufficientDeviceMemory { available, required, .. } => {
                assert_eq!(*available, 1 << 20);
                assert_eq!(*required, epoch::dataset_size(0));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err.disables_device());
        assert!(backend.state.lock().unwrap().allocations().is_empty());
    }

    #[test]
    fn build_failure_carries_the_build_log() {
        let context = MiningContext::new(common::test_settings(DagLoadMode::Parallel));
        let mut manager = manager(context.settings());
        let mut backend = MockBackend::new("broken").failing_build();

        let err = prepare(&mut manager, &mut backend, &Ethash::new(ETHASH_SOURCE), &context, &package(1, 0))
            .unwrap_err();
        match &err {
            MinerError::BuildFailure { device, log, .. } => {
                assert_eq!(device, "broken");
                assert!(log.contains("undeclared identifier"));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err.disables_device());
        assert_eq!(manager.loaded_epoch(), None);
    }

    #[test]
    fn generated_kernel_is_dumped() {
        let dir = tempdir().expect("Failed to create temporary directory");
        let dump = dir.path().join("kernel.cl");
        let mut settings = common::test_settings(DagLoadMode::Parallel);
        settings.kernel_dump_path = Some(dump.clone());
        let context = MiningContext::new(settings);
        let mut manager = manager(context.settings());
        let mut backend = MockBackend::new("mock");

        prepare(&mut manager, &mut backend, &Ethash::new(ETHASH_SOURCE), &context, &package(1, 0)).unwrap();
        let written = std::fs::read_to_string(&dump).unwrap();
        assert_eq!(written, backend.state.lock().unwrap().builds[0].source);
    }

    #[test]
    fn unwritable_dump_path_does_not_fail_the_build() {
        let dir = tempdir().expect("Failed to create temporary directory");
        let mut settings = common::test_settings(DagLoadMode::Parallel);
        settings.kernel_dump_path = Some(dir.path().join("missing").join("kernel.cl"));
        let context = MiningContext::new(settings);
        let mut manager = manager(context.settings());
        let mut backend = MockBackend::new("mock");

        let outcome = prepare(&mut manager, &mut backend, &Ethash::new(ETHASH_SOURCE), &context, &package(1, 0));
        assert_eq!(outcome.unwrap(), PrepareOutcome::Ready);
    }

    #[test]
    fn stop_cancels_dag_generation() {
        let context = MiningContext::new(common::test_settings(DagLoadMode::Parallel));
        let mut manager = manager(context.settings());
        let mut backend = MockBackend::new("mock");
        let variant = Ethash::new(ETHASH_SOURCE);
        let work = package(1, 0);
        let stop = StopSignal::new();
        stop.stop();

        let transition = manager.transition_for(&variant, &work).unwrap();
        let outcome = manager
            .prepare(&mut backend, &variant, &MockOracle::accepting(), &context, &stop, &work, transition)
            .unwrap();
        assert_eq!(outcome, PrepareOutcome::Cancelled);
        assert_eq!(manager.loaded_epoch(), None);
        assert_eq!(backend.state.lock().unwrap().dataset_launches, 0);
    }

    #[test]
    fn stop_cancels_sequential_wait() {
        let context = MiningContext::new(common::test_settings(DagLoadMode::Sequential));
        let mut manager = DatasetManager::new(1, DispatchParams::new(256, GLOBAL as usize));
        let mut backend = MockBackend::new("mock");
        let variant = Ethash::new(ETHASH_SOURCE);
        let work = package(1, 0);
        let stop = StopSignal::new();
        stop.stop();

        let transition = manager.transition_for(&variant, &work).unwrap();
        let outcome = manager
            .prepare(&mut backend, &variant, &MockOracle::accepting(), &context, &stop, &work, transition)
            .unwrap();
        assert_eq!(outcome, PrepareOutcome::Cancelled);
        assert!(backend.state.lock().unwrap().builds.is_empty());
        assert_eq!(context.sequential().next_slot(), 0);
    }
}

// Changelog:
// - v1.0.0 (2025-07-02): Dataset transition tests.
