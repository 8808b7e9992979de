use lset_harness::client::LsetTarget;
use lset_harness::config::{FailurePolicy, HarnessConfig};
use lset_harness::error::AppError;
use lset_harness::harness::{Harness, HarnessState};
use lset_harness::memory::{CallCounts, FaultPlan, MemoryClient};
use lset_harness::runner::WorkloadRunner;
use lset_harness::workload::WorkloadGenerator;
use std::future::Future;
use std::time::Duration;

fn block_on<F: Future>(future: F) -> F::Output {
    let runtime = compio::runtime::Runtime::new().expect("Failed to create Compio runtime");
    runtime.block_on(future)
}

fn faults(create: bool, inserts: &[usize], searches: &[usize]) -> FaultPlan {
    FaultPlan {
        fail_create: create,
        fail_inserts: inserts.iter().copied().collect(),
        fail_searches: searches.iter().copied().collect(),
    }
}

#[test]
fn default_run_finds_every_inserted_value() {
    block_on(async {
        let mut harness =
            Harness::with_client(HarnessConfig::default(), MemoryClient::default()).unwrap();
        assert_eq!(harness.state(), HarnessState::Connected);

        let report = harness.run().await.unwrap();
        assert_eq!(report.insert.success, 15);
        assert_eq!(report.insert.errors, 0);
        let search = report.search.unwrap();
        assert_eq!(search.success, 15);
        assert_eq!(search.not_found, 0);
        assert_eq!(search.errors, 0);
        assert_eq!(report.state, HarnessState::Done);
        assert!(report.status().is_ok());

        // bin 中保存的是去重后的序列，保持首次插入的顺序
        let mut expected = Vec::new();
        for v in WorkloadGenerator::new(200).generate(15) {
            if !expected.contains(&v) {
                expected.push(v);
            }
        }
        let target = LsetTarget::from_config(harness.config());
        assert_eq!(
            harness.client_mut().store_mut().items(&target),
            Some(expected)
        );
        assert_eq!(
            harness.client().calls(),
            CallCounts {
                create: 1,
                insert: 15,
                search: 15
            }
        );
    });
}

#[test]
fn create_failure_issues_no_inserts() {
    block_on(async {
        let client = MemoryClient::default().with_faults(faults(true, &[], &[]));
        let mut harness = Harness::with_client(HarnessConfig::default(), client).unwrap();

        let err = harness.run().await.unwrap_err();
        assert!(matches!(err, AppError::SetCreate(_)));
        assert_eq!(err.exit_code(), 4);
        assert_eq!(harness.state(), HarnessState::Failed);
        assert_eq!(harness.client().calls().insert, 0);
        assert_eq!(harness.client().calls().search, 0);
    });
}

#[test]
fn first_insert_failure_aborts_under_default_policy() {
    block_on(async {
        let client = MemoryClient::default().with_faults(faults(false, &[3], &[]));
        let mut harness = Harness::with_client(HarnessConfig::default(), client).unwrap();

        let report = harness.run().await.unwrap();
        assert_eq!(report.insert.success, 3);
        assert_eq!(report.insert.errors, 1);
        assert!(report.insert.aborted);
        assert!(report.insert.success + report.insert.errors <= 15);
        assert_eq!(report.search, None);
        assert_eq!(report.state, HarnessState::Failed);
        assert!(matches!(report.status(), Err(AppError::InsertPhase(_))));
        assert_eq!(harness.client().calls().insert, 4);
        assert_eq!(harness.client().calls().search, 0);
    });
}

#[test]
fn continue_policy_inserts_the_rest_and_still_verifies() {
    block_on(async {
        let config = HarnessConfig {
            insert_policy: FailurePolicy::Continue,
            ..HarnessConfig::default()
        };
        let client = MemoryClient::default().with_faults(faults(false, &[3], &[]));
        let mut harness = Harness::with_client(config, client).unwrap();

        let report = harness.run().await.unwrap();
        assert_eq!(report.insert.success, 14);
        assert_eq!(report.insert.errors, 1);
        assert!(!report.insert.aborted);

        // 第 3 个值只有在序列别处也出现过时才会被插入
        let values = WorkloadGenerator::new(200).generate(15);
        let skipped = values[3];
        let missing = if values
            .iter()
            .enumerate()
            .any(|(i, v)| i != 3 && *v == skipped)
        {
            0
        } else {
            1
        };
        let search = report.search.unwrap();
        assert_eq!(search.not_found, missing);
        assert_eq!(search.success, 15 - missing);
        assert_eq!(search.errors, 0);
        assert_eq!(report.state, HarnessState::Done);
        assert!(matches!(report.status(), Err(AppError::InsertPhase(_))));
    });
}

#[test]
fn search_attempts_every_item_despite_failures() {
    block_on(async {
        let client = MemoryClient::default().with_faults(faults(false, &[], &[0, 5, 9]));
        let mut harness = Harness::with_client(HarnessConfig::default(), client).unwrap();

        let report = harness.run().await.unwrap();
        let search = report.search.unwrap();
        assert_eq!(search.errors, 3);
        assert_eq!(search.success, 12);
        assert_eq!(search.attempted(), 15);
        assert!(!search.aborted);
        assert_eq!(report.state, HarnessState::Done);
        let err = report.status().unwrap_err();
        assert!(matches!(err, AppError::SearchPhase(_)));
        assert_eq!(err.exit_code(), 6);
    });
}

#[test]
fn search_abort_policy_stops_at_first_failure() {
    block_on(async {
        let config = HarnessConfig {
            search_policy: FailurePolicy::Abort,
            ..HarnessConfig::default()
        };
        let client = MemoryClient::default().with_faults(faults(false, &[], &[4]));
        let mut harness = Harness::with_client(config, client).unwrap();

        let search = harness.run().await.unwrap().search.unwrap();
        assert_eq!(search.success, 4);
        assert_eq!(search.errors, 1);
        assert!(search.aborted);
        assert_eq!(harness.client().calls().search, 5);
    });
}

#[test]
fn missing_values_are_reported_as_not_found() {
    block_on(async {
        let short = HarnessConfig {
            iterations: 5,
            ..HarnessConfig::default()
        };
        let long = HarnessConfig {
            iterations: 15,
            ..HarnessConfig::default()
        };
        let target = LsetTarget::from_config(&long);
        let mut client = MemoryClient::default();

        let insert = WorkloadRunner::run_insert(&mut client, &short, &target)
            .await
            .unwrap();
        assert!(insert.is_clean());

        let values = WorkloadGenerator::new(200).generate(15);
        let inserted = &values[..5];
        let expected_missing = values.iter().filter(|v| !inserted.contains(v)).count();

        let search = WorkloadRunner::run_search(&mut client, &long, &target).await;
        assert_eq!(search.not_found, expected_missing);
        assert_eq!(search.success, 15 - expected_missing);
        assert_eq!(search.errors, 0);
    });
}

#[test]
fn repeated_verification_is_idempotent() {
    block_on(async {
        let mut harness =
            Harness::with_client(HarnessConfig::default(), MemoryClient::default()).unwrap();
        let report = harness.run().await.unwrap();

        let first = harness.verify().await.unwrap();
        let second = harness.verify().await.unwrap();
        assert_eq!(Some(first), report.search);
        assert_eq!(first, second);
        assert_eq!(
            harness.state(),
            HarnessState::Verified {
                done: 15,
                total: 15
            }
        );
    });
}

#[test]
fn slow_calls_hit_the_per_call_timeout() {
    block_on(async {
        let config = HarnessConfig {
            timeout: Duration::from_millis(5),
            ..HarnessConfig::default()
        };
        let client = MemoryClient::default().with_latency(50_000..=50_000, 1);
        let mut harness = Harness::with_client(config, client).unwrap();

        match harness.run().await {
            Err(AppError::SetCreate(msg)) => assert!(msg.contains("exceeded"), "{}", msg),
            other => panic!("expected create timeout, got {:?}", other),
        }
    });
}

#[test]
fn second_create_on_same_bin_fails() {
    block_on(async {
        let config = HarnessConfig::default();
        let target = LsetTarget::from_config(&config);
        let mut client = MemoryClient::default();

        assert!(WorkloadRunner::run_insert(&mut client, &config, &target).await.is_ok());
        let err = WorkloadRunner::run_insert(&mut client, &config, &target)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SetCreate(_)));
        assert_eq!(client.calls().insert, 15);
    });
}

#[test]
fn state_machine_rejects_out_of_order_calls() {
    block_on(async {
        let mut harness =
            Harness::with_client(HarnessConfig::default(), MemoryClient::default()).unwrap();
        assert!(matches!(harness.verify().await, Err(AppError::State(_))));

        harness.run().await.unwrap();
        assert!(matches!(harness.run().await, Err(AppError::State(_))));
    });
}

#[test]
fn zero_iterations_is_a_clean_run() {
    block_on(async {
        let config = HarnessConfig {
            iterations: 0,
            ..HarnessConfig::default()
        };
        let mut harness = Harness::with_client(config, MemoryClient::default()).unwrap();
        let report = harness.run().await.unwrap();
        assert!(report.status().is_ok());
        assert_eq!(harness.client().calls().create, 1);
        assert_eq!(harness.client().calls().insert, 0);
    });
}

#[test]
fn invalid_config_is_rejected_before_running() {
    let config = HarnessConfig {
        namespace: String::new(),
        ..HarnessConfig::default()
    };
    let err = Harness::with_client(config, MemoryClient::default())
        .err()
        .unwrap();
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn oversized_record_ttl_is_a_config_error_in_memory_mode() {
    let config = HarnessConfig {
        record_ttl: Duration::from_secs(40_000_000_000),
        ..HarnessConfig::default()
    };
    let client = MemoryClient::from_config(&config);
    let err = Harness::with_client(config, client).err().unwrap();
    assert!(matches!(err, AppError::Config(_)));
    assert_eq!(err.exit_code(), 2);
}
