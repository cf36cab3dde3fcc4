//! End-to-end runs against the embedded arithmetic server (real time).

use load_test::{LoadRunner, ScenarioConfig, TcpComm, TcpServer};
use loadgen::{Generator, GeneratorStatus, ParamSet, RetCode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_test::assert_ok;

fn scenario(lps: u32, duration_secs: u64) -> ScenarioConfig {
    let mut config = ScenarioConfig::quick(lps, duration_secs);
    config.name = "e2e".to_string();
    config.timeout_ms = 500;
    config.result_buffer = 1000;
    config
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_run_against_embedded_server() {
    let results = assert_ok!(LoadRunner::new(scenario(200, 1)).run().await);

    assert!(
        (150..=210).contains(&results.calls_dispatched),
        "dispatched {}",
        results.calls_dispatched
    );
    assert!(results.results_received > 0);
    assert!(results.successful_calls > 0);
    assert_eq!(results.final_status, GeneratorStatus::Stopped);
    assert_eq!(results.results_dropped + results.results_received, results.calls_dispatched);

    for failure in [RetCode::ErrorResponse, RetCode::ErrorCallee, RetCode::FatalCall] {
        assert!(
            results.codes.iter().all(|c| c.code != failure.code()),
            "unexpected {failure}: {:?}",
            results.codes
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_after_ends_run_early() {
    let mut config = scenario(100, 30);
    config.stop_after_secs = Some(1);

    let started = Instant::now();
    let results = assert_ok!(LoadRunner::new(config).run().await);

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(results.calls_dispatched > 0);
    assert!(results.calls_dispatched < 1000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_generator_stop_closes_sink() {
    let server = TcpServer::bind("127.0.0.1:0").await.unwrap();
    let (tx, mut rx) = mpsc::channel(1000);
    let params = ParamSet::new(Arc::new(TcpComm::new(server.local_addr().to_string())), tx)
        .timeout(Duration::from_millis(500))
        .loads_per_second(100)
        .duration(Duration::from_secs(30));
    let generator = Generator::new(params).unwrap();

    assert!(generator.start());
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(generator.stop().await);
    assert_eq!(generator.status(), GeneratorStatus::Stopped);

    let mut received = 0;
    while let Some(result) = rx.recv().await {
        assert_ne!(result.code, RetCode::ErrorResponse, "{result}");
        received += 1;
    }
    assert!(received as u64 <= generator.call_count());
    assert!(generator.call_count() > 0);
    server.close();
}

#[tokio::test]
async fn test_run_rejects_invalid_scenario() {
    let mut config = scenario(100, 1);
    config.loads_per_second = 0;
    let err = LoadRunner::new(config).run().await.unwrap_err();
    assert!(err.to_string().contains("Invalid lps"), "{err}");
}
