use std::time::Duration;
use volley::*;
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve(delay: Duration) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("ok")
                .set_delay(delay),
        )
        .mount(&server)
        .await;
    server
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_five_workers_all_report() {
    let server = serve(Duration::ZERO).await;
    let config = WorkerConfig {
        concurrency: 5,
        duration: Duration::from_millis(300),
        ..WorkerConfig::new(server.uri())
    };

    let summary = Runner::new(config).unwrap().run().await.unwrap();
    assert_eq!(summary.workers.len(), 5);
    assert_eq!(summary.lost_workers, 0);

    let requests: u64 = summary.workers.iter().map(|s| s.num_requests).sum();
    let bytes: u64 = summary.workers.iter().map(|s| s.resp_size).sum();
    assert!(requests > 0);
    assert_eq!(summary.total.num_requests, requests);
    assert_eq!(summary.total.num_2x, requests);
    assert_eq!(summary.total.resp_size, bytes);
    assert!(summary.total.min_request_time <= summary.total.max_request_time);
    assert!(summary.finished_at >= summary.started_at);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_external_stop_ends_run_early() {
    let server = serve(Duration::from_millis(50)).await;
    let config = WorkerConfig {
        concurrency: 3,
        duration: Duration::from_secs(30),
        ..WorkerConfig::new(server.uri())
    };

    let runner = Runner::new(config).unwrap();
    let interrupt = runner.interrupt();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        interrupt.stop();
    });

    let summary = runner.run().await.unwrap();
    assert!(summary.elapsed < Duration::from_secs(5));
    assert_eq!(summary.workers.len(), 3);
}

#[tokio::test]
async fn test_stop_before_run_sends_empty_records() {
    let config = WorkerConfig {
        concurrency: 4,
        ..WorkerConfig::new("http://127.0.0.1:9/")
    };
    let runner = Runner::new(config).unwrap();
    runner.stop();

    let summary = runner.run().await.unwrap();
    assert_eq!(summary.workers.len(), 4);
    assert_eq!(summary.total.total_attempts(), 0);
}

#[test]
fn test_invalid_config_rejected() {
    assert!(matches!(
        Runner::new(WorkerConfig::new("not a url")),
        Err(ConfigError::InvalidUrl { .. })
    ));
}
