mod common;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use common::mock_service::{MockService, Response};
use votifast_core::error::DownloadError;
use votifast_core::http::HttpClient;
use votifast_core::job::DownloadJob;
use votifast_core::queue::JobQueue;
use votifast_core::storage::temp_path;
use votifast_core::worker::DownloadWorker;

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn streams_body_to_destination_and_reports_progress() {
    let service = MockService::start();
    let body = payload(256 * 1024);
    {
        let body = body.clone();
        service.route("/audio/file", move |_| Response::bytes(body.clone()));
    }
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("work").join("file.mp4");

    let seen = Arc::new(AtomicU64::new(0));
    let sink = {
        let seen = Arc::clone(&seen);
        Arc::new(move |n: u64| {
            seen.fetch_add(n, Ordering::SeqCst);
        })
    };
    let (job, completion) = DownloadJob::new(service.url("/audio/file"), &output);
    DownloadWorker::new(HttpClient::new())
        .run(job.with_progress(sink))
        .await;

    let bytes = completion.wait().await.unwrap();
    assert_eq!(bytes, body.len() as u64);
    assert_eq!(seen.load(Ordering::SeqCst), body.len() as u64);
    assert_eq!(std::fs::read(&output).unwrap(), body);
    assert!(!temp_path(&output).exists());
}

#[tokio::test]
async fn http_error_leaves_nothing_behind() {
    let service = MockService::start();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("missing.mp4");

    let (job, completion) = DownloadJob::new(service.url("/audio/nope"), &output);
    DownloadWorker::new(HttpClient::new()).run(job).await;

    let err = completion.wait().await.unwrap_err();
    assert!(matches!(err, DownloadError::Status(404)), "{err:?}");
    assert!(!output.exists());
    assert!(!temp_path(&output).exists());
    assert_eq!(service.hits("/audio/nope"), 1, "downloads are not retried");
}

#[tokio::test]
async fn unreachable_host_is_a_transfer_error() {
    // Bind then drop to get a port nobody listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("x.mp4");

    let (job, completion) = DownloadJob::new(format!("http://127.0.0.1:{port}/x"), &output);
    DownloadWorker::new(HttpClient::new()).run(job).await;

    assert!(matches!(
        completion.wait().await.unwrap_err(),
        DownloadError::Transfer(_)
    ));
    assert!(!temp_path(&output).exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pool_completes_every_queued_job() {
    let service = MockService::start();
    service.route("/audio/small", |_| Response::bytes(vec![7u8; 1024]));
    let dir = tempfile::tempdir().unwrap();

    let queue = JobQueue::new();
    let pool = DownloadWorker::new(HttpClient::new()).spawn_pool(3, queue.clone());
    let mut completions = Vec::new();
    for i in 0..6 {
        let (job, completion) =
            DownloadJob::new(service.url("/audio/small"), dir.path().join(format!("{i}.mp4")));
        queue.enqueue(job).await.unwrap();
        completions.push(completion);
    }
    queue.shutdown();
    pool.join().await;
    queue.drain().await;

    for c in completions {
        assert_eq!(c.peek().unwrap().unwrap(), 1024);
    }
    assert_eq!(service.hits("/audio/small"), 6);
}
