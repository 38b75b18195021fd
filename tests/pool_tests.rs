
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;

use parallel_lite::diagnostics::{Diagnostics, NoopDiagnostics};
use parallel_lite::output::OutputWriter;
use parallel_lite::scheduler::{work_queue, Record};
use parallel_lite::worker::{InvocationRunner, WorkerPool};
use test_harness::{template, BrokenWriter, RecordingDiagnostics, ScriptedRunner};

fn invoker(runner: Arc<ScriptedRunner>, timeout: Option<Duration>) -> InvocationRunner {
    let diagnostics: Arc<dyn Diagnostics> = Arc::new(NoopDiagnostics);
    InvocationRunner::new(Arc::new(template(&["fake"])), timeout, runner, diagnostics)
}

#[tokio::test]
async fn test_pool_drains_queue_and_signals_once_per_worker() {
    let runner = Arc::new(ScriptedRunner::new());
    let (tx, queue) = work_queue(3);
    let (sink, writer) = OutputWriter::new(tokio::io::sink(), Arc::new(NoopDiagnostics)).spawn(3);

    let pool = WorkerPool::new(3, invoker(runner.clone(), None), Arc::new(NoopDiagnostics));
    assert_eq!(pool.jobs(), 3);
    let completion = pool.spawn(queue, sink);

    for i in 1..=10 {
        tx.send(Record::new(i, format!("r{}", i))).await.unwrap();
    }
    drop(tx);

    let reports = completion.wait().await.unwrap();
    assert_eq!(reports.len(), 3);
    assert_eq!(reports.iter().map(|r| r.processed).sum::<u64>(), 10);
    assert_eq!(reports.iter().map(|r| r.succeeded).sum::<u64>(), 10);

    let output = writer.await.unwrap();
    assert_eq!(output.blocks, 10);
    assert_eq!(runner.last_args().len(), 10);
}

#[tokio::test]
async fn test_workers_wait_for_work_until_queue_closes() {
    let runner = Arc::new(ScriptedRunner::new());
    let (tx, queue) = work_queue(2);
    let (sink, _writer) = OutputWriter::new(tokio::io::sink(), Arc::new(NoopDiagnostics)).spawn(2);
    let completion = WorkerPool::new(2, invoker(runner, None), Arc::new(NoopDiagnostics))
        .spawn(queue, sink);

    let waiting = tokio::spawn(completion.wait());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiting.is_finished(), "workers quit before the queue closed");

    drop(tx);
    let reports = waiting.await.unwrap().unwrap();
    assert!(reports.iter().all(|r| r.processed == 0));
}

#[tokio::test]
async fn test_failures_are_counted_per_worker() {
    let runner = Arc::new(ScriptedRunner::new().failing_on(&["bad"]));
    let (tx, queue) = work_queue(1);
    let (sink, writer) = OutputWriter::new(tokio::io::sink(), Arc::new(NoopDiagnostics)).spawn(1);
    let completion =
        WorkerPool::new(1, invoker(runner, None), Arc::new(NoopDiagnostics)).spawn(queue, sink);

    for (i, line) in ["ok", "bad", "ok", "bad"].iter().enumerate() {
        tx.send(Record::new(i as u64 + 1, *line)).await.unwrap();
    }
    drop(tx);

    let reports = completion.wait().await.unwrap();
    assert_eq!(reports[0].processed, 4);
    assert_eq!(reports[0].succeeded, 2);
    assert_eq!(reports[0].failed, 2);
    assert_eq!(writer.await.unwrap().blocks, 2);
}

#[tokio::test]
async fn test_invocation_runner_passes_timeout_through() {
    let runner = Arc::new(ScriptedRunner::new());
    let invoker = invoker(runner.clone(), Some(Duration::from_secs(3)));

    assert_eq!(invoker.timeout(), Some(Duration::from_secs(3)));
    let output = invoker.invoke(0, &Record::new(1, "abc")).await.unwrap();
    assert_eq!(output, b"abc\n");
    assert_eq!(
        runner.calls.lock().unwrap().clone(),
        vec![vec!["fake".to_string(), "abc".to_string()]]
    );
}

#[tokio::test]
async fn test_output_writer_skips_empty_blocks() {
    let (writer, mut reader) = tokio::io::duplex(1024);
    let (sink, handle) = OutputWriter::new(writer, Arc::new(NoopDiagnostics)).spawn(4);

    sink.write(b"first\n".to_vec()).await;
    sink.write(Vec::new()).await;
    sink.write(b"second\n".to_vec()).await;
    drop(sink);

    let report = handle.await.unwrap();
    assert_eq!(report.blocks, 2);
    assert_eq!(report.bytes, 13);
    assert!(report.error.is_none());

    let mut written = String::new();
    reader.read_to_string(&mut written).await.unwrap();
    assert_eq!(written, "first\nsecond\n");
}

#[tokio::test]
async fn test_output_writer_waits_for_every_sink() {
    let (sink, handle) = OutputWriter::new(tokio::io::sink(), Arc::new(NoopDiagnostics)).spawn(1);
    let other = sink.clone();
    drop(sink);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!handle.is_finished());

    other.write(b"late\n".to_vec()).await;
    drop(other);
    assert_eq!(handle.await.unwrap().blocks, 1);
}

#[tokio::test]
async fn test_output_writer_closes_sinks_after_error() {
    let diagnostics = RecordingDiagnostics::new();
    let (sink, handle) = OutputWriter::new(BrokenWriter, diagnostics.clone()).spawn(4);
    assert!(!sink.is_closed());

    assert!(sink.write(b"lost\n".to_vec()).await);
    tokio::time::timeout(Duration::from_secs(5), sink.closed())
        .await
        .expect("sink stayed open after a failed write");
    assert!(!sink.write(b"later\n".to_vec()).await);
    drop(sink);

    let report = handle.await.unwrap();
    assert_eq!(report.blocks, 0);
    assert!(report.error.is_some());
    assert_eq!(diagnostics.output_errors.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_workers_stop_taking_records_after_output_fails() {
    let runner = Arc::new(ScriptedRunner::new());
    let diagnostics = RecordingDiagnostics::new();
    let (tx, queue) = work_queue(2);
    let (sink, writer) = OutputWriter::new(BrokenWriter, diagnostics.clone()).spawn(2);
    let completion =
        WorkerPool::new(2, invoker(runner.clone(), None), diagnostics.clone()).spawn(queue, sink);

    // Keep the queue open; the workers must quit on their own.
    let feeder = tokio::spawn(async move {
        for i in 1..=1000 {
            if tx.send(Record::new(i, format!("r{}", i))).await.is_err() {
                break;
            }
        }
        std::future::pending::<()>().await
    });

    let reports = tokio::time::timeout(Duration::from_secs(10), completion.wait())
        .await
        .expect("workers kept running against a failed output")
        .unwrap();
    feeder.abort();

    assert_eq!(reports.len(), 2);
    assert!(runner.call_count() < 20, "ran {} invocations", runner.call_count());
    let mut stopped = diagnostics.stopped.lock().unwrap().clone();
    stopped.sort();
    assert_eq!(stopped, vec![0, 1]);
    assert!(writer.await.unwrap().error.is_some());
}
