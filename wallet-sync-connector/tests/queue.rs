use anyhow::anyhow;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use tokio::time::{sleep, Duration};
use wallet_sync_connector::queue::{BoundedQueue, QueueReport, TaskUnit};

/// A unit that fails its first `failures` attempts and then returns `value`.
fn flaky(label: &str, failures: usize, value: u32) -> TaskUnit<u32> {
    let attempts = Arc::new(AtomicUsize::new(0));
    TaskUnit::new(label, move || {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst);
        async move {
            if attempt < failures {
                Err(anyhow!("attempt {} failed", attempt + 1))
            } else {
                Ok(value)
            }
        }
    })
}

#[tokio::test(start_paused = true)]
async fn in_flight_never_exceeds_the_limit() {
    let gauge = Arc::new(AtomicUsize::new(0));
    let observed_peak = Arc::new(AtomicUsize::new(0));
    let mut queue = BoundedQueue::new("limited", 3, 0);

    for i in 0..20u64 {
        let gauge = gauge.clone();
        let observed_peak = observed_peak.clone();
        queue.add(TaskUnit::new(format!("unit {}", i), move || {
            let gauge = gauge.clone();
            let observed_peak = observed_peak.clone();
            async move {
                let now = gauge.fetch_add(1, Ordering::SeqCst) + 1;
                observed_peak.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(10 + i % 4)).await;
                gauge.fetch_sub(1, Ordering::SeqCst);
                Ok(i)
            }
        }));
    }

    let report = queue.consume().await;
    assert_eq!(report.total, 20);
    assert_eq!(report.succeeded(), 20);
    assert_eq!(report.peak_in_flight, 3);
    assert!(observed_peak.load(Ordering::SeqCst) <= 3);
}

#[tokio::test]
async fn a_limit_of_zero_still_makes_progress() {
    let mut queue = BoundedQueue::new("zero", 0, 0);
    queue.add(flaky("only", 0, 7));
    let report = queue.consume().await;
    assert_eq!(report.outputs, vec![7]);
    assert_eq!(report.peak_in_flight, 1);
}

#[tokio::test]
async fn toleration_covers_exactly_that_many_failures() {
    let mut queue = BoundedQueue::new("tolerant", 4, 2);
    queue.add(flaky("recovers", 2, 1));
    queue.add(flaky("gives up", 3, 2));

    let report = queue.consume().await;
    assert_eq!(report.total, 2);
    assert_eq!(report.outputs, vec![1]);
    assert_eq!(report.failed(), 1);

    let failure = &report.failures[0];
    assert_eq!(failure.label, "gives up");
    assert_eq!(failure.attempts, 3);
    assert!(failure.error.to_string().contains("attempt 3 failed"));
}

#[tokio::test]
async fn failures_do_not_affect_other_units() {
    let mut queue = BoundedQueue::new("mixed", 2, 0);
    for i in 0..5 {
        queue.add(flaky(&format!("unit {}", i), usize::from(i % 2 == 1), i));
    }

    let report = queue.consume().await;
    let mut outputs = report.outputs.clone();
    outputs.sort();
    assert_eq!(outputs, vec![0, 2, 4]);
    assert_eq!(report.failed(), 2);
    assert_eq!(report.settled(), report.total);
}

#[tokio::test]
async fn on_finished_fires_once_after_every_retry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(None));

    let mut queue = {
        let calls = calls.clone();
        let seen = seen.clone();
        BoundedQueue::new("callback", 2, 1).on_finished(move |report: &QueueReport<u32>| {
            calls.fetch_add(1, Ordering::SeqCst);
            *seen.lock().unwrap() = Some((report.succeeded(), report.failed(), report.total));
        })
    };
    queue.add(flaky("first", 1, 1));
    queue.add(flaky("second", 0, 2));
    queue.add(flaky("third", 5, 3));

    let report = queue.consume().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(*seen.lock().unwrap(), Some((2, 1, 3)));
    assert!(!report.all_succeeded());
}

#[tokio::test]
async fn empty_queue_finishes_immediately() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let queue = BoundedQueue::<u32>::new("empty", 3, 0).on_finished(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let report = queue.consume().await;
    assert_eq!(report.total, 0);
    assert_eq!(report.peak_in_flight, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn units_are_admitted_in_insertion_order() {
    let started = Arc::new(Mutex::new(Vec::new()));
    let mut queue = BoundedQueue::new("fifo", 1, 0);

    for i in 0..5u32 {
        let started = started.clone();
        queue.add(TaskUnit::new(format!("unit {}", i), move || {
            started.lock().unwrap().push(i);
            async move { Ok(i) }
        }));
    }

    let report = queue.consume().await;
    assert_eq!(*started.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    assert_eq!(report.outputs, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn retried_units_rejoin_at_the_tail() {
    let started = Arc::new(Mutex::new(Vec::new()));
    let mut queue = BoundedQueue::new("tail", 1, 1);

    for (i, failures) in [(0u32, 1usize), (1, 0), (2, 0)] {
        let started = started.clone();
        let attempts = Arc::new(AtomicUsize::new(0));
        queue.add(TaskUnit::new(format!("unit {}", i), move || {
            started.lock().unwrap().push(i);
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < failures {
                    Err(anyhow!("not yet"))
                } else {
                    Ok(i)
                }
            }
        }));
    }

    let report = queue.consume().await;
    assert_eq!(*started.lock().unwrap(), vec![0, 1, 2, 0]);
    assert_eq!(report.outputs, vec![1, 2, 0]);
}

#[tokio::test]
async fn handles_can_add_work_while_consuming() {
    let mut queue = BoundedQueue::new("handles", 2, 0);
    let handle = queue.handle();

    queue.add(TaskUnit::new("parent", move || {
        let handle = handle.clone();
        async move {
            let accepted = handle.add(TaskUnit::new("child", || async { Ok("child") }));
            assert!(accepted);
            Ok("parent")
        }
    }));

    let report = queue.consume().await;
    assert_eq!(report.total, 2);
    assert_eq!(report.outputs, vec!["parent", "child"]);
}

#[tokio::test]
async fn settle_retries_on_the_current_task() {
    let mut unit = flaky("direct", 2, 9).with_retries(2);
    assert_eq!(unit.settle().await.unwrap(), 9);
    assert_eq!(unit.attempts(), 3);
    assert_eq!(unit.retries_remaining(), 0);

    let mut unit = flaky("direct", 1, 9);
    assert!(unit.settle().await.is_err());
    assert_eq!(unit.attempts(), 1);
}
