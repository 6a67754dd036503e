//! Integration tests for bandsync-core.
//!
//! These run entirely against the in-memory [`MockChannel`]; the tokio test
//! clock is paused, so timeout behavior is deterministic and the suite needs
//! no hardware and no real time.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use bandsync_core::{
    EventReceiver, ExecutorOptions, MockChannel, OrderStatus, OrderTask, ResponseKind,
    SleepIndexTask, SleepStage, SyncEvent, TaskExecutor,
};
use time::{Date, Month, PrimitiveDateTime, Time};

fn last_sync() -> PrimitiveDateTime {
    PrimitiveDateTime::new(
        Date::from_calendar_date(2017, Month::May, 11).unwrap(),
        Time::from_hms(23, 45, 0).unwrap(),
    )
}

fn count_frame(count: u8) -> Vec<u8> {
    vec![0xAA, 0x00, 0x00, count]
}

fn index_chunk(day: u8) -> Vec<u8> {
    vec![0x93, 17, 5, day, 0x01, 0x0E, 0x00, 0xD2, 0x00, 0x0F]
}

fn detail_chunk(index: u8, samples: &[u8]) -> Vec<u8> {
    let mut frame = vec![0x94, index];
    frame.extend_from_slice(samples);
    frame
}

/// Receive the next event, bailing out instead of hanging if none arrives.
async fn next_event(events: &mut EventReceiver) -> SyncEvent {
    timeout(Duration::from_secs(60), events.recv())
        .await
        .expect("no event within budget")
        .expect("event channel closed")
}

fn spawn_executor() -> (Arc<MockChannel>, TaskExecutor, EventReceiver) {
    let channel = Arc::new(MockChannel::new());
    let (executor, events) = TaskExecutor::spawn(channel.clone(), ExecutorOptions::default());
    (channel, executor, events)
}

#[tokio::test(start_paused = true)]
async fn test_full_sync_round_trip() {
    let (channel, executor, mut events) = spawn_executor();

    executor
        .enqueue(Box::new(SleepIndexTask::new(last_sync())))
        .unwrap();

    // Index phase: count, then one summary chunk per day
    executor.handle_frame(count_frame(3)).unwrap();
    for day in 1..=3 {
        executor.handle_frame(index_chunk(day)).unwrap();
    }
    // Record phase: authoritative count, then two detail chunks per day
    executor.handle_frame(count_frame(6)).unwrap();
    for index in 0..3 {
        executor.handle_frame(detail_chunk(index, &[2, 2])).unwrap();
    }
    for index in 0..3 {
        executor.handle_frame(detail_chunk(index, &[1, 0])).unwrap();
    }

    assert!(matches!(
        next_event(&mut events).await,
        SyncEvent::TaskFinished { task, status: OrderStatus::Success } if task == "sleep_index_sync"
    ));
    assert!(matches!(
        next_event(&mut events).await,
        SyncEvent::TaskFinished { task, status: OrderStatus::Success } if task == "sleep_record_sync"
    ));

    match next_event(&mut events).await {
        SyncEvent::SyncCompleted { sleeps } => {
            assert_eq!(sleeps.len(), 3);
            for (i, sleep) in sleeps.iter().enumerate() {
                assert_eq!(sleep.date.day(), i as u8 + 1);
                assert_eq!(sleep.deep_minutes, 270);
                assert_eq!(
                    sleep.stages,
                    vec![
                        SleepStage::Deep,
                        SleepStage::Deep,
                        SleepStage::Light,
                        SleepStage::Awake,
                    ]
                );
            }
        }
        other => panic!("expected SyncCompleted, got {other:?}"),
    }

    // Exactly two outbound requests: index then record, same date fields
    let sent = channel.sent().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], vec![0x2C, 17, 5, 11, 23, 45, 0x93]);
    assert_eq!(sent[1], vec![0x2C, 17, 5, 11, 23, 45, 0x94]);
}

#[tokio::test(start_paused = true)]
async fn test_zero_count_sync_reports_empty() {
    let (channel, executor, mut events) = spawn_executor();

    executor
        .enqueue(Box::new(SleepIndexTask::new(last_sync())))
        .unwrap();
    executor.handle_frame(count_frame(0)).unwrap();

    assert!(matches!(
        next_event(&mut events).await,
        SyncEvent::TaskFinished {
            status: OrderStatus::Success,
            ..
        }
    ));
    match next_event(&mut events).await {
        SyncEvent::SyncCompleted { sleeps } => assert!(sleeps.is_empty()),
        other => panic!("expected empty SyncCompleted, got {other:?}"),
    }

    // No record phase for an empty sync
    assert_eq!(channel.sent().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_without_response_fails_and_advances() {
    let (channel, executor, mut events) = spawn_executor();

    executor
        .enqueue(Box::new(SleepIndexTask::new(last_sync())))
        .unwrap();
    executor
        .enqueue(Box::new(SleepIndexTask::new(last_sync())))
        .unwrap();

    // No frames: the first task aborts at its base deadline, no grace
    assert!(matches!(
        next_event(&mut events).await,
        SyncEvent::TaskFinished { task, status: OrderStatus::Failed } if task == "sleep_index_sync"
    ));

    // The queue advanced: the second task is in flight and can complete
    executor.handle_frame(count_frame(0)).unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        SyncEvent::TaskFinished {
            status: OrderStatus::Success,
            ..
        }
    ));
    assert!(matches!(
        next_event(&mut events).await,
        SyncEvent::SyncCompleted { sleeps } if sleeps.is_empty()
    ));
    assert_eq!(channel.sent().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_established_count_earns_one_grace_extension() {
    let (_channel, executor, mut events) = spawn_executor();
    let started = tokio::time::Instant::now();

    executor
        .enqueue(Box::new(SleepIndexTask::new(last_sync())))
        .unwrap();
    executor.handle_frame(count_frame(3)).unwrap();

    // Deadline was re-armed to 3s + 9 * 100ms, then extended once by the 1s
    // grace window before the abort.
    assert!(matches!(
        next_event(&mut events).await,
        SyncEvent::TaskFinished {
            status: OrderStatus::Failed,
            ..
        }
    ));

    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_millis(4900),
        "aborted before the grace window: {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_millis(5200),
        "aborted too late: {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_session_state_does_not_leak_between_syncs() {
    let (_channel, executor, mut events) = spawn_executor();

    for day in [7u8, 8u8] {
        executor
            .enqueue(Box::new(SleepIndexTask::new(last_sync())))
            .unwrap();
        executor.handle_frame(count_frame(1)).unwrap();
        executor.handle_frame(index_chunk(day)).unwrap();
        executor.handle_frame(count_frame(2)).unwrap();
        executor.handle_frame(detail_chunk(0, &[2])).unwrap();
        executor.handle_frame(detail_chunk(0, &[1])).unwrap();

        loop {
            if let SyncEvent::SyncCompleted { sleeps } = next_event(&mut events).await {
                assert_eq!(sleeps.len(), 1, "previous sync leaked into this one");
                assert_eq!(sleeps[0].date.day(), day);
                assert_eq!(sleeps[0].stages, vec![SleepStage::Deep, SleepStage::Light]);
                break;
            }
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_reset_aborts_in_flight_task_and_goes_idle() {
    let (channel, executor, mut events) = spawn_executor();

    executor
        .enqueue(Box::new(SleepIndexTask::new(last_sync())))
        .unwrap();
    executor.reset().unwrap();

    assert!(matches!(
        next_event(&mut events).await,
        SyncEvent::TaskFinished {
            status: OrderStatus::Failed,
            ..
        }
    ));

    // The executor is idle but alive: a fresh sync still works
    executor
        .enqueue(Box::new(SleepIndexTask::new(last_sync())))
        .unwrap();
    executor.handle_frame(count_frame(0)).unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        SyncEvent::TaskFinished {
            status: OrderStatus::Success,
            ..
        }
    ));
    assert_eq!(channel.sent().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_frames_with_no_task_in_flight_are_dropped() {
    let (channel, executor, mut events) = spawn_executor();

    // Stale traffic before any task exists
    executor.handle_frame(count_frame(5)).unwrap();
    executor.handle_frame(index_chunk(1)).unwrap();

    executor
        .enqueue(Box::new(SleepIndexTask::new(last_sync())))
        .unwrap();
    executor.handle_frame(count_frame(0)).unwrap();

    assert!(matches!(
        next_event(&mut events).await,
        SyncEvent::TaskFinished {
            status: OrderStatus::Success,
            ..
        }
    ));
    assert!(matches!(
        next_event(&mut events).await,
        SyncEvent::SyncCompleted { sleeps } if sleeps.is_empty()
    ));
    assert_eq!(channel.sent().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_write_failure_fails_task_and_advances() {
    let (channel, executor, mut events) = spawn_executor();
    channel.set_should_fail(true);

    executor
        .enqueue(Box::new(SleepIndexTask::new(last_sync())))
        .unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        SyncEvent::TaskFinished {
            status: OrderStatus::Failed,
            ..
        }
    ));

    channel.set_should_fail(false);
    executor
        .enqueue(Box::new(SleepIndexTask::new(last_sync())))
        .unwrap();
    executor.handle_frame(count_frame(0)).unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        SyncEvent::TaskFinished {
            status: OrderStatus::Success,
            ..
        }
    ));
}

struct BuzzTask;

impl OrderTask for BuzzTask {
    fn name(&self) -> &'static str {
        "buzz"
    }

    fn response_kind(&self) -> ResponseKind {
        ResponseKind::None
    }

    fn assemble(&self) -> Vec<u8> {
        vec![0x10, 0x01]
    }
}

#[tokio::test(start_paused = true)]
async fn test_fire_and_forget_task_completes_on_write() {
    let (channel, executor, mut events) = spawn_executor();

    executor.enqueue(Box::new(BuzzTask)).unwrap();
    executor
        .enqueue(Box::new(SleepIndexTask::new(last_sync())))
        .unwrap();

    assert!(matches!(
        next_event(&mut events).await,
        SyncEvent::TaskFinished { task, status: OrderStatus::Success } if task == "buzz"
    ));

    // The awaited task behind it went out in the same advance
    executor.handle_frame(count_frame(0)).unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        SyncEvent::TaskFinished {
            status: OrderStatus::Success,
            ..
        }
    ));
    assert_eq!(channel.sent().await.len(), 2);
}
