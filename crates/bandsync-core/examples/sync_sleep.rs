//! Example: Running a Sleep Sync
//!
//! This example drives a full two-phase sleep sync against the in-memory
//! mock channel, standing in for a real band. It shows the wiring an
//! embedding application needs: spawn the executor over a channel, enqueue
//! an index task, feed inbound frames to `handle_frame`, and consume the
//! event channel.
//!
//! Run with: `cargo run --example sync_sleep`

use std::sync::Arc;

use bandsync_core::{ExecutorOptions, MockChannel, SleepIndexTask, SyncEvent, TaskExecutor};
use time::{Date, Month, PrimitiveDateTime, Time};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let channel = Arc::new(MockChannel::new());
    let (executor, mut events) = TaskExecutor::spawn(channel.clone(), ExecutorOptions::default());

    // Sync everything recorded since this timestamp
    let last_sync = PrimitiveDateTime::new(
        Date::from_calendar_date(2017, Month::May, 11)?,
        Time::from_hms(23, 45, 0)?,
    );
    executor.enqueue(Box::new(SleepIndexTask::new(last_sync)))?;

    // Play the band's side of the exchange: a count, two summary chunks,
    // the detail count, then two detail chunks per day.
    executor.handle_frame(vec![0xAA, 0x93, 0x00, 0x02])?;
    executor.handle_frame(vec![0x93, 17, 5, 10, 0x01, 0x0E, 0x00, 0xD2, 0x00, 0x0F])?;
    executor.handle_frame(vec![0x93, 17, 5, 11, 0x01, 0x2C, 0x00, 0xB4, 0x00, 0x1E])?;
    executor.handle_frame(vec![0xAA, 0x94, 0x00, 0x04])?;
    for index in 0..2u8 {
        executor.handle_frame(vec![0x94, index, 2, 2, 2, 1])?;
        executor.handle_frame(vec![0x94, index, 1, 1, 0, 0])?;
    }

    while let Some(event) = events.recv().await {
        match event {
            SyncEvent::TaskFinished { task, status } => {
                println!("task {task} finished: {status:?}");
            }
            SyncEvent::SyncCompleted { sleeps } => {
                println!();
                println!("Synced {} days:", sleeps.len());
                for sleep in &sleeps {
                    println!(
                        "  {}: deep {} min, light {} min, awake {} min, {} samples",
                        sleep.date,
                        sleep.deep_minutes,
                        sleep.light_minutes,
                        sleep.awake_minutes,
                        sleep.stages.len()
                    );
                }
                break;
            }
            _ => {}
        }
    }

    println!();
    println!("Requests written to the channel:");
    for frame in channel.sent().await {
        println!("  {frame:02X?}");
    }

    Ok(())
}
