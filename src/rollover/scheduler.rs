//! The background task that starts a rollover at the beginning of each month.

use std::time::Duration;

use time::{OffsetDateTime, Time};
use tokio::{sync::oneshot, task::JoinHandle};

use crate::{Error, archive::PeriodLabel, rollover::Rollover, timezone::to_local_time};

/// The shortest time the scheduler sleeps before checking the clock again.
const MIN_WAIT: Duration = Duration::from_secs(1);

/// Settings for the rollover scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// The canonical timezone whose calendar months are the periods, e.g.
    /// "Pacific/Auckland".
    pub timezone: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timezone: "Etc/UTC".to_owned(),
        }
    }
}

/// A handle to a running scheduler task.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown_sender: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the scheduler and wait for it to exit.
    ///
    /// A rollover that is already running is finished first.
    pub async fn shutdown(self) {
        // The task may have already exited, in which case there is nobody to tell.
        let _ = self.shutdown_sender.send(());

        if let Err(error) = self.task.await {
            tracing::error!("Rollover scheduler task failed: {error}");
        }
    }
}

/// Spawn a task that runs `rollover` for the month that just ended at the
/// first moment of every calendar month in the configured timezone.
///
/// # Errors
/// Returns [Error::InvalidTimezoneError] if the configured timezone is not recognised.
pub fn spawn_scheduler(
    rollover: Rollover,
    config: SchedulerConfig,
) -> Result<SchedulerHandle, Error> {
    spawn_scheduler_with_clock(rollover, config, OffsetDateTime::now_utc)
}

/// Like [spawn_scheduler], but reads the current time from `clock`.
pub(crate) fn spawn_scheduler_with_clock<C>(
    rollover: Rollover,
    config: SchedulerConfig,
    clock: C,
) -> Result<SchedulerHandle, Error>
where
    C: Fn() -> OffsetDateTime + Send + 'static,
{
    to_local_time(clock(), &config.timezone)?;

    let (shutdown_sender, shutdown_receiver) = oneshot::channel();
    let task = tokio::spawn(run_scheduler(rollover, config, clock, shutdown_receiver));

    tracing::info!("Rollover scheduler started");

    Ok(SchedulerHandle {
        shutdown_sender,
        task,
    })
}

async fn run_scheduler<C>(
    rollover: Rollover,
    config: SchedulerConfig,
    clock: C,
    mut shutdown_receiver: oneshot::Receiver<()>,
) where
    C: Fn() -> OffsetDateTime,
{
    loop {
        let Ok(now) = to_local_time(clock(), &config.timezone) else {
            tracing::error!(
                "Invalid timezone {}, stopping the rollover scheduler",
                config.timezone
            );
            return;
        };
        let current = PeriodLabel::containing(now.date());
        let wait = duration_until_next_period(now);

        tracing::debug!("Next rollover check in {wait:?}");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {},
            _ = &mut shutdown_receiver => {
                tracing::debug!("Rollover scheduler received shutdown signal.");
                return;
            },
        }

        let Ok(now) = to_local_time(clock(), &config.timezone) else {
            continue;
        };
        if PeriodLabel::containing(now.date()) == current {
            tracing::warn!("Rollover timer fired before the end of {current}, waiting again");
            continue;
        }

        match rollover.run(current).await {
            Ok(report) if !report.failed.is_empty() => tracing::warn!(
                "Rollover for {current} finished with {} failed owners",
                report.failed.len()
            ),
            Ok(_) => {}
            Err(error) => tracing::error!("Rollover for {current} did not run: {error}"),
        }
    }
}

/// How long to wait from `now` until the first moment of the next calendar month.
///
/// The boundary is taken in the same UTC offset as `now`, so a daylight
/// saving change during the month can make the wait end up to an hour early.
/// Callers should check the period again after waking up.
pub fn duration_until_next_period(now: OffsetDateTime) -> Duration {
    let next = PeriodLabel::containing(now.date()).next();
    let Ok(first_day) = next.first_day() else {
        return MIN_WAIT;
    };
    let boundary = first_day.with_time(Time::MIDNIGHT).assume_offset(now.offset());

    Duration::try_from(boundary - now)
        .unwrap_or(MIN_WAIT)
        .max(MIN_WAIT)
}
