// src/ticker.rs - Recurring countdown refresh
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};

use crate::{calculate_countdown, Clock, Countdown, CountdownError, Result, SystemClock};

/// Refresh period used when none is configured
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub enum TickerCommand {
    /// Count down to a different date from now on
    Retarget(DateTime<Utc>),
    /// Stop refreshing
    Stop,
}

/// Recomputes a countdown on a fixed period and publishes the latest value.
///
/// Consumers read values through [`CountdownTicker::subscribe`]. A running
/// ticker must be stopped (or dropped) when its view goes away.
pub struct CountdownTicker {
    /// Channel to send commands to the refresh task
    command_tx: mpsc::Sender<TickerCommand>,

    /// Handle to the refresh task
    task: Option<JoinHandle<()>>,

    /// Latest countdown
    values: watch::Receiver<Countdown>,

    target: DateTime<Utc>,
}

impl CountdownTicker {
    /// Starts refreshing the countdown to `target` every `period` using the
    /// wall clock.
    pub fn start(target: DateTime<Utc>, period: Duration) -> Self {
        Self::start_with_clock(target, period, Arc::new(SystemClock))
    }

    pub fn start_with_clock(target: DateTime<Utc>, period: Duration, clock: Arc<dyn Clock>) -> Self {
        let period = if period.is_zero() {
            DEFAULT_REFRESH_INTERVAL
        } else {
            period
        };
        info!("Starting countdown ticker for {} every {:?}", target, period);

        let (values_tx, values) = watch::channel(calculate_countdown(target, clock.now()));
        let (command_tx, mut command_rx) = mpsc::channel(10);

        let task = tokio::spawn(async move {
            let mut target = target;
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval.tick().await; // Initial tick

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if values_tx.send(calculate_countdown(target, clock.now())).is_err() {
                            debug!("No countdown observers left, ticker exiting");
                            break;
                        }
                    }
                    cmd = command_rx.recv() => match cmd {
                        Some(TickerCommand::Retarget(date)) => {
                            debug!("Ticker retargeted to {}", date);
                            target = date;
                            interval.reset();
                            let _ = values_tx.send(calculate_countdown(target, clock.now()));
                        }
                        Some(TickerCommand::Stop) | None => {
                            debug!("Countdown ticker stopping...");
                            break;
                        }
                    }
                }
            }
        });

        Self {
            command_tx,
            task: Some(task),
            values,
            target,
        }
    }

    /// Observes countdown values; the current one is available immediately.
    pub fn subscribe(&self) -> watch::Receiver<Countdown> {
        self.values.clone()
    }

    pub fn latest(&self) -> Countdown {
        *self.values.borrow()
    }

    pub fn target(&self) -> DateTime<Utc> {
        self.target
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Switches to a new target date and recomputes right away.
    pub async fn retarget(&mut self, date: DateTime<Utc>) -> Result<()> {
        if !self.is_running() {
            return Err(CountdownError::ApplicationError {
                message: "Countdown ticker is not running".to_string(),
            });
        }

        self.command_tx
            .send(TickerCommand::Retarget(date))
            .await
            .map_err(|e| CountdownError::ApplicationError {
                message: format!("Failed to send retarget command: {}", e),
            })?;
        self.target = date;
        Ok(())
    }

    /// Stops the refresh task. Stopping a stopped ticker does nothing.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            if let Err(e) = self.command_tx.send(TickerCommand::Stop).await {
                debug!("Ticker task already gone: {}", e);
            }

            if let Err(e) = task.await {
                let error_msg = format!("Failed to stop countdown ticker: {}", e);
                error!("{}", error_msg);
                return Err(CountdownError::ApplicationError { message: error_msg });
            }
            info!("Countdown ticker stopped");
        } else {
            debug!("Countdown ticker is not running");
        }

        Ok(())
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn set(&self, now: DateTime<Utc>) {
            *self.0.lock().unwrap() = now;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn t() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn publishes_initial_value_immediately() {
        let clock = Arc::new(ManualClock(Mutex::new(t())));
        let mut ticker = CountdownTicker::start_with_clock(
            t() + chrono::Duration::seconds(10),
            Duration::from_millis(10),
            clock,
        );
        assert_eq!(ticker.latest().seconds, 10);
        assert!(ticker.is_running());
        ticker.stop().await.unwrap();
    }

    #[tokio::test]
    async fn refreshes_as_time_passes() {
        let clock = Arc::new(ManualClock(Mutex::new(t())));
        let mut ticker = CountdownTicker::start_with_clock(
            t() + chrono::Duration::seconds(10),
            Duration::from_millis(5),
            clock.clone(),
        );
        let mut values = ticker.subscribe();

        clock.set(t() + chrono::Duration::seconds(4));
        let seen = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                values.changed().await.unwrap();
                if values.borrow().seconds == 6 {
                    break;
                }
            }
        })
        .await;
        assert!(seen.is_ok());
        ticker.stop().await.unwrap();
    }

    #[tokio::test]
    async fn retarget_recomputes_immediately() {
        let clock = Arc::new(ManualClock(Mutex::new(t())));
        let mut ticker =
            CountdownTicker::start_with_clock(t(), Duration::from_secs(3600), clock);
        let mut values = ticker.subscribe();

        ticker
            .retarget(t() - chrono::Duration::minutes(2))
            .await
            .unwrap();
        values.changed().await.unwrap();
        let countdown = *values.borrow();
        assert!(countdown.is_overdue);
        assert_eq!(countdown.minutes, 2);
        assert_eq!(ticker.target(), t() - chrono::Duration::minutes(2));
        ticker.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let mut ticker = CountdownTicker::start(Utc::now(), Duration::from_millis(10));
        ticker.stop().await.unwrap();
        ticker.stop().await.unwrap();
        assert!(!ticker.is_running());
        assert!(ticker.retarget(Utc::now()).await.is_err());
    }
}
