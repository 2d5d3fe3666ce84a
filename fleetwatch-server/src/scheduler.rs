//! Playback scheduler
//!
//! A single fixed-interval loop drives every playing vessel. Each tick takes
//! the engine write lock once, advances all vessels, and publishes the
//! resulting alerts on the session broadcast channel.

use std::time::Duration;

use fleetwatch_core::AlertRecord;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tokio_graceful_shutdown::SubsystemHandle;

use crate::{Session, SharedEngine};

pub struct Scheduler {
    engine: SharedEngine,
    tx_alerts: broadcast::Sender<AlertRecord>,
    tick_interval: Duration,
}

impl Scheduler {
    pub fn new(session: &Session) -> Self {
        Scheduler {
            engine: session.engine(),
            tx_alerts: session.alerts_sender(),
            tick_interval: session.config().tick_interval,
        }
    }

    /// Advance every playing vessel by one point, timestamped with wall-clock time
    pub fn tick_once(&self) -> Vec<AlertRecord> {
        let now_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
        self.tick_at(now_ms)
    }

    fn tick_at(&self, timestamp: u64) -> Vec<AlertRecord> {
        let alerts = {
            let mut engine = self.engine.write().unwrap();
            if engine.playing_count() == 0 {
                return Vec::new();
            }
            engine.tick(timestamp)
        };

        for alert in &alerts {
            log::info!(
                "ALERT: {} entered restricted zone '{}'",
                alert.vessel_name,
                alert.zone_name
            );
            // No subscribers is fine, alerts stay in the engine log
            let _ = self.tx_alerts.send(alert.clone());
        }

        alerts
    }

    pub async fn run(
        self,
        subsys: SubsystemHandle,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        log::info!(
            "Scheduler: ticking every {} ms",
            self.tick_interval.as_millis()
        );

        let mut tick_timer = interval(self.tick_interval);
        tick_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = subsys.on_shutdown_requested() => {
                    log::info!("Scheduler: Shutdown requested");
                    break;
                }
                _ = tick_timer.tick() => {
                    let alerts = self.tick_once();
                    if !alerts.is_empty() {
                        log::debug!("Scheduler: {} alerts this tick", alerts.len());
                    }
                }
            }
        }

        Ok(())
    }
}
