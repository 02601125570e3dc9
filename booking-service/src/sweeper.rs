use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info};

use crate::repository::ReservationRepository;

/// Releases slots held by reservations whose charge never completed, e.g.
/// when the process died between holding the slot and storing the payment.
pub struct OrphanSweeper {
    reservations: Arc<dyn ReservationRepository>,
    interval: Duration,
    grace: Duration,
}

impl OrphanSweeper {
    pub fn new(reservations: Arc<dyn ReservationRepository>, interval: Duration, grace: Duration) -> Self {
        Self {
            reservations,
            interval,
            grace,
        }
    }

    pub async fn run(&self) {
        let mut interval = time::interval(self.interval);

        loop {
            interval.tick().await;

            if let Err(e) = self.sweep().await {
                error!("Error sweeping orphaned reservations: {:#}", e);
            }
        }
    }

    async fn sweep(&self) -> Result<usize> {
        let cutoff = Utc::now() - chrono::Duration::from_std(self.grace)?;
        let swept = self.reservations.sweep_orphans(cutoff).await?;
        if swept > 0 {
            info!("Released {} orphaned reservations created before {}", swept, cutoff);
        }
        Ok(swept)
    }
}
