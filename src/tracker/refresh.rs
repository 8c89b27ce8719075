use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::utils::clock::Clock;

pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(1);

/// Signal to re-derive whatever is displayed. Carries no state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub at: DateTime<Utc>,
}

/// Emits a [Tick] every `period` until cancelled or until nobody listens anymore.
pub struct Ticker {
    next: mpsc::Sender<Tick>,
    shutdown: CancellationToken,
    period: Duration,
    time_provider: Box<dyn Clock>,
}

impl Ticker {
    pub fn new(
        next: mpsc::Sender<Tick>,
        shutdown: CancellationToken,
        period: Duration,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            next,
            shutdown,
            period,
            time_provider,
        }
    }

    /// Executes the ticker event loop. Ticks follow a fixed schedule, so a slow consumer doesn't
    /// make the display drift.
    pub async fn run(self) -> Result<()> {
        let mut tick_point = self.time_provider.instant();
        loop {
            tick_point += self.period;

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("Ticker cancelled");
                    return Ok(())
                }
                _ = self.time_provider.sleep_until(tick_point) => ()
            }

            let tick = Tick {
                at: self.time_provider.time(),
            };
            trace!("Tick {:?}", tick);
            // A stalled consumer must not keep the ticker alive past shutdown.
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("Ticker cancelled while waiting for the consumer");
                    return Ok(())
                }
                sent = self.next.send(tick) => {
                    if sent.is_err() {
                        debug!("Tick receiver dropped, stopping ticker");
                        return Ok(());
                    }
                }
            }
        }
    }
}
