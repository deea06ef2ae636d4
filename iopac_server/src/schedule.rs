//! The periodic refresh of the published calendar.

use std::time::Duration;

use iopac_core::{error::Result, portal::LoanSource, refresh::Refresher};
use log::{debug, error};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Refresh the calendar every `period`, starting one period from now.
///
/// Account failures only get logged. The loop ends when the calendar file cannot be written.
pub async fn run<S: LoanSource>(refresher: Refresher<S>, period: Duration) -> Result<()> {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match refresher.refresh().await {
            Ok(report) => debug!("{report:?}"),
            Err(err) => {
                error!("{err}");
                return Err(err);
            }
        }
    }
}
