use std::future::Future;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::Monitor;
use super::types::StatusRequest;

/// Drive `monitor` until `shutdown` resolves.
///
/// Ticks and status requests are served one at a time from this task. A
/// tick blocks the loop until it finishes; ticks missed meanwhile are not
/// replayed. Returns the monitor so callers can inspect its counters.
pub async fn run_monitor<F>(
    mut monitor: Monitor,
    interval: Duration,
    mut requests: mpsc::Receiver<StatusRequest>,
    shutdown: F,
) -> Monitor
where
    F: Future<Output = ()>,
{
    info!("Monitor started, ticking every {} s", interval.as_secs_f64());
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);
    let mut accepting = true;

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("Monitor shutting down after {} ticks", monitor.ticks());
                break;
            }

            _ = ticker.tick() => {
                let report = monitor.tick();
                debug!(
                    "Tick {} done: {} processed, {} skipped, {} failed",
                    report.tick, report.processed, report.skipped, report.failed
                );
            }

            request = requests.recv(), if accepting => match request {
                Some(request) => {
                    if request.reply.send(monitor.status()).is_err() {
                        debug!("Status requester went away before the reply");
                    }
                }
                None => {
                    debug!("Status request channel closed");
                    accepting = false;
                }
            },
        }
    }

    monitor
}
