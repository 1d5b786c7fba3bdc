use chrono::Utc;
use tokio::{
    sync::{mpsc, oneshot},
    time::{Duration, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{completion::CompletionClient, db::SessionStore, probe::WindowProbe};

use super::{state::TrackerStatus, tracker::Tracker};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Messages into the tracking worker. Power-state signals share the queue
/// with ticks, so they never interleave with a tick in progress.
#[derive(Debug)]
pub enum TrackerCommand {
    Suspend,
    Resume,
    LockScreen,
    UnlockScreen,
    Status(oneshot::Sender<TrackerStatus>),
}

/// Owns the tracker until cancelled, then flushes the open session.
pub async fn tracking_loop<P, S, C>(
    mut tracker: Tracker<P, S, C>,
    interval: Duration,
    mut commands: mpsc::Receiver<TrackerCommand>,
    cancel_token: CancellationToken,
) where
    P: WindowProbe,
    S: SessionStore,
    C: CompletionClient,
{
    let mut ticker = tokio::time::interval(interval);
    // A tick that outlives the interval (slow completion call) swallows the
    // ticks it overlapped instead of replaying them.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracker.start();

    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => break,
            Some(command) = commands.recv() => match command {
                TrackerCommand::Suspend | TrackerCommand::LockScreen => {
                    tracker.suspend(Utc::now()).await;
                }
                TrackerCommand::Resume | TrackerCommand::UnlockScreen => {
                    tracker.resume(Utc::now()).await;
                }
                TrackerCommand::Status(reply) => {
                    let _ = reply.send(tracker.status());
                }
            },
            _ = ticker.tick() => {
                tracker.tick(Utc::now()).await;
            }
        }
    }

    tracker.stop(Utc::now()).await;
    log_info!("tracking loop shut down");
}
