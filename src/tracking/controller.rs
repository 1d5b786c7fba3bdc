use anyhow::{bail, Context, Result};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::Duration,
};
use tokio_util::sync::CancellationToken;

use crate::{
    completion::CompletionClient, db::SessionStore, probe::WindowProbe,
    settings::MIN_TRACKING_INTERVAL_SECS,
};

use super::{
    state::TrackerStatus,
    tracker::{Tracker, TrackerDeps},
    worker::{tracking_loop, TrackerCommand},
};

const COMMAND_BUFFER: usize = 32;

struct Running {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
    commands: mpsc::Sender<TrackerCommand>,
}

/// Host-facing handle. At most one tracking worker runs per handle.
#[derive(Default)]
pub struct TrackerHandle {
    running: Option<Running>,
}

impl TrackerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn start<P, S, C>(&mut self, deps: TrackerDeps<P, S, C>, interval: Duration) -> Result<()>
    where
        P: WindowProbe + 'static,
        S: SessionStore + 'static,
        C: CompletionClient + 'static,
    {
        if self.running.is_some() {
            bail!("tracking already active");
        }
        if interval < Duration::from_secs(MIN_TRACKING_INTERVAL_SECS) {
            bail!(
                "tracking interval {interval:?} is below the {MIN_TRACKING_INTERVAL_SECS}s minimum"
            );
        }

        let cancel_token = CancellationToken::new();
        let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let handle = tokio::spawn(tracking_loop(
            Tracker::new(deps),
            interval,
            command_rx,
            cancel_token.clone(),
        ));

        self.running = Some(Running {
            handle,
            cancel_token,
            commands,
        });
        Ok(())
    }

    /// Flush the open session and wait for the worker to exit. No-op when idle.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };
        running.cancel_token.cancel();
        running
            .handle
            .await
            .context("tracking loop task failed to join")
    }

    pub async fn suspend(&self) -> Result<()> {
        self.send(TrackerCommand::Suspend).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.send(TrackerCommand::Resume).await
    }

    pub async fn lock_screen(&self) -> Result<()> {
        self.send(TrackerCommand::LockScreen).await
    }

    pub async fn unlock_screen(&self) -> Result<()> {
        self.send(TrackerCommand::UnlockScreen).await
    }

    pub async fn status(&self) -> Result<TrackerStatus> {
        let Some(running) = &self.running else {
            return Ok(TrackerStatus::default());
        };
        let (reply_tx, reply_rx) = oneshot::channel();
        running
            .commands
            .send(TrackerCommand::Status(reply_tx))
            .await
            .context("tracking loop is gone")?;
        reply_rx.await.context("tracking loop dropped status request")
    }

    async fn send(&self, command: TrackerCommand) -> Result<()> {
        match &self.running {
            Some(running) => running
                .commands
                .send(command)
                .await
                .context("tracking loop is gone"),
            None => {
                log::debug!("Ignoring {command:?}: tracking is not active");
                Ok(())
            }
        }
    }
}
