//! Background worker that fetches the authoritative snapshot on a fixed
//! period and forwards it to the UI loop.
//!
//! Fetches run one after another inside the worker, so a response can never
//! overtake a later one.

use crate::{
    gateway::GameGateway,
    model::GameSnapshot,
};
use std::{
    ops::ControlFlow,
    time::Duration,
};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{
        self,
        MissedTickBehavior,
    },
};
use tracing::{
    debug,
    warn,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollCommand {
    FetchNow,
    Shutdown,
}

/// Owner side of a running poll worker. Dropping it asks the worker to stop.
#[derive(Debug)]
pub struct PollerHandle {
    cmd_tx: mpsc::UnboundedSender<PollCommand>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Fetches out of schedule. The regular period is unaffected.
    pub fn fetch_now(&self) {
        let _ = self.cmd_tx.send(PollCommand::FetchNow);
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|task| task.is_finished())
    }

    pub async fn stop(mut self) {
        let _ = self.cmd_tx.send(PollCommand::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(?err, "poll worker ended abnormally");
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(PollCommand::Shutdown);
    }
}

/// Starts polling `gateway` every `poll_interval`, the first fetch right
/// away. Must be called from within a tokio runtime.
pub fn spawn_poller<G: GameGateway>(
    gateway: G,
    poll_interval: Duration,
    snapshot_tx: mpsc::UnboundedSender<GameSnapshot>,
) -> PollerHandle {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(poll_worker(gateway, poll_interval, cmd_rx, snapshot_tx));
    PollerHandle {
        cmd_tx,
        task: Some(task),
    }
}

async fn poll_worker<G: GameGateway>(
    gateway: G,
    poll_interval: Duration,
    mut cmd_rx: mpsc::UnboundedReceiver<PollCommand>,
    snapshot_tx: mpsc::UnboundedSender<GameSnapshot>,
) {
    async fn fetch_snapshot<G: GameGateway>(
        gateway: &G,
        snapshot_tx: &mpsc::UnboundedSender<GameSnapshot>,
    ) -> ControlFlow<()> {
        match gateway.fetch_state().await {
            Ok(snapshot) => {
                if snapshot_tx.send(snapshot).is_err() {
                    debug!("snapshot receiver dropped");
                    return ControlFlow::Break(());
                }
            }
            Err(err) => warn!(?err, "snapshot fetch failed"),
        }
        ControlFlow::Continue(())
    }

    let mut ticker = time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let flow = tokio::select! {
            _ = ticker.tick() => fetch_snapshot(&gateway, &snapshot_tx).await,
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(PollCommand::FetchNow) => {
                        fetch_snapshot(&gateway, &snapshot_tx).await
                    }
                    Some(PollCommand::Shutdown) | None => ControlFlow::Break(()),
                }
            }
        };
        if flow.is_break() {
            break;
        }
    }
    debug!("poll worker stopped");
}
