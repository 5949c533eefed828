use crate::{
    config::AppConfig,
    gateway::{
        GameGateway,
        GatewayResult,
        HttpGateway,
    },
    model::{
        ClickReceipt,
        GameSnapshot,
        LoadReceipt,
        PurchaseReceipt,
        SaveReceipt,
        SelectReceipt,
        TargetId,
    },
    poller::{
        PollerHandle,
        spawn_poller,
    },
    reconciler::{
        ActionOutcome,
        ClickTicket,
        PurchaseTicket,
        Reconciler,
        SelectTicket,
    },
    ui,
    view::{
        GameView,
        ViewChanges,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use std::{
    future::Future,
    time::{
        Duration,
        Instant,
    },
};
use tokio::{
    sync::mpsc,
    time::{
        self,
        MissedTickBehavior,
    },
};
use tracing::{
    debug,
    info,
    warn,
};

/// Period at which expired flashes and notices are cleared.
const EXPIRY_TICK: Duration = Duration::from_millis(50);

/// Result of a remote call, carried back to the UI loop together with the
/// ticket it was issued under.
#[derive(Debug)]
pub enum Completion {
    Click(ClickTicket, Option<ClickReceipt>),
    Select(SelectTicket, Option<SelectReceipt>),
    Purchase(PurchaseTicket, Option<PurchaseReceipt>),
    Save(Option<SaveReceipt>),
    Load(Option<LoadReceipt>),
}

/// Issues user actions without blocking the UI and applies their results
/// when they come back.
pub struct AppController<G: GameGateway> {
    gateway: G,
    reconciler: Reconciler,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
}

impl<G: GameGateway> AppController<G> {
    pub fn new(gateway: G) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            gateway,
            reconciler: Reconciler::new(),
            completion_tx,
            completion_rx,
        }
    }

    pub fn view(&self) -> &GameView {
        self.reconciler.view()
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn apply_snapshot(&mut self, snapshot: GameSnapshot) -> ViewChanges {
        self.reconciler.apply_snapshot(snapshot)
    }

    pub fn expire(&mut self, now: Instant) -> bool {
        self.reconciler.expire(now)
    }

    /// Spawns `call` and queues its result, reduced to `None` on transport
    /// failure, as a [`Completion`].
    fn dispatch<T, F, W>(&self, action: &'static str, call: F, wrap: W)
    where
        T: Send + 'static,
        F: Future<Output = GatewayResult<T>> + Send + 'static,
        W: FnOnce(Option<T>) -> Completion + Send + 'static,
    {
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let payload = match call.await {
                Ok(payload) => Some(payload),
                Err(err) => {
                    warn!(?err, action, "request failed");
                    None
                }
            };
            let _ = completion_tx.send(wrap(payload));
        });
    }

    pub fn click(&mut self, target: TargetId, now: Instant) {
        debug!(target, "click");
        let ticket = self.reconciler.begin_click(target, now);
        let gateway = self.gateway.clone();
        self.dispatch(
            "click",
            async move { gateway.submit_click(target).await },
            move |receipt| Completion::Click(ticket, receipt),
        );
    }

    pub fn select(&mut self, target: TargetId) {
        info!(target, "selecting target");
        let ticket = self.reconciler.begin_select(target);
        let gateway = self.gateway.clone();
        self.dispatch(
            "select",
            async move { gateway.submit_select(target).await },
            move |receipt| Completion::Select(ticket, receipt),
        );
    }

    /// Returns `false` when the current upgrade list has no `kind` entry, in
    /// which case nothing is sent.
    pub fn purchase(&mut self, kind: &str) -> bool {
        let Some(ticket) = self.reconciler.begin_purchase(kind) else {
            debug!(kind, "purchase of unknown upgrade ignored");
            return false;
        };
        info!(kind = %ticket.kind, target = ?ticket.target, "purchasing upgrade");
        let gateway = self.gateway.clone();
        let (kind, target) = (ticket.kind.clone(), ticket.target);
        self.dispatch(
            "purchase",
            async move { gateway.submit_purchase(&kind, target).await },
            move |receipt| Completion::Purchase(ticket, receipt),
        );
        true
    }

    pub fn save(&mut self) {
        info!("saving game");
        let gateway = self.gateway.clone();
        self.dispatch("save", async move { gateway.save().await }, Completion::Save);
    }

    pub fn load(&mut self) {
        info!("loading game");
        let gateway = self.gateway.clone();
        self.dispatch("load", async move { gateway.load().await }, Completion::Load);
    }

    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.completion_rx.recv().await
    }

    pub fn apply(&mut self, completion: Completion, now: Instant) -> ActionOutcome {
        let outcome = match completion {
            Completion::Click(ticket, receipt) => {
                self.reconciler.confirm_click(&ticket, receipt)
            }
            Completion::Select(ticket, receipt) => {
                self.reconciler.confirm_select(&ticket, receipt)
            }
            Completion::Purchase(ticket, receipt) => {
                self.reconciler.confirm_purchase(&ticket, receipt, now)
            }
            Completion::Save(receipt) => self.reconciler.confirm_save(receipt, now),
            Completion::Load(receipt) => self.reconciler.confirm_load(receipt, now),
        };
        debug!(?outcome, "action settled");
        outcome
    }
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let gateway = HttpGateway::new(config.api_url.clone(), config.request_timeout)
        .wrap_err("building game API client")?;
    info!(api_url = gateway.base_url(), "using game API");
    let controller = AppController::new(gateway.clone());
    let (snapshot_tx, snapshot_rx) = mpsc::unbounded_channel();
    let poller = spawn_poller(gateway, config.poll_interval, snapshot_tx);
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(
        controller,
        &poller,
        snapshot_rx,
        &mut ui_state,
        &mut input_events,
    )
    .await;
    ui::terminal_exit()?;
    poller.stop().await;
    info!("UI closed");
    res
}

async fn run_loop<G: GameGateway>(
    mut controller: AppController<G>,
    poller: &PollerHandle,
    mut snapshot_rx: mpsc::UnboundedReceiver<GameSnapshot>,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()> {
    let mut expiry = time::interval(EXPIRY_TICK);
    expiry.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ui::draw(ui_state, controller.view()).wrap_err("initial draw failed")?;

    loop {
        tokio::select! {
            maybe_snapshot = snapshot_rx.recv() => {
                let Some(snapshot) = maybe_snapshot else {
                    warn!("poll worker channel closed");
                    break;
                };
                let changes = controller.apply_snapshot(snapshot);
                if !changes.is_empty() {
                    ui::draw(ui_state, controller.view())
                        .wrap_err("draw after snapshot failed")?;
                }
            }
            Some(completion) = controller.next_completion() => {
                controller.apply(completion, Instant::now());
                ui::draw(ui_state, controller.view())
                    .wrap_err("draw after action result failed")?;
            }
            _ = expiry.tick() => {
                if controller.expire(Instant::now()) {
                    ui::draw(ui_state, controller.view())
                        .wrap_err("draw after expiry failed")?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(ui_state, event, controller.view()) else {
                    continue;
                };
                match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Redraw => {}
                    ui::UserEvent::Click(target) => controller.click(target, Instant::now()),
                    ui::UserEvent::Select(target) => controller.select(target),
                    ui::UserEvent::Buy(kind) => {
                        controller.purchase(&kind);
                    }
                    ui::UserEvent::Save => controller.save(),
                    ui::UserEvent::Load => controller.load(),
                    ui::UserEvent::Refresh => poller.fetch_now(),
                }
                ui::draw(ui_state, controller.view())
                    .wrap_err("draw after input failed")?;
            }
        }
    }
    Ok(())
}
