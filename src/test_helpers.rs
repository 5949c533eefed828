//! In-memory [`GameGateway`] with scripted answers, plus snapshot builders
//! shared by unit and scenario tests.

use crate::{
    gateway::{
        GameGateway,
        GatewayError,
        GatewayResult,
    },
    model::{
        ClickReceipt,
        GameSnapshot,
        LoadReceipt,
        PurchaseReceipt,
        SaveReceipt,
        SelectReceipt,
        Target,
        TargetId,
        Upgrade,
    },
};
use reqwest::StatusCode;
use std::{
    collections::VecDeque,
    sync::{
        Arc,
        Mutex,
        PoisonError,
    },
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayCall {
    FetchState,
    Click(TargetId),
    Select(TargetId),
    Purchase {
        kind: String,
        target: Option<TargetId>,
    },
    Save,
    Load,
}

#[derive(Debug, Default)]
struct Script {
    states: VecDeque<GatewayResult<GameSnapshot>>,
    clicks: VecDeque<GatewayResult<ClickReceipt>>,
    selects: VecDeque<GatewayResult<SelectReceipt>>,
    purchases: VecDeque<GatewayResult<PurchaseReceipt>>,
    saves: VecDeque<GatewayResult<SaveReceipt>>,
    loads: VecDeque<GatewayResult<LoadReceipt>>,
    calls: Vec<GatewayCall>,
}

/// Answers each call with the next queued result for that operation. An
/// exhausted queue answers `503 Service Unavailable`.
#[derive(Clone, Debug, Default)]
pub struct ScriptedGateway {
    script: Arc<Mutex<Script>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_script<T>(&self, f: impl FnOnce(&mut Script) -> T) -> T {
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut script)
    }

    pub fn push_state(&self, result: GatewayResult<GameSnapshot>) -> &Self {
        self.with_script(|s| s.states.push_back(result));
        self
    }

    pub fn push_click(&self, result: GatewayResult<ClickReceipt>) -> &Self {
        self.with_script(|s| s.clicks.push_back(result));
        self
    }

    pub fn push_select(&self, result: GatewayResult<SelectReceipt>) -> &Self {
        self.with_script(|s| s.selects.push_back(result));
        self
    }

    pub fn push_purchase(&self, result: GatewayResult<PurchaseReceipt>) -> &Self {
        self.with_script(|s| s.purchases.push_back(result));
        self
    }

    pub fn push_save(&self, result: GatewayResult<SaveReceipt>) -> &Self {
        self.with_script(|s| s.saves.push_back(result));
        self
    }

    pub fn push_load(&self, result: GatewayResult<LoadReceipt>) -> &Self {
        self.with_script(|s| s.loads.push_back(result));
        self
    }

    /// Every call received so far, in arrival order.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.with_script(|s| s.calls.clone())
    }

    pub fn fetch_count(&self) -> usize {
        self.with_script(|s| {
            s.calls
                .iter()
                .filter(|call| **call == GatewayCall::FetchState)
                .count()
        })
    }
}

/// The error an exhausted script answers with.
pub fn unavailable(endpoint: &str) -> GatewayError {
    GatewayError::Status {
        endpoint: endpoint.to_string(),
        status: StatusCode::SERVICE_UNAVAILABLE,
        body: "no scripted response".to_string(),
    }
}

fn next_or_unavailable<T>(
    queue: &mut VecDeque<GatewayResult<T>>,
    endpoint: &str,
) -> GatewayResult<T> {
    queue.pop_front().unwrap_or_else(|| Err(unavailable(endpoint)))
}

impl GameGateway for ScriptedGateway {
    async fn fetch_state(&self) -> GatewayResult<GameSnapshot> {
        self.with_script(|s| {
            s.calls.push(GatewayCall::FetchState);
            next_or_unavailable(&mut s.states, "/game")
        })
    }

    async fn submit_click(&self, target: TargetId) -> GatewayResult<ClickReceipt> {
        self.with_script(|s| {
            s.calls.push(GatewayCall::Click(target));
            next_or_unavailable(&mut s.clicks, "/clic")
        })
    }

    async fn submit_select(&self, target: TargetId) -> GatewayResult<SelectReceipt> {
        self.with_script(|s| {
            s.calls.push(GatewayCall::Select(target));
            next_or_unavailable(&mut s.selects, "/select")
        })
    }

    async fn submit_purchase(
        &self,
        kind: &str,
        target: Option<TargetId>,
    ) -> GatewayResult<PurchaseReceipt> {
        self.with_script(|s| {
            s.calls.push(GatewayCall::Purchase {
                kind: kind.to_string(),
                target,
            });
            next_or_unavailable(&mut s.purchases, "/amelioration/acheter")
        })
    }

    async fn save(&self) -> GatewayResult<SaveReceipt> {
        self.with_script(|s| {
            s.calls.push(GatewayCall::Save);
            next_or_unavailable(&mut s.saves, "/save")
        })
    }

    async fn load(&self) -> GatewayResult<LoadReceipt> {
        self.with_script(|s| {
            s.calls.push(GatewayCall::Load);
            next_or_unavailable(&mut s.loads, "/load")
        })
    }
}

pub fn target(number: TargetId, total_clicks: u64) -> Target {
    Target {
        number,
        color: "#4CAF50".to_string(),
        points_per_click: 1,
        auto_clicks_per_tick: 0,
        total_clicks,
        points_earned: total_clicks,
    }
}

pub fn upgrade(kind: &str, price: u64, for_target: bool) -> Upgrade {
    Upgrade {
        kind: kind.to_string(),
        name: kind.to_string(),
        description: format!("{kind} upgrade"),
        level: 0,
        price,
        for_target,
    }
}

/// Snapshot with `targets` as `(id, total_clicks)` pairs, the first one
/// selected, and no upgrade list.
pub fn snapshot(points: u64, targets: &[(TargetId, u64)]) -> GameSnapshot {
    GameSnapshot {
        points,
        total_clicks: targets.iter().map(|(_, clicks)| clicks).sum(),
        auto_click_delay_secs: 3.0,
        selected_target: targets.first().map(|(id, _)| *id),
        targets: targets
            .iter()
            .map(|(id, clicks)| (*id, target(*id, *clicks)))
            .collect(),
        upgrades: None,
    }
}
