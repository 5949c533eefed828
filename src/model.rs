//! Game state as exchanged with the backend.
//!
//! Field names on the wire follow the backend's JSON (`cibles`,
//! `ameliorations`, ...). The Rust side uses English names and keeps the
//! mapping in serde attributes.

use serde::{
    Deserialize,
    Serialize,
};
use std::collections::BTreeMap;

/// Stable identifier of a target, assigned by the backend.
pub type TargetId = u32;

/// A complete picture of the game at one instant, either authoritative or
/// locally predicted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub points: u64,
    #[serde(rename = "total_clics", default)]
    pub total_clicks: u64,
    #[serde(rename = "delai_auto_clic", default)]
    pub auto_click_delay_secs: f64,
    #[serde(rename = "cible_selectionnee", default)]
    pub selected_target: Option<TargetId>,
    #[serde(rename = "cibles", default)]
    pub targets: BTreeMap<TargetId, Target>,
    /// Upgrades scoped to `selected_target`. `None` when the payload carried
    /// no list at all, which leaves the rendered upgrades untouched.
    #[serde(rename = "ameliorations", default)]
    pub upgrades: Option<Vec<Upgrade>>,
}

impl GameSnapshot {
    pub fn target(&self, id: TargetId) -> Option<&Target> {
        self.targets.get(&id)
    }

    pub fn upgrade(&self, kind: &str) -> Option<&Upgrade> {
        self.upgrades
            .as_deref()
            .and_then(|upgrades| upgrades.iter().find(|u| u.kind == kind))
    }

    /// The target the purchase of `upgrade` applies to: the selected one for
    /// per-target upgrades, none for global ones.
    pub fn purchase_target(&self, upgrade: &Upgrade) -> Option<TargetId> {
        if upgrade.for_target {
            self.selected_target
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    #[serde(rename = "numero")]
    pub number: u32,
    #[serde(rename = "couleur", default)]
    pub color: String,
    #[serde(rename = "points_par_clic", default)]
    pub points_per_click: u64,
    #[serde(rename = "auto_clics_par_tick", default)]
    pub auto_clicks_per_tick: u64,
    #[serde(rename = "total_clics", default)]
    pub total_clicks: u64,
    #[serde(rename = "points_gagnes", default)]
    pub points_earned: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upgrade {
    /// Identity of the upgrade within the current selection scope.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "nom", default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "niveau", default)]
    pub level: u32,
    #[serde(rename = "prix", default)]
    pub price: u64,
    #[serde(rename = "pour_cible", default)]
    pub for_target: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ClickReceipt {
    pub success: bool,
    #[serde(rename = "points_gagnes", default)]
    pub points_gained: u64,
    #[serde(rename = "points_total", default)]
    pub points_total: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SelectReceipt {
    pub success: bool,
    #[serde(rename = "ameliorations", default)]
    pub upgrades: Vec<Upgrade>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct PurchaseReceipt {
    pub success: bool,
    #[serde(rename = "game_state", default)]
    pub snapshot: Option<GameSnapshot>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SaveReceipt {
    pub success: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct LoadReceipt {
    pub success: bool,
    #[serde(rename = "game_state", default)]
    pub snapshot: Option<GameSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PurchaseRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    #[serde(rename = "cible_id")]
    pub target: Option<TargetId>,
}
