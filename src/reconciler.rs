//! Keeps the store and the view coherent with an external source of truth.
//!
//! Remote calls are issued elsewhere; this type only sees their outcome,
//! already reduced to `Some(payload)` or `None` (transport failure, logged at
//! the call site). Every delta re-checks that the entity it refers to still
//! exists in the current snapshot, so a confirmation that arrives after an
//! authoritative replacement removed its target is dropped.

use crate::{
    model::{
        ClickReceipt,
        GameSnapshot,
        LoadReceipt,
        PurchaseReceipt,
        SaveReceipt,
        SelectReceipt,
        TargetId,
    },
    store::{
        GameStore,
        IdentityMismatch,
    },
    view::{
        GameView,
        NoticeKind,
        PurchaseFeedback,
        ViewChanges,
    },
};
use std::time::Instant;
use tracing::{
    debug,
    warn,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClickTicket {
    pub target: TargetId,
    /// Store version the click was issued against.
    pub issued_at: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectTicket {
    pub target: TargetId,
    pub sequence: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PurchaseTicket {
    pub kind: String,
    pub target: Option<TargetId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    /// State and view were updated.
    Applied(ViewChanges),
    /// The backend answered with `success: false`.
    Rejected,
    /// The call failed in transport; nothing is known.
    Unavailable,
    /// The answer refers to state that has since been superseded.
    Stale,
}

#[derive(Debug, Default)]
pub struct Reconciler {
    store: GameStore,
    view: GameView,
    selects_issued: u64,
    last_applied_select: u64,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &GameStore {
        &self.store
    }

    pub fn view(&self) -> &GameView {
        &self.view
    }

    /// Periodic full sync: the polled snapshot replaces the current one and
    /// the view is diffed against it.
    ///
    /// A snapshot without an upgrade list keeps the current list while the
    /// selection is unchanged. When the selection moved, the stale list and
    /// its cards are dropped.
    pub fn apply_snapshot(&mut self, mut snapshot: GameSnapshot) -> ViewChanges {
        let mut drop_upgrades = false;
        if snapshot.upgrades.is_none() {
            match self.store.current() {
                Some(current) if current.selected_target == snapshot.selected_target => {
                    snapshot.upgrades = current.upgrades.clone();
                }
                Some(_) => drop_upgrades = true,
                None => {}
            }
        }
        let version = self.store.replace(snapshot);
        let mut changes = self.refresh();
        if drop_upgrades {
            if let Some(snapshot) = self.store.current() {
                changes += self.view.rebuild_upgrades(snapshot);
            }
        }
        if !changes.is_empty() {
            debug!(version, %changes, "applied authoritative snapshot");
        }
        changes
    }

    fn refresh(&mut self) -> ViewChanges {
        match self.store.current() {
            Some(snapshot) => self.view.refresh(snapshot),
            None => ViewChanges::default(),
        }
    }

    /// Records a click about to be submitted. The click flash is cosmetic and
    /// does not depend on the outcome.
    pub fn begin_click(&mut self, target: TargetId, now: Instant) -> ClickTicket {
        self.view.flash_target(target, now);
        ClickTicket {
            target,
            issued_at: self.store.version(),
        }
    }

    pub fn confirm_click(
        &mut self,
        ticket: &ClickTicket,
        receipt: Option<ClickReceipt>,
    ) -> ActionOutcome {
        let Some(receipt) = receipt else {
            return ActionOutcome::Unavailable;
        };
        if !receipt.success {
            debug!(target = ticket.target, "click rejected by backend");
            return ActionOutcome::Rejected;
        }

        let target = ticket.target;
        let applied = self.store.apply_delta(|snapshot| {
            let card = snapshot
                .targets
                .get_mut(&target)
                .ok_or(IdentityMismatch::MissingTarget(target))?;
            card.total_clicks += 1;
            card.points_earned += receipt.points_gained;
            snapshot.total_clicks += 1;
            snapshot.points = receipt.points_total;
            Ok(())
        });
        if let Err(mismatch) = applied {
            debug!(
                %mismatch,
                issued_at = ticket.issued_at,
                current = self.store.version(),
                "dropping click confirmation"
            );
            return ActionOutcome::Stale;
        }

        let Some(snapshot) = self.store.current() else {
            return ActionOutcome::Stale;
        };
        let mut changes = self.view.refresh_score(snapshot);
        changes += self.view.patch_target(target, snapshot);
        ActionOutcome::Applied(changes)
    }

    pub fn begin_select(&mut self, target: TargetId) -> SelectTicket {
        self.selects_issued += 1;
        SelectTicket {
            target,
            sequence: self.selects_issued,
        }
    }

    /// Applies a selection answer unless a later selection already landed.
    /// The upgrade cards are rebuilt when the selected target changes and
    /// patched by type otherwise.
    pub fn confirm_select(
        &mut self,
        ticket: &SelectTicket,
        receipt: Option<SelectReceipt>,
    ) -> ActionOutcome {
        let Some(receipt) = receipt else {
            return ActionOutcome::Unavailable;
        };
        if ticket.sequence <= self.last_applied_select {
            debug!(
                sequence = ticket.sequence,
                latest = self.last_applied_select,
                "dropping superseded selection"
            );
            return ActionOutcome::Stale;
        }
        if !receipt.success {
            debug!(target = ticket.target, "selection rejected by backend");
            return ActionOutcome::Rejected;
        }

        let previous = self.store.current().and_then(|s| s.selected_target);
        let target = ticket.target;
        let applied = self.store.apply_delta(|snapshot| {
            if !snapshot.targets.contains_key(&target) {
                return Err(IdentityMismatch::MissingTarget(target));
            }
            snapshot.selected_target = Some(target);
            snapshot.upgrades = Some(receipt.upgrades);
            Ok(())
        });
        if let Err(mismatch) = applied {
            debug!(%mismatch, "dropping selection");
            return ActionOutcome::Stale;
        }
        self.last_applied_select = ticket.sequence;

        let Some(snapshot) = self.store.current() else {
            return ActionOutcome::Stale;
        };
        let mut changes = self.view.refresh_selection(snapshot);
        if previous == Some(target) {
            changes += self.view.refresh_upgrades(snapshot);
        } else {
            changes += self.view.rebuild_upgrades(snapshot);
        }
        ActionOutcome::Applied(changes)
    }

    /// Resolves which target a purchase of `kind` applies to. `None` when the
    /// current upgrade list has no such entry.
    pub fn begin_purchase(&self, kind: &str) -> Option<PurchaseTicket> {
        let snapshot = self.store.current()?;
        let upgrade = snapshot.upgrade(kind)?;
        Some(PurchaseTicket {
            kind: upgrade.kind.clone(),
            target: snapshot.purchase_target(upgrade),
        })
    }

    pub fn confirm_purchase(
        &mut self,
        ticket: &PurchaseTicket,
        receipt: Option<PurchaseReceipt>,
        now: Instant,
    ) -> ActionOutcome {
        let Some(receipt) = receipt else {
            self.view
                .show_notice("Purchase failed", NoticeKind::Error, now);
            return ActionOutcome::Unavailable;
        };
        if !receipt.success {
            self.view
                .flash_upgrade(&ticket.kind, PurchaseFeedback::Failure, now);
            self.view
                .show_notice("Not enough points!", NoticeKind::Error, now);
            return ActionOutcome::Rejected;
        }

        let changes = match receipt.snapshot {
            Some(snapshot) => self.apply_snapshot(snapshot),
            None => {
                warn!(kind = %ticket.kind, "purchase confirmed without a game state");
                ViewChanges::default()
            }
        };
        self.view
            .flash_upgrade(&ticket.kind, PurchaseFeedback::Success, now);
        self.view
            .show_notice("Upgrade purchased!", NoticeKind::Success, now);
        ActionOutcome::Applied(changes)
    }

    pub fn confirm_save(&mut self, receipt: Option<SaveReceipt>, now: Instant) -> ActionOutcome {
        match receipt {
            None => {
                self.view.show_notice("Save failed", NoticeKind::Error, now);
                ActionOutcome::Unavailable
            }
            Some(receipt) if !receipt.success => {
                self.view
                    .show_notice("Save was refused", NoticeKind::Error, now);
                ActionOutcome::Rejected
            }
            Some(_) => {
                let at = chrono::Local::now().format("%H:%M:%S");
                self.view
                    .show_notice(format!("Game saved at {at}"), NoticeKind::Success, now);
                ActionOutcome::Applied(ViewChanges::default())
            }
        }
    }

    pub fn confirm_load(&mut self, receipt: Option<LoadReceipt>, now: Instant) -> ActionOutcome {
        let Some(receipt) = receipt else {
            self.view.show_notice("Load failed", NoticeKind::Error, now);
            return ActionOutcome::Unavailable;
        };
        if !receipt.success {
            self.view.show_notice("No save found", NoticeKind::Error, now);
            return ActionOutcome::Rejected;
        }
        let changes = match receipt.snapshot {
            Some(snapshot) => self.apply_snapshot(snapshot),
            None => ViewChanges::default(),
        };
        self.view
            .show_notice("Game loaded!", NoticeKind::Success, now);
        ActionOutcome::Applied(changes)
    }

    pub fn expire(&mut self, now: Instant) -> bool {
        self.view.expire(now)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::model::{
        Target,
        Upgrade,
    };

    fn target(number: u32, total_clicks: u64, points_earned: u64) -> Target {
        Target {
            number,
            color: "#2196F3".to_string(),
            points_per_click: 1,
            total_clicks,
            points_earned,
            ..Target::default()
        }
    }

    fn upgrade(kind: &str, price: u64, for_target: bool) -> Upgrade {
        Upgrade {
            kind: kind.to_string(),
            name: kind.to_string(),
            price,
            for_target,
            ..Upgrade::default()
        }
    }

    fn state(points: u64, targets: &[(u32, u64)]) -> GameSnapshot {
        GameSnapshot {
            points,
            selected_target: Some(1),
            targets: targets
                .iter()
                .map(|(id, clicks)| (*id, target(*id, *clicks, *clicks)))
                .collect(),
            upgrades: Some(vec![
                upgrade("ClicPuissant", 10, true),
                upgrade("SpeedAuto", 200, false),
            ]),
            ..GameSnapshot::default()
        }
    }

    fn click_ok(gained: u64, total: u64) -> Option<ClickReceipt> {
        Some(ClickReceipt {
            success: true,
            points_gained: gained,
            points_total: total,
        })
    }

    fn serial(reconciler: &Reconciler, id: TargetId) -> Option<u64> {
        reconciler.view().targets().get(&id).map(|node| node.serial())
    }

    #[test]
    fn apply_snapshot__second_identical_poll_touches_nothing() {
        // given
        let mut reconciler = Reconciler::new();
        reconciler.apply_snapshot(state(3, &[(1, 0), (2, 0)]));

        // when
        let changes = reconciler.apply_snapshot(state(3, &[(1, 0), (2, 0)]));

        // then
        assert!(changes.is_empty());
    }

    #[test]
    fn confirm_click__then_poll_adds_target_and_patches_the_clicked_one() {
        // given
        let mut reconciler = Reconciler::new();
        let mut initial = state(0, &[(1, 0)]);
        initial.upgrades = None;
        reconciler.apply_snapshot(initial);
        let serial_1 = serial(&reconciler, 1);

        // when
        let ticket = reconciler.begin_click(1, Instant::now());
        let outcome = reconciler.confirm_click(&ticket, click_ok(1, 1));

        // then
        assert!(matches!(outcome, ActionOutcome::Applied(_)));
        assert_eq!(reconciler.view().score().unwrap().points, 1);
        let card = reconciler.view().targets().get(&1).unwrap().card().face().clone();
        assert_eq!(card.total_clicks, 1);
        assert_eq!(card.points_earned, 1);

        // when
        let mut polled = state(5, &[(1, 3), (2, 0)]);
        polled.upgrades = None;
        let changes = reconciler.apply_snapshot(polled);

        // then
        assert_eq!(reconciler.view().score().unwrap().points, 5);
        assert_eq!(reconciler.view().targets().keys(), vec![1, 2]);
        assert_eq!(serial(&reconciler, 1), serial_1);
        assert_eq!(
            reconciler.view().targets().get(&1).unwrap().card().face().total_clicks,
            3
        );
        assert_eq!(changes.created, 1);
        assert_eq!(changes.removed, 0);
    }

    #[test]
    fn confirm_click__authoritative_poll_wins_over_optimistic_value() {
        // given
        let mut reconciler = Reconciler::new();
        reconciler.apply_snapshot(state(10, &[(1, 0)]));
        let ticket = reconciler.begin_click(1, Instant::now());
        reconciler.confirm_click(&ticket, click_ok(4, 14));

        // when
        reconciler.apply_snapshot(state(12, &[(1, 1)]));

        // then
        assert_eq!(reconciler.store().current().unwrap().points, 12);
        assert_eq!(reconciler.view().score().unwrap().points, 12);
    }

    #[test]
    fn confirm_click__target_removed_by_poll_is_dropped() {
        // given
        let mut reconciler = Reconciler::new();
        reconciler.apply_snapshot(state(7, &[(1, 0), (2, 0)]));
        let ticket = reconciler.begin_click(2, Instant::now());
        reconciler.apply_snapshot(state(7, &[(1, 0)]));

        // when
        let outcome = reconciler.confirm_click(&ticket, click_ok(5, 12));

        // then
        assert_eq!(outcome, ActionOutcome::Stale);
        assert_eq!(reconciler.store().current().unwrap().points, 7);
        assert_eq!(reconciler.store().current().unwrap().total_clicks, 0);
        assert_eq!(reconciler.view().targets().keys(), vec![1]);
        assert_eq!(reconciler.view().score().unwrap().points, 7);
    }

    #[test]
    fn confirm_click__applies_to_the_current_snapshot_not_the_issuing_one() {
        // given
        let mut reconciler = Reconciler::new();
        reconciler.apply_snapshot(state(0, &[(1, 0)]));
        let ticket = reconciler.begin_click(1, Instant::now());
        reconciler.apply_snapshot(state(20, &[(1, 8)]));

        // when
        reconciler.confirm_click(&ticket, click_ok(1, 21));

        // then
        let snapshot = reconciler.store().current().unwrap();
        assert_eq!(snapshot.points, 21);
        assert_eq!(snapshot.target(1).unwrap().total_clicks, 9);
        assert_eq!(snapshot.target(1).unwrap().points_earned, 9);
    }

    #[test]
    fn confirm_click__failure_or_rejection_changes_nothing() {
        // given
        let mut reconciler = Reconciler::new();
        reconciler.apply_snapshot(state(3, &[(1, 0)]));
        let version = reconciler.store().version();
        let ticket = reconciler.begin_click(1, Instant::now());
        let rejected = Some(ClickReceipt {
            success: false,
            ..ClickReceipt::default()
        });

        // when
        let unavailable = reconciler.confirm_click(&ticket, None);
        let refused = reconciler.confirm_click(&ticket, rejected);

        // then
        assert_eq!(unavailable, ActionOutcome::Unavailable);
        assert_eq!(refused, ActionOutcome::Rejected);
        assert_eq!(reconciler.store().version(), version);
        assert_eq!(reconciler.store().current().unwrap().points, 3);
    }

    #[test]
    fn begin_click__flashes_the_card_regardless_of_outcome() {
        // given
        let mut reconciler = Reconciler::new();
        reconciler.apply_snapshot(state(3, &[(1, 0)]));

        // when
        let ticket = reconciler.begin_click(1, Instant::now());
        reconciler.confirm_click(&ticket, None);

        // then
        assert!(reconciler.view().targets().get(&1).unwrap().card().is_flashing());
    }

    fn select_ok(kinds: &[&str]) -> Option<SelectReceipt> {
        Some(SelectReceipt {
            success: true,
            upgrades: kinds.iter().map(|k| upgrade(k, 10, true)).collect(),
        })
    }

    fn upgrade_serials(reconciler: &Reconciler) -> Vec<u64> {
        reconciler
            .view()
            .upgrades()
            .iter()
            .map(|node| node.serial())
            .collect()
    }

    #[test]
    fn confirm_select__same_target_twice_causes_no_upgrade_churn() {
        // given
        let mut reconciler = Reconciler::new();
        reconciler.apply_snapshot(state(0, &[(1, 0), (2, 0)]));
        let first = reconciler.begin_select(2);
        reconciler.confirm_select(&first, select_ok(&["A", "B"]));
        let serials = upgrade_serials(&reconciler);

        // when
        let again = reconciler.begin_select(2);
        let outcome = reconciler.confirm_select(&again, select_ok(&["A", "B"]));

        // then
        assert_eq!(outcome, ActionOutcome::Applied(ViewChanges::default()));
        assert_eq!(upgrade_serials(&reconciler), serials);
    }

    #[test]
    fn confirm_select__new_target_replaces_every_upgrade_node() {
        // given
        let mut reconciler = Reconciler::new();
        reconciler.apply_snapshot(state(0, &[(1, 0), (2, 0)]));
        let before = upgrade_serials(&reconciler);

        // when
        let ticket = reconciler.begin_select(2);
        let outcome = reconciler.confirm_select(&ticket, select_ok(&["X", "Y", "Z"]));

        // then
        let ActionOutcome::Applied(changes) = outcome else {
            panic!("expected applied selection, got {outcome:?}");
        };
        assert_eq!(changes.removed, 2);
        assert_eq!(changes.created, 3);
        let after = upgrade_serials(&reconciler);
        assert!(after.iter().all(|serial| !before.contains(serial)));
        assert_eq!(reconciler.view().selection().unwrap().number, 2);
        assert_eq!(reconciler.store().current().unwrap().selected_target, Some(2));
    }

    #[test]
    fn confirm_select__new_target_with_same_upgrade_types_still_rebuilds() {
        // given
        let mut reconciler = Reconciler::new();
        reconciler.apply_snapshot(state(0, &[(1, 0), (2, 0)]));
        let before = upgrade_serials(&reconciler);

        // when
        let ticket = reconciler.begin_select(2);
        reconciler.confirm_select(&ticket, select_ok(&["ClicPuissant", "SpeedAuto"]));

        // then
        let after = upgrade_serials(&reconciler);
        assert_eq!(after.len(), 2);
        assert!(after.iter().all(|serial| !before.contains(serial)));
    }

    #[test]
    fn confirm_select__older_response_arriving_late_is_discarded() {
        // given
        let mut reconciler = Reconciler::new();
        reconciler.apply_snapshot(state(0, &[(1, 0), (2, 0), (3, 0)]));
        let older = reconciler.begin_select(2);
        let newer = reconciler.begin_select(3);
        reconciler.confirm_select(&newer, select_ok(&["C"]));

        // when
        let outcome = reconciler.confirm_select(&older, select_ok(&["B"]));

        // then
        assert_eq!(outcome, ActionOutcome::Stale);
        let snapshot = reconciler.store().current().unwrap();
        assert_eq!(snapshot.selected_target, Some(3));
        assert_eq!(reconciler.view().upgrades().keys(), vec!["C".to_string()]);
    }

    #[test]
    fn confirm_select__target_gone_is_a_no_op() {
        // given
        let mut reconciler = Reconciler::new();
        reconciler.apply_snapshot(state(0, &[(1, 0), (2, 0)]));
        let ticket = reconciler.begin_select(2);
        reconciler.apply_snapshot(state(0, &[(1, 0)]));

        // when
        let outcome = reconciler.confirm_select(&ticket, select_ok(&["B"]));

        // then
        assert_eq!(outcome, ActionOutcome::Stale);
        assert_eq!(reconciler.store().current().unwrap().selected_target, Some(1));
        assert_eq!(
            reconciler.view().upgrades().keys(),
            vec!["ClicPuissant".to_string(), "SpeedAuto".to_string()]
        );
    }

    #[test]
    fn confirm_select__same_target_shows_the_returned_upgrades() {
        // given
        let mut reconciler = Reconciler::new();
        let mut initial = state(0, &[(1, 0), (2, 0)]);
        initial.upgrades = None;
        reconciler.apply_snapshot(initial);

        // when
        let ticket = reconciler.begin_select(1);
        let outcome = reconciler.confirm_select(&ticket, select_ok(&["A"]));

        // then
        let ActionOutcome::Applied(changes) = outcome else {
            panic!("expected applied selection, got {outcome:?}");
        };
        assert_eq!(changes.created, 1);
        assert_eq!(reconciler.view().upgrades().keys(), vec!["A".to_string()]);
        assert!(reconciler.begin_purchase("A").is_some());
    }

    #[test]
    fn confirm_select__failed_newer_selection_does_not_block_older_one() {
        // given
        let mut reconciler = Reconciler::new();
        reconciler.apply_snapshot(state(0, &[(1, 0), (2, 0), (3, 0)]));
        let older = reconciler.begin_select(2);
        let newer = reconciler.begin_select(3);
        let rejected = Some(SelectReceipt {
            success: false,
            upgrades: Vec::new(),
        });

        // when
        let unavailable = reconciler.confirm_select(&newer, None);
        let refused = reconciler.confirm_select(&newer, rejected);
        let outcome = reconciler.confirm_select(&older, select_ok(&["B"]));

        // then
        assert_eq!(unavailable, ActionOutcome::Unavailable);
        assert_eq!(refused, ActionOutcome::Rejected);
        assert!(matches!(outcome, ActionOutcome::Applied(_)));
        assert_eq!(reconciler.store().current().unwrap().selected_target, Some(2));
        assert_eq!(reconciler.view().selection().unwrap().number, 2);
        assert_eq!(reconciler.view().upgrades().keys(), vec!["B".to_string()]);
    }

    #[test]
    fn apply_snapshot__poll_without_upgrades_keeps_the_current_list() {
        // given
        let mut reconciler = Reconciler::new();
        reconciler.apply_snapshot(state(0, &[(1, 0)]));
        let serials = upgrade_serials(&reconciler);
        let mut polled = state(30, &[(1, 2)]);
        polled.upgrades = None;

        // when
        reconciler.apply_snapshot(polled);

        // then
        let snapshot = reconciler.store().current().unwrap();
        assert_eq!(snapshot.points, 30);
        assert_eq!(snapshot.upgrades.as_ref().map(Vec::len), Some(2));
        assert_eq!(upgrade_serials(&reconciler), serials);
        assert!(reconciler.begin_purchase("ClicPuissant").is_some());
    }

    #[test]
    fn apply_snapshot__poll_without_upgrades_after_selection_moved_clears_them() {
        // given
        let mut reconciler = Reconciler::new();
        reconciler.apply_snapshot(state(0, &[(1, 0), (2, 0)]));
        let mut polled = state(0, &[(1, 0), (2, 0)]);
        polled.selected_target = Some(2);
        polled.upgrades = None;

        // when
        let changes = reconciler.apply_snapshot(polled);

        // then
        assert_eq!(changes.removed, 2);
        assert!(reconciler.view().upgrades().is_empty());
        assert!(reconciler.store().current().unwrap().upgrades.is_none());
        assert!(reconciler.begin_purchase("ClicPuissant").is_none());
        assert_eq!(reconciler.view().selection().unwrap().number, 2);
    }

    #[test]
    fn begin_purchase__binds_the_selected_target_only_for_per_target_upgrades() {
        // given
        let mut reconciler = Reconciler::new();
        reconciler.apply_snapshot(state(0, &[(1, 0)]));

        // when
        let per_target = reconciler.begin_purchase("ClicPuissant").unwrap();
        let global = reconciler.begin_purchase("SpeedAuto").unwrap();
        let unknown = reconciler.begin_purchase("Nope");

        // then
        assert_eq!(per_target.target, Some(1));
        assert_eq!(global.target, None);
        assert!(unknown.is_none());
    }

    #[test]
    fn confirm_purchase__success_replaces_state_and_flashes_the_card() {
        // given
        let mut reconciler = Reconciler::new();
        reconciler.apply_snapshot(state(50, &[(1, 0)]));
        let ticket = reconciler.begin_purchase("ClicPuissant").unwrap();
        let mut after = state(40, &[(1, 0)]);
        after.upgrades = Some(vec![
            Upgrade {
                level: 1,
                ..upgrade("ClicPuissant", 11, true)
            },
            upgrade("SpeedAuto", 200, false),
        ]);

        // when
        let outcome = reconciler.confirm_purchase(
            &ticket,
            Some(PurchaseReceipt {
                success: true,
                snapshot: Some(after),
            }),
            Instant::now(),
        );

        // then
        assert!(matches!(outcome, ActionOutcome::Applied(_)));
        assert_eq!(reconciler.store().current().unwrap().points, 40);
        let card = reconciler
            .view()
            .upgrades()
            .get(&"ClicPuissant".to_string())
            .unwrap()
            .card();
        assert_eq!(card.face().level, 1);
        assert_eq!(card.feedback(), Some(PurchaseFeedback::Success));
        assert_eq!(reconciler.view().notice().unwrap().kind, NoticeKind::Success);
    }

    #[test]
    fn confirm_purchase__rejection_keeps_state_and_shows_failure() {
        // given
        let mut reconciler = Reconciler::new();
        reconciler.apply_snapshot(state(5, &[(1, 0)]));
        let version = reconciler.store().version();
        let ticket = reconciler.begin_purchase("SpeedAuto").unwrap();

        // when
        let outcome = reconciler.confirm_purchase(
            &ticket,
            Some(PurchaseReceipt {
                success: false,
                snapshot: Some(state(0, &[])),
            }),
            Instant::now(),
        );

        // then
        assert_eq!(outcome, ActionOutcome::Rejected);
        assert_eq!(reconciler.store().version(), version);
        let card = reconciler
            .view()
            .upgrades()
            .get(&"SpeedAuto".to_string())
            .unwrap()
            .card();
        assert_eq!(card.feedback(), Some(PurchaseFeedback::Failure));
        let notice = reconciler.view().notice().unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.message, "Not enough points!");
    }

    #[test]
    fn confirm_purchase__transport_failure_shows_error_notice() {
        // given
        let mut reconciler = Reconciler::new();
        reconciler.apply_snapshot(state(50, &[(1, 0)]));
        let version = reconciler.store().version();
        let ticket = reconciler.begin_purchase("ClicPuissant").unwrap();

        // when
        let outcome = reconciler.confirm_purchase(&ticket, None, Instant::now());

        // then
        assert_eq!(outcome, ActionOutcome::Unavailable);
        assert_eq!(reconciler.store().version(), version);
        let notice = reconciler.view().notice().unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.message, "Purchase failed");
        let card = reconciler
            .view()
            .upgrades()
            .get(&"ClicPuissant".to_string())
            .unwrap()
            .card();
        assert_eq!(card.feedback(), None);
    }

    #[test]
    fn confirm_purchase__success_without_state_keeps_snapshot() {
        // given
        let mut reconciler = Reconciler::new();
        reconciler.apply_snapshot(state(50, &[(1, 0)]));
        let version = reconciler.store().version();
        let ticket = reconciler.begin_purchase("SpeedAuto").unwrap();

        // when
        let outcome = reconciler.confirm_purchase(
            &ticket,
            Some(PurchaseReceipt {
                success: true,
                snapshot: None,
            }),
            Instant::now(),
        );

        // then
        assert_eq!(outcome, ActionOutcome::Applied(ViewChanges::default()));
        assert_eq!(reconciler.store().version(), version);
        assert_eq!(reconciler.store().current().unwrap().points, 50);
        let card = reconciler
            .view()
            .upgrades()
            .get(&"SpeedAuto".to_string())
            .unwrap()
            .card();
        assert_eq!(card.feedback(), Some(PurchaseFeedback::Success));
        assert_eq!(reconciler.view().notice().unwrap().message, "Upgrade purchased!");
    }

    #[test]
    fn confirm_load__transport_failure_shows_error_notice() {
        // given
        let mut reconciler = Reconciler::new();
        reconciler.apply_snapshot(state(5, &[(1, 0)]));
        let version = reconciler.store().version();

        // when
        let outcome = reconciler.confirm_load(None, Instant::now());

        // then
        assert_eq!(outcome, ActionOutcome::Unavailable);
        assert_eq!(reconciler.store().version(), version);
        assert_eq!(reconciler.view().targets().keys(), vec![1]);
        let notice = reconciler.view().notice().unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.message, "Load failed");
    }

    #[test]
    fn confirm_load__replaces_state_or_reports_missing_save() {
        // given
        let mut reconciler = Reconciler::new();
        reconciler.apply_snapshot(state(5, &[(1, 0)]));
        let now = Instant::now();

        // when
        let missing = reconciler.confirm_load(
            Some(LoadReceipt {
                success: false,
                snapshot: None,
            }),
            now,
        );
        let missing_notice = reconciler.view().notice().cloned();
        let loaded = reconciler.confirm_load(
            Some(LoadReceipt {
                success: true,
                snapshot: Some(state(99, &[(1, 4), (2, 1)])),
            }),
            now,
        );

        // then
        assert_eq!(missing, ActionOutcome::Rejected);
        assert_eq!(missing_notice.unwrap().message, "No save found");
        assert!(matches!(loaded, ActionOutcome::Applied(_)));
        assert_eq!(reconciler.view().score().unwrap().points, 99);
        assert_eq!(reconciler.view().targets().keys(), vec![1, 2]);
    }

    #[test]
    fn confirm_save__reports_outcome_as_a_notice() {
        // given
        let mut reconciler = Reconciler::new();
        let now = Instant::now();

        // when
        let saved = reconciler.confirm_save(Some(SaveReceipt { success: true }), now);
        let saved_notice = reconciler.view().notice().cloned().unwrap();
        let failed = reconciler.confirm_save(None, now);

        // then
        assert_eq!(saved, ActionOutcome::Applied(ViewChanges::default()));
        assert!(saved_notice.message.starts_with("Game saved at "));
        assert_eq!(failed, ActionOutcome::Unavailable);
        assert_eq!(reconciler.view().notice().unwrap().kind, NoticeKind::Error);
    }
}
