//! Derived view state: one node per live target and per live upgrade.
//!
//! Nodes are plain data; the terminal renderer in [`crate::ui`] only reads
//! them. [`KeyedView`] holds the create/patch/remove triad shared by every
//! keyed collection, [`GameView`] groups the collections with the score
//! header, the selection label and the transient notice.

use crate::model::{
    GameSnapshot,
    Target,
    TargetId,
    Upgrade,
};
use std::{
    collections::BTreeSet,
    fmt,
    ops::AddAssign,
    time::{
        Duration,
        Instant,
    },
};

pub const CLICK_FLASH: Duration = Duration::from_millis(100);
pub const PURCHASE_FLASH: Duration = Duration::from_millis(400);
pub const NOTICE_LIFETIME: Duration = Duration::from_secs(3);

/// Serial number handed to each created node. A node that is patched keeps
/// its serial; a re-created one gets a new serial.
pub type NodeSerial = u64;

/// Number of view mutations performed by a reconciliation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewChanges {
    pub created: usize,
    pub patched: usize,
    pub removed: usize,
}

impl ViewChanges {
    pub fn is_empty(&self) -> bool {
        self.created == 0 && self.patched == 0 && self.removed == 0
    }

    fn patched_if(changed: bool) -> Self {
        Self {
            patched: usize::from(changed),
            ..Self::default()
        }
    }
}

impl AddAssign for ViewChanges {
    fn add_assign(&mut self, other: Self) {
        self.created += other.created;
        self.patched += other.patched;
        self.removed += other.removed;
    }
}

impl fmt::Display for ViewChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "+{} ~{} -{}",
            self.created, self.patched, self.removed
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RebuildPolicy {
    /// Create missing keys, remove stale keys, patch the rest in place.
    PatchByKey,
    /// Remove everything and create everything when the key set differs;
    /// otherwise patch in place.
    RebuildOnKeySetChange,
}

/// Snapshot-wide values that individual cards depend on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderContext {
    pub points: u64,
    pub selected: Option<TargetId>,
}

impl RenderContext {
    pub fn of(snapshot: &GameSnapshot) -> Self {
        Self {
            points: snapshot.points,
            selected: snapshot.selected_target,
        }
    }
}

/// A node type that can be kept in a [`KeyedView`].
pub trait Card: Sized {
    type Key: Clone + Ord + fmt::Debug;
    type Source<'a>;

    fn key_of(source: &Self::Source<'_>) -> Self::Key;

    fn build(source: &Self::Source<'_>, ctx: &RenderContext) -> Self;

    /// Updates displayed fields in place. Returns `true` only if one of them
    /// changed.
    fn patch(&mut self, source: &Self::Source<'_>, ctx: &RenderContext) -> bool;
}

#[derive(Clone, Debug)]
pub struct Node<C: Card> {
    key: C::Key,
    serial: NodeSerial,
    card: C,
}

impl<C: Card> Node<C> {
    pub fn key(&self) -> &C::Key {
        &self.key
    }

    pub fn serial(&self) -> NodeSerial {
        self.serial
    }

    pub fn card(&self) -> &C {
        &self.card
    }
}

/// Ordered collection of nodes indexed by entity identity.
#[derive(Clone, Debug)]
pub struct KeyedView<C: Card> {
    nodes: Vec<Node<C>>,
    next_serial: NodeSerial,
}

impl<C: Card> Default for KeyedView<C> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            next_serial: 1,
        }
    }
}

impl<C: Card> KeyedView<C> {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node<C>> {
        self.nodes.iter()
    }

    pub fn keys(&self) -> Vec<C::Key> {
        self.nodes.iter().map(|node| node.key.clone()).collect()
    }

    pub fn key_set(&self) -> BTreeSet<C::Key> {
        self.nodes.iter().map(|node| node.key.clone()).collect()
    }

    pub fn get(&self, key: &C::Key) -> Option<&Node<C>> {
        self.nodes.iter().find(|node| node.key == *key)
    }

    fn card_mut(&mut self, key: &C::Key) -> Option<&mut C> {
        self.nodes
            .iter_mut()
            .find(|node| node.key == *key)
            .map(|node| &mut node.card)
    }

    fn cards_mut(&mut self) -> impl Iterator<Item = &mut C> {
        self.nodes.iter_mut().map(|node| &mut node.card)
    }

    /// Brings the node set in line with `sources` following `policy`.
    pub fn reconcile<'a, I>(
        &mut self,
        sources: I,
        ctx: &RenderContext,
        policy: RebuildPolicy,
    ) -> ViewChanges
    where
        I: IntoIterator<Item = C::Source<'a>>,
    {
        let sources: Vec<C::Source<'a>> = sources.into_iter().collect();
        let incoming: BTreeSet<C::Key> = sources.iter().map(|s| C::key_of(s)).collect();

        if policy == RebuildPolicy::RebuildOnKeySetChange && incoming != self.key_set() {
            return self.rebuild(sources, ctx);
        }

        let mut changes = ViewChanges::default();
        let before = self.nodes.len();
        self.nodes.retain(|node| incoming.contains(&node.key));
        changes.removed = before - self.nodes.len();

        for source in &sources {
            let key = C::key_of(source);
            match self.nodes.iter_mut().find(|node| node.key == key) {
                Some(node) => {
                    if node.card.patch(source, ctx) {
                        changes.patched += 1;
                    }
                }
                None => {
                    self.create(key, source, ctx);
                    changes.created += 1;
                }
            }
        }
        changes
    }

    /// Drops every node and creates one per source, in source order.
    pub fn rebuild<'a, I>(&mut self, sources: I, ctx: &RenderContext) -> ViewChanges
    where
        I: IntoIterator<Item = C::Source<'a>>,
    {
        let mut changes = ViewChanges {
            removed: self.nodes.len(),
            ..ViewChanges::default()
        };
        self.nodes.clear();
        for source in sources {
            let key = C::key_of(&source);
            // duplicate keys collapse onto the first node
            if let Some(card) = self.card_mut(&key) {
                card.patch(&source, ctx);
                continue;
            }
            self.create(key, &source, ctx);
            changes.created += 1;
        }
        changes
    }

    /// Patches the node for `source` if it exists. `None` when no node
    /// carries that key.
    pub fn patch_one(&mut self, source: &C::Source<'_>, ctx: &RenderContext) -> Option<bool> {
        let key = C::key_of(source);
        self.card_mut(&key).map(|card| card.patch(source, ctx))
    }

    fn create(&mut self, key: C::Key, source: &C::Source<'_>, ctx: &RenderContext) {
        let serial = self.next_serial;
        self.next_serial += 1;
        self.nodes.push(Node {
            key,
            serial,
            card: C::build(source, ctx),
        });
    }
}

/// Displayed fields of a target card.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetFace {
    pub number: u32,
    pub color: String,
    pub points_per_click: u64,
    pub auto_clicks_per_tick: u64,
    pub total_clicks: u64,
    pub points_earned: u64,
    pub selected: bool,
}

impl TargetFace {
    fn new(id: TargetId, target: &Target, ctx: &RenderContext) -> Self {
        Self {
            number: target.number,
            color: target.color.clone(),
            points_per_click: target.points_per_click,
            auto_clicks_per_tick: target.auto_clicks_per_tick,
            total_clicks: target.total_clicks,
            points_earned: target.points_earned,
            selected: ctx.selected == Some(id),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TargetCard {
    face: TargetFace,
    flash_until: Option<Instant>,
}

impl TargetCard {
    pub fn face(&self) -> &TargetFace {
        &self.face
    }

    pub fn is_flashing(&self) -> bool {
        self.flash_until.is_some()
    }
}

impl Card for TargetCard {
    type Key = TargetId;
    type Source<'a> = (TargetId, &'a Target);

    fn key_of(source: &Self::Source<'_>) -> TargetId {
        source.0
    }

    fn build(&(id, target): &Self::Source<'_>, ctx: &RenderContext) -> Self {
        Self {
            face: TargetFace::new(id, target, ctx),
            flash_until: None,
        }
    }

    fn patch(&mut self, &(id, target): &Self::Source<'_>, ctx: &RenderContext) -> bool {
        let face = TargetFace::new(id, target, ctx);
        if face == self.face {
            return false;
        }
        self.face = face;
        true
    }
}

/// Displayed fields of an upgrade card.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpgradeFace {
    pub kind: String,
    pub name: String,
    pub description: String,
    pub level: u32,
    pub price: u64,
    pub affordable: bool,
    /// Target a purchase from this card applies to.
    pub purchase_target: Option<TargetId>,
}

impl UpgradeFace {
    fn new(upgrade: &Upgrade, ctx: &RenderContext) -> Self {
        Self {
            kind: upgrade.kind.clone(),
            name: upgrade.name.clone(),
            description: upgrade.description.clone(),
            level: upgrade.level,
            price: upgrade.price,
            affordable: ctx.points >= upgrade.price,
            purchase_target: if upgrade.for_target {
                ctx.selected
            } else {
                None
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PurchaseFeedback {
    Success,
    Failure,
}

#[derive(Clone, Debug)]
pub struct UpgradeCard {
    face: UpgradeFace,
    feedback: Option<(PurchaseFeedback, Instant)>,
}

impl UpgradeCard {
    pub fn face(&self) -> &UpgradeFace {
        &self.face
    }

    pub fn feedback(&self) -> Option<PurchaseFeedback> {
        self.feedback.map(|(feedback, _)| feedback)
    }
}

impl Card for UpgradeCard {
    type Key = String;
    type Source<'a> = &'a Upgrade;

    fn key_of(source: &Self::Source<'_>) -> String {
        source.kind.clone()
    }

    fn build(upgrade: &Self::Source<'_>, ctx: &RenderContext) -> Self {
        Self {
            face: UpgradeFace::new(upgrade, ctx),
            feedback: None,
        }
    }

    fn patch(&mut self, upgrade: &Self::Source<'_>, ctx: &RenderContext) -> bool {
        let face = UpgradeFace::new(upgrade, ctx);
        if face == self.face {
            return false;
        }
        self.face = face;
        true
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScoreBoard {
    pub points: u64,
    pub total_clicks: u64,
    pub auto_click_delay_secs: f64,
    pub target_count: usize,
}

impl ScoreBoard {
    fn of(snapshot: &GameSnapshot) -> Self {
        Self {
            points: snapshot.points,
            total_clicks: snapshot.total_clicks,
            auto_click_delay_secs: snapshot.auto_click_delay_secs,
            target_count: snapshot.targets.len(),
        }
    }
}

/// "Upgrades for target N" heading, drawn in the target's color.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionLabel {
    pub number: u32,
    pub color: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
    expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct GameView {
    score: Option<ScoreBoard>,
    selection: Option<SelectionLabel>,
    targets: KeyedView<TargetCard>,
    upgrades: KeyedView<UpgradeCard>,
    notice: Option<Notice>,
}

impl GameView {
    pub fn score(&self) -> Option<&ScoreBoard> {
        self.score.as_ref()
    }

    pub fn selection(&self) -> Option<&SelectionLabel> {
        self.selection.as_ref()
    }

    pub fn targets(&self) -> &KeyedView<TargetCard> {
        &self.targets
    }

    pub fn upgrades(&self) -> &KeyedView<UpgradeCard> {
        &self.upgrades
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Full refresh pass: header, every target by key, selection label and,
    /// when the snapshot carries a list, the upgrades.
    pub fn refresh(&mut self, snapshot: &GameSnapshot) -> ViewChanges {
        let ctx = RenderContext::of(snapshot);
        let mut changes = self.refresh_score(snapshot);
        changes += self.targets.reconcile(
            snapshot.targets.iter().map(|(id, target)| (*id, target)),
            &ctx,
            RebuildPolicy::PatchByKey,
        );
        changes += self.refresh_selection_label(snapshot);
        changes += self.refresh_upgrades(snapshot);
        changes
    }

    /// Upgrade cards against the snapshot's list: patched in place while the
    /// set of types is unchanged, rebuilt otherwise. A snapshot without a
    /// list leaves the cards alone.
    pub fn refresh_upgrades(&mut self, snapshot: &GameSnapshot) -> ViewChanges {
        let ctx = RenderContext::of(snapshot);
        match &snapshot.upgrades {
            Some(upgrades) => self.upgrades.reconcile(
                upgrades,
                &ctx,
                RebuildPolicy::RebuildOnKeySetChange,
            ),
            None => ViewChanges::default(),
        }
    }

    pub fn refresh_score(&mut self, snapshot: &GameSnapshot) -> ViewChanges {
        let score = ScoreBoard::of(snapshot);
        match &self.score {
            Some(current) if *current == score => ViewChanges::default(),
            Some(_) => {
                self.score = Some(score);
                ViewChanges::patched_if(true)
            }
            None => {
                self.score = Some(score);
                ViewChanges {
                    created: 1,
                    ..ViewChanges::default()
                }
            }
        }
    }

    /// Patches the card of `id` alone. A target missing from either the
    /// snapshot or the view is left alone.
    pub fn patch_target(&mut self, id: TargetId, snapshot: &GameSnapshot) -> ViewChanges {
        let ctx = RenderContext::of(snapshot);
        let Some(target) = snapshot.target(id) else {
            return ViewChanges::default();
        };
        let changed = self.targets.patch_one(&(id, target), &ctx).unwrap_or(false);
        ViewChanges::patched_if(changed)
    }

    /// Selection markers on every target card plus the selection label.
    pub fn refresh_selection(&mut self, snapshot: &GameSnapshot) -> ViewChanges {
        let ctx = RenderContext::of(snapshot);
        let mut changes = self.targets.reconcile(
            snapshot.targets.iter().map(|(id, target)| (*id, target)),
            &ctx,
            RebuildPolicy::PatchByKey,
        );
        changes += self.refresh_selection_label(snapshot);
        changes
    }

    pub fn rebuild_upgrades(&mut self, snapshot: &GameSnapshot) -> ViewChanges {
        let ctx = RenderContext::of(snapshot);
        self.upgrades
            .rebuild(snapshot.upgrades.iter().flatten(), &ctx)
    }

    fn refresh_selection_label(&mut self, snapshot: &GameSnapshot) -> ViewChanges {
        let label = snapshot
            .selected_target
            .and_then(|id| snapshot.target(id))
            .map(|target| SelectionLabel {
                number: target.number,
                color: target.color.clone(),
            });
        if label == self.selection {
            return ViewChanges::default();
        }
        self.selection = label;
        ViewChanges::patched_if(true)
    }

    pub fn flash_target(&mut self, id: TargetId, now: Instant) {
        if let Some(card) = self.targets.card_mut(&id) {
            card.flash_until = Some(now + CLICK_FLASH);
        }
    }

    pub fn flash_upgrade(&mut self, kind: &str, feedback: PurchaseFeedback, now: Instant) {
        if let Some(card) = self.upgrades.card_mut(&kind.to_string()) {
            card.feedback = Some((feedback, now + PURCHASE_FLASH));
        }
    }

    pub fn show_notice(&mut self, message: impl Into<String>, kind: NoticeKind, now: Instant) {
        self.notice = Some(Notice {
            message: message.into(),
            kind,
            expires_at: now + NOTICE_LIFETIME,
        });
    }

    /// Clears flashes and notices whose time is up. Returns `true` when
    /// anything was cleared.
    pub fn expire(&mut self, now: Instant) -> bool {
        let mut expired = false;
        for card in self.targets.cards_mut() {
            if card.flash_until.is_some_and(|until| until <= now) {
                card.flash_until = None;
                expired = true;
            }
        }
        for card in self.upgrades.cards_mut() {
            if card.feedback.is_some_and(|(_, until)| until <= now) {
                card.feedback = None;
                expired = true;
            }
        }
        if self.notice.as_ref().is_some_and(|n| n.expires_at <= now) {
            self.notice = None;
            expired = true;
        }
        expired
    }
}
