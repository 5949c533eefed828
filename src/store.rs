use crate::model::{
    GameSnapshot,
    TargetId,
};

/// A delta referred to an entity the current snapshot no longer holds.
///
/// This is the expected outcome of an optimistic update racing an
/// authoritative replacement and is never surfaced to the user.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IdentityMismatch {
    #[error("no snapshot has been loaded yet")]
    NoSnapshot,
    #[error("target {0} is not part of the current snapshot")]
    MissingTarget(TargetId),
}

/// Owner of the single current [`GameSnapshot`].
///
/// Writers go through [`GameStore::replace`] or [`GameStore::apply_delta`];
/// everything else only reads.
#[derive(Debug, Default)]
pub struct GameStore {
    snapshot: Option<GameSnapshot>,
    version: u64,
}

impl GameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&GameSnapshot> {
        self.snapshot.as_ref()
    }

    /// Bumped by every replacement and every committed delta.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn replace(&mut self, snapshot: GameSnapshot) -> u64 {
        self.snapshot = Some(snapshot);
        self.version += 1;
        self.version
    }

    /// Runs `mutate` against a scratch copy of the current snapshot and
    /// commits the copy only if `mutate` succeeds.
    pub fn apply_delta<T>(
        &mut self,
        mutate: impl FnOnce(&mut GameSnapshot) -> Result<T, IdentityMismatch>,
    ) -> Result<T, IdentityMismatch> {
        let current = self.snapshot.as_ref().ok_or(IdentityMismatch::NoSnapshot)?;
        let mut scratch = current.clone();
        let value = mutate(&mut scratch)?;
        self.snapshot = Some(scratch);
        self.version += 1;
        Ok(value)
    }
}
