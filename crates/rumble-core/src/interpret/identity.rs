//! Binding of mutable display names to stable actor IDs.
//!
//! Names are learned progressively from message metadata. Every new binding
//! is appended to the observation log and propagated backwards to games and
//! mentions that so far only knew the name.
//!
//! Lookups are bounded by the message time being interpreted, so a rerun
//! over history that was already imported resolves exactly as the first run
//! did, regardless of observations recorded later.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::db::store::Store;
use crate::error::IngestError;
use crate::model::{Actor, NameObservation};

/// What a single [`IdentityResolver::observe`] call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Observed {
    /// A new observation row was written.
    pub recorded: bool,
    pub backfilled_games: usize,
    pub backfilled_mentions: usize,
}

impl Observed {
    #[must_use]
    pub const fn backfilled(&self) -> usize {
        self.backfilled_games + self.backfilled_mentions
    }
}

#[derive(Clone, Copy)]
pub struct IdentityResolver<'conn> {
    store: Store<'conn>,
}

impl<'conn> IdentityResolver<'conn> {
    #[must_use]
    pub const fn new(store: Store<'conn>) -> Self {
        Self { store }
    }

    /// Return the actor for `id`, creating it on first reference.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::InvalidId`] for an empty ID, or a store error.
    pub fn resolve_or_create(&self, id: &str) -> Result<Actor, IngestError> {
        if id.is_empty() {
            return Err(IngestError::InvalidId);
        }
        Ok(self.store.find_or_create_user(id)?)
    }

    /// Record that `id` carried `name` at `at`.
    ///
    /// Nothing is written when the actor's latest observation up to `at`
    /// already has this name. Otherwise the observation is appended and
    /// unresolved game hosts and mentions carrying `name` are bound to `id`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::InvalidId`] for an empty ID, or a store error.
    pub fn observe(&self, id: &str, name: &str, at: DateTime<Utc>) -> Result<Observed, IngestError> {
        let actor = self.resolve_or_create(id)?;
        if name.is_empty() {
            debug!(user_id = %actor.id, "skipping observation without a name");
            return Ok(Observed::default());
        }

        if let Some(last) = self.store.last_observation_for_user(&actor.id, at)? {
            if last.name == name {
                return Ok(Observed::default());
            }
        }

        let recorded = self.store.insert_observation(&NameObservation {
            user_id: actor.id.clone(),
            name: name.to_string(),
            observed_at: at,
        })?;

        let observed = Observed {
            recorded,
            backfilled_games: self.store.backfill_game_hosts(&actor.id, name)?,
            backfilled_mentions: self.store.backfill_mentions(&actor.id, name)?,
        };
        if observed.backfilled() > 0 {
            info!(
                user_id = %actor.id,
                name,
                games = observed.backfilled_games,
                mentions = observed.backfilled_mentions,
                "bound previously unresolved references"
            );
        }
        Ok(observed)
    }

    /// Best guess for the actor called `name` as of `at`: the latest
    /// observation carrying that name wins.
    ///
    /// # Errors
    ///
    /// Returns a store error; an unknown name is `Ok(None)`.
    pub fn resolve_by_name(
        &self,
        name: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Actor>, IngestError> {
        match self.store.last_observation_for_name(name, at)? {
            Some(observation) => Ok(Some(Actor {
                id: observation.user_id,
            })),
            None => {
                warn!(name, "no actor known by this name yet, keeping it unresolved");
                Ok(None)
            }
        }
    }

    /// Current name of `id` as of `at`.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn current_name(&self, id: &str, at: DateTime<Utc>) -> Result<Option<String>, IngestError> {
        Ok(self
            .store
            .last_observation_for_user(id, at)?
            .map(|observation| observation.name))
    }
}
