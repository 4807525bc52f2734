//! Derived entities written to the store.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A platform account, keyed by its stable ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: String,
}

/// A display name seen attached to an actor at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameObservation {
    pub user_id: String,
    pub name: String,
    pub observed_at: DateTime<Utc>,
}

/// Lifecycle phase of a game, derived from its timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    CountingDown,
    Running,
    Ended,
    Cancelled,
}

/// One play session in a channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Game {
    pub id: i64,
    pub channel_id: String,
    pub era: String,
    pub host_user_name: Option<String>,
    pub host_user_id: Option<String>,
    pub countdown_started_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub cancelled: bool,
    pub reward_coins: u64,
    pub xp_multiplier: f64,
}

impl Game {
    /// A fresh game in its countdown phase.
    #[must_use]
    pub fn counting_down(
        id: i64,
        channel_id: &str,
        era: String,
        host_user_name: Option<String>,
        countdown_started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            channel_id: channel_id.to_string(),
            era,
            host_user_name,
            host_user_id: None,
            countdown_started_at,
            started_at: None,
            ended_at: None,
            cancelled: false,
            reward_coins: 0,
            xp_multiplier: 1.0,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> GamePhase {
        match (self.started_at.is_some(), self.ended_at.is_some()) {
            (_, true) if self.cancelled => GamePhase::Cancelled,
            (_, true) => GamePhase::Ended,
            (true, false) => GamePhase::Running,
            (false, false) => GamePhase::CountingDown,
        }
    }
}

/// One narrative beat of a running game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Round {
    pub game_id: i64,
    pub round_number: u32,
    pub posted_at: DateTime<Utc>,
}

/// A user referenced inside a narrative line.
///
/// `user_id` stays `None` until the name can be bound to an actor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UserMention {
    pub user_id: Option<String>,
    pub user_name: String,
    pub killed: bool,
    pub suffix: String,
}

impl UserMention {
    #[must_use]
    pub fn unresolved(user_name: String, killed: bool, suffix: String) -> Self {
        Self {
            user_id: None,
            user_name,
            killed,
            suffix,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub name: String,
}

/// Deduplicated narrative template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InteractionMessage {
    pub id: i64,
    pub text: String,
    pub event: String,
}
