//! Persistence adapter: typed upserts and lookups against the history store.
//!
//! Every write is keyed on a natural dedup key (see [`super::schema`]), so
//! replaying an export that was already imported rewrites the same rows
//! instead of adding new ones. Lookups report "not found" as `None`; only
//! genuine SQLite failures surface as errors.
//!
//! Resolved actor references are never downgraded: an upsert that carries
//! no actor ID keeps whatever ID a previous run or a backfill stored.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

use crate::model::{Actor, Game, InteractionMessage, Item, NameObservation, Round, UserMention};

/// Microseconds since the epoch, the store's timestamp representation.
#[must_use]
pub fn to_us(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

/// Inverse of [`to_us`].
///
/// # Errors
///
/// Returns a conversion error for values outside chrono's range.
pub fn from_us(us: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_micros(us).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Integer,
            format!("timestamp {us}us out of range").into(),
        )
    })
}

fn optional_from_us(us: Option<i64>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    us.map(from_us).transpose()
}

/// Row counts per entity table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub users: u64,
    pub name_observations: u64,
    pub items: u64,
    pub games: u64,
    pub rounds: u64,
    pub interaction_messages: u64,
    pub interactions: u64,
    pub interaction_mentions: u64,
}

/// Typed access to the history store.
#[derive(Clone, Copy)]
pub struct Store<'conn> {
    conn: &'conn Connection,
}

impl<'conn> Store<'conn> {
    /// Wrap an open (and migrated) connection.
    #[must_use]
    pub const fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    #[must_use]
    pub const fn conn(&self) -> &'conn Connection {
        self.conn
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Begin a write transaction on the shared connection.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite refuses to start the transaction.
    pub fn begin(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE")
    }

    /// Commit the transaction opened by [`Store::begin`]. A failed commit
    /// rolls the transaction back so the connection is usable again.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub fn commit(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch("COMMIT").inspect_err(|_| self.rollback())
    }

    /// Roll back the transaction opened by [`Store::begin`], if any.
    pub fn rollback(&self) {
        if !self.conn.is_autocommit() {
            if let Err(error) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!(%error, "rollback failed");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Actors and name observations
    // -----------------------------------------------------------------------

    /// Return the actor with `id`, creating it on first reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails (including an empty ID, which
    /// the schema rejects).
    pub fn find_or_create_user(&self, id: &str) -> rusqlite::Result<Actor> {
        self.conn.execute(
            "INSERT OR IGNORE INTO users (user_id) VALUES (?1)",
            params![id],
        )?;
        Ok(Actor { id: id.to_string() })
    }

    /// Latest observation of `user_id` not later than `as_of`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn last_observation_for_user(
        &self,
        user_id: &str,
        as_of: DateTime<Utc>,
    ) -> rusqlite::Result<Option<NameObservation>> {
        self.conn
            .query_row(
                "SELECT user_id, name, observed_at_us FROM name_observations
                 WHERE user_id = ?1 AND observed_at_us <= ?2
                 ORDER BY observed_at_us DESC, observation_id DESC
                 LIMIT 1",
                params![user_id, to_us(as_of)],
                observation_from_row,
            )
            .optional()
    }

    /// Latest observation carrying `name` not later than `as_of`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn last_observation_for_name(
        &self,
        name: &str,
        as_of: DateTime<Utc>,
    ) -> rusqlite::Result<Option<NameObservation>> {
        self.conn
            .query_row(
                "SELECT user_id, name, observed_at_us FROM name_observations
                 WHERE name = ?1 AND observed_at_us <= ?2
                 ORDER BY observed_at_us DESC, observation_id DESC
                 LIMIT 1",
                params![name, to_us(as_of)],
                observation_from_row,
            )
            .optional()
    }

    /// All observations of one actor in chronological order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn observations_for_user(&self, user_id: &str) -> rusqlite::Result<Vec<NameObservation>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, name, observed_at_us FROM name_observations
             WHERE user_id = ?1
             ORDER BY observed_at_us ASC, observation_id ASC",
        )?;
        let rows = stmt.query_map(params![user_id], observation_from_row)?;
        rows.collect()
    }

    /// Append an observation. Returns `false` when the exact row exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn insert_observation(&self, observation: &NameObservation) -> rusqlite::Result<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO name_observations (user_id, name, observed_at_us)
             VALUES (?1, ?2, ?3)",
            params![
                observation.user_id,
                observation.name,
                to_us(observation.observed_at)
            ],
        )?;
        Ok(changed > 0)
    }

    /// Bind games whose host is only known by `name` to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn backfill_game_hosts(&self, user_id: &str, name: &str) -> rusqlite::Result<usize> {
        self.conn.execute(
            "UPDATE games SET host_user_id = ?1
             WHERE host_user_id IS NULL AND host_user_name = ?2",
            params![user_id, name],
        )
    }

    /// Bind mentions only known by `name` to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn backfill_mentions(&self, user_id: &str, name: &str) -> rusqlite::Result<usize> {
        self.conn.execute(
            "UPDATE interaction_mentions SET user_id = ?1
             WHERE user_id IS NULL AND user_name = ?2",
            params![user_id, name],
        )
    }

    // -----------------------------------------------------------------------
    // Items and interaction templates
    // -----------------------------------------------------------------------

    /// Return the item called `name`, creating it on first reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn find_or_create_item(&self, name: &str) -> rusqlite::Result<Item> {
        self.conn.execute(
            "INSERT OR IGNORE INTO items (name) VALUES (?1)",
            params![name],
        )?;
        Ok(Item {
            name: name.to_string(),
        })
    }

    /// Return the template row for (`text`, `event`), creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert or lookup fails.
    pub fn find_or_create_interaction_message(
        &self,
        text: &str,
        event: &str,
    ) -> rusqlite::Result<InteractionMessage> {
        self.conn.execute(
            "INSERT OR IGNORE INTO interaction_messages (text, event) VALUES (?1, ?2)",
            params![text, event],
        )?;
        self.conn.query_row(
            "SELECT message_id, text, event FROM interaction_messages
             WHERE text = ?1 AND event = ?2",
            params![text, event],
            |row| {
                Ok(InteractionMessage {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    event: row.get(2)?,
                })
            },
        )
    }

    // -----------------------------------------------------------------------
    // Games
    // -----------------------------------------------------------------------

    /// Highest game ID in the store, `0` when empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn max_game_id(&self) -> rusqlite::Result<i64> {
        self.conn
            .query_row("SELECT COALESCE(MAX(game_id), 0) FROM games", [], |row| {
                row.get(0)
            })
    }

    /// ID of the game whose countdown started at `countdown_at` in `channel_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_game_id(
        &self,
        channel_id: &str,
        countdown_at: DateTime<Utc>,
    ) -> rusqlite::Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT game_id FROM games
                 WHERE channel_id = ?1 AND countdown_started_at_us = ?2",
                params![channel_id, to_us(countdown_at)],
                |row| row.get(0),
            )
            .optional()
    }

    /// Upsert a game by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub fn save_game(&self, game: &Game) -> rusqlite::Result<()> {
        let reward = i64::try_from(game.reward_coins)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        self.conn.execute(
            "INSERT INTO games (
                game_id, channel_id, era, host_user_name, host_user_id,
                countdown_started_at_us, started_at_us, ended_at_us,
                cancelled, reward_coins, xp_multiplier
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(game_id) DO UPDATE SET
                era = excluded.era,
                host_user_name = excluded.host_user_name,
                host_user_id = COALESCE(excluded.host_user_id, games.host_user_id),
                started_at_us = excluded.started_at_us,
                ended_at_us = excluded.ended_at_us,
                cancelled = excluded.cancelled,
                reward_coins = excluded.reward_coins,
                xp_multiplier = excluded.xp_multiplier",
            params![
                game.id,
                game.channel_id,
                game.era,
                game.host_user_name,
                game.host_user_id,
                to_us(game.countdown_started_at),
                game.started_at.map(to_us),
                game.ended_at.map(to_us),
                game.cancelled,
                reward,
                game.xp_multiplier,
            ],
        )?;
        Ok(())
    }

    /// Load a game by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_game(&self, id: i64) -> rusqlite::Result<Option<Game>> {
        self.conn
            .query_row(
                "SELECT game_id, channel_id, era, host_user_name, host_user_id,
                        countdown_started_at_us, started_at_us, ended_at_us,
                        cancelled, reward_coins, xp_multiplier
                 FROM games WHERE game_id = ?1",
                params![id],
                game_from_row,
            )
            .optional()
    }

    /// All games of a channel in countdown order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn games_in_channel(&self, channel_id: &str) -> rusqlite::Result<Vec<Game>> {
        let mut stmt = self.conn.prepare(
            "SELECT game_id, channel_id, era, host_user_name, host_user_id,
                    countdown_started_at_us, started_at_us, ended_at_us,
                    cancelled, reward_coins, xp_multiplier
             FROM games WHERE channel_id = ?1
             ORDER BY countdown_started_at_us ASC",
        )?;
        let rows = stmt.query_map(params![channel_id], game_from_row)?;
        rows.collect()
    }

    // -----------------------------------------------------------------------
    // Rounds and interactions
    // -----------------------------------------------------------------------

    /// Upsert a round on (game, number) and return its row ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert or lookup fails.
    pub fn save_round(&self, round: &Round) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO rounds (game_id, round_number, posted_at_us) VALUES (?1, ?2, ?3)
             ON CONFLICT(game_id, round_number) DO UPDATE SET posted_at_us = excluded.posted_at_us",
            params![round.game_id, round.round_number, to_us(round.posted_at)],
        )?;
        self.conn.query_row(
            "SELECT round_id FROM rounds WHERE game_id = ?1 AND round_number = ?2",
            params![round.game_id, round.round_number],
            |row| row.get(0),
        )
    }

    /// Round numbers stored for a game, ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn round_numbers(&self, game_id: i64) -> rusqlite::Result<Vec<u32>> {
        let mut stmt = self.conn.prepare(
            "SELECT round_number FROM rounds WHERE game_id = ?1 ORDER BY round_number ASC",
        )?;
        let rows = stmt.query_map(params![game_id], |row| row.get(0))?;
        rows.collect()
    }

    /// Upsert an interaction on (round, position) together with its mention
    /// slots and item links. Returns the interaction row ID.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the writes fail.
    pub fn save_interaction(
        &self,
        round_id: i64,
        position: usize,
        message: &InteractionMessage,
        mentions: &[UserMention],
        items: &[Item],
    ) -> rusqlite::Result<i64> {
        let position = i64::try_from(position)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        self.conn.execute(
            "INSERT INTO interactions (round_id, position, message_id) VALUES (?1, ?2, ?3)
             ON CONFLICT(round_id, position) DO UPDATE SET message_id = excluded.message_id",
            params![round_id, position, message.id],
        )?;
        let interaction_id: i64 = self.conn.query_row(
            "SELECT interaction_id FROM interactions WHERE round_id = ?1 AND position = ?2",
            params![round_id, position],
            |row| row.get(0),
        )?;

        for (slot, mention) in mentions.iter().enumerate() {
            let slot = i64::try_from(slot)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            self.conn.execute(
                "INSERT INTO interaction_mentions (
                    interaction_id, slot, user_id, user_name, killed, suffix
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(interaction_id, slot) DO UPDATE SET
                    user_id = COALESCE(excluded.user_id, interaction_mentions.user_id),
                    user_name = excluded.user_name,
                    killed = excluded.killed,
                    suffix = excluded.suffix",
                params![
                    interaction_id,
                    slot,
                    mention.user_id,
                    mention.user_name,
                    mention.killed,
                    mention.suffix,
                ],
            )?;
        }

        for item in items {
            self.conn.execute(
                "INSERT OR IGNORE INTO interaction_items (interaction_id, item_name)
                 VALUES (?1, ?2)",
                params![interaction_id, item.name],
            )?;
        }

        Ok(interaction_id)
    }

    /// Mention slots of one interaction, in slot order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn mentions_for_interaction(
        &self,
        interaction_id: i64,
    ) -> rusqlite::Result<Vec<UserMention>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, user_name, killed, suffix FROM interaction_mentions
             WHERE interaction_id = ?1 ORDER BY slot ASC",
        )?;
        let rows = stmt.query_map(params![interaction_id], |row| {
            Ok(UserMention {
                user_id: row.get(0)?,
                user_name: row.get(1)?,
                killed: row.get(2)?,
                suffix: row.get(3)?,
            })
        })?;
        rows.collect()
    }

    // -----------------------------------------------------------------------
    // Metadata
    // -----------------------------------------------------------------------

    /// Record the wall-clock time of the last completed import.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn record_import(&self, at: DateTime<Utc>) -> rusqlite::Result<()> {
        self.conn.execute(
            "UPDATE store_meta SET last_import_at_us = ?1 WHERE id = 1",
            params![to_us(at)],
        )?;
        Ok(())
    }

    /// Latest game or round timestamp held in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn latest_activity(&self) -> rusqlite::Result<Option<DateTime<Utc>>> {
        let latest: Option<i64> = self.conn.query_row(
            "SELECT MAX(ts) FROM (
                SELECT MAX(countdown_started_at_us) AS ts FROM games
                UNION ALL SELECT MAX(started_at_us) FROM games
                UNION ALL SELECT MAX(ended_at_us) FROM games
                UNION ALL SELECT MAX(posted_at_us) FROM rounds
            )",
            [],
            |row| row.get(0),
        )?;
        optional_from_us(latest)
    }

    /// Row counts per entity table.
    ///
    /// # Errors
    ///
    /// Returns an error if any count query fails.
    pub fn counts(&self) -> rusqlite::Result<StoreCounts> {
        let count = |table: &str| -> rusqlite::Result<u64> {
            let n: i64 =
                self.conn
                    .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                        row.get(0)
                    })?;
            Ok(u64::try_from(n).unwrap_or_default())
        };

        Ok(StoreCounts {
            users: count("users")?,
            name_observations: count("name_observations")?,
            items: count("items")?,
            games: count("games")?,
            rounds: count("rounds")?,
            interaction_messages: count("interaction_messages")?,
            interactions: count("interactions")?,
            interaction_mentions: count("interaction_mentions")?,
        })
    }
}

fn observation_from_row(row: &Row<'_>) -> rusqlite::Result<NameObservation> {
    Ok(NameObservation {
        user_id: row.get(0)?,
        name: row.get(1)?,
        observed_at: from_us(row.get(2)?)?,
    })
}

fn game_from_row(row: &Row<'_>) -> rusqlite::Result<Game> {
    let reward: i64 = row.get(9)?;
    Ok(Game {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        era: row.get(2)?,
        host_user_name: row.get(3)?,
        host_user_id: row.get(4)?,
        countdown_started_at: from_us(row.get(5)?)?,
        started_at: optional_from_us(row.get(6)?)?,
        ended_at: optional_from_us(row.get(7)?)?,
        cancelled: row.get(8)?,
        reward_coins: u64::try_from(reward).unwrap_or_default(),
        xp_multiplier: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations;
    use chrono::TimeZone;

    fn test_db() -> Connection {
        let mut conn = Connection::open_in_memory().expect("open in-memory db");
        conn.pragma_update(None, "foreign_keys", "ON")
            .expect("enable fk");
        migrations::migrate(&mut conn).expect("migrate schema");
        conn
    }

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
    }

    #[test]
    fn timestamps_round_trip_through_micros() {
        let at = ts(1_711_929_600);
        assert_eq!(from_us(to_us(at)).expect("in range"), at);
    }

    #[test]
    fn failed_commit_leaves_no_open_transaction() {
        let conn = test_db();
        let store = Store::new(&conn);
        store.begin().expect("begin");
        conn.pragma_update(None, "defer_foreign_keys", "ON")
            .expect("defer fk");
        conn.execute(
            "INSERT INTO name_observations (user_id, name, observed_at_us) VALUES ('ghost', 'g', 0)",
            [],
        )
        .expect("deferred insert");

        assert!(store.commit().is_err());
        assert!(conn.is_autocommit());
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM name_observations", [], |row| row.get(0))
            .expect("count");
        assert_eq!(rows, 0);
        store.begin().expect("store usable after failed commit");
        store.commit().expect("empty commit");
    }

    #[test]
    fn find_or_create_user_is_idempotent() {
        let conn = test_db();
        let store = Store::new(&conn);
        store.find_or_create_user("U1").expect("create");
        store.find_or_create_user("U1").expect("find");
        assert_eq!(store.counts().expect("counts").users, 1);
    }

    #[test]
    fn empty_user_id_is_rejected_by_schema() {
        let conn = test_db();
        let store = Store::new(&conn);
        assert!(store.find_or_create_user("").is_err());
    }

    #[test]
    fn last_observation_respects_as_of() {
        let conn = test_db();
        let store = Store::new(&conn);
        store.find_or_create_user("U1").expect("user");
        for (name, at) in [("alex", 10), ("alexander", 20)] {
            store
                .insert_observation(&NameObservation {
                    user_id: "U1".into(),
                    name: name.into(),
                    observed_at: ts(at),
                })
                .expect("insert");
        }

        let at_15 = store
            .last_observation_for_user("U1", ts(15))
            .expect("query")
            .expect("exists");
        assert_eq!(at_15.name, "alex");

        let latest = store
            .last_observation_for_user("U1", ts(99))
            .expect("query")
            .expect("exists");
        assert_eq!(latest.name, "alexander");

        assert!(
            store
                .last_observation_for_user("U1", ts(5))
                .expect("query")
                .is_none()
        );
    }

    #[test]
    fn duplicate_observation_is_ignored() {
        let conn = test_db();
        let store = Store::new(&conn);
        store.find_or_create_user("U1").expect("user");
        let obs = NameObservation {
            user_id: "U1".into(),
            name: "alex".into(),
            observed_at: ts(1),
        };
        assert!(store.insert_observation(&obs).expect("first"));
        assert!(!store.insert_observation(&obs).expect("second"));
        assert_eq!(store.counts().expect("counts").name_observations, 1);
    }

    #[test]
    fn save_game_never_downgrades_resolved_host() {
        let conn = test_db();
        let store = Store::new(&conn);
        store.find_or_create_user("U1").expect("user");

        let mut game = Game::counting_down(7, "c", "Classic".into(), Some("zed".into()), ts(0));
        game.started_at = Some(ts(60));
        store.save_game(&game).expect("save");
        assert_eq!(store.backfill_game_hosts("U1", "zed").expect("backfill"), 1);

        game.ended_at = Some(ts(600));
        store.save_game(&game).expect("save again");

        let stored = store.find_game(7).expect("query").expect("exists");
        assert_eq!(stored.host_user_id.as_deref(), Some("U1"));
        assert_eq!(stored.ended_at, Some(ts(600)));
        assert_eq!(store.max_game_id().expect("max"), 7);
        assert_eq!(store.find_game_id("c", ts(0)).expect("lookup"), Some(7));
    }

    #[test]
    fn rounds_and_interactions_upsert_on_natural_keys() {
        let conn = test_db();
        let store = Store::new(&conn);
        let mut game = Game::counting_down(1, "c", String::new(), None, ts(0));
        game.started_at = Some(ts(1));
        store.save_game(&game).expect("game");

        let round = Round {
            game_id: 1,
            round_number: 1,
            posted_at: ts(2),
        };
        let first = store.save_round(&round).expect("round");
        let again = store.save_round(&round).expect("round again");
        assert_eq!(first, again);

        let template = store
            .find_or_create_interaction_message("{{users[0]}} found {{item}}", "")
            .expect("template");
        let same = store
            .find_or_create_interaction_message("{{users[0]}} found {{item}}", "")
            .expect("template again");
        assert_eq!(template, same);

        let item = store.find_or_create_item("Egg Launcher").expect("item");
        let mention = UserMention::unresolved("thio".into(), false, String::new());
        let a = store
            .save_interaction(first, 0, &template, &[mention.clone()], &[item.clone()])
            .expect("interaction");
        let b = store
            .save_interaction(first, 0, &template, &[mention], &[item])
            .expect("interaction again");
        assert_eq!(a, b);

        let counts = store.counts().expect("counts");
        assert_eq!(counts.rounds, 1);
        assert_eq!(counts.interactions, 1);
        assert_eq!(counts.interaction_messages, 1);
        assert_eq!(counts.interaction_mentions, 1);
        assert_eq!(counts.items, 1);
    }

    #[test]
    fn latest_activity_spans_games_and_rounds() {
        let conn = test_db();
        let store = Store::new(&conn);
        assert!(store.latest_activity().expect("query").is_none());

        let mut game = Game::counting_down(1, "c", String::new(), None, ts(10));
        game.started_at = Some(ts(20));
        store.save_game(&game).expect("game");
        store
            .save_round(&Round {
                game_id: 1,
                round_number: 1,
                posted_at: ts(30),
            })
            .expect("round");

        assert_eq!(store.latest_activity().expect("query"), Some(ts(30)));
    }
}
