//! Canonical SQLite schema for the reconstructed game history.
//!
//! Every table carries a natural dedup key so a replay of already-seen
//! exports upserts into existing rows:
//! - `users` / `items` are keyed by platform ID / name
//! - `name_observations` is unique on (user, name, time)
//! - `games` is unique on (channel, countdown start)
//! - `rounds` on (game, number), `interactions` on (round, position)
//! - `interaction_messages` on (text, event)
//! - `store_meta` tracks schema version and last import time

/// Migration v1: entity tables plus store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY CHECK (length(user_id) > 0)
);

CREATE TABLE IF NOT EXISTS name_observations (
    observation_id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL REFERENCES users(user_id),
    name TEXT NOT NULL,
    observed_at_us INTEGER NOT NULL,
    UNIQUE (user_id, name, observed_at_us)
);

CREATE TABLE IF NOT EXISTS items (
    name TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS games (
    game_id INTEGER PRIMARY KEY,
    channel_id TEXT NOT NULL,
    era TEXT NOT NULL DEFAULT '',
    host_user_name TEXT,
    host_user_id TEXT REFERENCES users(user_id),
    countdown_started_at_us INTEGER NOT NULL,
    started_at_us INTEGER,
    ended_at_us INTEGER,
    cancelled INTEGER NOT NULL DEFAULT 0 CHECK (cancelled IN (0, 1)),
    reward_coins INTEGER NOT NULL DEFAULT 0,
    xp_multiplier REAL NOT NULL DEFAULT 1.0,
    UNIQUE (channel_id, countdown_started_at_us)
);

CREATE TABLE IF NOT EXISTS rounds (
    round_id INTEGER PRIMARY KEY AUTOINCREMENT,
    game_id INTEGER NOT NULL REFERENCES games(game_id),
    round_number INTEGER NOT NULL CHECK (round_number >= 1),
    posted_at_us INTEGER NOT NULL,
    UNIQUE (game_id, round_number)
);

CREATE TABLE IF NOT EXISTS interaction_messages (
    message_id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    event TEXT NOT NULL DEFAULT '',
    UNIQUE (text, event)
);

CREATE TABLE IF NOT EXISTS interactions (
    interaction_id INTEGER PRIMARY KEY AUTOINCREMENT,
    round_id INTEGER NOT NULL REFERENCES rounds(round_id),
    position INTEGER NOT NULL,
    message_id INTEGER NOT NULL REFERENCES interaction_messages(message_id),
    UNIQUE (round_id, position)
);

CREATE TABLE IF NOT EXISTS interaction_mentions (
    interaction_id INTEGER NOT NULL REFERENCES interactions(interaction_id) ON DELETE CASCADE,
    slot INTEGER NOT NULL,
    user_id TEXT REFERENCES users(user_id),
    user_name TEXT NOT NULL,
    killed INTEGER NOT NULL DEFAULT 0 CHECK (killed IN (0, 1)),
    suffix TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (interaction_id, slot)
);

CREATE TABLE IF NOT EXISTS interaction_items (
    interaction_id INTEGER NOT NULL REFERENCES interactions(interaction_id) ON DELETE CASCADE,
    item_name TEXT NOT NULL REFERENCES items(name),
    PRIMARY KEY (interaction_id, item_name)
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    last_import_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO store_meta (id, schema_version, last_import_at_us)
VALUES (1, 1, 0);
";

/// Migration v2: lookup indexes for name resolution and backfill scans.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_name_observations_name_time
    ON name_observations(name, observed_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_name_observations_user_time
    ON name_observations(user_id, observed_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_games_unresolved_host
    ON games(host_user_name) WHERE host_user_id IS NULL;

CREATE INDEX IF NOT EXISTS idx_rounds_game
    ON rounds(game_id, round_number);

CREATE INDEX IF NOT EXISTS idx_interactions_round
    ON interactions(round_id, position);

CREATE INDEX IF NOT EXISTS idx_interaction_mentions_unresolved
    ON interaction_mentions(user_name) WHERE user_id IS NULL;

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
";

/// Indexes expected by the identity and dump query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_name_observations_name_time",
    "idx_name_observations_user_time",
    "idx_games_unresolved_host",
    "idx_rounds_game",
    "idx_interactions_round",
    "idx_interaction_mentions_unresolved",
];
