//! Per-channel replay of bot messages into game history.
//!
//! [`Interpreter`] walks messages in posting order. Every message first
//! contributes identity hints (invoker, mentions, reactions, non-bot
//! author). Bot embeds are then classified through the rule table and
//! drive a small state machine kept in a [`ChannelContext`]:
//!
//! ```text
//! Idle ──countdown──▶ CountingDown ──started──▶ Running ──winner|cancel──▶ Idle
//!                                                  │ ▲
//!                                                  └─┘ round
//! ```
//!
//! A countdown from any state opens a fresh game. Lifecycle events that
//! arrive before the first countdown of the replay are leftovers from
//! history that was not exported and are skipped with a warning; the same
//! events arriving while a known game is not running abort the run.

pub mod classify;
pub mod extract;
pub mod identity;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::store::Store;
use crate::discord::{Embed, Export, Message, UserRef};
use crate::error::IngestError;
use crate::model::{Game, GamePhase, Round};

use classify::{DEFAULT_RULES, EmbedContext, EventKind, Rule, classify};
use extract::{Extractor, strip_non_graphic, unescape_markdown};
use identity::IdentityResolver;

static ERA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)Era:\s*(?:<a?:[^:>\s]+:\d+>)?\s*([^\r\n]*?)\s*$").expect("era regex must compile")
});

static ROUND_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(<a?:[^:>\s]+:\d+>)\s+\|\s+([^\n]+?)\s*$")
        .expect("round line regex must compile")
});

static ROUND_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__Round (\d+)__").expect("round number regex must compile"));

static PRIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*Prize:\*\*\s+(\d+)").expect("prize regex must compile"));

static XP_MULTIPLIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\d\.]+)x\s+XP\s+multiplier").expect("xp multiplier regex must compile")
});

/// Lifecycle state of a channel during replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    Idle,
    CountingDown,
    Running,
}

/// Replay cursor for one channel. Lives for one import and is never stored.
#[derive(Debug, Clone)]
pub struct ChannelContext {
    pub channel_id: String,
    /// Most recent game seen in this replay, whatever its phase.
    pub game: Option<Game>,
    /// Number the next round of `game` will get.
    pub round_number: u32,
}

impl ChannelContext {
    #[must_use]
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            game: None,
            round_number: 1,
        }
    }

    #[must_use]
    pub fn state(&self) -> ChannelState {
        match self.game.as_ref().map(Game::phase) {
            Some(GamePhase::CountingDown) => ChannelState::CountingDown,
            Some(GamePhase::Running) => ChannelState::Running,
            Some(GamePhase::Ended | GamePhase::Cancelled) | None => ChannelState::Idle,
        }
    }

    /// The current game if it is running, `None` if no game was seen yet.
    fn running_game(&mut self, event: &str) -> Result<Option<&mut Game>, IngestError> {
        match self.game.as_mut() {
            None => Ok(None),
            Some(game) if game.phase() == GamePhase::Running => Ok(Some(game)),
            Some(game) => Err(IngestError::InconsistentState(format!(
                "{event} while game {} in channel {} is {:?}",
                game.id,
                self.channel_id,
                game.phase()
            ))),
        }
    }
}

/// Counters for one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InterpretStats {
    pub messages: u64,
    pub bot_embeds: u64,
    pub countdowns: u64,
    pub games_started: u64,
    pub games_won: u64,
    pub games_cancelled: u64,
    pub rounds: u64,
    pub interactions: u64,
    pub observations: u64,
    pub backfilled: u64,
    /// Known shapes skipped on purpose.
    pub ignored: u64,
    /// Shapes no rule matched.
    pub unknown: u64,
    /// Lifecycle events skipped because no game was seen yet.
    pub leftover: u64,
    /// Recognized shapes that are not persisted, by rule name.
    pub unhandled: BTreeMap<String, u64>,
}

/// The message-to-event interpreter.
pub struct Interpreter<'conn> {
    store: Store<'conn>,
    identity: IdentityResolver<'conn>,
    extractor: Extractor<'conn>,
    bot_author_id: String,
    rules: Vec<Rule>,
    next_game_id: i64,
    stats: InterpretStats,
}

impl<'conn> Interpreter<'conn> {
    /// Create an interpreter whose game IDs continue after the highest one
    /// already stored.
    ///
    /// # Errors
    ///
    /// Returns a store error if the current maximum cannot be read.
    pub fn new(store: Store<'conn>, bot_author_id: impl Into<String>) -> Result<Self, IngestError> {
        let next_game_id = store.max_game_id()? + 1;
        Ok(Self {
            store,
            identity: IdentityResolver::new(store),
            extractor: Extractor::new(store),
            bot_author_id: bot_author_id.into(),
            rules: DEFAULT_RULES.to_vec(),
            next_game_id,
            stats: InterpretStats::default(),
        })
    }

    /// Replace the classification table.
    #[must_use]
    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = rules;
        self
    }

    #[must_use]
    pub const fn stats(&self) -> &InterpretStats {
        &self.stats
    }

    #[must_use]
    pub fn into_stats(self) -> InterpretStats {
        self.stats
    }

    /// Interpret every message of `export` in order.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error, wrapped with the failing message ID.
    pub fn interpret_export(
        &mut self,
        ctx: &mut ChannelContext,
        export: &Export,
    ) -> Result<(), IngestError> {
        if !export.channel.id.is_empty() && export.channel.id != ctx.channel_id {
            warn!(
                expected = %ctx.channel_id,
                found = %export.channel.id,
                "export channel differs from the directory it was found in"
            );
        }
        for message in &export.messages {
            self.interpret_message(ctx, message)
                .map_err(|e| e.at_message(&message.id))?;
        }
        Ok(())
    }

    /// Interpret one message against the channel context.
    ///
    /// # Errors
    ///
    /// Returns a fatal error for malformed input or an inconsistent state.
    pub fn interpret_message(
        &mut self,
        ctx: &mut ChannelContext,
        message: &Message,
    ) -> Result<(), IngestError> {
        self.stats.messages += 1;
        let at = message.timestamp;
        let from_bot = message.author.id == self.bot_author_id;

        let rules: Vec<Option<Rule>> = if from_bot {
            message
                .embeds
                .iter()
                .enumerate()
                .map(|(index, embed)| {
                    let embed_ctx = EmbedContext {
                        message,
                        embed,
                        index,
                    };
                    classify(&self.rules, &embed_ctx).copied()
                })
                .collect()
        } else {
            Vec::new()
        };

        // Past names must precede the invoker's current name at the same instant.
        for (embed, rule) in message.embeds.iter().zip(&rules) {
            if rule.is_some_and(|r| r.kind == EventKind::UserScopedHint) {
                self.user_scoped_hint(ctx, message, embed)?;
            }
        }

        for user in message.identity_hints() {
            self.observe(ctx, &user.id, &user.name, at)?;
        }
        if !from_bot {
            let UserRef { id, name } = &message.author;
            return self.observe(ctx, id, name, at);
        }

        for (embed, rule) in message.embeds.iter().zip(rules) {
            self.stats.bot_embeds += 1;
            let Some(rule) = rule else {
                self.stats.unknown += 1;
                warn!(
                    message_id = %message.id,
                    title = embed.title(),
                    author = embed.author_name(),
                    "unrecognized bot message, skipping"
                );
                continue;
            };

            match rule.kind {
                EventKind::CountdownStarted => self.countdown_started(ctx, message, embed)?,
                EventKind::GameStarted => self.game_started(ctx, message, embed)?,
                EventKind::GameWinner => self.game_finished(ctx, message, false)?,
                EventKind::GameCancelled => self.game_finished(ctx, message, true)?,
                EventKind::Round => self.round(ctx, message, embed)?,
                EventKind::UserScopedHint => {
                    debug!(message_id = %message.id, rule = rule.name, "past name recorded");
                }
                EventKind::WinnerDetails | EventKind::GameSummary => {
                    *self.stats.unhandled.entry(rule.name.to_string()).or_default() += 1;
                    info!(
                        message_id = %message.id,
                        rule = rule.name,
                        "recognized message is not persisted yet"
                    );
                }
                EventKind::Ignored => {
                    self.stats.ignored += 1;
                    debug!(message_id = %message.id, rule = rule.name, "ignoring message");
                }
            }
        }
        Ok(())
    }

    fn observe(
        &mut self,
        ctx: &mut ChannelContext,
        id: &str,
        name: &str,
        at: DateTime<Utc>,
    ) -> Result<(), IngestError> {
        let observed = self.identity.observe(id, name, at)?;
        if observed.recorded {
            self.stats.observations += 1;
        }
        self.stats.backfilled += observed.backfilled() as u64;

        // The current game may not be stored yet, so the store backfill
        // cannot reach it.
        if let Some(game) = ctx.game.as_mut() {
            if game.host_user_id.is_none() && game.host_user_name.as_deref() == Some(name) {
                game.host_user_id = Some(id.to_string());
            }
        }
        Ok(())
    }

    fn allocate_game_id(&mut self, channel_id: &str, at: DateTime<Utc>) -> Result<i64, IngestError> {
        if let Some(existing) = self.store.find_game_id(channel_id, at)? {
            return Ok(existing);
        }
        let id = self.next_game_id;
        self.next_game_id += 1;
        Ok(id)
    }

    fn countdown_started(
        &mut self,
        ctx: &mut ChannelContext,
        message: &Message,
        embed: &Embed,
    ) -> Result<(), IngestError> {
        let at = message.timestamp;
        let title = strip_non_graphic(embed.title());
        let description = strip_non_graphic(embed.description());

        let era = parse_era(&description).unwrap_or_default();
        let host_user_name = title
            .split_once(" hosted by ")
            .map(|(_, host)| unescape_markdown(host.trim()))
            .filter(|host| !host.is_empty());

        if let Some(previous) = &ctx.game {
            if previous.phase() == GamePhase::Running {
                warn!(
                    game_id = previous.id,
                    channel_id = %ctx.channel_id,
                    "new countdown while a game is running, abandoning it"
                );
            }
        }

        let id = self.allocate_game_id(&ctx.channel_id, at)?;
        let mut game = Game::counting_down(id, &ctx.channel_id, era, host_user_name, at);
        if let Some(host) = game.host_user_name.as_deref() {
            game.host_user_id = self.identity.resolve_by_name(host, at)?.map(|actor| actor.id);
        }

        debug!(
            game_id = game.id,
            era = %game.era,
            host = game.host_user_name.as_deref().unwrap_or_default(),
            "game counting down"
        );
        ctx.game = Some(game);
        ctx.round_number = 1;
        self.stats.countdowns += 1;
        Ok(())
    }

    fn game_started(
        &mut self,
        ctx: &mut ChannelContext,
        message: &Message,
        embed: &Embed,
    ) -> Result<(), IngestError> {
        let Some(game) = ctx.game.as_mut() else {
            self.leftover(message, "game start");
            return Ok(());
        };
        if game.phase() != GamePhase::CountingDown {
            return Err(IngestError::InconsistentState(format!(
                "game start while game {} in channel {} is {:?}",
                game.id,
                ctx.channel_id,
                game.phase()
            )));
        }

        let description = strip_non_graphic(embed.description());
        if let Some(prize) = parse_prize(&description)? {
            game.reward_coins = prize;
        }
        if let Some(multiplier) = parse_xp_multiplier(&description)? {
            game.xp_multiplier = multiplier;
        }
        game.started_at = Some(message.timestamp);
        self.store.save_game(game)?;

        info!(
            game_id = game.id,
            channel_id = %ctx.channel_id,
            reward = game.reward_coins,
            xp_multiplier = game.xp_multiplier,
            "game started"
        );
        self.stats.games_started += 1;
        Ok(())
    }

    fn game_finished(
        &mut self,
        ctx: &mut ChannelContext,
        message: &Message,
        cancelled: bool,
    ) -> Result<(), IngestError> {
        let event = if cancelled { "cancellation" } else { "winner" };
        let Some(game) = ctx.running_game(event)? else {
            self.leftover(message, event);
            return Ok(());
        };

        game.ended_at = Some(message.timestamp);
        game.cancelled = cancelled;
        self.store.save_game(game)?;

        info!(game_id = game.id, cancelled, "game ended");
        if cancelled {
            self.stats.games_cancelled += 1;
        } else {
            self.stats.games_won += 1;
        }
        Ok(())
    }

    fn round(
        &mut self,
        ctx: &mut ChannelContext,
        message: &Message,
        embed: &Embed,
    ) -> Result<(), IngestError> {
        let round_number = ctx.round_number;
        let Some(game) = ctx.running_game("round")? else {
            self.leftover(message, "round");
            return Ok(());
        };

        let title = strip_non_graphic(embed.title());
        if let Some(shown) = parse_round_number(&title) {
            if shown != round_number {
                warn!(
                    game_id = game.id,
                    shown,
                    expected = round_number,
                    "round number in title differs from replay order"
                );
            }
        }

        let round = Round {
            game_id: game.id,
            round_number,
            posted_at: message.timestamp,
        };
        let round_id = self.store.save_round(&round)?;

        match title.split_once(" - ") {
            Some((_, event)) => self.event_round(round_id, event.trim(), embed, message.timestamp)?,
            None => self.narrative_round(round_id, embed, message.timestamp)?,
        }

        ctx.round_number += 1;
        self.stats.rounds += 1;
        Ok(())
    }

    /// One interaction per `<:emoji:id> | text` line.
    fn narrative_round(
        &mut self,
        round_id: i64,
        embed: &Embed,
        at: DateTime<Utc>,
    ) -> Result<(), IngestError> {
        for (position, line) in ROUND_LINE.captures_iter(embed.description()).enumerate() {
            let (template, mentions) = self.extractor.extract_users(&line[2], at)?;
            let (template, items) = self.extractor.extract_items(&template)?;
            let interaction_message = self.store.find_or_create_interaction_message(&template, "")?;
            self.store
                .save_interaction(round_id, position, &interaction_message, &mentions, &items)?;
            self.stats.interactions += 1;
        }
        Ok(())
    }

    /// Event rounds carry a single aggregate interaction labelled with the
    /// event name; the template is the description's opening paragraph.
    fn event_round(
        &mut self,
        round_id: i64,
        event: &str,
        embed: &Embed,
        at: DateTime<Utc>,
    ) -> Result<(), IngestError> {
        let description = strip_non_graphic(embed.description());
        let (rewritten, mentions) = self.extractor.extract_users(&description, at)?;
        let (rewritten, items) = self.extractor.extract_items(&rewritten)?;
        let template = rewritten.split("\n\n").next().unwrap_or_default().trim();

        let interaction_message = self.store.find_or_create_interaction_message(template, event)?;
        self.store
            .save_interaction(round_id, 0, &interaction_message, &mentions, &items)?;
        self.stats.interactions += 1;
        Ok(())
    }

    fn user_scoped_hint(
        &mut self,
        ctx: &mut ChannelContext,
        message: &Message,
        embed: &Embed,
    ) -> Result<(), IngestError> {
        let Some(interaction) = &message.interaction else {
            return Ok(());
        };
        let author = embed.author_name();
        let past_name = unescape_markdown(author.split('\'').next().unwrap_or_default());
        self.observe(ctx, &interaction.user.id, &past_name, message.timestamp)
    }

    fn leftover(&mut self, message: &Message, event: &str) {
        self.stats.leftover += 1;
        warn!(
            message_id = %message.id,
            event,
            "no game seen yet in this channel, skipping leftover history"
        );
    }
}

/// Era label from a countdown description.
#[must_use]
pub fn parse_era(description: &str) -> Option<String> {
    ERA.captures(description)
        .map(|caps| caps[1].to_string())
        .filter(|era| !era.is_empty())
}

/// Round number shown in a `__Round N__` title.
#[must_use]
pub fn parse_round_number(title: &str) -> Option<u32> {
    ROUND_NUMBER
        .captures(title)
        .and_then(|caps| caps[1].parse().ok())
}

/// Prize from `**Prize:** N`.
///
/// # Errors
///
/// Returns [`IngestError::MalformedField`] when the amount does not fit.
pub fn parse_prize(description: &str) -> Result<Option<u64>, IngestError> {
    PRIZE
        .captures(description)
        .map(|caps| {
            caps[1].parse().map_err(|_| IngestError::MalformedField {
                field: "prize",
                value: caps[1].to_string(),
            })
        })
        .transpose()
}

/// Multiplier from `N.Nx XP multiplier`.
///
/// # Errors
///
/// Returns [`IngestError::MalformedField`] when the number does not parse.
pub fn parse_xp_multiplier(description: &str) -> Result<Option<f64>, IngestError> {
    XP_MULTIPLIER
        .captures(description)
        .map(|caps| {
            caps[1].parse().map_err(|_| IngestError::MalformedField {
                field: "xp multiplier",
                value: caps[1].to_string(),
            })
        })
        .transpose()
}
