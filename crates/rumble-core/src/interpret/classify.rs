//! Ordered rule table mapping bot embeds to lifecycle events.
//!
//! Rules are evaluated top to bottom and the first match wins. New bot
//! message shapes are supported by adding a row; the state machine only
//! sees the resulting [`EventKind`].

use serde::Serialize;

use crate::discord::{Embed, Message};

/// What an embed means for the channel's game lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A new session is counting down.
    CountdownStarted,
    GameStarted,
    GameCancelled,
    GameWinner,
    /// Runners-up, kills and revives listed after the winner. Not persisted.
    WinnerDetails,
    /// End-of-game summary. Not persisted.
    GameSummary,
    /// A round narrative, one interaction per line (or one per event round).
    Round,
    /// A reply to a user command whose author line carries the invoker's
    /// name at that time.
    UserScopedHint,
    /// Known shape with no bearing on game history.
    Ignored,
}

/// The embed under classification together with its message.
#[derive(Debug, Clone, Copy)]
pub struct EmbedContext<'a> {
    pub message: &'a Message,
    pub embed: &'a Embed,
    /// Position of the embed within the message.
    pub index: usize,
}

impl EmbedContext<'_> {
    fn title(&self) -> &str {
        self.embed.title()
    }

    fn description(&self) -> &str {
        self.embed.description()
    }

    fn author(&self) -> &str {
        self.embed.author_name()
    }
}

/// One row of the classification table.
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub kind: EventKind,
    pub matches: fn(&EmbedContext<'_>) -> bool,
}

impl Rule {
    #[must_use]
    pub const fn new(
        name: &'static str,
        kind: EventKind,
        matches: fn(&EmbedContext<'_>) -> bool,
    ) -> Self {
        Self {
            name,
            kind,
            matches,
        }
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// First rule of `rules` matching `ctx`, if any.
#[must_use]
pub fn classify<'r>(rules: &'r [Rule], ctx: &EmbedContext<'_>) -> Option<&'r Rule> {
    rules.iter().find(|rule| (rule.matches)(ctx))
}

const WINNER_DETAIL_FIELDS: &[&str] = &["Runners-up", "Most Kills", "Most Revives"];

const USER_SCOPED_AUTHOR_SUFFIXES: &[&str] = &[
    "'s balance",
    "'s backpacks",
    "'s Classic Era Items and Skins",
];

/// Rules in priority order.
pub const DEFAULT_RULES: &[Rule] = &[
    Rule::new("countdown", EventKind::CountdownStarted, |c| {
        c.title().contains("hosted by ") || c.embed.footer_text() == Some("Automatic Session")
    }),
    Rule::new("countdown-continued", EventKind::Ignored, |c| {
        c.description().starts_with("Starting in ")
    }),
    Rule::new("game-started", EventKind::GameStarted, |c| {
        c.title().starts_with("Started a new ")
    }),
    Rule::new("game-cancelled", EventKind::GameCancelled, |c| {
        c.title() == "Rumble Royale session cancelled"
    }),
    Rule::new("winner", EventKind::GameWinner, |c| {
        c.index == 0 && c.title().contains("WINNER!")
    }),
    Rule::new("winner-details", EventKind::WinnerDetails, |c| {
        c.index > 0
            && c.embed
                .fields
                .iter()
                .any(|f| WINNER_DETAIL_FIELDS.iter().any(|name| f.name.contains(name)))
    }),
    Rule::new("user-scoped-hint", EventKind::UserScopedHint, |c| {
        c.message.interaction.is_some()
            && USER_SCOPED_AUTHOR_SUFFIXES
                .iter()
                .any(|suffix| c.author().contains(suffix))
    }),
    Rule::new("round", EventKind::Round, |c| c.title().starts_with("__Round ")),
    Rule::new("game-summary", EventKind::GameSummary, |c| {
        c.title().contains("Summary")
    }),
    Rule::new("empty-inventory", EventKind::Ignored, |c| {
        c.description() == "Your inventory is empty."
    }),
    Rule::new("title-already-equipped", EventKind::Ignored, |c| {
        c.description() == "You already have this title equipped!"
    }),
    Rule::new("profile", EventKind::Ignored, |c| c.author().contains("'s Profile")),
    Rule::new("battle-history", EventKind::Ignored, |c| {
        c.title().contains("'s Battle History")
    }),
    Rule::new("event-quests", EventKind::Ignored, |c| {
        c.title().contains("Event Quests")
    }),
    Rule::new("season-overview", EventKind::Ignored, |c| {
        c.title().starts_with("Season") && c.title().ends_with("| Overview")
    }),
    Rule::new("leaderboard", EventKind::Ignored, |c| {
        c.title().ends_with("Leaderboard:") || c.title().starts_with("Leaderboard ")
    }),
    Rule::new("title-change", EventKind::Ignored, |c| c.author() == "Title Change"),
    Rule::new("quotes", EventKind::Ignored, |c| {
        c.author() == "Quotes | View" || matches!(c.title(), "Quotes | View" | "Quotes | Select")
    }),
    Rule::new("banners", EventKind::Ignored, |c| {
        c.author() == "Banners" || c.title() == "Banners"
    }),
    Rule::new("cosmetics", EventKind::Ignored, |c| c.title().starts_with("COSMETICS")),
    Rule::new("rumble-pass", EventKind::Ignored, |c| {
        let title = c.title();
        title.contains("umble") && title.contains("ass") && title.contains("eason")
    }),
    Rule::new("vote-reward", EventKind::Ignored, |c| {
        c.description().contains("Thanks for voting! Enjoy your free")
            || c.title() == "Vote for Rumble Royale"
    }),
    Rule::new("bot-info", EventKind::Ignored, |c| {
        matches!(
            c.title(),
            "Rumble Royale Info" | "Rumble Royale Overview" | "Rumble Royale Commands"
        )
    }),
    Rule::new("era-phrases", EventKind::Ignored, |c| c.title().contains("Era Phrases")),
    Rule::new("black-market", EventKind::Ignored, |c| {
        c.title() == "Black Market" || c.author() == "Black Market"
    }),
    Rule::new("support", EventKind::Ignored, |c| {
        c.title() == "We're glad you're enjoying the bot"
    }),
    Rule::new("rewards", EventKind::Ignored, |c| {
        let title = c.title();
        title == "Backpack Rewards!" || title.contains("Weekly Reward") || title.contains("Daily Reward")
    }),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::{EmbedAuthor, EmbedField, EmbedFooter, Interaction, UserRef};
    use chrono::{TimeZone, Utc};

    fn message(interaction: bool) -> Message {
        Message {
            id: "m1".into(),
            timestamp: Utc.timestamp_opt(0, 0).single().expect("ts"),
            content: String::new(),
            author: UserRef::default(),
            interaction: interaction.then(|| Interaction {
                name: "balance".into(),
                user: UserRef {
                    id: "U1".into(),
                    name: "alex".into(),
                },
            }),
            mentions: Vec::new(),
            reactions: Vec::new(),
            embeds: Vec::new(),
        }
    }

    fn titled(title: &str) -> Embed {
        Embed {
            title: Some(title.into()),
            ..Embed::default()
        }
    }

    fn kind_of(message: &Message, embed: &Embed, index: usize) -> Option<EventKind> {
        let ctx = EmbedContext {
            message,
            embed,
            index,
        };
        classify(DEFAULT_RULES, &ctx).map(|rule| rule.kind)
    }

    #[test]
    fn lifecycle_titles_classify() {
        let msg = message(false);
        let cases = [
            ("Rumble Royale hosted by zed", EventKind::CountdownStarted),
            ("Started a new Rumble Royale session", EventKind::GameStarted),
            ("Rumble Royale session cancelled", EventKind::GameCancelled),
            ("<:Crwn2:872850260756664350> **__WINNER!__**", EventKind::GameWinner),
            ("__Round 3__", EventKind::Round),
            ("__Round 4__ - STORM", EventKind::Round),
            ("Leaderboard Top 10", EventKind::Ignored),
        ];
        for (title, expected) in cases {
            assert_eq!(kind_of(&msg, &titled(title), 0), Some(expected), "{title}");
        }
    }

    #[test]
    fn automatic_session_footer_starts_countdown() {
        let embed = Embed {
            title: Some("Rumble Royale".into()),
            footer: Some(EmbedFooter {
                text: Some("Automatic Session".into()),
            }),
            ..Embed::default()
        };
        assert_eq!(kind_of(&message(false), &embed, 0), Some(EventKind::CountdownStarted));
    }

    #[test]
    fn countdown_rule_wins_over_continuation() {
        let embed = Embed {
            title: Some("Rumble Royale hosted by zed".into()),
            description: Some("Starting in 1 minute!".into()),
            ..Embed::default()
        };
        assert_eq!(kind_of(&message(false), &embed, 0), Some(EventKind::CountdownStarted));

        let continued = Embed {
            description: Some("Starting in 1 minute!".into()),
            ..Embed::default()
        };
        assert_eq!(kind_of(&message(false), &continued, 0), Some(EventKind::Ignored));
    }

    #[test]
    fn winner_only_in_first_embed() {
        let msg = message(false);
        let winner = titled("**__WINNER!__**");
        assert_eq!(kind_of(&msg, &winner, 1), None);

        let details = Embed {
            fields: vec![EmbedField {
                name: "Runners-up".into(),
                value: "**alex**".into(),
            }],
            ..Embed::default()
        };
        assert_eq!(kind_of(&msg, &details, 1), Some(EventKind::WinnerDetails));
    }

    #[test]
    fn user_scoped_hint_requires_interaction() {
        let embed = Embed {
            author: Some(EmbedAuthor {
                name: Some("alex's balance".into()),
            }),
            ..Embed::default()
        };
        assert_eq!(kind_of(&message(true), &embed, 0), Some(EventKind::UserScopedHint));
        assert_eq!(kind_of(&message(false), &embed, 0), None);
    }

    #[test]
    fn summary_is_recognized() {
        assert_eq!(
            kind_of(&message(false), &titled("Game Summary"), 0),
            Some(EventKind::GameSummary)
        );
    }

    #[test]
    fn unknown_shape_has_no_rule() {
        assert_eq!(kind_of(&message(false), &titled("Something brand new"), 0), None);
    }

    #[test]
    fn rule_names_are_unique() {
        let mut names: Vec<_> = DEFAULT_RULES.iter().map(|r| r.name).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(names.len(), before);
    }
}
