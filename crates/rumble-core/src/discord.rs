//! Decoded shape of a chat export file.
//!
//! Only the fields the interpreter reads are modelled; everything else in
//! the export is ignored by serde. Every embed part is optional because the
//! bot omits whatever it does not use.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One export file: a channel header plus its messages in posting order.
#[derive(Debug, Clone, Deserialize)]
pub struct Export {
    #[serde(default)]
    pub channel: Channel,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Reference to a platform account as it appears in a message.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct UserRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: UserRef,
    #[serde(default)]
    pub interaction: Option<Interaction>,
    #[serde(default)]
    pub mentions: Vec<UserRef>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
}

/// The slash-command invocation a bot message answers.
#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    #[serde(default)]
    pub name: String,
    pub user: UserRef,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Reaction {
    #[serde(default)]
    pub users: Vec<UserRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Embed {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<EmbedAuthor>,
    #[serde(default)]
    pub footer: Option<EmbedFooter>,
    #[serde(default)]
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbedAuthor {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbedFooter {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbedField {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl Embed {
    /// Title, or `""` when absent.
    #[must_use]
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    /// Description, or `""` when absent.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    /// Author line name, or `""` when absent.
    #[must_use]
    pub fn author_name(&self) -> &str {
        self.author
            .as_ref()
            .and_then(|a| a.name.as_deref())
            .unwrap_or_default()
    }

    /// Footer text, if the embed has a footer.
    #[must_use]
    pub fn footer_text(&self) -> Option<&str> {
        self.footer.as_ref().and_then(|f| f.text.as_deref())
    }
}

impl Message {
    /// Every (id, name) hint carried by the message, excluding the author:
    /// the interaction invoker, mentioned users, then reacting users.
    pub fn identity_hints(&self) -> impl Iterator<Item = &UserRef> {
        self.interaction
            .iter()
            .map(|i| &i.user)
            .chain(self.mentions.iter())
            .chain(self.reactions.iter().flat_map(|r| r.users.iter()))
    }
}
