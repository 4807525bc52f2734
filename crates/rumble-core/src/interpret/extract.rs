//! Pattern-based extraction of user and item mentions from narrative text.
//!
//! The bot renders players as `**name suffix**` (alive) or
//! `~~**name suffix**~~` (killed) and items as `__Item Name__`. Each match is
//! replaced by a positional placeholder, leaving a template that repeats
//! verbatim across rounds and can be stored once.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::{Captures, Regex};

use crate::db::store::Store;
use crate::error::IngestError;
use crate::interpret::identity::IdentityResolver;
use crate::model::{Item, UserMention};

/// Placeholder substituted for the single item mention of a line.
pub const ITEM_PLACEHOLDER: &str = "{{item}}";

static USER_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:~~\*\*([a-z0-9_\.\\]*[a-z0-9_\.])(\s+[^\*]+)?\*\*~~|\*\*([a-z0-9_\.\\]*[a-z0-9_\.])(\s+[^\*]+)?\*\*)",
    )
    .expect("user mention regex must compile")
});

static ITEM_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__([^_]+)__").expect("item mention regex must compile"));

/// Placeholder for the user mention at `index`.
#[must_use]
pub fn user_placeholder(index: usize) -> String {
    format!("{{{{users[{index}]}}}}")
}

/// Undo the markdown escaping the bot applies to names.
#[must_use]
pub fn unescape_markdown(text: &str) -> String {
    text.replace(r"\_", "_")
        .replace(r"\*", "*")
        .replace(r"\.", ".")
        .replace(r"\\", r"\")
}

/// Drop invisible and control characters, keeping whitespace.
#[must_use]
pub fn strip_non_graphic(text: &str) -> String {
    text.chars()
        .filter(|&c| c.is_whitespace() || !(c.is_control() || is_format_char(c)))
        .collect()
}

const fn is_format_char(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{061C}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206F}'
            | '\u{FEFF}'
            | '\u{FFF9}'..='\u{FFFB}'
    )
}

/// Replace every user mention in `text` by a placeholder.
///
/// Returns the template and the unique mentions in first-seen order. Exact
/// repeats (same name, suffix and killed flag) share one slot.
#[must_use]
pub fn scan_user_mentions(text: &str) -> (String, Vec<UserMention>) {
    let mut mentions: Vec<UserMention> = Vec::new();
    let template = USER_MENTION.replace_all(text, |caps: &Captures<'_>| {
        let (name, suffix, killed) = match caps.get(1) {
            Some(name) => (name, caps.get(2), true),
            None => (
                caps.get(3).expect("one alternative always matches"),
                caps.get(4),
                false,
            ),
        };
        let mention = UserMention::unresolved(
            unescape_markdown(name.as_str()),
            killed,
            suffix.map(|s| s.as_str().trim().to_string()).unwrap_or_default(),
        );
        let index = mentions
            .iter()
            .position(|m| *m == mention)
            .unwrap_or_else(|| {
                mentions.push(mention);
                mentions.len() - 1
            });
        user_placeholder(index)
    });
    (template.into_owned(), mentions)
}

/// Replace the item mention in `text` by [`ITEM_PLACEHOLDER`].
///
/// # Errors
///
/// Returns [`IngestError::UnsupportedMultiItem`] when the text names more
/// than one item.
pub fn scan_item_mentions(text: &str) -> Result<(String, Vec<String>), IngestError> {
    let names: Vec<String> = ITEM_MENTION
        .captures_iter(text)
        .map(|caps| unescape_markdown(&caps[1]))
        .collect();
    if names.len() > 1 {
        return Err(IngestError::UnsupportedMultiItem(text.to_string()));
    }
    let template = ITEM_MENTION.replace(text, ITEM_PLACEHOLDER).into_owned();
    Ok((template, names))
}

/// Extractors bound to the store, resolving what they find.
#[derive(Clone, Copy)]
pub struct Extractor<'conn> {
    store: Store<'conn>,
    identity: IdentityResolver<'conn>,
}

impl<'conn> Extractor<'conn> {
    #[must_use]
    pub const fn new(store: Store<'conn>) -> Self {
        Self {
            store,
            identity: IdentityResolver::new(store),
        }
    }

    /// Template the user mentions of `text` and bind each to an actor where
    /// a name observation at or before `at` allows it.
    ///
    /// # Errors
    ///
    /// Returns an error if a store lookup fails.
    pub fn extract_users(
        &self,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<(String, Vec<UserMention>), IngestError> {
        let (template, mut mentions) = scan_user_mentions(text);
        for mention in &mut mentions {
            if let Some(actor) = self.identity.resolve_by_name(&mention.user_name, at)? {
                mention.user_id = Some(actor.id);
            }
        }
        Ok((template, mentions))
    }

    /// Template the item mention of `text`, creating the item if it is new.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::UnsupportedMultiItem`] for multi-item text, or
    /// a store error.
    pub fn extract_items(&self, text: &str) -> Result<(String, Vec<Item>), IngestError> {
        let (template, names) = scan_item_mentions(text)?;
        let items = names
            .iter()
            .map(|name| self.store.find_or_create_item(name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((template, items))
    }
}
