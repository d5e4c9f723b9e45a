//! Shorthand triggers and their expansion into plain tokens.

use crate::entity::{is_short_flag, split_short, Entity};
use std::borrow::Cow;
use tracing::trace;

/// A trigger that stands for a fixed list of tokens, e.g. `-P` for `--port 80`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shorthand {
    trigger: String,
    expansion: Vec<String>,
}

impl Shorthand {
    pub(crate) fn new(trigger: String, expansion: Vec<String>) -> Self {
        Self { trigger, expansion }
    }

    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    pub fn expansion(&self) -> &[String] {
        &self.expansion
    }

    fn is_short(&self) -> bool {
        is_short_flag(&self.trigger)
    }

    /// Whether `token` is exactly this trigger.
    pub fn recognizes(&self, token: &str) -> bool {
        self.trigger == token
    }

    /// Expands this shorthand alone over `tokens`.
    pub fn expand<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<String> {
        let mut out = Vec::with_capacity(tokens.len());
        for token in tokens {
            let token = token.as_ref();
            match expand_token(token, &[self], &|_| false) {
                Some(expanded) => out.extend(expanded),
                None => out.push(token.to_string()),
            }
        }
        out
    }
}

/// Replaces every shorthand trigger in `tokens` with its expansion.
///
/// Grouped short tokens are expanded piecewise: with `-1` and `-2` registered
/// as shorthands and `-t` a flag, `-12t` becomes the two expansions followed
/// by `-t`. Returns the input untouched when nothing was expanded.
pub fn expand<'t>(tokens: &'t [String], entities: &[Entity]) -> Cow<'t, [String]> {
    let shorthands: Vec<&Shorthand> = entities.iter().filter_map(Entity::as_shorthand).collect();
    if shorthands.is_empty() {
        return Cow::Borrowed(tokens);
    }
    let is_plain_flag = |flag: &str| {
        entities
            .iter()
            .filter_map(Entity::as_option)
            .any(|o| !o.has_value() && o.triggers().iter().any(|t| t == flag))
    };

    let mut expanded: Option<Vec<String>> = None;
    for (i, token) in tokens.iter().enumerate() {
        match expand_token(token, &shorthands, &is_plain_flag) {
            Some(replacement) => {
                trace!(%token, ?replacement, "expanded shorthand");
                expanded
                    .get_or_insert_with(|| tokens[..i].to_vec())
                    .extend(replacement);
            }
            None => {
                if let Some(out) = expanded.as_mut() {
                    out.push(token.clone());
                }
            }
        }
    }

    match expanded {
        Some(out) => Cow::Owned(out),
        None => Cow::Borrowed(tokens),
    }
}

/// Expansion of a single token, or `None` when no shorthand applies.
fn expand_token(
    token: &str,
    shorthands: &[&Shorthand],
    is_plain_flag: &dyn Fn(&str) -> bool,
) -> Option<Vec<String>> {
    if let Some(sh) = shorthands.iter().find(|s| s.recognizes(token)) {
        return Some(sh.expansion.clone());
    }
    if !is_short_flag(token) {
        return None;
    }

    let (head, rest) = split_short(token);
    // Text after `=` is a value, and `-x-` must not turn into `--`.
    if rest.is_empty() || rest.starts_with('=') || rest.starts_with('-') {
        return None;
    }
    let tail = format!("-{rest}");

    if let Some(sh) = shorthands
        .iter()
        .find(|s| s.is_short() && s.trigger == head)
    {
        let mut out = sh.expansion.clone();
        match expand_token(&tail, shorthands, is_plain_flag) {
            Some(more) => out.extend(more),
            None => out.push(tail),
        }
        return Some(out);
    }

    if is_plain_flag(head) {
        let more = expand_token(&tail, shorthands, is_plain_flag)?;
        let mut out = vec![head.to_string()];
        out.extend(more);
        return Some(out);
    }
    None
}
