//! `@name` to Discord mention resolution.

use tracing::debug;

use crate::common::messages::RosterEntry;
use crate::relay::sanitizer::{strip_escapes, ZERO_WIDTH_SPACE};

/// Replace `@name` tokens with `<@id>` when exactly one roster member matches.
///
/// Expects sanitized input. Whitespace runs collapse to a single space.
pub fn resolve_mentions(text: &str, roster: &[RosterEntry]) -> String {
    text.split_whitespace()
        .map(|token| resolve_token(token, roster))
        .collect::<Vec<_>>()
        .join(" ")
}

fn resolve_token(token: &str, roster: &[RosterEntry]) -> String {
    let Some(name) = token.strip_prefix('@') else {
        return token.to_string();
    };
    if name.is_empty() || name.starts_with(ZERO_WIDTH_SPACE) {
        return token.to_string();
    }

    let name = strip_escapes(name);
    if name.eq_ignore_ascii_case("everyone") || name.eq_ignore_ascii_case("here") {
        return token.to_string();
    }

    let mut matches: Vec<&RosterEntry> =
        roster.iter().filter(|entry| entry.matches(&name)).collect();
    matches.sort_by_key(|entry| entry.id);
    matches.dedup_by_key(|entry| entry.id);

    match matches.as_slice() {
        [entry] => entry.mention(),
        [] => token.to_string(),
        _ => {
            debug!("Mention @{} is ambiguous ({} members), left as text", name, matches.len());
            token.to_string()
        }
    }
}
