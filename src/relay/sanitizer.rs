//! Neutralizes Discord mass mentions, raw mention syntax and markdown.
//!
//! Every string that crosses into Discord goes through [`sanitize`]. The
//! transform only inserts characters (a zero-width space or a backslash),
//! so the visible text is unchanged, and running it twice is a no-op.

use std::sync::LazyLock;

use fancy_regex::Regex;
use tracing::warn;

use crate::common::messages::{RichContent, RichField};

/// Inserted after `@` / `<` to break mention parsing without a visible change.
pub const ZERO_WIDTH_SPACE: char = '\u{200B}';

/// Characters Discord treats as markdown.
const MARKDOWN_CHARS: [char; 6] = ['*', '_', '~', '`', '|', '>'];

/// `@everyone` / `@here` anywhere, Discord pings on them inside words too.
static BROAD_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)@(?=everyone|here)").expect("valid broad mention pattern"));

/// Start of `<@id>`, `<@!id>`, `<@&id>` or `<#id>`.
static RAW_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(?=[@#])").expect("valid raw mention pattern"));

/// Make `text` safe to post to Discord.
pub fn sanitize(text: &str) -> String {
    let text = insert_after(&BROAD_MENTION, text, "@");
    let text = insert_after(&RAW_MENTION, &text, "<");
    escape_markdown(&text)
}

/// Sanitize every free-text field of a rich message.
pub fn sanitize_rich(content: RichContent) -> RichContent {
    RichContent {
        title: content.title.as_deref().map(sanitize),
        author: content.author.as_deref().map(sanitize),
        description: content.description.as_deref().map(sanitize),
        footer: content.footer.as_deref().map(sanitize),
        fields: content
            .fields
            .into_iter()
            .map(|field| RichField {
                name: sanitize(&field.name),
                value: sanitize(&field.value),
                inline: field.inline,
            })
            .collect(),
        color: content.color,
    }
}

/// Remove the backslashes [`sanitize`] adds in front of markdown characters.
pub fn strip_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek().is_some_and(|next| MARKDOWN_CHARS.contains(next)) {
            continue;
        }
        out.push(c);
    }

    out
}

/// Append a zero-width space to every `marker` matched by `pattern`.
fn insert_after(pattern: &Regex, text: &str, marker: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for found in pattern.find_iter(text) {
        let found = match found {
            Ok(found) => found,
            Err(e) => {
                warn!("Sanitizer pattern failed: {}", e);
                break;
            }
        };
        out.push_str(&text[last..found.start()]);
        out.push_str(marker);
        out.push(ZERO_WIDTH_SPACE);
        last = found.start() + marker.len();
    }

    out.push_str(&text[last..]);
    out
}

/// Backslash-escape markdown characters that are not already escaped.
fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut backslashes = 0usize;

    for c in text.chars() {
        if MARKDOWN_CHARS.contains(&c) && backslashes % 2 == 0 {
            out.push('\\');
        }
        out.push(c);
        backslashes = if c == '\\' { backslashes + 1 } else { 0 };
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broad_mentions_are_broken() {
        assert_eq!(sanitize("hi @everyone"), "hi @\u{200B}everyone");
        assert_eq!(sanitize("@HERE now"), "@\u{200B}HERE now");
        assert!(!sanitize("ping @Everyone!").contains("@Everyone"));
    }

    #[test]
    fn test_broad_mentions_inside_words_are_broken() {
        assert_eq!(sanitize("x@everyone"), "x@\u{200B}everyone");
        assert_eq!(sanitize("@everyones"), "@\u{200B}everyones");
        assert_eq!(sanitize("ping@here"), "ping@\u{200B}here");
        assert_eq!(sanitize("@here_now"), "@\u{200B}here\\_now");
        assert_eq!(sanitize("@everyone1"), "@\u{200B}everyone1");
        assert_eq!(sanitize("@Alice"), "@Alice");
    }

    #[test]
    fn test_raw_mention_syntax() {
        assert_eq!(sanitize("<@123>"), "<\u{200B}@123\\>");
        assert_eq!(sanitize("<#55>"), "<\u{200B}#55\\>");
        assert_eq!(sanitize("a < b"), "a < b");
    }

    #[test]
    fn test_markdown_escaped() {
        assert_eq!(sanitize("**bold**"), "\\*\\*bold\\*\\*");
        assert_eq!(sanitize("snake_case"), "snake\\_case");
        assert_eq!(sanitize("`code` ~~x~~ || > q"), "\\`code\\` \\~\\~x\\~\\~ \\|\\| \\> q");
    }

    #[test]
    fn test_already_escaped_left_alone() {
        assert_eq!(sanitize("\\*"), "\\*");
        assert_eq!(sanitize("\\\\*"), "\\\\\\*");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "@everyone look at **this**",
            "<@123> and <#456> and @here",
            "\\\\_ \\_ _ `x` ~y~ |z| >q",
            "plain text with üñíçødé",
            "",
            "@@everyone @<@1>",
        ];
        for sample in samples {
            let once = sanitize(sample);
            assert_eq!(sanitize(&once), once, "not idempotent for {:?}", sample);
        }
    }

    /// Every arrangement of up to four pieces around mention and escape boundaries.
    #[test]
    fn test_idempotent_and_safe_for_generated_input() {
        let pieces = ["\\", "<", "@", "everyone", "HERE", "*", "_", "#1>", "x", " "];
        let mut inputs = vec![String::new()];
        for _ in 0..4 {
            inputs = inputs
                .iter()
                .flat_map(|prefix| pieces.iter().map(move |piece| format!("{}{}", prefix, piece)))
                .collect();

            for input in &inputs {
                let once = sanitize(input);
                assert_eq!(sanitize(&once), once, "not idempotent for {:?}", input);

                let lower = once.to_lowercase();
                assert!(!lower.contains("@everyone"), "mass mention left in {:?}", once);
                assert!(!lower.contains("@here"), "mass mention left in {:?}", once);
                assert!(!once.contains("<@") && !once.contains("<#"), "raw mention left in {:?}", once);
            }
        }
    }

    #[test]
    fn test_strip_escapes() {
        assert_eq!(strip_escapes(&sanitize("Bob_the_Builder")), "Bob_the_Builder");
        assert_eq!(strip_escapes("C:\\path"), "C:\\path");
    }

    #[test]
    fn test_sanitize_rich_covers_every_field() {
        let content = RichContent::new()
            .title("@everyone")
            .author("*a*")
            .description("<@1>")
            .footer("_f_")
            .field("~n~", "@here", false)
            .color(0xFF0000);

        let clean = sanitize_rich(content);

        assert_eq!(clean.title.as_deref(), Some("@\u{200B}everyone"));
        assert_eq!(clean.author.as_deref(), Some("\\*a\\*"));
        assert_eq!(clean.description.as_deref(), Some("<\u{200B}@1\\>"));
        assert_eq!(clean.footer.as_deref(), Some("\\_f\\_"));
        assert_eq!(clean.fields[0].name, "\\~n\\~");
        assert_eq!(clean.fields[0].value, "@\u{200B}here");
        assert_eq!(clean.color, Some(0xFF0000));
    }
}
