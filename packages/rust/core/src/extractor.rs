//! Turns a chat message into a [`Submission`]: who posted it and what it says.

use tracing::{debug, instrument};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use deliverybot_chat::{ChatMessage, ChatSource, Member};
use deliverybot_shared::{DeliveryBotError, Result, Submission};

/// Normalize a display name into a student identifier.
///
/// Lowercases, decomposes (NFD), strips combining marks and joins
/// whitespace-separated words with `-`: `"José  Pérez"` → `"jose-perez"`.
/// Runs of whitespace collapse into one `-` and surrounding whitespace is
/// dropped, so a doubled space in a nickname still matches the roster entry.
/// Applying it to its own output returns the output unchanged.
pub fn normalize_nickname(name: &str) -> String {
    let stripped: String = name
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Pick the raw (un-normalized) author name for a message.
///
/// Submissions relayed by the forwarding bot carry the real author in the
/// first line, as in `Entrega de Ana García`.
pub fn resolve_author_name<'a>(
    member: &'a Member,
    body: &'a str,
    forwarder_name: &str,
) -> Result<&'a str> {
    let display_name = member.display_name();
    let is_forwarded = display_name == forwarder_name || member.user.username == forwarder_name;

    if !is_forwarded {
        return Ok(display_name);
    }

    let first_line = body.lines().next().unwrap_or_default();
    first_line
        .split(" de ")
        .nth(1)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            DeliveryBotError::parse(format!(
                "forwarded message has no ' de <name>' in its first line: {first_line:?}"
            ))
        })
}

/// Build a [`Submission`] from a chat message, looking up the author's
/// guild nickname through `source`.
#[instrument(skip_all, fields(message_id = %message.id))]
pub async fn extract_submission<S: ChatSource>(
    source: &S,
    message: &ChatMessage,
    forwarder_name: &str,
) -> Result<Submission> {
    let raw_text = message.content.trim().to_string();
    let member = source.fetch_member(&message.author.id).await?;

    let author = resolve_author_name(&member, &raw_text, forwarder_name)?;
    let nickname = normalize_nickname(author);
    debug!(author, %nickname, "resolved submission author");

    Ok(Submission { nickname, raw_text })
}
