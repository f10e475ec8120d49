use crate::platform::IncomingMessage;

/// Prefix of bot commands; those never reach the search pipeline
pub const COMMAND_PREFIX: char = '/';

/// Extract searchable text from a message, or `None` when the message
/// should be ignored: no text, blank text, a command, or (in groups) text
/// longer than `max_group_len` characters.
pub fn normalize(msg: &IncomingMessage, max_group_len: usize) -> Option<String> {
    let text = msg.text.as_deref()?.trim();

    if text.is_empty() || text.starts_with(COMMAND_PREFIX) {
        return None;
    }

    if msg.chat_kind.is_group() && text.chars().count() > max_group_len {
        return None;
    }

    Some(text.to_string())
}
