use crate::pipeline::aggregate::{ImageCandidate, SearchResult};
use crate::platform::ChatKind;

/// Callback data of the dismiss button
pub const CLOSE_TOKEN: &str = "close";
pub const CLOSE_LABEL: &str = "❌ Close";
pub const RESULT_PREFIX: &str = "📂 ";
pub const NO_RESULTS_TEXT: &str =
    "❌ <b>No results found.</b>\nCheck the spelling or try the original title.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadKind {
    /// Send as a photo with the given URL, caption underneath
    Photo(String),
    TextOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    Url(String),
    /// Local control token handled by the callback handler
    Control(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn close() -> Self {
        Self {
            label: CLOSE_LABEL.to_string(),
            action: ButtonAction::Control(CLOSE_TOKEN.to_string()),
        }
    }
}

/// Everything the transport needs to send one reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePayload {
    pub kind: PayloadKind,
    /// Telegram HTML
    pub caption: String,
    pub buttons: Vec<Button>,
    pub spoiler: bool,
}

/// Python-style title case: the first letter of every alphabetic run is
/// upper-cased, the rest lower-cased.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}

fn result_caption(text: &str) -> String {
    let title = html_escape::encode_text(&title_case(text)).into_owned();
    format!("🔎 <b>Result:</b> {title}")
}

/// Assemble the reply for a search.
///
/// Group results are hidden behind a spoiler when `spoiler_in_groups` is
/// set; private results are quoted. The close button always comes last.
pub fn compose(
    chat_kind: ChatKind,
    text: &str,
    results: &[SearchResult],
    image: Option<&ImageCandidate>,
    spoiler_in_groups: bool,
) -> ResponsePayload {
    let mut buttons: Vec<Button> = results
        .iter()
        .map(|r| Button {
            label: format!("{RESULT_PREFIX}{}", r.title),
            action: ButtonAction::Url(r.url.clone()),
        })
        .collect();

    let (caption, spoiler) = if results.is_empty() {
        (NO_RESULTS_TEXT.to_string(), false)
    } else if chat_kind.is_group() && spoiler_in_groups {
        (format!("<tg-spoiler>{}</tg-spoiler>", result_caption(text)), true)
    } else {
        (format!("<blockquote>{}</blockquote>", result_caption(text)), false)
    };

    buttons.push(Button::close());

    let kind = match image {
        Some(image) => PayloadKind::Photo(image.url.clone()),
        None => PayloadKind::TextOnly,
    };

    ResponsePayload {
        kind,
        caption,
        buttons,
        spoiler,
    }
}
