use tracing::{debug, warn};

use crate::llm::TextGenerator;
use crate::platform::ChatKind;

/// Greetings, acknowledgements and the like. Matching is exact and
/// case-insensitive.
pub fn is_ignored(text: &str, ignore_words: &[String]) -> bool {
    let lowered = text.trim().to_lowercase();
    ignore_words.iter().any(|w| w.to_lowercase() == lowered)
}

fn classification_prompt(text: &str) -> String {
    format!(
        "Does the text \"{text}\" name a movie, anime, series, or book? \
         Reply with only YES or NO."
    )
}

/// Decide whether `text` asks for a title search.
///
/// Private chats are search-only, so they always pass. In groups the ignore
/// list is checked first and always suppresses; after that the generator is
/// asked, and any failure (or no generator at all) lets the message through.
pub async fn is_search_intent(
    text: &str,
    chat_kind: ChatKind,
    ignore_words: &[String],
    generator: Option<&dyn TextGenerator>,
) -> bool {
    if !chat_kind.is_group() {
        return true;
    }

    if is_ignored(text, ignore_words) {
        debug!("Ignoring small talk: {}", text);
        return false;
    }

    let Some(generator) = generator else {
        return true;
    };

    match generator.generate(&classification_prompt(text)).await {
        Ok(answer) => {
            let verdict = answer.to_uppercase().contains("YES");
            debug!("Intent classifier said {:?} for {:?}", answer.trim(), text);
            verdict
        }
        Err(e) => {
            warn!("Intent classification failed, assuming search: {:#}", e);
            true
        }
    }
}
