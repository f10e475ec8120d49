use tracing::{debug, warn};

use crate::config::ProfileConfig;
use crate::llm::TextGenerator;

/// `<text> <language qualifier> <channel suffix>`, used whenever the
/// generator is unavailable.
pub fn fallback_query(text: &str, profile: &ProfileConfig) -> String {
    [
        text.trim(),
        profile.language_qualifier.trim(),
        profile.channel_suffix.trim(),
    ]
    .iter()
    .filter(|part| !part.is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join(" ")
}

fn synthesis_prompt(text: &str, profile: &ProfileConfig) -> String {
    format!(
        "Turn the user's request into one Google search query that finds Telegram channels \
         sharing this title.\n\
         Rules:\n\
         - If the request does not name a language or dubbing, add \"{qualifier}\".\n\
         - Always end the query with \"{suffix}\".\n\
         - Reply with the query only: no quotes, no explanation.\n\n\
         Request: {text}",
        qualifier = profile.language_qualifier,
        suffix = profile.channel_suffix,
    )
}

/// Build the search-engine query for `text`. Asks the generator once; an
/// error or blank answer falls back to [`fallback_query`].
pub async fn synthesize(
    text: &str,
    profile: &ProfileConfig,
    generator: Option<&dyn TextGenerator>,
) -> String {
    let Some(generator) = generator else {
        return fallback_query(text, profile);
    };

    match generator.generate(&synthesis_prompt(text, profile)).await {
        Ok(answer) if !answer.trim().is_empty() => {
            let query = answer.trim().to_string();
            debug!("Synthesized query for {:?}: {}", text, query);
            query
        }
        Ok(_) => {
            warn!("Query synthesis returned nothing, using template");
            fallback_query(text, profile)
        }
        Err(e) => {
            warn!("Query synthesis failed, using template: {:#}", e);
            fallback_query(text, profile)
        }
    }
}
