//! Message-to-result pipeline: normalize, gate on intent, build the query,
//! search, compose the reply. Stateless; each message is handled on its own.

pub mod aggregate;
pub mod compose;
pub mod intent;
pub mod normalize;
pub mod query;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ProfileConfig;
use crate::llm::TextGenerator;
use crate::platform::IncomingMessage;
use crate::search::SearchBackend;

pub use compose::{Button, ButtonAction, PayloadKind, ResponsePayload, CLOSE_TOKEN};

pub struct Pipeline {
    profile: ProfileConfig,
    generator: Option<Arc<dyn TextGenerator>>,
    search: Arc<dyn SearchBackend>,
}

impl Pipeline {
    pub fn new(
        profile: ProfileConfig,
        generator: Option<Arc<dyn TextGenerator>>,
        search: Arc<dyn SearchBackend>,
    ) -> Self {
        Self {
            profile,
            generator,
            search,
        }
    }

    fn generator(&self) -> Option<&dyn TextGenerator> {
        self.generator.as_deref()
    }

    /// Normalize and classify. `None` means the message gets no reply.
    pub async fn admit(&self, msg: &IncomingMessage) -> Option<String> {
        let text = normalize::normalize(msg, self.profile.max_group_text_len)?;

        if !intent::is_search_intent(
            &text,
            msg.chat_kind,
            &self.profile.ignore_words,
            self.generator(),
        )
        .await
        {
            debug!("Suppressed message {} in chat {}", msg.message_id, msg.chat_id);
            return None;
        }

        Some(text)
    }

    /// Search for admitted `text` and compose the reply.
    pub async fn respond(&self, msg: &IncomingMessage, text: &str) -> ResponsePayload {
        let query_generator = if self.profile.ai_query {
            self.generator()
        } else {
            None
        };
        let query = query::synthesize(text, &self.profile, query_generator).await;

        let (results, image) = tokio::join!(
            aggregate::search_links(self.search.as_ref(), &query),
            aggregate::search_image(self.search.as_ref(), text, &self.profile.image_suffix),
        );

        info!(
            "Search for {:?} in chat {}: {} result(s), image: {}",
            text,
            msg.chat_id,
            results.len(),
            image.is_some()
        );

        compose::compose(
            msg.chat_kind,
            text,
            &results,
            image.as_ref(),
            self.profile.spoiler_in_groups,
        )
    }

    /// Run the whole pipeline for one message.
    #[cfg(test)]
    pub async fn handle(&self, msg: &IncomingMessage) -> Option<ResponsePayload> {
        let text = self.admit(msg).await?;
        Some(self.respond(msg, &text).await)
    }
}

#[cfg(test)]
mod tests {
    use super::compose::NO_RESULTS_TEXT;
    use super::testing::{hit, FakeGenerator, FakeSearch};
    use super::*;
    use crate::platform::{ChatKind, SenderMeta};
    use crate::search::SearchMode;

    fn message(text: &str, chat_kind: ChatKind) -> IncomingMessage {
        IncomingMessage {
            text: Some(text.to_string()),
            chat_id: -100123,
            chat_kind,
            message_id: 55,
            sender: SenderMeta {
                first_name: Some("Asha".to_string()),
                username: None,
            },
        }
    }

    fn two_hits() -> Vec<crate::search::SearchHit> {
        vec![
            hit("Telegram: Naruto Hindi", "https://t.me/naruto_hindi?utm=1"),
            hit("Naruto Shippuden Channel", "https://t.me/s/shippuden"),
        ]
    }

    fn pipeline(
        generator: Option<Arc<FakeGenerator>>,
        search: Arc<FakeSearch>,
    ) -> Pipeline {
        Pipeline::new(
            ProfileConfig::default(),
            generator.map(|g| g as Arc<dyn TextGenerator>),
            search,
        )
    }

    #[tokio::test]
    async fn test_scenario_private_search_with_image() {
        let search = Arc::new(FakeSearch::new(
            two_hits(),
            vec![hit("poster", "https://img.example/naruto.jpg")],
        ));
        let pipeline = pipeline(None, search.clone());

        let payload = pipeline
            .handle(&message("Naruto", ChatKind::Private))
            .await
            .unwrap();

        assert_eq!(payload.buttons.len(), 3);
        assert!(!payload.spoiler);
        assert_eq!(
            payload.kind,
            PayloadKind::Photo("https://img.example/naruto.jpg".to_string())
        );
        assert_eq!(payload.buttons[0].label, "📂 Naruto Hindi");
        assert_eq!(
            payload.buttons[1].action,
            ButtonAction::Url("https://t.me/shippuden".to_string())
        );
        assert_eq!(
            payload.buttons[2].action,
            ButtonAction::Control(CLOSE_TOKEN.to_string())
        );
        assert_eq!(
            search.request_for(SearchMode::Image).unwrap().query,
            "Naruto poster wallpaper hd"
        );
    }

    #[tokio::test]
    async fn test_scenario_group_greeting_suppressed() {
        let generator = Arc::new(FakeGenerator::replying("YES"));
        let search = Arc::new(FakeSearch::new(two_hits(), vec![]));
        let pipeline = pipeline(Some(generator.clone()), search.clone());

        assert!(pipeline
            .handle(&message("hello", ChatKind::Group))
            .await
            .is_none());
        assert_eq!(generator.calls(), 0);
        assert!(search.requests().is_empty());
    }

    #[tokio::test]
    async fn test_scenario_group_classifier_timeout_fails_open() {
        let generator = Arc::new(FakeGenerator::failing("operation timed out"));
        let search = Arc::new(FakeSearch::new(two_hits(), vec![]));
        let pipeline = pipeline(Some(generator.clone()), search.clone());

        let payload = pipeline
            .handle(&message("Stree 2", ChatKind::Group))
            .await
            .unwrap();

        assert!(payload.spoiler);
        assert_eq!(payload.kind, PayloadKind::TextOnly);
        // classifier and synthesizer each tried once
        assert_eq!(generator.calls(), 2);
        assert_eq!(
            search.request_for(SearchMode::Web).unwrap().query,
            "Stree 2 Hindi Dubbed Telegram Channel site:t.me"
        );
    }

    #[tokio::test]
    async fn test_scenario_search_error_shows_not_found() {
        let search = Arc::new(FakeSearch::failing(
            "Search API error (429): Quota exceeded for quota metric",
        ));
        let pipeline = pipeline(None, search);

        let payload = pipeline
            .handle(&message("Naruto", ChatKind::Private))
            .await
            .unwrap();

        assert_eq!(payload.caption, NO_RESULTS_TEXT);
        assert!(!payload.caption.contains("Quota"));
        assert!(!payload.spoiler);
        assert_eq!(payload.buttons, vec![Button::close()]);
    }

    #[tokio::test]
    async fn test_pipeline_is_idempotent() {
        let search = Arc::new(FakeSearch::new(
            two_hits(),
            vec![hit("poster", "https://img.example/naruto.jpg")],
        ));
        let pipeline = pipeline(None, search);

        for kind in [ChatKind::Private, ChatKind::Group] {
            let msg = message("one piece", kind);
            let first = pipeline.handle(&msg).await;
            let second = pipeline.handle(&msg).await;
            assert!(first.is_some());
            assert_eq!(first, second);
        }
    }

    #[tokio::test]
    async fn test_generator_writes_the_query() {
        let generator = Arc::new(FakeGenerator::replying("Naruto Hindi Dubbed Telegram Channel site:t.me"));
        let search = Arc::new(FakeSearch::new(two_hits(), vec![]));
        let pipeline = pipeline(Some(generator), search.clone());

        pipeline
            .handle(&message("naruto", ChatKind::Private))
            .await
            .unwrap();
        assert_eq!(
            search.request_for(SearchMode::Web).unwrap().query,
            "Naruto Hindi Dubbed Telegram Channel site:t.me"
        );
    }

    #[tokio::test]
    async fn test_ai_query_disabled_uses_template() {
        let generator = Arc::new(FakeGenerator::replying("something else entirely"));
        let search = Arc::new(FakeSearch::new(two_hits(), vec![]));
        let profile = ProfileConfig {
            ai_query: false,
            ..ProfileConfig::default()
        };
        let pipeline = Pipeline::new(profile, Some(generator.clone()), search.clone());

        pipeline
            .handle(&message("naruto", ChatKind::Private))
            .await
            .unwrap();
        assert_eq!(generator.calls(), 0);
        assert_eq!(
            search.request_for(SearchMode::Web).unwrap().query,
            "naruto Hindi Dubbed Telegram Channel site:t.me"
        );
    }

    #[tokio::test]
    async fn test_long_group_message_never_reaches_search() {
        let search = Arc::new(FakeSearch::new(two_hits(), vec![]));
        let pipeline = pipeline(None, search.clone());
        let chatter = "did anyone watch the match yesterday, it was absolutely unreal";

        assert!(pipeline.handle(&message(chatter, ChatKind::Supergroup)).await.is_none());
        assert!(search.requests().is_empty());
    }
}
