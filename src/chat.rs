use std::sync::Arc;

use anyhow::Result;
use log::info;

use crate::db::{ChatRole, Database};
use crate::mood::{EmotionKind, MoodState};
use crate::response::{ResponseGenerator, ResponseRequest};

/// A wellbeing tip rides along when the conversation length is a multiple of this.
const TIP_EVERY: usize = 3;

/// Companion chat for one session: logs both sides and asks the generator for replies.
#[derive(Clone)]
pub struct ChatService {
    db: Database,
    generator: Arc<dyn ResponseGenerator>,
}

impl ChatService {
    pub fn new(db: Database, generator: Arc<dyn ResponseGenerator>) -> Self {
        Self { db, generator }
    }

    pub fn generator_name(&self) -> &'static str {
        self.generator.name()
    }

    /// Opening line for a session, shaped by the mood on screen.
    pub async fn greeting(&self, mood: MoodState, emotion: Option<EmotionKind>) -> Result<String> {
        self.generator
            .generate(&ResponseRequest::greeting(mood, emotion))
            .await
    }

    pub async fn reply(
        &self,
        session_id: &str,
        mood: MoodState,
        emotion: Option<EmotionKind>,
        user_message: &str,
    ) -> Result<String> {
        self.db
            .log_message(session_id, ChatRole::User, user_message, emotion)
            .await?;

        let logged = self.db.count_messages(session_id, ChatRole::User).await?
            + self.db.count_messages(session_id, ChatRole::Assistant).await?;
        let include_tip = logged % TIP_EVERY == 0;

        let request = ResponseRequest {
            mood,
            emotion,
            user_message: Some(user_message.to_string()),
            include_tip,
        };
        let response = self.generator.generate(&request).await?;

        self.db
            .log_message(session_id, ChatRole::Assistant, &response, None)
            .await?;

        info!(
            "chat reply via {} (mood {mood}, tip {include_tip})",
            self.generator.name()
        );
        Ok(response)
    }
}
