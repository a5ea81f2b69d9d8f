//! Relay between the chat page and the external chat-completion service.
//!
//! The persona instruction is passed as the agent preamble on every call and never stored in the
//! session transcript, so exported reports only contain what the user and the advisor said.

use anyhow::anyhow;
use async_trait::async_trait;
use rig::{
    client::CompletionClient,
    completion::{Chat, Message},
    providers::groq,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::{ChatRole, ChatTurn};

pub const ADVISORY_MODEL: &str = "llama-3.3-70b-versatile";

const ADVISOR_PERSONA: &str = "너는 사람들에게 유능한 Wrap Account를 해주는 펀드 매니저야, 너의 고객은 한국 사람밖에 없으니 한국말로만 대답을 해야해 그렇지 않으면 너의 직업은 위태로워";

/// One chat-completion round trip.
#[async_trait]
pub trait AdvisoryClient: Send + Sync {
    /// Complete `history` (whose last turn is the new user question) under `system`.
    async fn complete(&self, system: &str, history: &[ChatTurn]) -> anyhow::Result<String>;
}

/// Groq-hosted completion through rig.
pub struct GroqAdvisoryClient {
    api_key: Option<String>,
    model: String,
}

impl GroqAdvisoryClient {
    /// A client without a key still constructs; every call then fails and the relay reports it.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            model: ADVISORY_MODEL.to_string(),
        }
    }
}

fn to_rig_message(turn: &ChatTurn) -> Message {
    match turn.role {
        ChatRole::User => Message::user(turn.content.clone()),
        ChatRole::Assistant => Message::assistant(turn.content.clone()),
    }
}

#[async_trait]
impl AdvisoryClient for GroqAdvisoryClient {
    async fn complete(&self, system: &str, history: &[ChatTurn]) -> anyhow::Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("GROQ_API_KEY not set"))?;
        let (question, earlier) = history
            .split_last()
            .ok_or_else(|| anyhow!("no question to answer"))?;

        let client = groq::Client::new(api_key);
        let agent = client.agent(&self.model).preamble(system).build();
        let earlier: Vec<Message> = earlier.iter().map(to_rig_message).collect();

        let reply = agent.chat(question.content.clone(), earlier).await?;
        Ok(reply)
    }
}

#[derive(Clone)]
pub struct AdvisoryRelay {
    client: Arc<dyn AdvisoryClient>,
}

impl AdvisoryRelay {
    pub fn new(client: Arc<dyn AdvisoryClient>) -> Self {
        Self { client }
    }

    /// Append `question` and the advisor's reply to `history`, returning the reply.
    ///
    /// A failed call still produces a reply: the error text becomes the assistant turn, so the
    /// transcript always grows by exactly two turns.
    pub async fn ask(&self, history: &mut Vec<ChatTurn>, question: String) -> String {
        history.push(ChatTurn::user(question));

        let reply = match self.client.complete(ADVISOR_PERSONA, history).await {
            Ok(content) => {
                info!(turns = history.len(), "advisory reply received");
                content
            }
            Err(e) => {
                warn!(error = %e, "advisory call failed");
                format!("Groq API 호출 중 오류가 발생했습니다: {e:#}")
            }
        };

        history.push(ChatTurn::assistant(reply.clone()));
        reply
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned outcomes and records what it was asked.
    #[derive(Default)]
    pub struct ScriptedAdvisor {
        replies: Mutex<VecDeque<anyhow::Result<String>>>,
        pub calls: Mutex<Vec<(String, Vec<ChatTurn>)>>,
    }

    impl ScriptedAdvisor {
        pub fn new(replies: Vec<anyhow::Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AdvisoryClient for ScriptedAdvisor {
        async fn complete(&self, system: &str, history: &[ChatTurn]) -> anyhow::Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((system.to_string(), history.to_vec()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("no scripted reply")))
        }
    }
}
