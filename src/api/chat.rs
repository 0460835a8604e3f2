use super::client::ScoreSightClient;
use super::error::ApiError;
use super::normalize::RawConfidence;
use crate::models::{ChatMessage, ChatRole, Confidence};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Messages of history sent along with each question
pub const CONTEXT_WINDOW: usize = 10;

pub const GREETING: &str = "Hello! I'm your EPL Match Predictor assistant. I can help you with \
match predictions, team analysis, and football insights. How can I assist you today?";

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    message: &'a str,
    conversation: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    reply: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    confidence: Option<RawConfidence>,
}

impl ChatReply {
    fn text(&mut self) -> Option<String> {
        self.response
            .take()
            .or_else(|| self.reply.take())
            .or_else(|| self.message.take())
            .filter(|t| !t.trim().is_empty())
    }
}

/// Why the assistant could not answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatFailure {
    Unauthenticated,
    Unreachable,
    Backend,
}

impl ChatFailure {
    pub fn from_error(err: &ApiError) -> Self {
        match err {
            ApiError::Unauthorized(_) => ChatFailure::Unauthenticated,
            ApiError::Transport(_) => ChatFailure::Unreachable,
            _ => ChatFailure::Backend,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ChatFailure::Unauthenticated => "Please log in to chat with the assistant.",
            ChatFailure::Unreachable => {
                "I'm sorry, I'm having trouble connecting to the server. Please make sure the backend is running."
            }
            ChatFailure::Backend => {
                "I apologize, but I encountered an error. Please try again."
            }
        }
    }
}

/// Result of one exchange; both variants have already been appended to the transcript
#[derive(Debug, Clone)]
pub enum ChatTurn {
    Reply(ChatMessage),
    Failed {
        notice: ChatMessage,
        failure: ChatFailure,
    },
}

impl ChatTurn {
    pub fn message(&self) -> &ChatMessage {
        match self {
            ChatTurn::Reply(message) | ChatTurn::Failed { notice: message, .. } => message,
        }
    }
}

/// What the assistant said, before it joins a transcript
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantReply {
    pub text: String,
    pub source: Option<String>,
    pub confidence: Option<Confidence>,
}

impl ScoreSightClient {
    /// Ask the assistant a question. `conversation` is sent as context.
    pub async fn send_chat(
        &self,
        message: &str,
        conversation: &[ChatMessage],
        token: Option<&str>,
    ) -> Result<AssistantReply, ApiError> {
        let mut request = self.post(self.chat_path()).json(&ChatBody {
            message,
            conversation,
        });
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let mut reply: ChatReply = self.send_json(request).await?;
        let text = reply
            .text()
            .ok_or_else(|| ApiError::Decode("chat reply has no text".to_string()))?;
        let confidence = match reply.confidence {
            Some(RawConfidence::Label(label)) => Confidence::parse(&label),
            Some(RawConfidence::Score(score)) => Some(Confidence::from_score(score)),
            None => None,
        };
        Ok(AssistantReply {
            text,
            source: reply.source,
            confidence,
        })
    }
}

/// A question that has joined the transcript but not yet been answered
#[derive(Debug, Clone)]
pub struct PendingChat {
    text: String,
    context: Vec<ChatMessage>,
}

impl PendingChat {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub async fn send(
        &self,
        client: &ScoreSightClient,
        token: Option<&str>,
    ) -> Result<AssistantReply, ApiError> {
        client.send_chat(&self.text, &self.context, token).await
    }
}

/// In-memory chat transcript plus the logic to extend it
pub struct ChatWidget {
    client: ScoreSightClient,
    messages: Vec<ChatMessage>,
    next_id: u64,
}

impl ChatWidget {
    pub fn new(client: ScoreSightClient) -> Self {
        let mut widget = Self {
            client,
            messages: Vec::new(),
            next_id: 1,
        };
        widget.clear();
        widget
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Reset the transcript to the greeting
    pub fn clear(&mut self) {
        self.messages.clear();
        let greeting = self.message(GREETING.to_string(), ChatRole::Assistant);
        self.messages.push(greeting);
    }

    pub fn client(&self) -> &ScoreSightClient {
        &self.client
    }

    /// Send `text` to the assistant and append both sides to the transcript.
    ///
    /// Blank input is rejected with no request. Backend failures do not
    /// return an error; they append an explanatory assistant message.
    pub async fn send(&mut self, text: &str, token: Option<&str>) -> Result<ChatTurn, ApiError> {
        let pending = self.prepare(text)?;
        let result = pending.send(&self.client, token).await;
        Ok(self.complete(result))
    }

    /// Validate `text`, append it as the user's message and capture the
    /// context that goes with it
    pub fn prepare(&mut self, text: &str) -> Result<PendingChat, ApiError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ApiError::Validation("Message cannot be empty".to_string()));
        }

        let start = self.messages.len().saturating_sub(CONTEXT_WINDOW);
        let context: Vec<ChatMessage> = self.messages[start..].to_vec();

        let question = self.message(text.to_string(), ChatRole::User);
        self.messages.push(question);

        Ok(PendingChat {
            text: text.to_string(),
            context,
        })
    }

    /// Append the answer (or a failure notice) for a prepared question
    pub fn complete(&mut self, result: Result<AssistantReply, ApiError>) -> ChatTurn {
        let turn = match result {
            Ok(reply) => {
                let mut answer = self.message(reply.text, ChatRole::Assistant);
                answer.source = reply.source;
                answer.confidence = reply.confidence;
                ChatTurn::Reply(answer)
            }
            Err(e) => {
                tracing::warn!("Chat request failed: {}", e);
                let failure = ChatFailure::from_error(&e);
                let notice = self.message(failure.message().to_string(), ChatRole::Assistant);
                ChatTurn::Failed { notice, failure }
            }
        };

        self.messages.push(turn.message().clone());
        turn
    }

    fn message(&mut self, content: String, role: ChatRole) -> ChatMessage {
        let id = self.next_id;
        self.next_id += 1;
        ChatMessage {
            id,
            content,
            role,
            timestamp: Utc::now(),
            source: None,
            confidence: None,
        }
    }
}
