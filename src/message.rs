//! C5: the message protocol and router — the wire format agents use to
//! talk to each other, plus a handler-registry based dispatcher.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::error::MessageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    TaskRequest,
    TaskResponse,
    CollaborationRequest,
    CollaborationResponse,
    StatusUpdate,
    ErrorNotification,
    Heartbeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagePriority {
    Low = 1,
    Medium = 2,
    High = 3,
    Urgent = 4,
}

/// The standard envelope every agent-to-agent communication travels in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub message_type: MessageType,
    pub priority: MessagePriority,
    pub content: HashMap<String, Value>,
    pub metadata: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub requires_response: bool,
    pub correlation_id: Option<String>,
}

impl Message {
    pub fn new(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        message_type: MessageType,
        content: HashMap<String, Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            message_type,
            priority: MessagePriority::Medium,
            content,
            metadata: HashMap::new(),
            created_at: Utc::now(),
            expires_at: None,
            requires_response: false,
            correlation_id: None,
        }
    }

    pub fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn requiring_response(mut self) -> Self {
        self.requires_response = true;
        self
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() > expires_at,
            None => false,
        }
    }

    /// Build a reply to this message, linked by `correlation_id`.
    pub fn create_response(&self, sender_id: impl Into<String>, content: HashMap<String, Value>) -> Message {
        let message_type = if self.message_type == MessageType::TaskRequest {
            MessageType::TaskResponse
        } else {
            MessageType::CollaborationResponse
        };

        Message {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.into(),
            receiver_id: self.sender_id.clone(),
            message_type,
            priority: self.priority,
            content,
            metadata: HashMap::new(),
            created_at: Utc::now(),
            expires_at: None,
            requires_response: false,
            correlation_id: Some(self.id.clone()),
        }
    }
}

/// Convenience wrapper for building a task-request `Message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequestEnvelope {
    pub task_description: String,
    pub task_data: HashMap<String, Value>,
    pub required_capabilities: Vec<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub context: HashMap<String, Value>,
}

impl TaskRequestEnvelope {
    pub fn to_message(&self, sender_id: impl Into<String>, receiver_id: impl Into<String>) -> Message {
        let mut content = HashMap::new();
        content.insert("task_description".to_string(), Value::String(self.task_description.clone()));
        content.insert("task_data".to_string(), serde_json::to_value(&self.task_data).unwrap_or(Value::Null));
        content.insert(
            "required_capabilities".to_string(),
            serde_json::to_value(&self.required_capabilities).unwrap_or(Value::Null),
        );
        content.insert(
            "deadline".to_string(),
            self.deadline.map(|d| Value::String(d.to_rfc3339())).unwrap_or(Value::Null),
        );
        content.insert("context".to_string(), serde_json::to_value(&self.context).unwrap_or(Value::Null));

        Message::new(sender_id, receiver_id, MessageType::TaskRequest, content).requiring_response()
    }
}

/// Convenience wrapper for building a task-response `Message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponseEnvelope {
    pub success: bool,
    pub result_data: HashMap<String, Value>,
    pub error_message: Option<String>,
    pub execution_time: Option<f64>,
}

impl TaskResponseEnvelope {
    pub fn to_message(
        &self,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Message {
        let mut content = HashMap::new();
        content.insert("success".to_string(), Value::Bool(self.success));
        content.insert("result_data".to_string(), serde_json::to_value(&self.result_data).unwrap_or(Value::Null));
        content.insert(
            "error_message".to_string(),
            self.error_message.clone().map(Value::String).unwrap_or(Value::Null),
        );
        content.insert(
            "execution_time".to_string(),
            self.execution_time.map(Value::from).unwrap_or(Value::Null),
        );

        let mut message = Message::new(sender_id, receiver_id, MessageType::TaskResponse, content);
        message.correlation_id = Some(correlation_id.into());
        message
    }
}

/// `id`/`sender_id` present, not expired, and requests requiring a
/// response actually say so.
pub fn validate_message(message: &Message) -> bool {
    if message.id.is_empty() || message.sender_id.is_empty() {
        return false;
    }
    if message.is_expired() {
        return false;
    }
    if matches!(
        message.message_type,
        MessageType::TaskRequest | MessageType::CollaborationRequest
    ) && !message.requires_response
    {
        return false;
    }
    true
}

pub fn validate_task_request(message: &Message) -> bool {
    if message.message_type != MessageType::TaskRequest {
        return false;
    }
    ["task_description", "task_data", "required_capabilities"]
        .iter()
        .all(|field| message.content.contains_key(*field))
}

pub fn validate_task_response(message: &Message) -> bool {
    if message.message_type != MessageType::TaskResponse {
        return false;
    }
    ["success", "result_data"].iter().all(|field| message.content.contains_key(*field))
}

/// A per-agent message handler, invoked by the router on delivery.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: Message) -> Result<(), MessageError>;
}

/// Routes messages to registered handlers, queuing for agents with none
/// registered yet.
pub struct MessageRouter {
    handlers: RwLock<HashMap<String, Arc<dyn MessageHandler>>>,
    queue: RwLock<Vec<Message>>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            queue: RwLock::new(Vec::new()),
        }
    }

    pub async fn register_handler(&self, agent_id: impl Into<String>, handler: Arc<dyn MessageHandler>) {
        self.handlers.write().await.insert(agent_id.into(), handler);
    }

    pub async fn unregister_handler(&self, agent_id: &str) {
        self.handlers.write().await.remove(agent_id);
    }

    /// Deliver immediately if a handler is registered, else queue for later
    /// pickup. Returns `false` only on validation failure.
    pub async fn send_message(&self, message: Message) -> bool {
        if !validate_message(&message) {
            return false;
        }

        let handler = self.handlers.read().await.get(&message.receiver_id).cloned();
        match handler {
            Some(handler) => {
                if let Err(err) = handler.handle(message.clone()).await {
                    warn!(message_id = %message.id, error = %err, "error delivering message");
                    return false;
                }
                true
            }
            None => {
                self.queue.write().await.push(message);
                true
            }
        }
    }

    /// Deliver to every registered handler, optionally skipping the sender.
    /// Returns the number of successful deliveries.
    pub async fn broadcast_message(&self, message: &Message, exclude_sender: bool) -> usize {
        let handlers: Vec<(String, Arc<dyn MessageHandler>)> = self
            .handlers
            .read()
            .await
            .iter()
            .map(|(id, handler)| (id.clone(), handler.clone()))
            .collect();

        let mut sent = 0;
        for (agent_id, handler) in handlers {
            if exclude_sender && agent_id == message.sender_id {
                continue;
            }
            let mut addressed = message.clone();
            addressed.receiver_id = agent_id.clone();
            match handler.handle(addressed).await {
                Ok(()) => sent += 1,
                Err(err) => warn!(agent_id, error = %err, "error broadcasting message"),
            }
        }
        sent
    }

    /// Drain queued messages addressed to `agent_id`.
    pub async fn get_queued_messages(&self, agent_id: &str) -> Vec<Message> {
        let mut queue = self.queue.write().await;
        let (mine, rest): (Vec<Message>, Vec<Message>) =
            queue.drain(..).partition(|msg| msg.receiver_id == agent_id);
        *queue = rest;
        mine
    }
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new()
    }
}
