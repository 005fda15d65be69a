use serde::Serialize;

use crate::dto::ws::OutboundMessage;

#[derive(Clone, Debug)]
/// Dispatched payload carried across the session channels.
///
/// `data` holds the full JSON frame (including its `type` tag) so socket
/// writers and SSE streams forward the exact same bytes.
pub struct ServerEvent {
    /// Message `type`, also used as the SSE event name.
    pub event: String,
    /// Serialised frame.
    pub data: String,
    /// Question the event refers to, set on reveals so player sockets can
    /// append their personal result.
    pub question_id: Option<u32>,
}

impl ServerEvent {
    /// Serialise `payload` into a frame tagged with `event`.
    pub fn json<T>(event: &str, payload: &T) -> serde_json::Result<Self>
    where
        T: Serialize,
    {
        Ok(Self {
            event: event.to_string(),
            data: serde_json::to_string(payload)?,
            question_id: None,
        })
    }

    /// Serialise an outbound socket message, keeping its tag as event name.
    pub fn from_message(message: &OutboundMessage) -> serde_json::Result<Self> {
        let mut event = Self::json(message.kind(), message)?;
        if let OutboundMessage::Reveal(reveal) = message {
            event.question_id = Some(reveal.question_id);
        }
        Ok(event)
    }
}
