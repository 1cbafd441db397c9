//! Chat command handling, independent of the socket transport.
//!
//! Each connection's commands are processed one at a time in receipt order,
//! and a message is only broadcast after it has been persisted. Failures are
//! reported to the originating connection and never to the room.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::{
    chat::{
        protocol::{ClientCommand, ServerEvent},
        registry::{ConnectionId, RoomRegistry},
    },
    db::connection::DbPool,
    models::{chat::ChatMessage, user::AuthUser},
    repositories::{chat as chat_repo, video as video_repo},
    types::{UserId, VideoId},
};

const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

impl RelayError {
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::BadRequest(_) => "BAD_REQUEST",
            RelayError::Forbidden(_) => "FORBIDDEN",
            RelayError::NotFound(_) => "NOT_FOUND",
            RelayError::Storage(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn to_event(&self) -> ServerEvent {
        let message = match self {
            RelayError::Storage(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        ServerEvent::Error {
            code: self.code().to_string(),
            message,
        }
    }
}

#[derive(Clone)]
pub struct ChatRelay {
    pool: DbPool,
    rooms: Arc<RoomRegistry>,
}

impl ChatRelay {
    pub fn new(pool: DbPool, rooms: Arc<RoomRegistry>) -> Self {
        Self { pool, rooms }
    }

    pub fn rooms(&self) -> &Arc<RoomRegistry> {
        &self.rooms
    }

    pub async fn connect(&self, user: &AuthUser) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let (id, receiver) = self.rooms.connect().await;
        tracing::info!(connection = %id, user_id = %user.id, "Chat connection opened");
        (id, receiver)
    }

    pub async fn disconnect(&self, id: ConnectionId) {
        self.rooms.leave(id).await;
        tracing::info!(connection = %id, "Chat connection closed");
    }

    /// Parses and handles one text frame. Errors go back to the sender only.
    pub async fn handle_frame(&self, id: ConnectionId, user: &AuthUser, raw: &str) {
        let result = match serde_json::from_str::<ClientCommand>(raw) {
            Ok(command) => self.handle(id, user, command).await,
            Err(err) => Err(RelayError::BadRequest(format!("Malformed chat command: {}", err))),
        };

        if let Err(err) = result {
            match &err {
                RelayError::Storage(cause) => {
                    tracing::error!(connection = %id, error = %cause, "Chat command failed")
                }
                other => tracing::warn!(connection = %id, user_id = %user.id, "Chat command rejected: {}", other),
            }
            self.rooms.send_to(id, err.to_event()).await;
        }
    }

    pub async fn handle(
        &self,
        id: ConnectionId,
        user: &AuthUser,
        command: ClientCommand,
    ) -> Result<(), RelayError> {
        match command {
            ClientCommand::JoinVideoRoom { video_id } => {
                self.join_video_room(id, &video_id).await.map(|_| ())
            }
            ClientCommand::ChatMessage {
                video_id,
                user_id,
                text,
            } => self
                .chat_message(id, user, &video_id, user_id.as_deref(), &text)
                .await
                .map(|_| ()),
        }
    }

    /// Joins the room and sends the full backlog to this connection alone.
    /// Messages broadcast while the backlog loads are delivered after it.
    ///
    /// Returns the number of backlog messages delivered.
    pub async fn join_video_room(&self, id: ConnectionId, raw_video_id: &str) -> Result<usize, RelayError> {
        let video_id = parse_video_id(raw_video_id)?;
        if !video_repo::exists(&self.pool, video_id).await? {
            return Err(RelayError::NotFound("Video not found".into()));
        }

        if !self.rooms.begin_join(id, video_id).await {
            return Ok(0);
        }
        let backlog = match chat_repo::list_for_video(&self.pool, video_id).await {
            Ok(backlog) => backlog,
            Err(err) => {
                self.rooms.abort_join(id, video_id).await;
                return Err(err.into());
            }
        };
        let count = backlog.len();
        self.rooms.complete_join(id, video_id, backlog).await;

        tracing::info!(connection = %id, video_id = %video_id, backlog = count, "Joined chat room");
        Ok(count)
    }

    /// Persists the message as the authenticated user, then broadcasts it.
    pub async fn chat_message(
        &self,
        id: ConnectionId,
        user: &AuthUser,
        raw_video_id: &str,
        claimed_user_id: Option<&str>,
        text: &str,
    ) -> Result<ChatMessage, RelayError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RelayError::BadRequest("Message text is required".into()));
        }
        if text.chars().count() > MAX_MESSAGE_CHARS {
            return Err(RelayError::BadRequest(format!(
                "Message text must be at most {} characters",
                MAX_MESSAGE_CHARS
            )));
        }
        let video_id = parse_video_id(raw_video_id)?;

        if let Some(claimed) = claimed_user_id.filter(|value| !value.trim().is_empty()) {
            let claimed: UserId = claimed
                .parse()
                .map_err(|_| RelayError::BadRequest("Invalid user id".into()))?;
            if claimed != user.id {
                return Err(RelayError::Forbidden(
                    "Cannot send messages on behalf of another user".into(),
                ));
            }
        }

        if !video_repo::exists(&self.pool, video_id).await? {
            return Err(RelayError::NotFound("Video not found".into()));
        }

        let message = chat_repo::insert_message(&self.pool, video_id, user.id, text).await?;
        let delivered = self
            .rooms
            .broadcast(video_id, &ServerEvent::ChatMessage(message.clone()))
            .await;

        tracing::debug!(
            connection = %id,
            video_id = %video_id,
            message_id = %message.id,
            delivered,
            "Relayed chat message"
        );
        Ok(message)
    }
}

fn parse_video_id(raw: &str) -> Result<VideoId, RelayError> {
    if raw.trim().is_empty() {
        return Err(RelayError::BadRequest("videoId is required".into()));
    }
    raw.parse()
        .map_err(|_| RelayError::BadRequest("Invalid video id".into()))
}
