//! Two-party chats with per-participant unread counters.
//!
//! Counter bookkeeping reads the chat, adjusts the map locally and writes it
//! back. Concurrent senders can overwrite each other's increment; the count is
//! then lower than the number of unread messages.

use std::collections::{BTreeMap, BTreeSet};

use log::{error, info};

use crate::{
    client::SnapshareClient,
    errors::AppError,
    id::generate_document_id,
    live::LiveView,
    models::{Chat, LastMessage, Message, UserProfile},
    store::{FieldUpdate, Query},
};

use super::now;

/// Username shown for a chat partner whose profile cannot be loaded.
pub const FALLBACK_USERNAME: &str = "User";
pub const SUGGESTION_LIMIT: usize = 10;

/// A chat as listed for one viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSummary {
    pub chat: Chat,
    pub other_id: String,
    pub other_username: String,
    pub other_photo_url: String,
    pub unread: u64,
}

#[derive(Clone)]
pub struct ChatService {
    client: SnapshareClient,
}

fn recently_updated_first(a: &Chat, b: &Chat) -> std::cmp::Ordering {
    b.updated_at.cmp(&a.updated_at)
}

fn oldest_first(a: &Message, b: &Message) -> std::cmp::Ordering {
    a.created_at.cmp(&b.created_at)
}

impl ChatService {
    pub fn new(client: SnapshareClient) -> Self {
        Self { client }
    }

    fn chats_of(&self, viewer: &str) -> Query {
        self.client.chats().query().where_array_contains("participants", viewer)
    }

    async fn require_participant(&self, viewer: &str, chat_id: &str) -> Result<Chat, AppError> {
        let chat = self.client.chats().get(chat_id).await?.ok_or_else(|| AppError::NotFound {
            what: "chat",
            id: chat_id.to_string(),
        })?;
        if !chat.has_participant(viewer) {
            return Err(AppError::forbidden("not a participant of this chat"));
        }
        Ok(chat)
    }

    /// Returns the existing chat between `viewer` and `target`, or creates one.
    ///
    /// The lookup and the create are separate steps; two simultaneous starts can
    /// produce two chats for the same pair.
    pub async fn start_chat(&self, viewer: &str, target: &str) -> Result<Chat, AppError> {
        if viewer == target {
            return Err(AppError::invalid("cannot start a chat with yourself"));
        }
        let chats = self.client.chats();
        let existing = chats.find_many(&self.chats_of(viewer)).await?;
        if let Some(chat) = existing
            .into_iter()
            .find(|chat| chat.other_participant(viewer) == Some(target))
        {
            return Ok(chat);
        }
        if self.client.users().get(target).await?.is_none() {
            return Err(AppError::NotFound {
                what: "user",
                id: target.to_string(),
            });
        }

        let created_at = now();
        let chat = Chat {
            id: generate_document_id(),
            participants: vec![viewer.to_string(), target.to_string()],
            last_message: None,
            unread_counts: BTreeMap::from([(viewer.to_string(), 0), (target.to_string(), 0)]),
            created_at,
            updated_at: created_at,
        };
        chats
            .set(&chat)
            .await
            .inspect_err(|err| error!("failed to create chat {viewer}/{target}: {err}"))?;
        info!("chat {} started between {viewer} and {target}", chat.id);
        Ok(chat)
    }

    /// Writes the message, then bumps the recipient's unread counter and the
    /// chat preview in a second write.
    pub async fn send_message(&self, viewer: &str, chat_id: &str, text: &str) -> Result<Message, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::invalid("message text is required"));
        }
        let chat = self.require_participant(viewer, chat_id).await?;
        let recipient = chat
            .other_participant(viewer)
            .ok_or_else(|| AppError::invalid("chat has no other participant"))?
            .to_string();

        let message = Message {
            id: generate_document_id(),
            chat_id: chat_id.to_string(),
            sender_id: viewer.to_string(),
            text: text.to_string(),
            read: false,
            created_at: now(),
        };
        self.client
            .messages(chat_id)
            .set(&message)
            .await
            .inspect_err(|err| error!("failed to send message in {chat_id}: {err}"))?;

        // Re-read so the counter reflects writes made since the participant check.
        let chats = self.client.chats();
        let chat = chats.get_or_error(chat_id).await?;
        let unread = chat.unread_for(&recipient) + 1;
        let last_message = LastMessage {
            text: message.text.clone(),
            sender_id: viewer.to_string(),
            created_at: message.created_at,
        };
        chats
            .update(
                chat_id,
                &[
                    FieldUpdate::set_serialized("lastMessage", &last_message)?,
                    FieldUpdate::set("updatedAt", message.created_at.timestamp_millis()),
                    FieldUpdate::set(format!("unreadCounts.{recipient}"), unread),
                ],
            )
            .await
            .inspect_err(|err| error!("message {} sent but chat {chat_id} not updated: {err}", message.id))?;
        Ok(message)
    }

    /// Clears the viewer's unread counter. No write happens when it is already zero.
    pub async fn open_chat(&self, viewer: &str, chat_id: &str) -> Result<Chat, AppError> {
        let mut chat = self.require_participant(viewer, chat_id).await?;
        if chat.unread_for(viewer) > 0 {
            chat.unread_counts.insert(viewer.to_string(), 0);
            self.client
                .chats()
                .update(chat_id, &[FieldUpdate::set(format!("unreadCounts.{viewer}"), 0)])
                .await?;
        }
        Ok(chat)
    }

    pub async fn delete_message(&self, viewer: &str, chat_id: &str, message_id: &str) -> Result<(), AppError> {
        let messages = self.client.messages(chat_id);
        let message = messages.get(message_id).await?.ok_or_else(|| AppError::NotFound {
            what: "message",
            id: message_id.to_string(),
        })?;
        if message.sender_id != viewer {
            return Err(AppError::forbidden("only the sender can delete a message"));
        }
        messages.delete(message_id).await?;
        Ok(())
    }

    /// The viewer's chats, most recently updated first, with partner details.
    pub async fn chat_list(&self, viewer: &str) -> Result<Vec<ChatSummary>, AppError> {
        let mut chats = self.client.chats().find_many(&self.chats_of(viewer)).await?;
        chats.sort_by(recently_updated_first);
        self.summarize(viewer, chats).await
    }

    pub async fn watch_chats(&self, viewer: &str) -> Result<LiveView<Chat>, AppError> {
        let subscription = self.client.chats().subscribe(self.chats_of(viewer)).await?;
        Ok(LiveView::new(subscription).sorted_by(recently_updated_first))
    }

    /// Attaches the other participant's profile to each chat. Missing or
    /// unreadable profiles fall back to [`FALLBACK_USERNAME`].
    pub async fn summarize(&self, viewer: &str, chats: Vec<Chat>) -> Result<Vec<ChatSummary>, AppError> {
        let users = self.client.users();
        let mut summaries = Vec::with_capacity(chats.len());
        for chat in chats {
            let other_id = chat.other_participant(viewer).unwrap_or_default().to_string();
            let profile = match users.get(&other_id).await {
                Ok(profile) => profile,
                Err(err) => {
                    error!("could not load chat partner {other_id}: {err}");
                    None
                }
            };
            let (other_username, other_photo_url) = match profile {
                Some(profile) => (profile.username, profile.photo_url),
                None => (FALLBACK_USERNAME.to_string(), String::new()),
            };
            summaries.push(ChatSummary {
                unread: chat.unread_for(viewer),
                chat,
                other_id,
                other_username,
                other_photo_url,
            });
        }
        Ok(summaries)
    }

    /// Messages of a chat, oldest first.
    pub async fn messages(&self, viewer: &str, chat_id: &str) -> Result<Vec<Message>, AppError> {
        self.require_participant(viewer, chat_id).await?;
        let messages = self.client.messages(chat_id);
        let mut list = messages.find_many(&messages.query()).await?;
        list.sort_by(oldest_first);
        Ok(list)
    }

    pub async fn watch_messages(&self, viewer: &str, chat_id: &str) -> Result<LiveView<Message>, AppError> {
        self.require_participant(viewer, chat_id).await?;
        let messages = self.client.messages(chat_id);
        let subscription = messages.subscribe(messages.query()).await?;
        Ok(LiveView::new(subscription).sorted_by(oldest_first))
    }

    /// People to start a chat with: followers and followees the viewer has no
    /// chat with yet, at most [`SUGGESTION_LIMIT`].
    pub async fn suggestions(&self, viewer: &str) -> Result<Vec<UserProfile>, AppError> {
        let users = self.client.users();
        let Some(profile) = users.get(viewer).await? else {
            return Ok(Vec::new());
        };
        let chatted: BTreeSet<String> = self
            .client
            .chats()
            .find_many(&self.chats_of(viewer))
            .await?
            .iter()
            .filter_map(|chat| chat.other_participant(viewer).map(str::to_string))
            .collect();

        let mut seen: BTreeSet<String> = BTreeSet::new();
        let candidates = profile
            .followers
            .iter()
            .chain(profile.following.iter())
            .filter(|id| id.as_str() != viewer && !chatted.contains(*id))
            .filter(|id| seen.insert((*id).clone()))
            .take(SUGGESTION_LIMIT)
            .cloned()
            .collect::<Vec<_>>();

        let mut suggestions = Vec::with_capacity(candidates.len());
        for id in candidates {
            if let Some(candidate) = users.get(&id).await? {
                suggestions.push(candidate);
            }
        }
        Ok(suggestions)
    }
}
