use anyhow::Result;
use clap::Subcommand;
use comfy_table::{Cell, Table};
use serde::Serialize;
use snapshare::{Message, services::ChatSummary};

use super::{format_time, truncate};
use crate::{
    context::CliContext,
    examples::ExampleGroup,
    output::{OutputManager, TableDisplay},
};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Conversations",
    commands: &[
        "snapshare chat list --as <uid>                   # Chats with unread counts",
        "snapshare chat open --as <uid> <chat_id>         # Read messages, clear the counter",
        "snapshare chat send --as <uid> <chat_id> \"hi\"",
        "snapshare chat start --as <uid> <other_uid>",
    ],
}];

#[derive(Subcommand)]
pub enum ChatCommands {
    /// List a user's chats
    List {
        #[arg(long = "as")]
        viewer: String,
    },

    /// Find or create the chat with another user
    Start {
        #[arg(long = "as")]
        viewer: String,
        other: String,
    },

    /// Send a message
    Send {
        #[arg(long = "as")]
        viewer: String,
        chat_id: String,
        text: String,
    },

    /// Show messages and reset the viewer's unread counter
    Open {
        #[arg(long = "as")]
        viewer: String,
        chat_id: String,
    },
}

#[derive(Serialize)]
struct ChatRow {
    id: String,
    with: String,
    with_id: String,
    last_message: Option<String>,
    unread: u64,
    updated_at: String,
}

impl From<ChatSummary> for ChatRow {
    fn from(summary: ChatSummary) -> Self {
        Self {
            id: summary.chat.id,
            with: summary.other_username,
            with_id: summary.other_id,
            last_message: summary.chat.last_message.map(|last| last.text),
            unread: summary.unread,
            updated_at: format_time(&summary.chat.updated_at),
        }
    }
}

#[derive(Serialize)]
#[serde(transparent)]
struct ChatRows(Vec<ChatRow>);

impl TableDisplay for ChatRows {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table(&["", "Id", "With", "Last message", "Unread", "Updated"]);
        for row in &self.0 {
            table.add_row(vec![
                Cell::new(output.unread_marker(row.unread > 0)),
                Cell::new(&row.id),
                Cell::new(format!("@{}", row.with)),
                Cell::new(row.last_message.as_deref().map(|text| truncate(text, 30)).unwrap_or_default()),
                Cell::new(row.unread),
                Cell::new(&row.updated_at),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.0
            .iter()
            .map(|row| format!("{} @{} unread:{}", row.id, row.with, row.unread))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Serialize)]
#[serde(transparent)]
struct MessageRows(Vec<Message>);

impl TableDisplay for MessageRows {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table(&["Sent", "From", "Text"]);
        for message in &self.0 {
            table.add_row(vec![
                Cell::new(format_time(&message.created_at)),
                Cell::new(&message.sender_id),
                Cell::new(&message.text),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.0
            .iter()
            .map(|message| format!("{}: {}", message.sender_id, message.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub async fn handle_chat_commands(command: ChatCommands, ctx: &CliContext, output: &OutputManager) -> Result<()> {
    let chat = ctx.app.chat();
    match command {
        ChatCommands::List { viewer } => {
            let summaries = chat.chat_list(&viewer).await?;
            if summaries.is_empty() {
                output.info("No chats yet");
                return Ok(());
            }
            let rows = summaries.into_iter().map(ChatRow::from).collect();
            output.display(&ChatRows(rows))?;
        }
        ChatCommands::Start { viewer, other } => {
            let started = chat.start_chat(&viewer, &other).await?;
            output.success(&format!("Chat {} with {other}", started.id));
        }
        ChatCommands::Send { viewer, chat_id, text } => {
            let message = chat.send_message(&viewer, &chat_id, &text).await?;
            output.success(&format!("Sent message {}", message.id));
        }
        ChatCommands::Open { viewer, chat_id } => {
            let messages = chat.messages(&viewer, &chat_id).await?;
            let opened = chat.open_chat(&viewer, &chat_id).await?;
            output.verbose(&format!("unread counter for {viewer} is {}", opened.unread_for(&viewer)));
            output.display(&MessageRows(messages))?;
        }
    }
    Ok(())
}
