use anyhow::Result;
use clap::Subcommand;
use comfy_table::{Cell, Table};
use serde::Serialize;
use snapshare::Notification;

use super::format_time;
use crate::{
    context::CliContext,
    examples::ExampleGroup,
    output::{OutputManager, TableDisplay},
};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Notifications",
    commands: &[
        "snapshare notifications list --as <uid>     # Newest first",
        "snapshare notifications read --as <uid>     # Mark all as read",
    ],
}];

#[derive(Subcommand)]
pub enum NotificationCommands {
    /// List a user's notifications
    List {
        #[arg(long = "as")]
        viewer: String,
    },

    /// Mark every unread notification as read
    Read {
        #[arg(long = "as")]
        viewer: String,
    },
}

#[derive(Serialize)]
#[serde(transparent)]
struct NotificationRows(Vec<Notification>);

impl TableDisplay for NotificationRows {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table(&["", "Type", "From", "Message", "Received"]);
        for notification in &self.0 {
            table.add_row(vec![
                Cell::new(output.unread_marker(!notification.read)),
                Cell::new(notification.kind.as_str()),
                Cell::new(format!("@{}", notification.sender.username)),
                Cell::new(&notification.message),
                Cell::new(format_time(&notification.created_at)),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.0
            .iter()
            .map(|n| format!("{} {} {}", n.kind.as_str(), n.sender_id, n.message))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub async fn handle_notification_commands(
    command: NotificationCommands,
    ctx: &CliContext,
    output: &OutputManager,
) -> Result<()> {
    let notifications = ctx.app.notifications();
    match command {
        NotificationCommands::List { viewer } => {
            let list = notifications.list(&viewer).await?;
            let unread = list.iter().filter(|n| !n.read).count();
            output.heading(&format!("Notifications ({unread} unread)"));
            output.display(&NotificationRows(list))?;
        }
        NotificationCommands::Read { viewer } => {
            let marked = notifications.mark_all_read(&viewer).await?;
            output.success(&format!("Marked {marked} notifications as read"));
        }
    }
    Ok(())
}
