use anyhow::{Result, bail};
use clap::Subcommand;
use comfy_table::{Cell, Table};
use serde::Serialize;
use snapshare::UserProfile;

use crate::{
    context::CliContext,
    examples::ExampleGroup,
    output::{OutputManager, TableDisplay},
};

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Browse Profiles",
        commands: &[
            "snapshare users list                  # All profiles, by username",
            "snapshare users show <uid>            # One profile with follower counts",
        ],
    },
    ExampleGroup {
        title: "Search",
        commands: &["snapshare users search ali           # Usernames starting with 'ali'"],
    },
];

#[derive(Subcommand)]
pub enum UserCommands {
    /// List every profile
    List,

    /// Show one profile
    Show {
        /// Profile id (identity uid)
        uid: String,
    },

    /// Search usernames by prefix
    Search {
        term: String,
    },
}

#[derive(Serialize)]
#[serde(transparent)]
struct ProfileRows(Vec<UserProfile>);

impl TableDisplay for ProfileRows {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table(&["Id", "Username", "Display name", "Followers", "Following", "Complete"]);
        for profile in &self.0 {
            table.add_row(vec![
                Cell::new(&profile.id),
                Cell::new(&profile.username),
                Cell::new(&profile.display_name),
                Cell::new(profile.followers.len()),
                Cell::new(profile.following.len()),
                Cell::new(if profile.is_profile_complete { "yes" } else { "no" }),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.0
            .iter()
            .map(|profile| format!("{} {}", profile.id, profile.username))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub async fn handle_user_commands(command: UserCommands, ctx: &CliContext, output: &OutputManager) -> Result<()> {
    match command {
        UserCommands::List => {
            let users = ctx.app.client().users();
            let mut profiles = users.find_many(&users.query()).await?;
            profiles.sort_by(|a, b| a.username.cmp(&b.username));
            output.heading(&format!("Profiles ({})", profiles.len()));
            output.display(&ProfileRows(profiles))?;
        }
        UserCommands::Show { uid } => {
            let Some(profile) = ctx.app.client().users().get(&uid).await? else {
                bail!("No profile with id '{uid}'");
            };
            if output.options.output_format != crate::output::OutputFormat::Table {
                return output.display(&ProfileRows(vec![profile]));
            }
            output.heading(&format!("@{}", profile.username));
            output.key_value("Id", &profile.id);
            output.key_value("Display name", &profile.display_name);
            output.key_value("Email", &profile.email);
            output.key_value("Bio", &profile.bio);
            output.key_value("Avatar", &profile.photo_url);
            output.key_value("Followers", &profile.followers.len().to_string());
            output.key_value("Following", &profile.following.len().to_string());
            if !profile.is_profile_complete {
                output.warning("Profile setup not finished");
            }
        }
        UserCommands::Search { term } => {
            let profiles = ctx.app.search().search_users(&term).await?;
            if profiles.is_empty() {
                output.info(&format!("No usernames start with '{}'", term.trim().to_lowercase()));
                return Ok(());
            }
            output.display(&ProfileRows(profiles))?;
        }
    }
    Ok(())
}
