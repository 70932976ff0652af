use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Table};
use serde::Serialize;
use snapshare::Post;

use super::{format_time, truncate};
use crate::{
    context::CliContext,
    examples::ExampleGroup,
    output::{OutputManager, TableDisplay},
    theme::ICONS,
};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Posts",
    commands: &[
        "snapshare feed                        # Newest posts first",
        "snapshare feed --limit 5",
        "snapshare feed --user <uid>           # One user's posts",
    ],
}];

#[derive(Args)]
pub struct FeedArgs {
    /// Maximum number of posts
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// Only posts by this user id
    #[arg(long)]
    pub user: Option<String>,
}

#[derive(Serialize)]
#[serde(transparent)]
struct PostRows(Vec<Post>);

impl TableDisplay for PostRows {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table(&["Id", "Author", "Caption", ICONS.heart, "Posted"]);
        for post in &self.0 {
            table.add_row(vec![
                Cell::new(&post.id),
                Cell::new(format!("@{}", post.user.username)),
                Cell::new(truncate(&post.caption, 40)),
                Cell::new(post.likes.len()),
                Cell::new(format_time(&post.created_at)),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.0
            .iter()
            .map(|post| format!("{} @{} {}", post.id, post.user.username, post.image_url))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub async fn handle_feed(args: FeedArgs, ctx: &CliContext, output: &OutputManager) -> Result<()> {
    let feed = ctx.app.feed();
    let posts = match &args.user {
        Some(uid) => {
            let mut posts = feed.profile_posts(uid).await?;
            posts.truncate(args.limit);
            posts
        }
        None => feed.home_feed(Some(args.limit)).await?,
    };
    if posts.is_empty() {
        output.info("No posts yet");
        return Ok(());
    }
    output.heading("Feed");
    output.display(&PostRows(posts))
}
