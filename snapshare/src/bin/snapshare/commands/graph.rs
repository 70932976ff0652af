use anyhow::Result;
use clap::Subcommand;
use comfy_table::{Cell, Table};
use serde::Serialize;
use snapshare::services::{EdgeRepair, GraphAsymmetry, MissingSide};

use crate::{
    context::CliContext,
    examples::ExampleGroup,
    output::{OutputManager, TableDisplay},
};

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Follow Edges",
        commands: &[
            "snapshare graph follow --as <uid> <target>     # Follow and notify the target",
            "snapshare graph unfollow --as <uid> <target>",
        ],
    },
    ExampleGroup {
        title: "Consistency",
        commands: &[
            "snapshare graph audit                         # List one-sided follow edges",
            "snapshare graph repair                        # Write the missing halves",
        ],
    },
];

#[derive(Subcommand)]
pub enum GraphCommands {
    /// Follow a user
    Follow {
        /// Acting user id
        #[arg(long = "as")]
        actor: String,
        target: String,
    },

    /// Unfollow a user
    Unfollow {
        #[arg(long = "as")]
        actor: String,
        target: String,
    },

    /// Report follow edges recorded on one side only
    Audit,

    /// Complete one-sided follow edges
    Repair,
}

#[derive(Serialize)]
struct EdgeRow {
    follower: String,
    followee: String,
    missing: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    repaired: Option<bool>,
}

impl EdgeRow {
    fn new(asymmetry: &GraphAsymmetry, repaired: Option<bool>) -> Self {
        Self {
            follower: asymmetry.follower.clone(),
            followee: asymmetry.followee.clone(),
            missing: match asymmetry.missing {
                MissingSide::Followers => "followers",
                MissingSide::Following => "following",
            },
            repaired,
        }
    }
}

#[derive(Serialize)]
#[serde(transparent)]
struct EdgeRows(Vec<EdgeRow>);

impl TableDisplay for EdgeRows {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table(&["Follower", "Followee", "Missing in", "Repaired"]);
        for row in &self.0 {
            table.add_row(vec![
                Cell::new(&row.follower),
                Cell::new(&row.followee),
                Cell::new(row.missing),
                Cell::new(match row.repaired {
                    Some(true) => "yes",
                    Some(false) => "failed",
                    None => "-",
                }),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.0
            .iter()
            .map(|row| format!("{} -> {} missing:{}", row.follower, row.followee, row.missing))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub async fn handle_graph_commands(command: GraphCommands, ctx: &CliContext, output: &OutputManager) -> Result<()> {
    let graph = ctx.app.graph();
    match command {
        GraphCommands::Follow { actor, target } => {
            graph.follow(&actor, &target).await?;
            output.success(&format!("{actor} now follows {target}"));
        }
        GraphCommands::Unfollow { actor, target } => {
            graph.unfollow(&actor, &target).await?;
            output.success(&format!("{actor} no longer follows {target}"));
        }
        GraphCommands::Audit => {
            let found = graph.audit().await?;
            if found.is_empty() {
                output.success("All follow edges are recorded on both sides");
                return Ok(());
            }
            output.warning(&format!("{} one-sided follow edges", found.len()));
            let rows = found.iter().map(|asymmetry| EdgeRow::new(asymmetry, None)).collect();
            output.display(&EdgeRows(rows))?;
        }
        GraphCommands::Repair => {
            let repairs = graph.repair().await?;
            let rows = repairs
                .iter()
                .map(|repair| EdgeRow::new(&repair.asymmetry, Some(repair.repaired)))
                .collect::<Vec<_>>();
            if !rows.is_empty() {
                output.display(&EdgeRows(rows))?;
            }
            ensure_all_repaired(&repairs)?;
            output.success(&format!("Repaired {} edges", repairs.len()));
        }
    }
    Ok(())
}

/// Fails the command when any edge stayed one-sided, so scripts see a non-zero exit.
fn ensure_all_repaired(repairs: &[EdgeRepair]) -> Result<()> {
    let failed = repairs.iter().filter(|repair| !repair.repaired).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} edges could not be repaired", repairs.len());
    }
    Ok(())
}
