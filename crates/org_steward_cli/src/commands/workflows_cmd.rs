use std::path::PathBuf;

use chrono::Utc;
use clap::Subcommand;
use org_steward_core::workflows;
use tracing::instrument;

use super::{cutoff_from_days, output_path, write_workbook, Context};
use crate::errors::Error;

#[derive(Subcommand, Debug)]
pub enum WorkflowsCommands {
    /// Report which repositories use Actions and which workflows still run
    Audit {
        /// A workflow is active when it ran within this many days
        #[arg(long, default_value_t = 180)]
        days: u32,

        /// Directory receiving the report sheets
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[instrument(skip(ctx))]
pub async fn execute(cmd: &WorkflowsCommands, ctx: &Context) -> Result<(), Error> {
    match cmd {
        WorkflowsCommands::Audit { days, output } => {
            let cutoff = cutoff_from_days(*days, Utc::now());
            let session = ctx.session().await?;
            let workbook =
                workflows::workflow_audit(&session.client, ctx.org()?, cutoff, ctx.workers).await?;
            write_workbook(&workbook, &output_path(output.clone(), "workflow_audit", ""))
        }
    }
}
