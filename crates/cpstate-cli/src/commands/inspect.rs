//! Inspect command: summarizes an archive without contacting a control plane

use clap::Args;
use colored::Colorize;
use cpstate_import::{unarchive, StateSummary, DEFAULT_INPUT_ARCHIVE};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct InspectCommand {
    /// Exported state archive to inspect
    #[arg(short, long, default_value = DEFAULT_INPUT_ARCHIVE, env = "CPSTATE_INPUT")]
    pub input: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl InspectCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let state = unarchive(&self.input, &CancellationToken::new())
            .map_err(|e| anyhow::anyhow!("Failed to read {:?}: {}", self.input, e))?;
        let summary = state.summary()?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&summary_json(&summary))?);
        } else {
            print_summary(&summary);
        }
        Ok(())
    }
}

fn summary_json(summary: &StateSummary) -> serde_json::Value {
    serde_json::json!({
        "meta": summary.meta,
        "groups": summary.groups,
        "total": summary.total(),
    })
}

fn print_summary(summary: &StateSummary) {
    let meta = &summary.meta;

    println!("{}", "Exported control plane state".bright_white().bold());
    println!("  Engine version: {}", meta.engine_version.bright_cyan());
    if let Some(exported_at) = meta.exported_at {
        println!("  Exported at:    {}", exported_at.to_rfc3339());
    }
    if let Some(namespace) = &meta.namespace {
        println!("  Namespace:      {}", namespace);
    }
    if meta.feature_flags.is_empty() {
        println!("  Feature flags:  {}", "none".bright_black());
    } else {
        println!("  Feature flags:  {}", meta.feature_flags.join(", "));
    }

    println!();
    println!(
        "{} {}",
        "Resources".bright_white().bold(),
        format!("({} total)", summary.total()).bright_black()
    );
    for (group, count) in &summary.groups {
        println!("  {:<60} {}", group, count.to_string().bright_cyan());
    }
}
