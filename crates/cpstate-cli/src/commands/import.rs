//! Import command: restores an exported state into a live control plane

use crate::progress::SpinnerProgress;
use clap::Args;
use colored::Colorize;
use cpstate_client::{
    ClusterConfig, HttpControlPlane, DEFAULT_ENGINE_DEPLOYMENT, DEFAULT_ENGINE_NAMESPACE,
    DEFAULT_SERVER,
};
use cpstate_core::LiveSystem;
use cpstate_import::{
    ControlPlaneStateImporter, ImportOptions, ImportReport, WaitSettings, DEFAULT_INPUT_ARCHIVE,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Args, Debug)]
pub struct ImportCommand {
    /// Exported state archive to import
    #[arg(short, long, default_value = DEFAULT_INPUT_ARCHIVE, env = "CPSTATE_INPUT")]
    pub input: PathBuf,

    /// Unpause managed resources once the import is done. This activates the
    /// imported control plane.
    #[arg(long, env = "CPSTATE_UNPAUSE_AFTER_IMPORT")]
    pub unpause_after_import: bool,

    /// Import even if the target does not match the exported environment
    #[arg(long, env = "CPSTATE_SKIP_PREFLIGHT_CHECKS")]
    pub skip_preflight_checks: bool,

    /// Seconds between readiness polls
    #[arg(long, default_value_t = 5, env = "CPSTATE_POLL_INTERVAL")]
    pub poll_interval: u64,

    /// Seconds to wait for a kind to become ready before failing
    #[arg(long, default_value_t = 600, env = "CPSTATE_WAIT_TIMEOUT")]
    pub wait_timeout: u64,

    /// Do not wait for package revisions to become healthy
    #[arg(long, env = "CPSTATE_NO_LEGACY_REVISION_WAIT")]
    pub no_legacy_revision_wait: bool,

    /// Print the import report as JSON
    #[arg(long)]
    pub json: bool,

    /// API server URL of the target control plane
    #[arg(long, default_value = DEFAULT_SERVER, env = "CPSTATE_SERVER")]
    pub server: String,

    /// Bearer token for the API server
    #[arg(long, env = "CPSTATE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// PEM file with the certificate authority of the API server
    #[arg(long, env = "CPSTATE_CERTIFICATE_AUTHORITY")]
    pub certificate_authority: Option<PathBuf>,

    /// Skip TLS certificate verification
    #[arg(long, env = "CPSTATE_INSECURE_SKIP_TLS_VERIFY")]
    pub insecure_skip_tls_verify: bool,

    /// Namespace of the engine deployment
    #[arg(long, default_value = DEFAULT_ENGINE_NAMESPACE, env = "CPSTATE_ENGINE_NAMESPACE")]
    pub engine_namespace: String,

    /// Name of the engine deployment
    #[arg(long, default_value = DEFAULT_ENGINE_DEPLOYMENT, env = "CPSTATE_ENGINE_DEPLOYMENT")]
    pub engine_deployment: String,
}

impl ImportCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        info!("Importing control plane state from {:?}", self.input);

        let plane = HttpControlPlane::new(&self.cluster_config())
            .map_err(|e| anyhow::anyhow!("Failed to create control plane client: {}", e))?;
        let live = LiveSystem::from_control_plane(Arc::new(plane));

        let mut importer = ControlPlaneStateImporter::new(live, self.import_options())
            .with_progress(Arc::new(SpinnerProgress));

        let rt = tokio::runtime::Runtime::new()?;
        let cancel = CancellationToken::new();

        let report = rt.block_on(async {
            let ctrl_c_token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, stopping import");
                    ctrl_c_token.cancel();
                }
            });

            if self.skip_preflight_checks {
                debug!("Skipping preflight checks");
            } else {
                let issues = importer.preflight_checks(&cancel).await;
                if !issues.is_empty() {
                    eprintln!("{}", "Preflight checks failed:".bright_red().bold());
                    for issue in &issues {
                        eprintln!("  {} {}", "-".bright_red(), issue);
                    }
                    eprintln!(
                        "{}",
                        "Use --skip-preflight-checks to import anyway.".bright_black()
                    );
                    anyhow::bail!("{} preflight check(s) failed", issues.len());
                }
            }

            importer
                .import(&cancel)
                .await
                .map_err(|e| anyhow::anyhow!("Import failed: {}", e))
        })?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report, self.unpause_after_import);
        }
        Ok(())
    }

    fn cluster_config(&self) -> ClusterConfig {
        ClusterConfig {
            server: self.server.clone(),
            token: self.token.clone(),
            certificate_authority: self.certificate_authority.clone(),
            insecure_skip_tls_verify: self.insecure_skip_tls_verify,
            engine_namespace: self.engine_namespace.clone(),
            engine_deployment: self.engine_deployment.clone(),
            ..ClusterConfig::default()
        }
    }

    fn import_options(&self) -> ImportOptions {
        ImportOptions {
            input_archive: self.input.clone(),
            unpause_after_import: self.unpause_after_import,
            legacy_revision_wait: !self.no_legacy_revision_wait,
            wait: WaitSettings {
                poll_interval_secs: self.poll_interval,
                timeout_secs: self.wait_timeout,
            },
        }
    }
}

fn print_report(report: &ImportReport, unpaused_managed: bool) {
    println!();
    println!(
        "{} {}",
        "Successfully imported control plane state!".bright_green().bold(),
        format!("({} resources)", report.total()).bright_white()
    );
    println!();

    let groups = report
        .base
        .iter()
        .chain(report.remaining.iter())
        .filter(|(_, count)| **count > 0);
    for (group, count) in groups {
        println!("  {:<60} {}", group.bright_white(), count.to_string().bright_cyan());
    }

    if !unpaused_managed {
        println!();
        println!(
            "{}",
            "Managed resources are still paused. Re-run with --unpause-after-import or remove the pause annotation to activate the control plane."
                .yellow()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        import: ImportCommand,
    }

    fn parse(args: &[&str]) -> ImportCommand {
        let mut argv = vec!["cpstate"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap().import
    }

    #[test]
    fn test_defaults() {
        let cmd = parse(&[]);
        let options = cmd.import_options();
        assert_eq!(options, ImportOptions::default());

        let config = cmd.cluster_config();
        assert_eq!(config.server, DEFAULT_SERVER);
        assert_eq!(config.engine_namespace, DEFAULT_ENGINE_NAMESPACE);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_flags_map_to_options() {
        let cmd = parse(&[
            "-i",
            "/tmp/state.tar.gz",
            "--unpause-after-import",
            "--poll-interval",
            "2",
            "--wait-timeout",
            "30",
            "--no-legacy-revision-wait",
            "--server",
            "https://cp.example.io:6443",
            "--token",
            "abc",
            "--insecure-skip-tls-verify",
        ]);

        let options = cmd.import_options();
        assert_eq!(options.input_archive, PathBuf::from("/tmp/state.tar.gz"));
        assert!(options.unpause_after_import);
        assert!(!options.legacy_revision_wait);
        assert_eq!(options.wait.poll_interval_secs, 2);
        assert_eq!(options.wait.timeout_secs, 30);

        let config = cmd.cluster_config();
        assert_eq!(config.server, "https://cp.example.io:6443");
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert!(config.insecure_skip_tls_verify);
    }
}
