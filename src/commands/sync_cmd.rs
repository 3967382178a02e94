//! Sync CLI commands for synchronizing with the remote store.

use chrono::DateTime;
use clap::{Args, Subcommand};

use dietsync_core::remote::check_server;
use dietsync_core::sync::{
    ConflictView, Decision, LoginOutcome, PushOutcome, Resolution, ResolveOutcome,
};

use super::CommandError;
use crate::config::Config;
use crate::sync::{connect, Engine};

/// Sync with the remote store
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Resolve an open conflict: "remote" takes the server copy, "local" keeps this one
    #[arg(long, value_name = "SIDE")]
    resolve: Option<Resolution>,

    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Debug, Subcommand)]
enum SyncSubcommand {
    /// Show sync configuration, server status and local sync metadata
    Status,
}

impl SyncCommand {
    pub async fn run(&self, engine: &Engine, config: &Config) -> Result<(), CommandError> {
        match &self.command {
            None => self.sync(engine, config).await,
            Some(SyncSubcommand::Status) => {
                status(engine, config).await;
                Ok(())
            }
        }
    }

    async fn sync(&self, engine: &Engine, config: &Config) -> Result<(), CommandError> {
        if !config.sync.is_configured() {
            return Err(CommandError::SyncNotConfigured);
        }

        println!("Syncing with server...");
        let outcome = connect(engine, config).await.ok_or_else(|| {
            CommandError::Unreachable(config.sync.server_url.clone().unwrap_or_default())
        })?;

        match &outcome {
            LoginOutcome::FetchFailed => return Err(CommandError::FetchFailed),
            LoginOutcome::Initialized => println!("  ✓ uploaded local diet state (first sync)"),
            LoginOutcome::InitializeFailed => println!("  ✗ first upload failed"),
            LoginOutcome::Reconciled(decision) => println!("  {}", describe(decision)),
            LoginOutcome::AlreadyActive | LoginOutcome::Cancelled => {}
        }

        if let Some(view) = engine.conflict() {
            match self.resolve {
                Some(resolution) => resolve(engine, resolution).await,
                None => {
                    print_conflict(&view);
                    return Ok(());
                }
            }
        } else if self.resolve.is_some() {
            println!("  No conflict to resolve.");
        }

        match engine.flush().await {
            PushOutcome::Pushed => println!("  ✓ pushed local changes"),
            PushOutcome::Failed => println!("  ✗ push failed, changes stay pending"),
            PushOutcome::Suppressed | PushOutcome::Skipped => {}
        }

        println!();
        if engine.metadata().has_unsynced_changes() {
            println!("Local changes are still pending.");
        } else {
            println!("Sync complete.");
        }
        Ok(())
    }
}

async fn resolve(engine: &Engine, resolution: Resolution) {
    match engine.resolve(resolution).await {
        ResolveOutcome::UsedRemote => println!("  ✓ conflict resolved: using the server copy"),
        ResolveOutcome::KeptLocal { pushed: true } => {
            println!("  ✓ conflict resolved: kept this device's copy")
        }
        ResolveOutcome::KeptLocal { pushed: false } => {
            println!("  ✗ kept this device's copy but the upload failed, it will be retried")
        }
        ResolveOutcome::NoConflict => println!("  No conflict to resolve."),
    }
}

async fn status(engine: &Engine, config: &Config) {
    println!("Sync Configuration");
    println!("==================");
    println!();

    match (&config.sync.server_url, &config.sync.api_key) {
        (Some(server_url), Some(api_key)) => {
            println!("Server:    {}", server_url);
            let key_prefix: String = api_key.chars().take(8).collect();
            println!("API Key:   {}...", key_prefix);
            println!("User:      {}", config.user_id.value);
            println!(
                "Auto-sync: {}",
                if config.sync.auto_sync {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            println!("Debounce:  {} ms", config.sync.debounce().as_millis());
            println!();

            print!("Server status: ");
            if check_server(server_url).await {
                println!("✓ reachable");
            } else {
                println!("✗ unreachable");
            }
        }
        _ => {
            println!("Status: Not configured");
            println!();
            println!("To enable sync, add to your config file:");
            println!();
            println!("  user_id: \"your-user-id\"");
            println!("  sync:");
            println!("    server_url: \"http://localhost:8080\"");
            println!("    api_key: \"your-api-key\"");
            println!("    auto_sync: false");
            println!();
            println!("Or set environment variables:");
            println!("  DIETSYNC_SYNC_URL");
            println!("  DIETSYNC_SYNC_API_KEY");
            println!("  DIETSYNC_SYNC_DEBOUNCE_MS (optional)");
        }
    }

    let meta = engine.metadata();
    println!();
    println!("Local modified:   {}", format_ms(meta.local_modified_at_ms));
    println!("Last synced:      {}", format_ms(meta.last_synced_at_ms));
    println!(
        "Remote modified:  {}",
        meta.last_known_remote_modified_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never seen".to_string())
    );
    println!(
        "Pending changes:  {}",
        if meta.has_unsynced_changes() {
            "yes"
        } else {
            "no"
        }
    );
}

fn describe(decision: &Decision) -> &'static str {
    match decision {
        Decision::InSync => "✓ up to date",
        Decision::AdoptRemote(_) => "✓ updated from server",
        Decision::PushLocal => "✓ local changes are newer",
        Decision::Conflict(_) => "✗ conflict",
        Decision::Unchanged => "✓ nothing to do",
    }
}

fn format_ms(ms: i64) -> String {
    if ms <= 0 {
        return "never".to_string();
    }
    DateTime::from_timestamp_millis(ms)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}

fn print_conflict(view: &ConflictView) {
    println!();
    println!("Conflict: this device and the server both changed since the last sync.");
    println!();
    println!("{:<12}  {:<30}  REMOTE", "", "LOCAL");
    println!(
        "{:<12}  {:<30}  {}",
        "modified",
        format_ms(view.local_updated_at_ms),
        view.remote_updated_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string())
    );
    for (local, remote) in view.local.diets().iter().zip(view.remote.diets()) {
        let left = format!("{} ({} entries)", local.name, local.meal_entries.len());
        let right = format!("{} ({} entries)", remote.name, remote.meal_entries.len());
        println!("{:<12}  {:<30}  {}", local.id, left, right);
    }
    println!(
        "{:<12}  {:<30}  {}",
        "favorites",
        view.local.favorites.len(),
        view.remote.favorites.len()
    );
    let left = format!("{} ml", view.local.hydration_goal);
    println!(
        "{:<12}  {:<30}  {} ml",
        "hydration", left, view.remote.hydration_goal
    );
    println!();
    println!("Local changes stay on this device until you choose:");
    println!("  dietsync sync --resolve remote   use the server copy");
    println!("  dietsync sync --resolve local    keep this device's copy");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ms() {
        assert_eq!(format_ms(0), "never");
        assert!(format_ms(1_700_000_000_000).starts_with("2023-11-14"));
    }

    #[test]
    fn test_describe_decisions() {
        assert_eq!(describe(&Decision::InSync), "✓ up to date");
        assert_eq!(describe(&Decision::PushLocal), "✓ local changes are newer");
    }
}
