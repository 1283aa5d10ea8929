//! Command-line interface definitions.
//!
//! Every subcommand drives the engine through `MonitorControl`; `run` also
//! starts the recurring scheduler.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{ChannelKind, ScriptDialect};

/// Stock condition monitors with scheduled checks and notifications
#[derive(Parser, Debug)]
#[command(name = "stockwatch")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    /// Owner whose monitors and settings are used
    #[arg(long, global = true, default_value = "local")]
    pub owner: String,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scheduler in the foreground until Ctrl-C
    Run,

    /// Turn an intent into conditions and a script
    Generate(GenerateArgs),

    /// List monitors
    List,

    /// Evaluate a monitor now
    Check(CheckArgs),

    /// Stop a monitor
    Deactivate(MonitorArg),

    /// Move a triggered monitor back to active
    Rearm(MonitorArg),

    /// Delete a monitor
    Delete(MonitorArg),

    /// List supported condition templates and script dialects
    Templates,

    /// Notification settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Show recent notifications
    History(HistoryArgs),

    /// Send a test notification over one channel
    NotifyTest(NotifyTestArgs),
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Stock code, e.g. 600519
    #[arg(long)]
    pub code: String,

    /// Display name; defaults to the code
    #[arg(long)]
    pub name: Option<String>,

    /// What to watch for, e.g. "金叉时通知我"
    pub intent: String,

    /// Script dialect [python, pinescript]
    #[arg(long)]
    pub dialect: Option<ScriptDialect>,

    /// Persist and activate the generated monitor
    #[arg(long)]
    pub activate: bool,
}

#[derive(Args, Debug)]
pub struct MonitorArg {
    /// Monitor id
    pub id: String,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Monitor id
    pub id: String,

    /// Read bars from this JSON file instead of the configured source
    #[arg(long)]
    pub bars: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Display the owner's notification settings
    Show,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Maximum entries to show
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct NotifyTestArgs {
    /// Channel to test [browser, email]
    #[arg(long, default_value = "browser")]
    pub channel: ChannelKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_parses_intent_and_flags() {
        let cli = Cli::parse_from([
            "stockwatch",
            "--json",
            "generate",
            "--code",
            "600519",
            "--dialect",
            "pine",
            "--activate",
            "金叉时通知我",
        ]);
        assert!(cli.json);
        assert_eq!(cli.owner, "local");
        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.code, "600519");
                assert_eq!(args.intent, "金叉时通知我");
                assert_eq!(args.dialect, Some(ScriptDialect::PineScript));
                assert!(args.activate);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn notify_test_parses_channel() {
        let cli = Cli::parse_from(["stockwatch", "notify-test", "--channel", "email"]);
        match cli.command {
            Commands::NotifyTest(args) => assert_eq!(args.channel, ChannelKind::Email),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn unknown_channel_is_rejected() {
        assert!(Cli::try_parse_from(["stockwatch", "notify-test", "--channel", "sms"]).is_err());
    }
}
