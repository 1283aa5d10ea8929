//! CLI module graph.

pub mod command;
pub mod monitor;
pub mod notify;
pub mod output;
pub mod run;
pub mod templates;

use crate::domain::OwnerId;
use crate::error::Result;
use crate::infrastructure::bootstrap::Runtime;
use crate::infrastructure::config::Config;

use command::{Cli, Commands, SettingsCommand};

/// Dispatch a parsed command against a built runtime.
///
/// # Errors
///
/// Returns the first error raised by the command.
pub async fn execute(cli: Cli, config: &Config, runtime: Runtime) -> Result<()> {
    if matches!(cli.command, Commands::Run) {
        return run::execute(runtime, config).await;
    }

    let owner = OwnerId::from(cli.owner);
    let control = runtime.service.as_ref();
    match cli.command {
        Commands::Run => Ok(()),
        Commands::Generate(args) => monitor::generate(control, &owner, args).await,
        Commands::List => monitor::list(control, &owner).await,
        Commands::Check(args) => {
            monitor::check(
                control,
                &runtime.source,
                runtime.scheduler.config(),
                args,
            )
            .await
        }
        Commands::Deactivate(arg) => monitor::deactivate(control, arg.id).await,
        Commands::Rearm(arg) => monitor::rearm(control, arg.id).await,
        Commands::Delete(arg) => monitor::delete(control, arg.id).await,
        Commands::Templates => {
            templates::list(control);
            Ok(())
        }
        Commands::Settings(SettingsCommand::Show) => notify::show_settings(control, &owner).await,
        Commands::History(args) => {
            notify::history(control, &owner, args.limit);
            Ok(())
        }
        Commands::NotifyTest(args) => notify::test(control, &owner, args.channel).await,
    }
}
