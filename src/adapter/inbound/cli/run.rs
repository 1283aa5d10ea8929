//! Handler for the `run` command.

use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tracing::{info, warn};

use super::output;
use crate::adapter::outbound::notifier::BrowserNotification;
use crate::error::Result;
use crate::infrastructure::bootstrap::Runtime;
use crate::infrastructure::config::Config;

/// Start the scheduler and print browser notifications until Ctrl-C.
pub async fn execute(runtime: Runtime, config: &Config) -> Result<()> {
    print_startup(config);

    let printer = tokio::spawn(print_notifications(runtime.browser.subscribe()));
    let handle = runtime.scheduler.clone().start();

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    handle.shutdown().await;
    printer.abort();
    output::success("Scheduler stopped");
    Ok(())
}

fn print_startup(config: &Config) {
    if output::is_json() {
        return;
    }
    output::section(&format!("stockwatch {}", env!("CARGO_PKG_VERSION")));
    output::field("Database", &config.database);
    output::field("Interval", format!("{}s", config.scheduler.interval_secs));
    output::field("Period", config.scheduler.period);
    output::field(
        "Email relay",
        config
            .notifications
            .email
            .relay_url
            .as_deref()
            .unwrap_or("not configured"),
    );
    output::success("Watching active monitors (Ctrl-C to stop)");
}

async fn print_notifications(mut rx: Receiver<BrowserNotification>) {
    loop {
        match rx.recv().await {
            Ok(notification) => {
                if output::is_json() {
                    output::json_output(json!({ "notification": notification }));
                } else {
                    output::section(&notification.title);
                    output::lines(&notification.body);
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Notification printer fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
