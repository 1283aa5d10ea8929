//! Notification settings, history and test delivery.

use serde_json::json;
use tabled::{Table, Tabled};

use super::output;
use crate::domain::{ChannelKind, OwnerId};
use crate::error::Result;
use crate::port::inbound::control::MonitorControl;

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Delivered")]
    delivered: String,
}

pub async fn show_settings(control: &dyn MonitorControl, owner: &OwnerId) -> Result<()> {
    let settings = control.notification_settings(owner).await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "settings.show",
            "owner": owner,
            "settings": settings,
        }));
        return Ok(());
    }

    output::section(&format!("Notification settings for {owner}"));
    output::field("Browser", on_off(settings.browser_enabled));
    output::field("Email", on_off(settings.email_enabled));
    output::field("Email address", settings.email_address().unwrap_or("-"));
    let quiet = settings.quiet_hours().map_or_else(
        || "none".to_string(),
        |q| format!("{}-{}", q.start.format("%H:%M"), q.end.format("%H:%M")),
    );
    output::field("Quiet hours", quiet);
    output::field("UTC offset (min)", settings.utc_offset_minutes);
    let disabled: Vec<&str> = settings
        .notification_types
        .iter()
        .filter(|(_, enabled)| !**enabled)
        .map(|(kind, _)| kind.as_str())
        .collect();
    if !disabled.is_empty() {
        output::field("Muted kinds", disabled.join(", "));
    }
    Ok(())
}

pub fn history(control: &dyn MonitorControl, owner: &OwnerId, limit: usize) {
    let records = control.notification_history(owner, limit);

    if output::is_json() {
        output::json_output(json!({
            "command": "history",
            "records": records,
        }));
        return;
    }

    if records.is_empty() {
        output::warning("No notifications in this session");
        return;
    }
    let rows: Vec<HistoryRow> = records
        .iter()
        .map(|r| HistoryRow {
            time: r.message.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            title: r.message.title.clone(),
            delivered: r
                .report
                .channels
                .iter()
                .filter(|c| c.delivered)
                .map(|c| c.channel.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();
    output::lines(&Table::new(rows).to_string());
}

pub async fn test(
    control: &dyn MonitorControl,
    owner: &OwnerId,
    channel: ChannelKind,
) -> Result<()> {
    let report = control.send_test_notification(owner, channel).await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "notify-test",
            "report": report,
        }));
        return Ok(());
    }

    match &report.reason {
        None => output::success(&format!("Test notification delivered over {channel}")),
        Some(reason) => output::warning(&format!("{channel}: {reason}")),
    }
    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
