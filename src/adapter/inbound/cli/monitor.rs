//! Monitor lifecycle commands.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tabled::{Table, Tabled};

use super::command::{CheckArgs, GenerateArgs};
use super::output;
use crate::adapter::outbound::market_data::decode_series;
use crate::application::scheduler::SchedulerConfig;
use crate::application::synthesis::describe;
use crate::domain::{Monitor, MonitorId, OhlcvSeries, OwnerId};
use crate::error::Result;
use crate::port::inbound::control::{CheckOutcome, GenerateRequest, MonitorControl};
use crate::port::outbound::market_data::OhlcvSource;

#[derive(Tabled)]
struct MonitorRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Stock")]
    stock: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Triggers")]
    triggers: u64,
    #[tabled(rename = "Last Check")]
    last_check: String,
    #[tabled(rename = "Intent")]
    intent: String,
}

impl From<&Monitor> for MonitorRow {
    fn from(m: &Monitor) -> Self {
        Self {
            id: m.id().to_string(),
            stock: format!("{}({})", m.stock_name(), m.stock_code()),
            status: m.status().to_string(),
            triggers: m.trigger_count(),
            last_check: m
                .last_check_at()
                .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string()),
            intent: m.intent().to_string(),
        }
    }
}

/// Synthesize a draft and optionally activate it.
pub async fn generate(
    control: &dyn MonitorControl,
    owner: &OwnerId,
    args: GenerateArgs,
) -> Result<()> {
    let draft = control
        .generate(GenerateRequest {
            stock_name: args.name.unwrap_or_else(|| args.code.clone()),
            stock_code: args.code,
            intent: args.intent,
            dialect: args.dialect,
        })
        .await?;

    let id = if args.activate {
        Some(control.activate(owner, draft.clone()).await?)
    } else {
        None
    };

    if output::is_json() {
        output::json_output(json!({
            "command": "generate",
            "draft": draft,
            "monitor_id": id,
        }));
        return Ok(());
    }

    output::section(&format!("{}({})", draft.stock_name, draft.stock_code));
    output::field("Combine", draft.combine.as_str());
    for condition in &draft.conditions {
        output::field("Condition", describe(condition));
    }
    output::section(&format!("Script ({})", draft.dialect));
    output::lines(&draft.script_text);
    if let Some(id) = id {
        output::success(&format!("Monitor {id} is active"));
    }
    Ok(())
}

pub async fn list(control: &dyn MonitorControl, owner: &OwnerId) -> Result<()> {
    let monitors = control.list_monitors(owner).await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "list",
            "monitors": monitors,
        }));
        return Ok(());
    }

    if monitors.is_empty() {
        output::warning(&format!("No monitors for {owner}"));
        return Ok(());
    }
    let rows: Vec<MonitorRow> = monitors.iter().map(MonitorRow::from).collect();
    output::lines(&Table::new(rows).to_string());
    Ok(())
}

/// Evaluate a monitor against bars from a file or the configured source.
pub async fn check(
    control: &dyn MonitorControl,
    source: &Arc<dyn OhlcvSource>,
    scheduler: &SchedulerConfig,
    args: CheckArgs,
) -> Result<()> {
    let id = MonitorId::from(args.id);
    let series = match &args.bars {
        Some(path) => read_series(path)?,
        None => {
            let monitor = control.get_monitor(&id).await?;
            source
                .fetch(monitor.stock_code(), scheduler.period, scheduler.bars)
                .await?
        }
    };

    let outcome = control.check(&id, series).await?;
    print_outcome(&outcome);
    Ok(())
}

fn read_series(path: &Path) -> Result<OhlcvSeries> {
    let bytes = std::fs::read(path)?;
    decode_series(&bytes, usize::MAX)
}

fn print_outcome(outcome: &CheckOutcome) {
    if output::is_json() {
        output::json_output(json!({
            "command": "check",
            "outcome": outcome,
        }));
        return;
    }

    let result = &outcome.result;
    output::section(&format!("Check {}", outcome.monitor_id));
    output::field("Triggered", result.triggered);
    output::field("Latest price", format!("{:.2}", result.latest_price));
    output::field("Bar time", result.evaluated_at.format("%Y-%m-%d %H:%M"));
    output::field("Trigger count", outcome.trigger_count);
    for alert in &result.alerts {
        output::field(alert.kind.key(), &alert.message);
    }
    if result.triggered && !outcome.counted {
        output::warning("Same bar already triggered; not counted again");
    }
    if let Some(report) = &outcome.delivery {
        for channel in &report.channels {
            match &channel.reason {
                None => output::success(&format!("{} delivered", channel.channel)),
                Some(reason) => output::warning(&format!("{}: {reason}", channel.channel)),
            }
        }
    }
}

pub async fn deactivate(control: &dyn MonitorControl, id: String) -> Result<()> {
    let id = MonitorId::from(id);
    control.deactivate(&id).await?;
    report("deactivate", &id, "stopped");
    Ok(())
}

pub async fn rearm(control: &dyn MonitorControl, id: String) -> Result<()> {
    let id = MonitorId::from(id);
    control.rearm(&id).await?;
    report("rearm", &id, "active again");
    Ok(())
}

pub async fn delete(control: &dyn MonitorControl, id: String) -> Result<()> {
    let id = MonitorId::from(id);
    control.delete(&id).await?;
    report("delete", &id, "deleted");
    Ok(())
}

fn report(command: &str, id: &MonitorId, what: &str) {
    if output::is_json() {
        output::json_output(json!({ "command": command, "monitor_id": id }));
    } else {
        output::success(&format!("Monitor {id} {what}"));
    }
}
