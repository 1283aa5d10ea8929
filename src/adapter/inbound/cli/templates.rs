//! Condition template listing.

use serde_json::json;
use tabled::{Table, Tabled};

use super::output;
use crate::port::inbound::control::MonitorControl;

#[derive(Tabled)]
struct TemplateRow {
    #[tabled(rename = "Indicator")]
    indicator: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Keywords")]
    keywords: String,
    #[tabled(rename = "Example")]
    example: String,
}

pub fn list(control: &dyn MonitorControl) {
    let templates = control.templates();
    let dialects = control.dialects();

    if output::is_json() {
        output::json_output(json!({
            "command": "templates",
            "templates": templates,
            "dialects": dialects,
        }));
        return;
    }

    output::section("Condition templates");
    let rows: Vec<TemplateRow> = templates
        .iter()
        .map(|t| TemplateRow {
            indicator: t.indicator.to_string(),
            name: t.name.clone(),
            keywords: t.keywords.join(" / "),
            example: t.example_intent.clone(),
        })
        .collect();
    output::lines(&Table::new(rows).to_string());

    let dialects: Vec<&str> = dialects.iter().map(|d| d.as_str()).collect();
    output::field("Dialects", dialects.join(", "));
}
