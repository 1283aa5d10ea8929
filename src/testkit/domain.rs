//! Builders for domain primitives used across tests.

use chrono::Utc;

use crate::application::synthesis::{render, ScriptContext};
use crate::domain::{
    CombineMode, Condition, Monitor, MonitorDraft, NotificationSettings, OwnerId, ScriptDialect,
};

/// Owner used by [`monitor`].
pub const TEST_OWNER: &str = "tester";

/// Golden-cross draft for `stock_code`, rendered in Python.
pub fn draft(stock_code: &str) -> MonitorDraft {
    draft_with(stock_code, vec![Condition::golden_cross(5, 10)], CombineMode::All)
}

/// Draft with explicit conditions.
pub fn draft_with(stock_code: &str, conditions: Vec<Condition>, combine: CombineMode) -> MonitorDraft {
    let script_text = render(
        ScriptDialect::Python,
        &ScriptContext {
            stock_code,
            stock_name: stock_code,
            intent: "金叉时通知我",
            conditions: &conditions,
            combine,
        },
    );
    MonitorDraft {
        stock_code: stock_code.to_string(),
        stock_name: stock_code.to_string(),
        intent: "金叉时通知我".to_string(),
        dialect: ScriptDialect::Python,
        script_text,
        conditions,
        combine,
    }
}

/// Pending golden-cross monitor owned by [`TEST_OWNER`].
///
/// # Panics
///
/// Never for a non-empty `stock_code`.
pub fn monitor(stock_code: &str) -> Monitor {
    Monitor::from_draft(draft(stock_code), OwnerId::from(TEST_OWNER), Utc::now())
        .expect("golden cross draft is valid")
}

/// Defaults with the email channel on and an address set.
pub fn settings_with_email(address: &str) -> NotificationSettings {
    NotificationSettings {
        email_enabled: true,
        email_address: Some(address.to_string()),
        ..NotificationSettings::default()
    }
}
