//! Exchange-agnostic domain types for condition monitoring.

pub mod bar;
pub mod condition;
pub mod error;
pub mod evaluation;
pub mod id;
pub mod indicator;
pub mod monitor;
pub mod notification;

pub use bar::{Bar, BarPeriod, OhlcvSeries};
pub use condition::{CombineMode, Comparator, Condition, CrossDirection, IndicatorKind};
pub use evaluation::{Alert, AlertKind, EvaluationResult, Severity};
pub use id::{MonitorId, OwnerId};
pub use monitor::{Monitor, MonitorDraft, MonitorStatus, ScriptDialect};
pub use notification::{
    ChannelKind, ChannelReport, DeliveryReason, DeliveryReport, NotificationMessage,
    NotificationRecord, NotificationSettings, QuietHours,
};
