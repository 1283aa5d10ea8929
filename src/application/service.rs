//! [`MonitorControl`] implementation wiring synthesis, registry, scheduler
//! and dispatcher together.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use super::dispatch::Dispatcher;
use super::registry::MonitorRegistry;
use super::scheduler::Scheduler;
use super::settings_cache::SettingsCache;
use super::synthesis::Synthesizer;
use crate::domain::{
    ChannelKind, ChannelReport, Monitor, MonitorDraft, MonitorId, MonitorStatus,
    NotificationRecord, NotificationSettings, OhlcvSeries, OwnerId, ScriptDialect,
};
use crate::error::Result;
use crate::port::inbound::control::{
    CheckOutcome, ConditionTemplate, GenerateRequest, MonitorControl,
};

/// The control surface behind the CLI and any other front end.
///
/// Explicit checks go through the scheduler so that they share its
/// per-monitor in-flight lock with recurring checks.
pub struct MonitorService {
    synthesizer: Arc<Synthesizer>,
    registry: Arc<MonitorRegistry>,
    scheduler: Arc<Scheduler>,
    dispatcher: Arc<Dispatcher>,
    settings: Arc<SettingsCache>,
}

impl MonitorService {
    /// Assemble the service from already-wired components. The scheduler
    /// must share `registry`, `dispatcher` and `settings`.
    #[must_use]
    pub fn new(
        synthesizer: Arc<Synthesizer>,
        registry: Arc<MonitorRegistry>,
        scheduler: Arc<Scheduler>,
        dispatcher: Arc<Dispatcher>,
        settings: Arc<SettingsCache>,
    ) -> Self {
        Self {
            synthesizer,
            registry,
            scheduler,
            dispatcher,
            settings,
        }
    }

    /// Scheduler driving recurring checks.
    #[must_use]
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Registry holding every monitor.
    #[must_use]
    pub fn registry(&self) -> &Arc<MonitorRegistry> {
        &self.registry
    }
}

#[async_trait]
impl MonitorControl for MonitorService {
    async fn generate(&self, request: GenerateRequest) -> Result<MonitorDraft> {
        self.synthesizer.generate(&request).await
    }

    async fn activate(&self, owner: &OwnerId, draft: MonitorDraft) -> Result<MonitorId> {
        let monitor = Monitor::from_draft(draft, owner.clone(), Utc::now())?;
        let id = self.registry.create(&monitor).await?;
        self.registry.set_status(&id, MonitorStatus::Active).await?;
        Ok(id)
    }

    async fn check(&self, id: &MonitorId, series: OhlcvSeries) -> Result<CheckOutcome> {
        self.scheduler.check(id, series).await
    }

    async fn deactivate(&self, id: &MonitorId) -> Result<()> {
        self.registry.set_status(id, MonitorStatus::Stopped).await?;
        Ok(())
    }

    async fn rearm(&self, id: &MonitorId) -> Result<()> {
        self.registry.set_status(id, MonitorStatus::Active).await?;
        Ok(())
    }

    async fn delete(&self, id: &MonitorId) -> Result<()> {
        self.registry.delete(id).await?;
        self.scheduler.forget(id);
        let dropped = self.dispatcher.history().forget_monitor(id);
        if dropped > 0 {
            info!(monitor_id = %id, records = dropped, "Notification history dropped");
        }
        Ok(())
    }

    async fn get_monitor(&self, id: &MonitorId) -> Result<Monitor> {
        self.registry.get(id).await
    }

    async fn list_monitors(&self, owner: &OwnerId) -> Result<Vec<Monitor>> {
        self.registry.list(Some(owner)).await
    }

    async fn notification_settings(&self, owner: &OwnerId) -> Result<NotificationSettings> {
        self.settings.get(owner).await
    }

    async fn set_notification_settings(
        &self,
        owner: &OwnerId,
        settings: NotificationSettings,
    ) -> Result<()> {
        self.settings.put(owner, settings).await?;
        info!(owner = %owner, "Notification settings updated");
        Ok(())
    }

    fn notification_history(&self, owner: &OwnerId, limit: usize) -> Vec<NotificationRecord> {
        self.dispatcher.history().list(owner, limit)
    }

    fn clear_notification_history(&self, owner: &OwnerId) -> usize {
        self.dispatcher.history().clear(owner)
    }

    async fn send_test_notification(
        &self,
        owner: &OwnerId,
        channel: ChannelKind,
    ) -> Result<ChannelReport> {
        let settings = self.settings.get(owner).await?;
        Ok(self
            .dispatcher
            .send_test(owner, channel, &settings, Utc::now())
            .await)
    }

    fn templates(&self) -> Vec<ConditionTemplate> {
        self.synthesizer.templates()
    }

    fn dialects(&self) -> Vec<ScriptDialect> {
        ScriptDialect::ALL.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::engine::Engine;

    #[tokio::test]
    async fn activate_persists_active_monitor() {
        let engine = Engine::new();
        let owner = OwnerId::from("u");
        let draft = engine
            .service
            .generate(GenerateRequest {
                stock_code: "600519".into(),
                stock_name: "贵州茅台".into(),
                intent: "金叉时通知我".into(),
                dialect: None,
            })
            .await
            .unwrap();

        let id = engine.service.activate(&owner, draft).await.unwrap();
        let monitor = engine.service.get_monitor(&id).await.unwrap();
        assert_eq!(monitor.status(), MonitorStatus::Active);
        assert_eq!(monitor.owner(), &owner);
        assert_eq!(engine.service.list_monitors(&owner).await.unwrap().len(), 1);
        assert!(engine
            .service
            .list_monitors(&OwnerId::from("other"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn rearm_and_deactivate() {
        let engine = Engine::new();
        let id = engine.active_monitor("u", "600519").await;

        // active -> active is not in the transition table
        assert!(engine.service.rearm(&id).await.unwrap_err().is_conflict());

        engine
            .service
            .check(&id, crate::testkit::bars::golden_cross())
            .await
            .unwrap();
        engine.service.rearm(&id).await.unwrap();
        assert_eq!(
            engine.service.get_monitor(&id).await.unwrap().status(),
            MonitorStatus::Active
        );

        engine.service.deactivate(&id).await.unwrap();
        engine.service.deactivate(&id).await.unwrap();
        assert!(engine.service.rearm(&id).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn delete_drops_monitor_history() {
        let engine = Engine::new();
        let owner = OwnerId::from("u");
        let id = engine.active_monitor("u", "600519").await;
        engine
            .service
            .check(&id, crate::testkit::bars::golden_cross())
            .await
            .unwrap();
        assert_eq!(engine.service.notification_history(&owner, 10).len(), 1);

        engine.service.delete(&id).await.unwrap();
        assert!(engine.service.notification_history(&owner, 10).is_empty());
        assert!(engine.service.get_monitor(&id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_notification_respects_channel_flags() {
        let engine = Engine::new();
        let owner = OwnerId::from("u");

        let report = engine
            .service
            .send_test_notification(&owner, ChannelKind::Email)
            .await
            .unwrap();
        assert!(!report.attempted);

        let report = engine
            .service
            .send_test_notification(&owner, ChannelKind::Browser)
            .await
            .unwrap();
        assert!(report.delivered);
        assert_eq!(engine.browser.count(), 1);
    }

    #[test]
    fn lists_dialects_and_templates() {
        let engine = Engine::new();
        assert_eq!(
            engine.service.dialects(),
            vec![ScriptDialect::Python, ScriptDialect::PineScript]
        );
        assert!(engine.service.templates().len() >= 6);
    }
}
