//! Application settings singleton.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::ActivityService;
use crate::errors::AppResult;
use crate::infra::repositories::SettingsRepository;
use domain::settings::is_hex_color;
use domain::{AppSetting, FieldErrors, NewActivity, SocialLinks, ACTION_UPDATED};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Every editable column of the settings row
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsInput {
    pub app_name: String,
    pub app_description: Option<String>,
    pub logo_path: Option<String>,
    pub favicon_path: Option<String>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
    pub primary_color: String,
    pub secondary_color: String,
    pub accent_color: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub social_links: SocialLinks,
    pub maintenance_mode: bool,
    pub maintenance_message: Option<String>,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SettingsService: Send + Sync {
    /// The settings row, created with defaults on first access
    async fn current(&self) -> AppResult<AppSetting>;

    async fn update(&self, input: SettingsInput, actor: Uuid) -> AppResult<AppSetting>;
}

pub struct SettingsManager {
    repo: Arc<dyn SettingsRepository>,
    activity: Arc<dyn ActivityService>,
}

impl SettingsManager {
    pub fn new(repo: Arc<dyn SettingsRepository>, activity: Arc<dyn ActivityService>) -> Self {
        Self { repo, activity }
    }
}

fn check_colors(input: &SettingsInput) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    for (field, value) in [
        ("primary_color", &input.primary_color),
        ("secondary_color", &input.secondary_color),
        ("accent_color", &input.accent_color),
    ] {
        if !is_hex_color(value) {
            errors.add(
                field,
                format!("The {} must be a valid hex color.", field.replace('_', " ")),
            );
        }
    }
    Ok(errors.into_result()?)
}

#[async_trait]
impl SettingsService for SettingsManager {
    async fn current(&self) -> AppResult<AppSetting> {
        if let Some(settings) = self.repo.get().await? {
            return Ok(settings);
        }
        tracing::info!("No settings row found, creating defaults");
        self.repo.insert(AppSetting::defaults()).await
    }

    async fn update(&self, input: SettingsInput, actor: Uuid) -> AppResult<AppSetting> {
        check_colors(&input)?;
        let current = self.current().await?;

        let maintenance_toggled = current.maintenance_mode != input.maintenance_mode;
        let updated = self
            .repo
            .update(AppSetting {
                id: current.id,
                app_name: input.app_name,
                app_description: input.app_description,
                logo_path: input.logo_path,
                favicon_path: input.favicon_path,
                seo_title: input.seo_title,
                seo_description: input.seo_description,
                seo_keywords: input.seo_keywords,
                primary_color: input.primary_color,
                secondary_color: input.secondary_color,
                accent_color: input.accent_color,
                contact_email: input.contact_email,
                contact_phone: input.contact_phone,
                address: input.address,
                social_links: input.social_links,
                maintenance_mode: input.maintenance_mode,
                maintenance_message: input.maintenance_message,
                created_at: current.created_at,
                updated_at: Utc::now(),
            })
            .await?;

        if maintenance_toggled {
            tracing::warn!(enabled = updated.maintenance_mode, "Maintenance mode changed");
        }

        self.activity
            .record(
                NewActivity::new("app_setting", ACTION_UPDATED)
                    .by(Some(actor))
                    .on(updated.id)
                    .describe("Updated application settings"),
            )
            .await;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::infra::repositories::MockSettingsRepository;
    use crate::services::MockActivityService;

    fn input() -> SettingsInput {
        SettingsInput {
            app_name: "Plant Ops".into(),
            app_description: None,
            logo_path: None,
            favicon_path: None,
            seo_title: None,
            seo_description: None,
            seo_keywords: None,
            primary_color: "#112233".into(),
            secondary_color: "#aabbcc".into(),
            accent_color: "#FFAA00".into(),
            contact_email: None,
            contact_phone: None,
            address: None,
            social_links: SocialLinks::default(),
            maintenance_mode: false,
            maintenance_message: None,
        }
    }

    fn quiet_activity() -> Arc<MockActivityService> {
        let mut activity = MockActivityService::new();
        activity.expect_record().returning(|_| ());
        Arc::new(activity)
    }

    #[tokio::test]
    async fn test_first_read_creates_defaults() {
        let mut repo = MockSettingsRepository::new();
        repo.expect_get().returning(|| Ok(None));
        repo.expect_insert()
            .times(1)
            .returning(|settings| Ok(settings));

        let settings = SettingsManager::new(Arc::new(repo), quiet_activity())
            .current()
            .await
            .unwrap();
        assert_eq!(settings.app_name, AppSetting::DEFAULT_APP_NAME);
    }

    #[tokio::test]
    async fn test_update_keeps_row_identity() {
        let existing = AppSetting::defaults();
        let id = existing.id;

        let mut repo = MockSettingsRepository::new();
        repo.expect_get()
            .returning(move || Ok(Some(existing.clone())));
        repo.expect_update()
            .withf(move |s| s.id == id && s.app_name == "Plant Ops")
            .returning(|s| Ok(s));

        let updated = SettingsManager::new(Arc::new(repo), quiet_activity())
            .update(input(), Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(updated.id, id);
    }

    #[tokio::test]
    async fn test_bad_colour_is_rejected_per_field() {
        let mut repo = MockSettingsRepository::new();
        repo.expect_update().never();

        let mut bad = input();
        bad.accent_color = "orange".into();
        bad.primary_color = "#12345".into();

        let err = SettingsManager::new(Arc::new(repo), quiet_activity())
            .update(bad, Uuid::new_v4())
            .await
            .unwrap_err();

        match err {
            AppError::Validation(fields) => {
                assert!(fields.contains("accent_color"));
                assert!(fields.contains("primary_color"));
                assert!(!fields.contains("secondary_color"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
