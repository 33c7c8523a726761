//! Application settings row.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};

use super::entities::app_setting::{self, ActiveModel, Entity as SettingEntity};
use crate::errors::{AppError, AppResult};
use domain::AppSetting;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// The settings row, if one was ever written
    async fn get(&self) -> AppResult<Option<AppSetting>>;

    async fn insert(&self, settings: AppSetting) -> AppResult<AppSetting>;

    /// Overwrite every column of the existing row
    async fn update(&self, settings: AppSetting) -> AppResult<AppSetting>;
}

pub struct SettingsStore {
    db: DatabaseConnection,
}

impl SettingsStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn social_links_json(settings: &AppSetting) -> AppResult<serde_json::Value> {
    serde_json::to_value(&settings.social_links)
        .map_err(|e| AppError::internal(format!("social links encoding: {}", e)))
}

#[async_trait]
impl SettingsRepository for SettingsStore {
    async fn get(&self) -> AppResult<Option<AppSetting>> {
        // Oldest row wins should a second one ever slip in.
        Ok(SettingEntity::find()
            .order_by_asc(app_setting::Column::CreatedAt)
            .one(&self.db)
            .await?
            .map(AppSetting::from))
    }

    async fn insert(&self, settings: AppSetting) -> AppResult<AppSetting> {
        let social_links = social_links_json(&settings)?;
        let model = ActiveModel {
            id: Set(settings.id),
            app_name: Set(settings.app_name),
            app_description: Set(settings.app_description),
            logo_path: Set(settings.logo_path),
            favicon_path: Set(settings.favicon_path),
            seo_title: Set(settings.seo_title),
            seo_description: Set(settings.seo_description),
            seo_keywords: Set(settings.seo_keywords),
            primary_color: Set(settings.primary_color),
            secondary_color: Set(settings.secondary_color),
            accent_color: Set(settings.accent_color),
            contact_email: Set(settings.contact_email),
            contact_phone: Set(settings.contact_phone),
            address: Set(settings.address),
            social_links: Set(social_links),
            maintenance_mode: Set(settings.maintenance_mode),
            maintenance_message: Set(settings.maintenance_message),
            created_at: Set(settings.created_at),
            updated_at: Set(settings.updated_at),
        }
        .insert(&self.db)
        .await?;

        Ok(AppSetting::from(model))
    }

    async fn update(&self, settings: AppSetting) -> AppResult<AppSetting> {
        let model = SettingEntity::find_by_id(settings.id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        let social_links = social_links_json(&settings)?;

        let mut active: ActiveModel = model.into();
        active.app_name = Set(settings.app_name);
        active.app_description = Set(settings.app_description);
        active.logo_path = Set(settings.logo_path);
        active.favicon_path = Set(settings.favicon_path);
        active.seo_title = Set(settings.seo_title);
        active.seo_description = Set(settings.seo_description);
        active.seo_keywords = Set(settings.seo_keywords);
        active.primary_color = Set(settings.primary_color);
        active.secondary_color = Set(settings.secondary_color);
        active.accent_color = Set(settings.accent_color);
        active.contact_email = Set(settings.contact_email);
        active.contact_phone = Set(settings.contact_phone);
        active.address = Set(settings.address);
        active.social_links = Set(social_links);
        active.maintenance_mode = Set(settings.maintenance_mode);
        active.maintenance_message = Set(settings.maintenance_message);
        active.updated_at = Set(Utc::now());

        Ok(AppSetting::from(active.update(&self.db).await?))
    }
}
