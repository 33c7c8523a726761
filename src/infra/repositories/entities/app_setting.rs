//! Singleton settings row.

use sea_orm::entity::prelude::*;

use domain::{AppSetting, SocialLinks};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "app_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub app_name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub app_description: Option<String>,
    pub logo_path: Option<String>,
    pub favicon_path: Option<String>,
    pub seo_title: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub seo_description: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub seo_keywords: Option<String>,
    pub primary_color: String,
    pub secondary_color: String,
    pub accent_color: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub address: Option<String>,
    pub social_links: Json,
    pub maintenance_mode: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub maintenance_message: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for AppSetting {
    fn from(model: Model) -> Self {
        // Malformed links read as empty.
        let social_links: SocialLinks =
            serde_json::from_value(model.social_links).unwrap_or_default();

        AppSetting {
            id: model.id,
            app_name: model.app_name,
            app_description: model.app_description,
            logo_path: model.logo_path,
            favicon_path: model.favicon_path,
            seo_title: model.seo_title,
            seo_description: model.seo_description,
            seo_keywords: model.seo_keywords,
            primary_color: model.primary_color,
            secondary_color: model.secondary_color,
            accent_color: model.accent_color,
            contact_email: model.contact_email,
            contact_phone: model.contact_phone,
            address: model.address,
            social_links,
            maintenance_mode: model.maintenance_mode,
            maintenance_message: model.maintenance_message,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
