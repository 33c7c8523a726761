//! Application settings handlers.

use axum::{extract::State, response::Json};
use serde::{Deserialize, Deserializer};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::{permission, Authorized};
use crate::api::pages::Page;
use crate::api::AppState;
use crate::errors::AppResult;
use crate::services::SettingsInput;
use crate::types::ApiResponse;
use domain::settings::is_hex_color;
use domain::{AppSetting, SocialLinks};

fn hex_color(value: &str) -> Result<(), ValidationError> {
    if is_hex_color(value) {
        Ok(())
    } else {
        Err(ValidationError::new("hex_color"))
    }
}

/// Empty form inputs arrive as `""`; treat them as absent.
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct SocialLinksRequest {
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(url(message = "The link must be a valid URL."))]
    pub facebook: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(url(message = "The link must be a valid URL."))]
    pub twitter: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(url(message = "The link must be a valid URL."))]
    pub instagram: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(url(message = "The link must be a valid URL."))]
    pub linkedin: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(url(message = "The link must be a valid URL."))]
    pub youtube: Option<String>,
}

impl From<SocialLinksRequest> for SocialLinks {
    fn from(req: SocialLinksRequest) -> Self {
        SocialLinks {
            facebook: req.facebook,
            twitter: req.twitter,
            instagram: req.instagram,
            linkedin: req.linkedin,
            youtube: req.youtube,
        }
    }
}

/// Full replacement of the settings row; colours are checked as `#RRGGBB`
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SettingsRequest {
    #[validate(length(min = 1, max = 255, message = "The app name must be between 1 and 255 characters."))]
    pub app_name: String,
    pub app_description: Option<String>,
    #[validate(length(max = 255, message = "The logo path may not be greater than 255 characters."))]
    pub logo_path: Option<String>,
    #[validate(length(max = 255, message = "The favicon path may not be greater than 255 characters."))]
    pub favicon_path: Option<String>,
    #[validate(length(max = 255, message = "The SEO title may not be greater than 255 characters."))]
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
    #[validate(custom(
        function = "hex_color",
        message = "The primary color must be a valid hex color."
    ))]
    #[schema(example = "#1D4ED8")]
    pub primary_color: String,
    #[validate(custom(
        function = "hex_color",
        message = "The secondary color must be a valid hex color."
    ))]
    #[schema(example = "#64748B")]
    pub secondary_color: String,
    #[validate(custom(
        function = "hex_color",
        message = "The accent color must be a valid hex color."
    ))]
    #[schema(example = "#F59E0B")]
    pub accent_color: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(email(message = "The contact email must be a valid email address."))]
    pub contact_email: Option<String>,
    #[validate(length(max = 50, message = "The contact phone may not be greater than 50 characters."))]
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub social_links: SocialLinksRequest,
    #[serde(default)]
    pub maintenance_mode: bool,
    pub maintenance_message: Option<String>,
}

impl From<SettingsRequest> for SettingsInput {
    fn from(req: SettingsRequest) -> Self {
        SettingsInput {
            app_name: req.app_name,
            app_description: req.app_description,
            logo_path: req.logo_path,
            favicon_path: req.favicon_path,
            seo_title: req.seo_title,
            seo_description: req.seo_description,
            seo_keywords: req.seo_keywords,
            primary_color: req.primary_color,
            secondary_color: req.secondary_color,
            accent_color: req.accent_color,
            contact_email: req.contact_email,
            contact_phone: req.contact_phone,
            address: req.address,
            social_links: req.social_links.into(),
            maintenance_mode: req.maintenance_mode,
            maintenance_message: req.maintenance_message,
        }
    }
}

#[utoipa::path(get, path = "/dashboard/settings", tag = "Settings",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Settings form", body = AppSetting),
        (status = 403, description = "Forbidden")))]
pub async fn edit(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageSettings>,
) -> AppResult<Page<AppSetting>> {
    let settings = state.services.settings.current().await?;
    Page::render(&state, &current_user, "Settings/Edit", settings).await
}

#[utoipa::path(put, path = "/dashboard/settings", tag = "Settings",
    security(("bearer_auth" = [])), request_body = SettingsRequest,
    responses((status = 200, description = "Settings saved", body = AppSetting),
        (status = 422, description = "Validation error")))]
pub async fn update(
    State(state): State<AppState>,
    Authorized(current_user, _): Authorized<permission::ManageSettings>,
    ValidatedJson(payload): ValidatedJson<SettingsRequest>,
) -> AppResult<Json<ApiResponse<AppSetting>>> {
    let settings = state
        .services
        .settings
        .update(payload.into(), current_user.id())
        .await?;
    Ok(Json(ApiResponse::with_message(settings, "Settings saved.")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_social_link_is_keyed_under_social_links() {
        let req: SettingsRequest = serde_json::from_value(serde_json::json!({
            "app_name": "Ops",
            "primary_color": "#000000",
            "secondary_color": "#111111",
            "accent_color": "#222222",
            "social_links": {"twitter": "not a url"}
        }))
        .unwrap();
        let fields = crate::api::extractors::validation_fields(&req.validate().unwrap_err());
        assert_eq!(
            fields.get("social_links.twitter").map(|m| m[0].as_str()),
            Some("The link must be a valid URL.")
        );
    }

    #[test]
    fn test_blank_links_are_dropped_and_colors_checked() {
        let req: SettingsRequest = serde_json::from_value(serde_json::json!({
            "app_name": "Ops",
            "primary_color": "#000000",
            "secondary_color": "#fff",
            "accent_color": "#222222",
            "contact_email": "",
            "social_links": {"facebook": "", "youtube": "https://youtube.com/@ops"}
        }))
        .unwrap();
        assert_eq!(req.social_links.facebook, None);
        assert_eq!(req.contact_email, None);

        let fields = crate::api::extractors::validation_fields(&req.validate().unwrap_err());
        assert_eq!(
            fields.get("secondary_color").map(|m| m[0].as_str()),
            Some("The secondary color must be a valid hex color.")
        );
        assert!(!fields.contains("primary_color"));
        assert!(!fields.contains("social_links.facebook"));
    }
}
