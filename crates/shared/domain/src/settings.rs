//! Application settings singleton.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Social profile links, stored as a JSON object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SocialLinks {
    pub facebook: Option<String>,
    pub twitter: Option<String>,
    pub instagram: Option<String>,
    pub linkedin: Option<String>,
    pub youtube: Option<String>,
}

/// The single persisted configuration row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AppSetting {
    pub id: Uuid,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppSetting {
    pub const DEFAULT_APP_NAME: &'static str = "Back Office";
    pub const DEFAULT_PRIMARY_COLOR: &'static str = "#1D4ED8";
    pub const DEFAULT_SECONDARY_COLOR: &'static str = "#64748B";
    pub const DEFAULT_ACCENT_COLOR: &'static str = "#F59E0B";
    pub const DEFAULT_MAINTENANCE_MESSAGE: &'static str =
        "We are performing scheduled maintenance. Please check back soon.";

    /// Row created the first time settings are read.
    pub fn defaults() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            app_name: Self::DEFAULT_APP_NAME.to_string(),
            app_description: None,
            logo_path: None,
            favicon_path: None,
            seo_title: None,
            seo_description: None,
            seo_keywords: None,
            primary_color: Self::DEFAULT_PRIMARY_COLOR.to_string(),
            secondary_color: Self::DEFAULT_SECONDARY_COLOR.to_string(),
            accent_color: Self::DEFAULT_ACCENT_COLOR.to_string(),
            contact_email: None,
            contact_phone: None,
            address: None,
            social_links: SocialLinks::default(),
            maintenance_mode: false,
            maintenance_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Message shown while maintenance mode is on.
    pub fn maintenance_notice(&self) -> &str {
        self.maintenance_message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(Self::DEFAULT_MAINTENANCE_MESSAGE)
    }
}

/// Subset exposed to unauthenticated pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PublicSettings {
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

impl From<AppSetting> for PublicSettings {
    fn from(s: AppSetting) -> Self {
        Self {
            app_name: s.app_name,
            app_description: s.app_description,
            logo_path: s.logo_path,
            favicon_path: s.favicon_path,
            seo_title: s.seo_title,
            seo_description: s.seo_description,
            seo_keywords: s.seo_keywords,
            primary_color: s.primary_color,
            secondary_color: s.secondary_color,
            accent_color: s.accent_color,
            contact_email: s.contact_email,
            contact_phone: s.contact_phone,
            address: s.address,
            social_links: s.social_links,
            maintenance_mode: s.maintenance_mode,
            maintenance_message: s.maintenance_message,
        }
    }
}

/// `#RRGGBB`, either case.
pub fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color() {
        assert!(is_hex_color("#1d4ed8"));
        assert!(is_hex_color("#ABCDEF"));
        assert!(!is_hex_color("1D4ED8"));
        assert!(!is_hex_color("#FFF"));
        assert!(!is_hex_color("#GGGGGG"));
        assert!(!is_hex_color("#1D4ED80"));
    }

    #[test]
    fn test_defaults_use_valid_colors() {
        let s = AppSetting::defaults();
        assert!(is_hex_color(&s.primary_color));
        assert!(is_hex_color(&s.secondary_color));
        assert!(is_hex_color(&s.accent_color));
        assert!(!s.maintenance_mode);
    }

    #[test]
    fn test_maintenance_notice_falls_back() {
        let mut s = AppSetting::defaults();
        assert_eq!(s.maintenance_notice(), AppSetting::DEFAULT_MAINTENANCE_MESSAGE);
        s.maintenance_message = Some("Back at noon".into());
        assert_eq!(s.maintenance_notice(), "Back at noon");
    }
}
