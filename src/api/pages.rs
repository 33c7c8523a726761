//! Page payloads.
//!
//! Every dashboard page answers with the shared props (app info, settings,
//! current user, sidebar) next to its own data.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use super::middleware::CurrentUser;
use super::AppState;
use crate::errors::AppResult;
use domain::{AppSetting, MenuNode, UserResponse};

#[derive(Debug, Serialize, ToSchema)]
pub struct AppInfo {
    pub env: String,
    pub locale: String,
}

/// Props shared by every dashboard page
#[derive(Debug, Serialize, ToSchema)]
pub struct SharedProps {
    pub app: AppInfo,
    pub settings: AppSetting,
    pub user: UserResponse,
    pub permissions: Vec<String>,
    pub sidebar: Vec<MenuNode>,
}

impl SharedProps {
    pub async fn load(state: &AppState, current_user: &CurrentUser) -> AppResult<Self> {
        let settings = state.services.settings.current().await?;
        let sidebar = state.services.menus.sidebar(&current_user.access).await?;

        Ok(Self {
            app: AppInfo {
                env: state.config.app_env.clone(),
                locale: state.config.app_locale.clone(),
            },
            settings,
            user: UserResponse::from(&current_user.user),
            permissions: current_user.access.permissions.iter().cloned().collect(),
            sidebar,
        })
    }
}

/// Named page with its data
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub component: &'static str,
    pub props: SharedProps,
    pub data: T,
}

impl<T: Serialize> Page<T> {
    pub async fn render(
        state: &AppState,
        current_user: &CurrentUser,
        component: &'static str,
        data: T,
    ) -> AppResult<Self> {
        Ok(Self {
            component,
            props: SharedProps::load(state, current_user).await?,
            data,
        })
    }
}

impl<T: Serialize> IntoResponse for Page<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
