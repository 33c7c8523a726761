//! Activity log pages and the live stream.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use futures::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;

use crate::api::middleware::CurrentUser;
use crate::api::pages::Page;
use crate::api::AppState;
use crate::errors::AppResult;
use crate::types::{DataTableRequest, DataTableResponse};
use domain::ActivityLog;

const RECENT_ON_PAGE: u64 = 20;

#[utoipa::path(get, path = "/admin/activity-logs", tag = "Admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Latest entries", body = Vec<ActivityLog>)))]
pub async fn index(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Page<Vec<ActivityLog>>> {
    let recent = state.services.activity.recent(RECENT_ON_PAGE).await?;
    Page::render(&state, &current_user, "Admin/ActivityLogs/Index", recent).await
}

#[utoipa::path(post, path = "/admin/activity-logs/json", tag = "Admin",
    security(("bearer_auth" = [])), request_body = DataTableRequest,
    responses((status = 200, description = "One draw of the activity table")))]
pub async fn datatable(
    State(state): State<AppState>,
    Json(req): Json<DataTableRequest>,
) -> AppResult<Json<DataTableResponse<ActivityLog>>> {
    Ok(Json(state.services.activity.datatable(&req).await?))
}

/// Server-Sent Events; each `activity` event carries one new entry
#[utoipa::path(get, path = "/admin/activity-logs/stream", tag = "Admin",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "text/event-stream of activity entries")))]
pub async fn stream(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!(user_id = %current_user.id(), "Activity stream opened");
    let receiver = state.services.activity.subscribe();

    let events = stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(entry) => match Event::default().event("activity").json_data(&entry) {
                    Ok(event) => return Some((Ok(event), receiver)),
                    Err(e) => tracing::warn!(error = %e, "Failed to encode activity event"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Activity subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
