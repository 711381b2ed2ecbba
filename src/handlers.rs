use std::time::Duration;

use axum::{Json, extract::Query, extract::State, response::IntoResponse};
use axum_extra::extract::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use chrono::Local;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    AppState,
    auth::verify_token,
    dates::format_request_date,
    error::ApiError,
    models::{AnnouncementsPage, DaySchedule, ScheduleOption},
};

#[derive(Debug, serde::Deserialize)]
pub struct GroupScheduleQuery {
    #[serde(default)]
    pub group: String,
    pub date: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct TeacherScheduleQuery {
    #[serde(default)]
    pub teacher: String,
    pub date: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct AnnouncementsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    pub token: Option<String>,
}

fn default_page() -> u32 {
    1
}

/// Cancels its token once the request has taken too long.
struct Deadline {
    token: CancellationToken,
    timer: JoinHandle<()>,
}

impl Deadline {
    fn start(timeout: Duration) -> Self {
        let token = CancellationToken::new();
        let timer = tokio::spawn({
            let token = token.clone();
            async move {
                tokio::time::sleep(timeout).await;
                token.cancel();
            }
        });
        Self { token, timer }
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

fn requested_date(date: Option<String>) -> String {
    date.unwrap_or_else(|| format_request_date(Local::now().date_naive()))
}

#[utoipa::path(get, path = "/", tag = "schedule")]
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "HMTPK Schedule API",
        "endpoints": {
            "/schedule/group": "Weekly schedule of a student group",
            "/schedule/teacher": "Weekly schedule of a teacher",
            "/options/groups": "Selectable groups",
            "/options/teachers": "Selectable teachers",
            "/announcements": "Press-center announcements"
        }
    }))
}

#[utoipa::path(get, path = "/healthz/live", tag = "schedule")]
pub async fn healthz_live() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(get, path = "/healthz/ready", tag = "schedule")]
pub async fn healthz_ready() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(
    get,
    path = "/schedule/group",
    params(
        ("group" = String, Query, description = "Group identifier from /options/groups"),
        ("date" = Option<String>, Query, description = "Any day of the week, dd.mm.yyyy (defaults to today)"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Seven days of lessons", body = [DaySchedule]),
        (status = 400, description = "Missing group or malformed date"),
        (status = 401, description = "Invalid authentication token"),
        (status = 502, description = "hmtpk.ru did not respond successfully"),
        (status = 504, description = "hmtpk.ru took too long")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "schedule"
)]
pub async fn get_group_schedule(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    Query(query): Query<GroupScheduleQuery>,
) -> Result<Json<Vec<DaySchedule>>, ApiError> {
    let auth_header = auth.map(|TypedHeader(a)| a);
    verify_token(&state.settings, auth_header, query.token.as_deref())?;

    let date = requested_date(query.date);
    let deadline = Deadline::start(state.settings.request_timeout());
    let week = state
        .scraper
        .schedule_by_group(&query.group, &date, &deadline.token)
        .await?;
    Ok(Json(week))
}

#[utoipa::path(
    get,
    path = "/schedule/teacher",
    params(
        ("teacher" = String, Query, description = "Teacher name from /options/teachers"),
        ("date" = Option<String>, Query, description = "Any day of the week, dd.mm.yyyy (defaults to today)"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Seven days of lessons", body = [DaySchedule]),
        (status = 400, description = "Missing teacher or malformed date"),
        (status = 401, description = "Invalid authentication token"),
        (status = 502, description = "hmtpk.ru did not respond successfully"),
        (status = 504, description = "hmtpk.ru took too long")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "schedule"
)]
pub async fn get_teacher_schedule(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    Query(query): Query<TeacherScheduleQuery>,
) -> Result<Json<Vec<DaySchedule>>, ApiError> {
    let auth_header = auth.map(|TypedHeader(a)| a);
    verify_token(&state.settings, auth_header, query.token.as_deref())?;

    let date = requested_date(query.date);
    let deadline = Deadline::start(state.settings.request_timeout());
    let week = state
        .scraper
        .schedule_by_teacher(&query.teacher, &date, &deadline.token)
        .await?;
    Ok(Json(week))
}

#[utoipa::path(
    get,
    path = "/options/groups",
    params(
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Selectable groups", body = [ScheduleOption]),
        (status = 401, description = "Invalid authentication token"),
        (status = 502, description = "hmtpk.ru did not respond successfully"),
        (status = 504, description = "hmtpk.ru took too long")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "schedule"
)]
pub async fn get_group_options(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<Vec<ScheduleOption>>, ApiError> {
    let auth_header = auth.map(|TypedHeader(a)| a);
    verify_token(&state.settings, auth_header, query.token.as_deref())?;

    let deadline = Deadline::start(state.settings.request_timeout());
    let options = state.scraper.group_options(&deadline.token).await?;
    Ok(Json(options))
}

#[utoipa::path(
    get,
    path = "/options/teachers",
    params(
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Selectable teachers", body = [ScheduleOption]),
        (status = 401, description = "Invalid authentication token"),
        (status = 502, description = "hmtpk.ru did not respond successfully"),
        (status = 504, description = "hmtpk.ru took too long")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "schedule"
)]
pub async fn get_teacher_options(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<Vec<ScheduleOption>>, ApiError> {
    let auth_header = auth.map(|TypedHeader(a)| a);
    verify_token(&state.settings, auth_header, query.token.as_deref())?;

    let deadline = Deadline::start(state.settings.request_timeout());
    let options = state.scraper.teacher_options(&deadline.token).await?;
    Ok(Json(options))
}

#[utoipa::path(
    get,
    path = "/announcements",
    params(
        ("page" = Option<u32>, Query, description = "Listing page, starting at 1"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Announcements on the page", body = AnnouncementsPage),
        (status = 400, description = "Page is not positive"),
        (status = 401, description = "Invalid authentication token"),
        (status = 502, description = "hmtpk.ru did not respond successfully"),
        (status = 504, description = "hmtpk.ru took too long")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "announcements"
)]
pub async fn get_announcements(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    Query(query): Query<AnnouncementsQuery>,
) -> Result<Json<AnnouncementsPage>, ApiError> {
    let auth_header = auth.map(|TypedHeader(a)| a);
    verify_token(&state.settings, auth_header, query.token.as_deref())?;

    let deadline = Deadline::start(state.settings.request_timeout());
    let page = state
        .scraper
        .announcements(query.page, &deadline.token)
        .await?;
    Ok(Json(page))
}
