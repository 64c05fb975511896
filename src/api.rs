use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::{
    api_error,
    channel_search::ChannelSearchClient,
    content_generator::ContentGenerator,
    dashboard::{AnalysisStep, QuizStatus, StudentSession, SummaryState, View},
    errors::{ApiError, ErrorContext, TransitionError},
    local_store::NotificationFlags,
    models::*,
    recommendation::{RecommendationAssembler, RecommendationSet},
    roster::Roster,
    ttl_cache::CacheStats,
    video_catalog,
    video_validator::VideoValidator,
};

use crate::{log_api_error, log_api_start, log_api_success, log_api_warn};

type ErrorResponse = (StatusCode, Json<ApiResponse<()>>);
type ApiResult<T> = Result<Json<ApiResponse<T>>, ErrorResponse>;

#[derive(Clone)]
pub struct AppState {
    pub roster: Arc<Roster>,
    pub generator: ContentGenerator,
    pub channel: ChannelSearchClient,
    pub validator: VideoValidator,
    pub assembler: RecommendationAssembler,
    pub notifications: NotificationFlags,
    pub sessions: Arc<Mutex<HashMap<Uuid, StudentSession>>>,
}

impl AppState {
    pub fn new(
        roster: Arc<Roster>,
        generator: ContentGenerator,
        channel: ChannelSearchClient,
        validator: VideoValidator,
        notifications: NotificationFlags,
    ) -> Self {
        let assembler = RecommendationAssembler::new(channel.clone(), validator.clone(), generator.clone());
        Self {
            roster,
            generator,
            channel,
            validator,
            assembler,
            notifications,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

// Request payloads

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "matricula")]
    pub registration: String,
    #[serde(alias = "senha")]
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub session_id: Uuid,
}

#[derive(Deserialize)]
pub struct AnalysisRequest {
    pub bimester: u8,
}

#[derive(Deserialize)]
pub struct ComparisonParams {
    pub first: Option<u8>,
    pub second: Option<u8>,
}

#[derive(Deserialize, Default)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub subjects: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRequest {
    pub video_id: String,
    pub difficulty: QuizDifficulty,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JustificationRequest {
    pub video_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateVideosRequest {
    #[serde(default)]
    pub videos: Vec<Video>,
    #[serde(default)]
    pub video_ids: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub issue_type: String,
    pub user_id: Option<String>,
}

#[derive(Deserialize)]
pub struct SubjectsParams {
    pub grade: Option<String>,
}

// Response payloads

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub ai_configured: bool,
    pub youtube_configured: bool,
    pub active_sessions: usize,
    pub validation_cache: CacheStats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub session_id: Uuid,
    pub student: Student,
    pub view: View,
    pub dashboard_key: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub analysis: AnalysisData,
    pub weak_subjects: Vec<String>,
    pub has_low_grades: bool,
    pub step: AnalysisStep,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JustificationResponse {
    pub video_id: String,
    pub justification: Option<String>,
    pub fallback: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoCheck {
    pub video_id: String,
    #[serde(flatten)]
    pub result: ValidationResult,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportReceipt {
    pub video_id: String,
    pub issue_type: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total: usize,
    pub by_issue_type: BTreeMap<String, usize>,
    pub reports: Vec<IssueReport>,
}

#[derive(Serialize)]
pub struct SubjectsResponse {
    pub catalog: Vec<&'static str>,
    pub channel: Vec<&'static str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStatus {
    pub key: String,
    pub seen: bool,
    pub first_time: bool,
}

fn session_context(operation: &str, id: Uuid) -> ErrorContext {
    ErrorContext::new(operation, "session").with_id(&id.to_string())
}

/// Run `f` against one session while holding the session lock. Never call
/// this across an `.await`.
fn with_session<T>(
    state: &AppState,
    id: Uuid,
    operation: &str,
    f: impl FnOnce(&mut StudentSession) -> Result<T, ApiError>,
) -> Result<T, ErrorResponse> {
    let mut sessions = state.sessions.lock().map_err(|_| {
        ApiError::InternalError("session store lock poisoned".to_string())
            .to_response_with_context(session_context(operation, id))
    })?;

    let session = sessions.get_mut(&id).ok_or_else(|| {
        log_api_warn!(operation, session_id = id, "unknown session");
        ApiError::NotFound(format!("Session '{}' not found", id))
            .to_response_with_context(session_context(operation, id))
    })?;

    f(session).map_err(|e| e.to_response_with_context(session_context(operation, id)))
}

fn parse_bimester(number: u8) -> Result<Bimester, ApiError> {
    Bimester::from_number(number)
        .ok_or_else(|| ApiError::ValidationError(format!("bimester must be between 1 and 4, got {}", number)))
}

/// A video from the session's recommendations, or from the static catalog
fn find_video(session: &StudentSession, video_id: &str) -> Option<Video> {
    session
        .dashboard
        .recommendations()
        .and_then(|set| set.videos.iter().find(|v| v.id == video_id).cloned())
        .or_else(|| video_catalog::find_by_id(video_id).cloned())
}

pub async fn health(State(state): State<AppState>) -> ApiResult<HealthStatus> {
    log_api_start!("health");

    let active_sessions = state.sessions.lock().map(|s| s.len()).unwrap_or_default();

    Ok(Json(ApiResponse::success(HealthStatus {
        status: "ok",
        ai_configured: state.generator.is_ai_configured(),
        youtube_configured: state.channel.is_configured(),
        active_sessions,
        validation_cache: state.validator.cache_stats().await,
    })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    log_api_start!("login");

    let student = match state.roster.login(&request.registration, &request.password) {
        Ok(student) => student.clone(),
        Err(e) => {
            let context = ErrorContext::new("login", "student").with_id(request.registration.trim());
            return Err(ApiError::from(e).to_response_with_context(context));
        }
    };

    let session = StudentSession::new(student);
    let response = LoginResponse {
        session_id: session.id,
        student: session.student.clone(),
        view: session.navigator.view(),
        dashboard_key: session.navigator.dashboard_key(),
    };

    let mut sessions = state.sessions.lock().map_err(|_| {
        ApiError::InternalError("session store lock poisoned".to_string()).to_response()
    })?;
    sessions.insert(session.id, session);

    log_api_success!("login", session_id = response.session_id, "student logged in");
    Ok(Json(ApiResponse::success(response)))
}

pub async fn logout(
    State(state): State<AppState>,
    Json(request): Json<LogoutRequest>,
) -> ApiResult<View> {
    let id = request.session_id;
    log_api_start!("logout", session_id = id);

    let removed = state
        .sessions
        .lock()
        .map_err(|_| ApiError::InternalError("session store lock poisoned".to_string()).to_response())?
        .remove(&id);

    match removed {
        Some(mut session) => {
            session.logout();
            log_api_success!("logout", session_id = id, "session closed");
            Ok(Json(ApiResponse::success(session.navigator.view())))
        }
        None => Err(api_error!(not_found, "logout", "session", &id.to_string())),
    }
}

pub async fn start_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AnalysisRequest>,
) -> ApiResult<AnalysisReport> {
    log_api_start!("start_analysis", session_id = id);

    let report = with_session(&state, id, "start_analysis", |session| {
        let bimester = parse_bimester(request.bimester)?;
        let analysis = state.roster.analyze(&session.student, bimester);

        session.dashboard.start_analysis(analysis.clone())?;
        session.selected_bimester = Some(bimester);

        Ok(AnalysisReport {
            weak_subjects: analysis.weak_subjects(DEFAULT_SUBJECT_PERFORMANCE_THRESHOLD),
            has_low_grades: analysis.has_low_grades(),
            analysis,
            step: session.dashboard.step(),
        })
    })?;

    log_api_success!("start_analysis", session_id = id, "analysis ready");
    Ok(Json(ApiResponse::success(report)))
}

pub async fn proceed_to_reinforcement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<AnalysisStep> {
    let step = with_session(&state, id, "proceed_to_reinforcement", |session| {
        session.dashboard.proceed_to_reinforcement()?;
        Ok(session.dashboard.step())
    })?;
    Ok(Json(ApiResponse::success(step)))
}

pub async fn back_to_selection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<AnalysisStep> {
    let step = with_session(&state, id, "back_to_selection", |session| {
        session.dashboard.back_to_selection();
        session.quiz.reset();
        Ok(session.dashboard.step())
    })?;
    Ok(Json(ApiResponse::success(step)))
}

/// Generates the summary on first request; later requests return the stored one
pub async fn get_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<SummaryState> {
    log_api_start!("get_summary", session_id = id);

    let (epoch, student, analysis, current) = with_session(&state, id, "get_summary", |session| {
        let analysis = session.dashboard.analysis().cloned().ok_or(TransitionError {
            action: "request a summary",
            from: session.dashboard.step().as_str(),
        })?;
        Ok((
            session.dashboard.epoch(),
            session.student.clone(),
            analysis,
            session.dashboard.summary().clone(),
        ))
    })?;

    if current != SummaryState::Loading {
        return Ok(Json(ApiResponse::success(current)));
    }

    let generated = state.generator.generate_performance_summary(&student, &analysis).await;
    let fallback = generated.is_fallback();

    let summary = with_session(&state, id, "get_summary", |session| {
        if !session.dashboard.apply_summary(epoch, generated.into_inner(), fallback) {
            log_api_warn!("get_summary", session_id = id, "analysis changed, summary dropped");
        }
        Ok(session.dashboard.summary().clone())
    })?;

    log_api_success!("get_summary", session_id = id, "summary ready");
    Ok(Json(ApiResponse::success(summary)))
}

pub async fn get_comparison(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<ComparisonParams>,
) -> ApiResult<BimesterComparison> {
    let comparison = with_session(&state, id, "get_comparison", |session| {
        let first = parse_bimester(params.first.unwrap_or(1))?;
        let second = parse_bimester(params.second.unwrap_or(2))?;
        Ok(state.roster.compare_bimesters(&session.student, first, second))
    })?;
    Ok(Json(ApiResponse::success(comparison)))
}

pub async fn get_recommendations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecommendationRequest>,
) -> ApiResult<RecommendationSet> {
    log_api_start!("get_recommendations", session_id = id);

    let (epoch, analysis) = with_session(&state, id, "get_recommendations", |session| {
        let step = session.dashboard.step();
        match (step, session.dashboard.analysis()) {
            (AnalysisStep::Reinforcement, Some(analysis)) => Ok((session.dashboard.epoch(), analysis.clone())),
            _ => Err(ApiError::InvalidState(TransitionError {
                action: "load recommendations",
                from: step.as_str(),
            })),
        }
    })?;

    let set = state.assembler.assemble(&analysis, &request.subjects).await;

    with_session(&state, id, "get_recommendations", |session| {
        if session.dashboard.apply_recommendations(epoch, set.clone()) {
            Ok(())
        } else {
            Err(ApiError::InvalidState(TransitionError {
                action: "apply recommendations",
                from: session.dashboard.step().as_str(),
            }))
        }
    })?;

    log_api_success!("get_recommendations", count = set.videos.len(), "recommendations ready");
    Ok(Json(ApiResponse::success(set)))
}

/// Starts a quiz for a video. A request superseded by a newer one keeps the
/// newer request's status.
pub async fn request_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<QuizRequest>,
) -> ApiResult<QuizStatus> {
    log_api_start!("request_quiz", session_id = id);

    let (ticket, video) = with_session(&state, id, "request_quiz", |session| {
        let video = find_video(session, &request.video_id)
            .ok_or_else(|| ApiError::NotFound(format!("Video '{}' not found", request.video_id)))?;
        let ticket = session.quiz.begin(&video.id, request.difficulty);
        Ok((ticket, video))
    })?;

    let generated = state
        .generator
        .generate_quiz_for_video(&video.title, &video.subject, request.difficulty)
        .await;
    let reason = generated.fallback_reason().map(str::to_string);

    let status = with_session(&state, id, "request_quiz", |session| {
        if !session.quiz.complete(ticket, generated.into_inner(), reason) {
            log_api_warn!("request_quiz", session_id = id, "newer quiz requested, result dropped");
        }
        Ok(session.quiz.status().clone())
    })?;

    Ok(Json(ApiResponse::success(status)))
}

pub async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<QuizStatus> {
    let status = with_session(&state, id, "get_quiz", |session| Ok(session.quiz.status().clone()))?;
    Ok(Json(ApiResponse::success(status)))
}

pub async fn request_justification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<JustificationRequest>,
) -> ApiResult<JustificationResponse> {
    log_api_start!("request_justification", session_id = id);

    let (ticket, video, analysis) = with_session(&state, id, "request_justification", |session| {
        let analysis = session.dashboard.analysis().cloned().ok_or(TransitionError {
            action: "justify a video",
            from: session.dashboard.step().as_str(),
        })?;
        let video = find_video(session, &request.video_id)
            .ok_or_else(|| ApiError::NotFound(format!("Video '{}' not found", request.video_id)))?;
        Ok((session.justification.select(&video.id), video, analysis))
    })?;

    let generated = state.generator.generate_video_justification(&video, &analysis).await;
    let fallback = generated.is_fallback();

    let justification = with_session(&state, id, "request_justification", |session| {
        if session.justification.complete(ticket, generated.into_inner()) {
            Ok(session.justification.text().map(str::to_string))
        } else {
            log_api_warn!("request_justification", session_id = id, "another video selected, result dropped");
            Ok(None)
        }
    })?;

    Ok(Json(ApiResponse::success(JustificationResponse {
        video_id: video.id,
        justification,
        fallback,
    })))
}

pub async fn validate_videos(
    State(state): State<AppState>,
    Json(request): Json<ValidateVideosRequest>,
) -> ApiResult<Vec<VideoCheck>> {
    log_api_start!("validate_videos");

    let mut videos = request.videos;
    for video_id in &request.video_ids {
        match video_catalog::find_by_id(video_id) {
            Some(video) => videos.push(video.clone()),
            None => return Err(api_error!(not_found, "validate_videos", "video", video_id)),
        }
    }

    if videos.is_empty() {
        return Err(api_error!(validation, "validate_videos", "video", "no videos to validate"));
    }

    let results = join_all(videos.iter().map(|video| state.validator.validate(video))).await;
    let checks: Vec<VideoCheck> = videos
        .into_iter()
        .zip(results)
        .map(|(video, result)| VideoCheck {
            video_id: video.id,
            result,
        })
        .collect();

    log_api_success!("validate_videos", count = checks.len(), "videos checked");
    Ok(Json(ApiResponse::success(checks)))
}

pub async fn report_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Json(request): Json<ReportRequest>,
) -> ApiResult<ReportReceipt> {
    log_api_start!("report_video", video_id = video_id);

    let issue_type = request.issue_type.trim();
    if issue_type.is_empty() {
        return Err(api_error!(validation, "report_video", "report", "issueType is required"));
    }

    if let Err(e) = state
        .validator
        .mark_problematic(&video_id, issue_type, request.user_id)
        .await
    {
        log_api_error!("report_video", error = e, "could not save report");
        return Err(api_error!(storage, "report_video", "report", e));
    }

    log_api_success!("report_video", video_id = video_id, "report saved");
    Ok(Json(ApiResponse::success(ReportReceipt {
        video_id,
        issue_type: issue_type.to_string(),
    })))
}

pub async fn list_reports(State(state): State<AppState>) -> ApiResult<ReportSummary> {
    let reports_log = state.validator.reports();

    let reports = reports_log
        .all()
        .await
        .map_err(|e| api_error!(storage, "list_reports", "report", e))?;
    let by_issue_type = reports_log
        .by_issue_type()
        .await
        .map_err(|e| api_error!(storage, "list_reports", "report", e))?;

    Ok(Json(ApiResponse::success(ReportSummary {
        total: reports.len(),
        by_issue_type,
        reports,
    })))
}

/// Forget every report; cached verdicts are dropped so videos get re-checked
pub async fn clear_reports(State(state): State<AppState>) -> ApiResult<bool> {
    state
        .validator
        .reports()
        .clear()
        .await
        .map_err(|e| api_error!(storage, "clear_reports", "report", e))?;
    state.validator.clear_cache().await;

    log_api_success!("clear_reports", "reports cleared");
    Ok(Json(ApiResponse::success(true)))
}

pub async fn list_subjects(
    State(state): State<AppState>,
    Query(params): Query<SubjectsParams>,
) -> ApiResult<SubjectsResponse> {
    let grades: Vec<SchoolGrade> = match params.grade.as_deref() {
        Some(label) => match SchoolGrade::from_label(label) {
            Some(grade) => vec![grade],
            None => {
                return Err(api_error!(
                    validation,
                    "list_subjects",
                    "subject",
                    format!("unknown school grade '{}'", label)
                ))
            }
        },
        None => SchoolGrade::ALL.to_vec(),
    };

    let mut catalog: Vec<&'static str> = Vec::new();
    for grade in grades {
        for subject in video_catalog::subjects_for_grade(grade) {
            if !catalog.contains(subject) {
                catalog.push(*subject);
            }
        }
    }

    Ok(Json(ApiResponse::success(SubjectsResponse {
        catalog,
        channel: state.channel.available_subjects(),
    })))
}

pub async fn get_notification(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<NotificationStatus> {
    let seen = state.notifications.has_seen(&key).await;
    Ok(Json(ApiResponse::success(NotificationStatus {
        key,
        seen,
        first_time: false,
    })))
}

pub async fn mark_notification_seen(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<NotificationStatus> {
    let first_time = state
        .notifications
        .mark_seen(&key)
        .await
        .map_err(|e| api_error!(storage, "mark_notification_seen", "notification", e))?;

    Ok(Json(ApiResponse::success(NotificationStatus {
        key,
        seen: true,
        first_time,
    })))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        // Session routes
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/sessions/:id/analysis", post(start_analysis))
        .route("/api/sessions/:id/reinforcement", post(proceed_to_reinforcement))
        .route("/api/sessions/:id/back", post(back_to_selection))
        .route("/api/sessions/:id/summary", get(get_summary))
        .route("/api/sessions/:id/comparison", get(get_comparison))
        .route("/api/sessions/:id/recommendations", post(get_recommendations))
        .route("/api/sessions/:id/quiz", post(request_quiz).get(get_quiz))
        .route("/api/sessions/:id/justification", post(request_justification))
        // Video routes
        .route("/api/videos/validate", post(validate_videos))
        .route("/api/videos/:id/report", post(report_video))
        .route("/api/reports", get(list_reports).delete(clear_reports))
        .route("/api/subjects", get(list_subjects))
        .route("/api/notifications/:key", get(get_notification))
        .route("/api/notifications/:key/seen", post(mark_notification_seen))
        .with_state(state)
}
