use crate::capture::{CaptureView, ImageUpload};
use crate::chart::{ChartView, build_chart};
use crate::dashboard::build_dashboard;
use crate::errors::AppError;
use crate::models::{
    DashboardResponse, Meal, MealNameForm, ProfileCreatedResponse, ProfileForm, WeightEntry, WeightForm,
    WeightLogResponse,
};
use crate::state::AppState;
use crate::ui::{render_dashboard, render_progress, render_setup};
use axum::{
    Form, Json,
    extract::{Multipart, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::debug;

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let summary = build_dashboard(&*state.data.lock().await);
    let Some(summary) = summary else {
        return Html(render_setup(&ProfileForm::default(), None));
    };
    let capture = state.capture.lock().await;
    Html(render_dashboard(&summary, &capture))
}

pub async fn progress(State(state): State<AppState>) -> Response {
    let data = state.data.lock().await;
    match data.profile.as_ref() {
        Some(profile) => Html(render_progress(profile, &build_chart(&data.weight_history))).into_response(),
        None => Redirect::to("/").into_response(),
    }
}

pub async fn create_profile_form(State(state): State<AppState>, Form(form): Form<ProfileForm>) -> Response {
    match state.create_profile(&form).await {
        Ok(_) => Redirect::to("/").into_response(),
        Err(err) => (err.status, Html(render_setup(&form, Some(&err.message)))).into_response(),
    }
}

/// Rejected uploads surface as a notice on the capture panel, so every
/// outcome ends back on the dashboard.
pub async fn upload_meal_form(State(state): State<AppState>, multipart: Multipart) -> Result<Redirect, AppError> {
    let upload = read_upload(multipart).await?;
    if let Err(err) = state.analyze_upload(upload).await {
        debug!(status = %err.status, "upload not analyzed: {}", err.message);
    }
    Ok(Redirect::to("/"))
}

/// The remove buttons submit the review form, so whatever name the user has
/// typed so far comes along and is kept.
pub async fn remove_item_form(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    form: Option<Form<MealNameForm>>,
) -> Result<Redirect, AppError> {
    if let Some(name) = form.and_then(|Form(form)| form.name) {
        state.rename_meal(&name).await?;
    }
    state.remove_item(index).await?;
    Ok(Redirect::to("/"))
}

pub async fn confirm_meal_form(
    State(state): State<AppState>,
    Form(form): Form<MealNameForm>,
) -> Result<Redirect, AppError> {
    state.confirm_meal(form.name.as_deref()).await?;
    Ok(Redirect::to("/"))
}

pub async fn cancel_meal_form(State(state): State<AppState>) -> Result<Redirect, AppError> {
    state.cancel_meal().await?;
    Ok(Redirect::to("/"))
}

pub async fn retry_meal_form(State(state): State<AppState>) -> Result<Redirect, AppError> {
    state.retry_meal().await?;
    Ok(Redirect::to("/"))
}

pub async fn log_weight_form(State(state): State<AppState>, Form(form): Form<WeightForm>) -> Result<Redirect, AppError> {
    state.log_weight(&form.weight).await?;
    Ok(Redirect::to("/progress"))
}

pub async fn create_profile(
    State(state): State<AppState>,
    Json(form): Json<ProfileForm>,
) -> Result<Json<ProfileCreatedResponse>, AppError> {
    Ok(Json(state.create_profile(&form).await?))
}

pub async fn get_dashboard(State(state): State<AppState>) -> Result<Json<DashboardResponse>, AppError> {
    let data = state.data.lock().await;
    build_dashboard(&data)
        .map(Json)
        .ok_or_else(|| AppError::conflict("No profile has been set up yet."))
}

pub async fn get_capture(State(state): State<AppState>) -> Json<CaptureView> {
    Json(state.capture_view().await)
}

pub async fn analyze_meal(State(state): State<AppState>, multipart: Multipart) -> Result<Json<CaptureView>, AppError> {
    let upload = read_upload(multipart).await?;
    Ok(Json(state.analyze_upload(upload).await?))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<CaptureView>, AppError> {
    Ok(Json(state.remove_item(index).await?))
}

pub async fn rename_meal(
    State(state): State<AppState>,
    Json(payload): Json<MealNameForm>,
) -> Result<Json<CaptureView>, AppError> {
    let name = payload.name.unwrap_or_default();
    Ok(Json(state.rename_meal(&name).await?))
}

pub async fn confirm_meal(
    State(state): State<AppState>,
    payload: Option<Json<MealNameForm>>,
) -> Result<Json<Meal>, AppError> {
    let name = payload.and_then(|Json(form)| form.name);
    Ok(Json(state.confirm_meal(name.as_deref()).await?))
}

pub async fn cancel_meal(State(state): State<AppState>) -> Result<Json<CaptureView>, AppError> {
    Ok(Json(state.cancel_meal().await?))
}

pub async fn retry_meal(State(state): State<AppState>) -> Result<Json<CaptureView>, AppError> {
    Ok(Json(state.retry_meal().await?))
}

pub async fn log_weight(
    State(state): State<AppState>,
    Json(form): Json<WeightForm>,
) -> Result<Json<WeightLogResponse>, AppError> {
    Ok(Json(state.log_weight(&form.weight).await?))
}

pub async fn get_weight_history(State(state): State<AppState>) -> Json<Vec<WeightEntry>> {
    Json(state.data.lock().await.weight_history.clone())
}

pub async fn get_chart(State(state): State<AppState>) -> Json<ChartView> {
    Json(build_chart(&state.data.lock().await.weight_history))
}

/// Pulls the `image` field out of a multipart body. A body without one
/// yields an empty upload, which the capture turns away.
async fn read_upload(mut multipart: Multipart) -> Result<ImageUpload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(err.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::bad_request(err.to_string()))?;
        return Ok(ImageUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Ok(ImageUpload {
        file_name: None,
        content_type: None,
        bytes: Vec::new(),
    })
}
