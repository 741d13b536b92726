use crate::dtos::{
    CreateStudentRequest, ListStudentsParams, ListStudentsResponse, StudentResponse,
    UpdateStudentRequest,
};
use crate::startup::AppState;
use crate::utils::ValidatedBody;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use service_core::error::AppError;
use service_core::response::ApiResponse;

fn student_not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Student not found"))
}

/// Echoes the request payload back on success. Duplicate `student_id`s
/// surface as 500 with the driver's message.
#[tracing::instrument(skip(state, payload), fields(student_id = payload.student_id))]
pub async fn create_student(
    State(state): State<AppState>,
    ValidatedBody(payload): ValidatedBody<CreateStudentRequest>,
) -> Result<ApiResponse<CreateStudentRequest>, AppError> {
    let student = payload.to_student()?;

    state.db.insert(&student).await?;

    tracing::info!("Student created");

    Ok(ApiResponse::new(
        StatusCode::CREATED,
        "Student created successfully",
        Some(payload),
    ))
}

#[tracing::instrument(skip(state))]
pub async fn list_students(
    State(state): State<AppState>,
    WithRejection(Query(params), _): WithRejection<Query<ListStudentsParams>, AppError>,
) -> Result<Json<ListStudentsResponse>, AppError> {
    let pagination = params.pagination()?;
    let filter = params.filter()?;

    let total_students = state
        .db
        .count(filter.clone())
        .await
        .map_err(|e| e.context("Error retrieving students"))?;

    let students = state
        .db
        .list(filter, pagination.skip(), pagination.page_size as i64)
        .await
        .map_err(|e| e.context("Error retrieving students"))?;

    Ok(Json(ListStudentsResponse::new(
        students,
        pagination,
        total_students,
    )))
}

#[tracing::instrument(skip(state))]
pub async fn get_student(
    State(state): State<AppState>,
    WithRejection(Path(student_id), _): WithRejection<Path<i64>, AppError>,
) -> Result<ApiResponse<StudentResponse>, AppError> {
    let student = state
        .db
        .find_by_student_id(student_id)
        .await
        .map_err(|e| e.context("Error retrieving student"))?
        .ok_or_else(student_not_found)?;

    Ok(ApiResponse::success(StatusCode::OK, student.into()))
}

/// Applies `name` and `dob` only; `marks` is never touched here.
#[tracing::instrument(skip(state, payload))]
pub async fn update_student(
    State(state): State<AppState>,
    WithRejection(Path(student_id), _): WithRejection<Path<i64>, AppError>,
    ValidatedBody(payload): ValidatedBody<UpdateStudentRequest>,
) -> Result<ApiResponse<StudentResponse>, AppError> {
    let changes = payload.changes()?;

    // An empty $set is rejected by the server, so a no-op update is a plain read
    let updated = if changes.is_empty() {
        state.db.find_by_student_id(student_id).await
    } else {
        state.db.update_by_student_id(student_id, changes).await
    };

    let student = updated
        .map_err(|e| e.context("Error updating student"))?
        .ok_or_else(student_not_found)?;

    tracing::info!("Student updated");

    Ok(ApiResponse::success(StatusCode::ACCEPTED, student.into()))
}

#[tracing::instrument(skip(state))]
pub async fn delete_student(
    State(state): State<AppState>,
    WithRejection(Path(student_id), _): WithRejection<Path<i64>, AppError>,
) -> Result<ApiResponse<StudentResponse>, AppError> {
    let student = state
        .db
        .delete_by_student_id(student_id)
        .await
        .map_err(|e| e.context("Error deleting student"))?
        .ok_or_else(student_not_found)?;

    tracing::info!("Student deleted");

    Ok(ApiResponse::success(StatusCode::OK, student.into()))
}
