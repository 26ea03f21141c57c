//! User management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        user::{ChangePassword, CreateUser, UpdateUser, User},
        Pagination,
    },
};

use super::{auth::MessageResponse, AuthenticatedUser};

/// Register a new member account
#[utoipa::path(
    post,
    path = "/users/register",
    tag = "users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User registered", body = User),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Email or username already in use", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<crate::AppState>,
    Json(user): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    user.validate()?;

    let created = state.services.users.register(user).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List users
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(Pagination),
    responses(
        (status = 200, description = "List of users", body = Vec<User>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser { user, .. }: AuthenticatedUser,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<User>>> {
    user.require_admin()?;

    let users = state.services.users.list(page).await?;
    Ok(Json(users))
}

/// Get user details by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 403, description = "Not your account"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser { user, .. }: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<User>> {
    user.require_admin_or_self(id)?;

    let found = state.services.users.get_by_id(id).await?;
    Ok(Json(found))
}

/// Update a user's profile
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 403, description = "Not your account"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email or username already in use")
    )
)]
pub async fn update_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser { user, .. }: AuthenticatedUser,
    Path(id): Path<i32>,
    Json(update): Json<UpdateUser>,
) -> AppResult<Json<User>> {
    user.require_admin_or_self(id)?;
    update.validate()?;

    let updated = state.services.users.update(id, update).await?;
    Ok(Json(updated))
}

/// Change one's own password
#[utoipa::path(
    put,
    path = "/users/{id}/password",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    request_body = ChangePassword,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Incorrect current password"),
        (status = 403, description = "Not your account")
    )
)]
pub async fn change_password(
    State(state): State<crate::AppState>,
    AuthenticatedUser { user, .. }: AuthenticatedUser,
    Path(id): Path<i32>,
    Json(change): Json<ChangePassword>,
) -> AppResult<Json<MessageResponse>> {
    user.require_self(id)?;
    change.validate()?;

    state.services.users.change_password(id, change).await?;
    Ok(Json(MessageResponse::new("Password updated successfully")))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Admin role required, or deleting own account"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser { user, .. }: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    user.require_admin()?;
    if user.id == id {
        return Err(AppError::Forbidden("You cannot delete your own account".to_string()));
    }

    state.services.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
