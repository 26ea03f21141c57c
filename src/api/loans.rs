//! Loan endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::{CreateLoan, LoanDetails, LoanQuery},
        Pagination,
    },
};

use super::AuthenticatedUser;

/// List loans, optionally filtered by user or book
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanQuery),
    responses(
        (status = 200, description = "List of loans", body = Vec<LoanDetails>),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser { user, .. }: AuthenticatedUser,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    user.require_admin()?;

    let loans = state.services.loans.list_loans(query).await?;
    Ok(Json(loans))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = LoanDetails),
        (status = 400, description = "Book out of stock or invalid dates"),
        (status = 403, description = "Borrowing for another user"),
        (status = 404, description = "User or book not found")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser { user, .. }: AuthenticatedUser,
    Json(loan): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<LoanDetails>)> {
    user.require_admin_or_self(loan.user_id)?;

    let opened = state.services.loans.open_loan(loan).await?;
    Ok((StatusCode::CREATED, Json(opened)))
}

/// Get loan details by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 403, description = "Not your loan"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser { user, .. }: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get_loan(id).await?;
    user.require_admin_or_self(loan.user_id)?;
    Ok(Json(loan))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan closed", body = LoanDetails),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser { user, .. }: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    user.require_admin()?;

    let closed = state.services.loans.close_loan(id).await?;
    Ok(Json(closed))
}

/// Get loans for a user
#[utoipa::path(
    get,
    path = "/users/{id}/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID"),
        Pagination
    ),
    responses(
        (status = 200, description = "User's loans", body = Vec<LoanDetails>),
        (status = 403, description = "Not your account")
    )
)]
pub async fn get_user_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser { user, .. }: AuthenticatedUser,
    Path(id): Path<i32>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    user.require_admin_or_self(id)?;

    let loans = state
        .services
        .loans
        .list_loans(LoanQuery {
            user_id: Some(id),
            book_id: None,
            skip: page.skip,
            limit: page.limit,
        })
        .await?;
    Ok(Json(loans))
}

/// Get loans for a book
#[utoipa::path(
    get,
    path = "/books/{id}/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID"),
        Pagination
    ),
    responses(
        (status = 200, description = "Book's loans", body = Vec<LoanDetails>),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No loans for this book")
    )
)]
pub async fn get_book_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser { user, .. }: AuthenticatedUser,
    Path(id): Path<i32>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    user.require_admin()?;

    let loans = state
        .services
        .loans
        .list_loans(LoanQuery {
            user_id: None,
            book_id: Some(id),
            skip: page.skip,
            limit: page.limit,
        })
        .await?;

    if loans.is_empty() {
        return Err(AppError::NotFound(format!(
            "No borrowed records found for book {}",
            id
        )));
    }
    Ok(Json(loans))
}
