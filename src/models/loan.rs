//! Loan (borrow) model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::Pagination;

/// Loan model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Loan {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub date_borrowed: NaiveDate,
    pub date_due: NaiveDate,
}

/// Loan with the borrower's and the book's names resolved at read time.
/// A name is absent when the referenced row has been deleted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub user_id: i32,
    pub user: Option<String>,
    pub book_id: i32,
    pub book: Option<String>,
    pub date_borrowed: NaiveDate,
    pub date_due: NaiveDate,
}

impl LoanDetails {
    pub fn compose(loan: Loan, user: Option<String>, book: Option<String>) -> Self {
        Self {
            id: loan.id,
            user_id: loan.user_id,
            user,
            book_id: loan.book_id,
            book,
            date_borrowed: loan.date_borrowed,
            date_due: loan.date_due,
        }
    }
}

/// Create loan request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateLoan {
    pub user_id: i32,
    pub book_id: i32,
    pub date_borrowed: NaiveDate,
    pub date_due: NaiveDate,
}

/// Loan list filter
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoanQuery {
    pub user_id: Option<i32>,
    pub book_id: Option<i32>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl LoanQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            skip: self.skip,
            limit: self.limit,
        }
    }
}
