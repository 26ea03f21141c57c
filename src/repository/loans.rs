//! Loans repository for database operations
//!
//! Opening and closing a loan moves book stock in the same transaction as
//! the loan row, so a failure part-way leaves both untouched.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::loan::{CreateLoan, Loan, LoanQuery},
};

#[async_trait]
pub trait LoansRepository: Send + Sync {
    /// Get loan by ID
    async fn get_by_id(&self, id: i32) -> AppResult<Loan>;

    /// Loans matching the optional user/book filter, oldest first
    async fn list(&self, query: LoanQuery) -> AppResult<Vec<Loan>>;

    /// Take one copy off the shelf and record the loan.
    /// Fails with `NotFound` for an unknown book or borrower and `OutOfStock`
    /// when no copy is left.
    async fn open(&self, loan: &CreateLoan) -> AppResult<Loan>;

    /// Delete the loan and put its copy back on the shelf
    async fn close(&self, id: i32) -> AppResult<Loan>;
}

#[derive(Clone)]
pub struct PgLoansRepository {
    pool: Pool<Postgres>,
}

impl PgLoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoansRepository for PgLoansRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    async fn list(&self, query: LoanQuery) -> AppResult<Vec<Loan>> {
        let page = query.pagination();

        let loans = sqlx::query_as::<_, Loan>(
            r#"
            SELECT * FROM loans
            WHERE ($1::INT IS NULL OR user_id = $1)
              AND ($2::INT IS NULL OR book_id = $2)
            ORDER BY id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(query.user_id)
        .bind(query.book_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    async fn open(&self, loan: &CreateLoan) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        // Row lock: concurrent borrows of the same book queue here
        let stock: i32 = sqlx::query_scalar("SELECT stock FROM books WHERE id = $1 FOR UPDATE")
            .bind(loan.book_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", loan.book_id)))?;

        // Shared lock: the borrower cannot be deleted until this loan commits
        let borrower: Option<i32> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR SHARE")
            .bind(loan.user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if borrower.is_none() {
            return Err(AppError::NotFound(format!("User with id {} not found", loan.user_id)));
        }

        if stock <= 0 {
            return Err(AppError::OutOfStock(
                "Book is out of stock and cannot be borrowed".to_string(),
            ));
        }

        sqlx::query("UPDATE books SET stock = stock - 1 WHERE id = $1")
            .bind(loan.book_id)
            .execute(&mut *tx)
            .await?;

        let created = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (user_id, book_id, date_borrowed, date_due)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(loan.user_id)
        .bind(loan.book_id)
        .bind(loan.date_borrowed)
        .bind(loan.date_due)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn close(&self, id: i32) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>("DELETE FROM loans WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;

        let restocked = sqlx::query("UPDATE books SET stock = stock + 1 WHERE id = $1")
            .bind(loan.book_id)
            .execute(&mut *tx)
            .await?;

        if restocked.rows_affected() == 0 {
            tracing::warn!(
                loan_id = loan.id,
                book_id = loan.book_id,
                "Closed loan references a deleted book, stock not restored"
            );
        }

        tx.commit().await?;

        Ok(loan)
    }
}
