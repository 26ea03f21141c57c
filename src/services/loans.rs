//! Lending ledger: borrow and return against book stock

use std::collections::HashMap;

use crate::{
    error::{AppError, AppResult},
    models::loan::{CreateLoan, Loan, LoanDetails, LoanQuery},
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Open a loan, taking one copy of the book off the shelf
    pub async fn open_loan(&self, loan: CreateLoan) -> AppResult<LoanDetails> {
        if loan.date_due < loan.date_borrowed {
            return Err(AppError::Validation(
                "Due date cannot be before the borrow date".to_string(),
            ));
        }

        let opened = self.repository.loans.open(&loan).await?;
        tracing::info!(
            loan_id = opened.id,
            user_id = opened.user_id,
            book_id = opened.book_id,
            "Loan opened"
        );

        self.details(opened).await
    }

    /// Close a loan, putting its copy back on the shelf
    pub async fn close_loan(&self, loan_id: i32) -> AppResult<LoanDetails> {
        let closed = self.repository.loans.close(loan_id).await?;
        tracing::info!(loan_id, book_id = closed.book_id, "Loan closed");

        self.details(closed).await
    }

    pub async fn get_loan(&self, loan_id: i32) -> AppResult<LoanDetails> {
        let loan = self.repository.loans.get_by_id(loan_id).await?;
        self.details(loan).await
    }

    pub async fn list_loans(&self, query: LoanQuery) -> AppResult<Vec<LoanDetails>> {
        let loans = self.repository.loans.list(query).await?;
        self.compose(loans).await
    }

    async fn details(&self, loan: Loan) -> AppResult<LoanDetails> {
        let mut composed = self.compose(vec![loan]).await?;
        composed
            .pop()
            .ok_or_else(|| AppError::Internal("Loan vanished while composing".to_string()))
    }

    /// Attach user and book names to raw loans, leaving a name absent when
    /// its row is gone
    async fn compose(&self, loans: Vec<Loan>) -> AppResult<Vec<LoanDetails>> {
        if loans.is_empty() {
            return Ok(Vec::new());
        }

        let user_ids = distinct(loans.iter().map(|l| l.user_id));
        let book_ids = distinct(loans.iter().map(|l| l.book_id));

        let users: HashMap<i32, String> = self.repository.users.names_by_ids(&user_ids).await?;
        let books: HashMap<i32, String> = self.repository.books.names_by_ids(&book_ids).await?;

        Ok(loans
            .into_iter()
            .map(|loan| {
                let user = users.get(&loan.user_id).cloned();
                let book = books.get(&loan.book_id).cloned();
                LoanDetails::compose(loan, user, book)
            })
            .collect())
    }
}

fn distinct(ids: impl Iterator<Item = i32>) -> Vec<i32> {
    let mut ids: Vec<i32> = ids.collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}
