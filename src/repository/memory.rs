//! In-memory store implementing every repository trait.
//!
//! All tables live behind one async mutex, so each operation (including the
//! stock check and decrement of `open`) runs as a single atomic step.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, CreateBook, UpdateBook},
        loan::{CreateLoan, Loan, LoanQuery},
        user::{NewUser, Role, UpdateUser, User},
        Pagination,
    },
};

use super::{
    books::BooksRepository, loans::LoansRepository, revoked_tokens::RevokedTokensRepository,
    users::UsersRepository,
};

#[derive(Debug)]
struct RevokedToken {
    token: String,
    user_id: i32,
    #[allow(dead_code)]
    revoked_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    books: BTreeMap<i32, Book>,
    loans: BTreeMap<i32, Loan>,
    revoked_tokens: Vec<RevokedToken>,
    last_user_id: i32,
    last_book_id: i32,
    last_loan_id: i32,
}

impl Tables {
    fn email_taken(&self, email: &str, exclude_id: Option<i32>) -> bool {
        self.users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.id) != exclude_id)
    }

    fn username_taken(&self, username: &str, exclude_id: Option<i32>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != exclude_id)
    }

    fn isbn_taken(&self, isbn: &str, exclude_id: Option<i32>) -> bool {
        self.books
            .values()
            .any(|b| b.isbn == isbn && Some(b.id) != exclude_id)
    }
}

fn page_of<T: Clone>(rows: impl Iterator<Item = T>, page: Pagination) -> Vec<T> {
    rows.skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect()
}

/// Shared in-memory tables; clones see the same data
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsersRepository for MemoryStore {
    async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.tables
            .lock()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        Ok(self.tables.lock().await.email_taken(email, exclude_id))
    }

    async fn username_exists(&self, username: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        Ok(self.tables.lock().await.username_taken(username, exclude_id))
    }

    async fn admin_exists(&self) -> AppResult<bool> {
        Ok(self.tables.lock().await.users.values().any(|u| u.role == Role::Admin))
    }

    async fn names_by_ids(&self, ids: &[i32]) -> AppResult<HashMap<i32, String>> {
        let tables = self.tables.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).map(|u| (*id, u.name.clone())))
            .collect())
    }

    async fn list(&self, page: Pagination) -> AppResult<Vec<User>> {
        let tables = self.tables.lock().await;
        Ok(page_of(tables.users.values().cloned(), page))
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.tables.lock().await.users.len() as i64)
    }

    async fn create(&self, user: &NewUser) -> AppResult<User> {
        let mut tables = self.tables.lock().await;

        if tables.email_taken(&user.email, None) {
            return Err(AppError::Conflict("Duplicate value violates users_email_key".to_string()));
        }
        if tables.username_taken(&user.username, None) {
            return Err(AppError::Conflict("Duplicate value violates users_username_key".to_string()));
        }

        tables.last_user_id += 1;
        let created = User {
            id: tables.last_user_id,
            name: user.name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            address: user.address.clone(),
            phone: user.phone.clone(),
            role: user.role,
        };
        tables.users.insert(created.id, created.clone());

        Ok(created)
    }

    async fn update(&self, id: i32, update: &UpdateUser) -> AppResult<User> {
        let mut tables = self.tables.lock().await;

        if let Some(ref email) = update.email {
            if tables.email_taken(email, Some(id)) {
                return Err(AppError::Conflict("Duplicate value violates users_email_key".to_string()));
            }
        }
        if let Some(ref username) = update.username {
            if tables.username_taken(username, Some(id)) {
                return Err(AppError::Conflict("Duplicate value violates users_username_key".to_string()));
            }
        }

        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;

        if let Some(ref name) = update.name {
            user.name = name.clone();
        }
        if let Some(ref username) = update.username {
            user.username = username.clone();
        }
        if let Some(ref email) = update.email {
            user.email = email.clone();
        }
        if let Some(ref address) = update.address {
            user.address = address.clone();
        }
        if let Some(ref phone) = update.phone {
            user.phone = phone.clone();
        }

        Ok(user.clone())
    }

    async fn update_password(&self, id: i32, password_hash: &str) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        Ok(self.tables.lock().await.users.remove(&id).is_some())
    }
}

#[async_trait]
impl BooksRepository for MemoryStore {
    async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        self.tables
            .lock()
            .await
            .books
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        Ok(self.tables.lock().await.isbn_taken(isbn, exclude_id))
    }

    async fn names_by_ids(&self, ids: &[i32]) -> AppResult<HashMap<i32, String>> {
        let tables = self.tables.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.books.get(id).map(|b| (*id, b.name.clone())))
            .collect())
    }

    async fn list(&self, page: Pagination) -> AppResult<Vec<Book>> {
        let tables = self.tables.lock().await;
        Ok(page_of(tables.books.values().cloned(), page))
    }

    async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let mut tables = self.tables.lock().await;

        if tables.isbn_taken(&book.isbn, None) {
            return Err(AppError::Conflict("Duplicate value violates books_isbn_key".to_string()));
        }
        if book.stock < 0 {
            return Err(AppError::Validation("Stock cannot be negative".to_string()));
        }

        tables.last_book_id += 1;
        let created = Book {
            id: tables.last_book_id,
            name: book.name.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            publication_date: book.publication_date,
            stock: book.stock,
        };
        tables.books.insert(created.id, created.clone());

        Ok(created)
    }

    async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        let mut tables = self.tables.lock().await;

        if let Some(ref isbn) = update.isbn {
            if tables.isbn_taken(isbn, Some(id)) {
                return Err(AppError::Conflict("Duplicate value violates books_isbn_key".to_string()));
            }
        }

        let book = tables
            .books
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        if let Some(ref name) = update.name {
            book.name = name.clone();
        }
        if let Some(ref author) = update.author {
            book.author = author.clone();
        }
        if let Some(ref isbn) = update.isbn {
            book.isbn = isbn.clone();
        }
        if update.publication_date.is_some() {
            book.publication_date = update.publication_date;
        }

        Ok(book.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        Ok(self.tables.lock().await.books.remove(&id).is_some())
    }
}

#[async_trait]
impl LoansRepository for MemoryStore {
    async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        self.tables
            .lock()
            .await
            .loans
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    async fn list(&self, query: LoanQuery) -> AppResult<Vec<Loan>> {
        let tables = self.tables.lock().await;
        let matching = tables.loans.values().filter(|l| {
            query.user_id.map_or(true, |id| l.user_id == id)
                && query.book_id.map_or(true, |id| l.book_id == id)
        });
        Ok(page_of(matching.cloned(), query.pagination()))
    }

    async fn open(&self, loan: &CreateLoan) -> AppResult<Loan> {
        let mut tables = self.tables.lock().await;

        if !tables.users.contains_key(&loan.user_id) {
            return Err(AppError::NotFound(format!("User with id {} not found", loan.user_id)));
        }

        let book = tables
            .books
            .get_mut(&loan.book_id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", loan.book_id)))?;

        if book.stock <= 0 {
            return Err(AppError::OutOfStock(
                "Book is out of stock and cannot be borrowed".to_string(),
            ));
        }
        book.stock -= 1;

        tables.last_loan_id += 1;
        let created = Loan {
            id: tables.last_loan_id,
            user_id: loan.user_id,
            book_id: loan.book_id,
            date_borrowed: loan.date_borrowed,
            date_due: loan.date_due,
        };
        tables.loans.insert(created.id, created.clone());

        Ok(created)
    }

    async fn close(&self, id: i32) -> AppResult<Loan> {
        let mut tables = self.tables.lock().await;

        let loan = tables
            .loans
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;

        match tables.books.get_mut(&loan.book_id) {
            Some(book) => book.stock += 1,
            None => tracing::warn!(
                loan_id = loan.id,
                book_id = loan.book_id,
                "Closed loan references a deleted book, stock not restored"
            ),
        }

        Ok(loan)
    }
}

#[async_trait]
impl RevokedTokensRepository for MemoryStore {
    async fn exists(&self, token: &str) -> AppResult<bool> {
        Ok(self
            .tables
            .lock()
            .await
            .revoked_tokens
            .iter()
            .any(|t| t.token == token))
    }

    async fn insert(&self, token: &str, user_id: i32, revoked_at: DateTime<Utc>) -> AppResult<bool> {
        let mut tables = self.tables.lock().await;
        if tables.revoked_tokens.iter().any(|t| t.token == token) {
            return Ok(false);
        }
        tables.revoked_tokens.push(RevokedToken {
            token: token.to_string(),
            user_id,
            revoked_at,
        });
        Ok(true)
    }

    async fn delete_for_user(&self, user_id: i32) -> AppResult<u64> {
        let mut tables = self.tables.lock().await;
        let before = tables.revoked_tokens.len();
        tables.revoked_tokens.retain(|t| t.user_id != user_id);
        Ok((before - tables.revoked_tokens.len()) as u64)
    }

    async fn count_for_user(&self, user_id: i32) -> AppResult<i64> {
        Ok(self
            .tables
            .lock()
            .await
            .revoked_tokens
            .iter()
            .filter(|t| t.user_id == user_id)
            .count() as i64)
    }
}
