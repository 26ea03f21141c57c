//! Repository layer for database operations

pub mod books;
pub mod loans;
pub mod memory;
pub mod revoked_tokens;
pub mod users;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

pub use books::BooksRepository;
pub use loans::LoansRepository;
pub use revoked_tokens::RevokedTokensRepository;
pub use users::UsersRepository;

/// Handles to every table, each behind its repository trait
#[derive(Clone)]
pub struct Repository {
    pub users: Arc<dyn UsersRepository>,
    pub books: Arc<dyn BooksRepository>,
    pub loans: Arc<dyn LoansRepository>,
    pub revoked_tokens: Arc<dyn RevokedTokensRepository>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: Arc::new(users::PgUsersRepository::new(pool.clone())),
            books: Arc::new(books::PgBooksRepository::new(pool.clone())),
            loans: Arc::new(loans::PgLoansRepository::new(pool.clone())),
            revoked_tokens: Arc::new(revoked_tokens::PgRevokedTokensRepository::new(pool)),
        }
    }

    /// Repository over a fresh in-memory store
    pub fn in_memory() -> Self {
        let store = memory::MemoryStore::new();
        Self {
            users: Arc::new(store.clone()),
            books: Arc::new(store.clone()),
            loans: Arc::new(store.clone()),
            revoked_tokens: Arc::new(store),
        }
    }
}
