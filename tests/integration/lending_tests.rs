//! Lending ledger: stock consistency under borrow and return

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Barrier;

use libris_server::{
    error::AppError,
    models::loan::{CreateLoan, LoanQuery},
};

use crate::common::{add_book, loan_request, spawn_app};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_borrow_of_last_copy() {
    let app = spawn_app().await;
    let book = add_book(&app.services, "9780000000001", 1).await;
    let book_id = book.id;
    let barrier = Arc::new(Barrier::new(2));

    let mut handles = Vec::new();
    for user_id in [app.admin.id, app.member.id] {
        let services = app.services.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            services.loans.open_loan(loan_request(user_id, book_id)).await
        }));
    }

    let mut opened = 0;
    let mut out_of_stock = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => opened += 1,
            Err(AppError::OutOfStock(_)) => out_of_stock += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!((opened, out_of_stock), (1, 1));
    assert_eq!(app.services.catalog.get_book(book.id).await.unwrap().stock, 0);
}

#[tokio::test]
async fn test_return_restores_stock_for_next_borrower() {
    let app = spawn_app().await;
    let book = add_book(&app.services, "9780000000002", 1).await;

    let first = app
        .services
        .loans
        .open_loan(loan_request(app.member.id, book.id))
        .await
        .unwrap();
    assert_eq!(first.user.as_deref(), Some("Mel Member"));
    assert_eq!(app.services.catalog.get_book(book.id).await.unwrap().stock, 0);

    app.services.loans.close_loan(first.id).await.unwrap();
    assert_eq!(app.services.catalog.get_book(book.id).await.unwrap().stock, 1);

    let second = app
        .services
        .loans
        .open_loan(loan_request(app.admin.id, book.id))
        .await
        .unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(app.services.catalog.get_book(book.id).await.unwrap().stock, 0);
}

#[tokio::test]
async fn test_closing_twice_is_not_found() {
    let app = spawn_app().await;
    let book = add_book(&app.services, "9780000000003", 2).await;
    let loan = app
        .services
        .loans
        .open_loan(loan_request(app.member.id, book.id))
        .await
        .unwrap();

    app.services.loans.close_loan(loan.id).await.unwrap();
    let again = app.services.loans.close_loan(loan.id).await;

    assert!(matches!(again, Err(AppError::NotFound(_))));
    assert_eq!(app.services.catalog.get_book(book.id).await.unwrap().stock, 2);
}

#[tokio::test]
async fn test_borrow_rejects_unknown_user_book_and_bad_dates() {
    let app = spawn_app().await;
    let book = add_book(&app.services, "9780000000004", 1).await;

    let unknown_user = app.services.loans.open_loan(loan_request(9999, book.id)).await;
    assert!(matches!(unknown_user, Err(AppError::NotFound(_))));

    let unknown_book = app.services.loans.open_loan(loan_request(app.member.id, 9999)).await;
    assert!(matches!(unknown_book, Err(AppError::NotFound(_))));

    let backwards = app
        .services
        .loans
        .open_loan(CreateLoan {
            date_due: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            ..loan_request(app.member.id, book.id)
        })
        .await;
    assert!(matches!(backwards, Err(AppError::Validation(_))));

    assert_eq!(app.services.catalog.get_book(book.id).await.unwrap().stock, 1);
}

#[tokio::test]
async fn test_loan_view_survives_book_deletion() {
    let app = spawn_app().await;
    let book = add_book(&app.services, "9780000000005", 1).await;
    let loan = app
        .services
        .loans
        .open_loan(loan_request(app.member.id, book.id))
        .await
        .unwrap();
    assert_eq!(loan.book.as_deref(), Some("Book 9780000000005"));

    app.services.catalog.delete_book(book.id).await.unwrap();

    let view = app.services.loans.get_loan(loan.id).await.unwrap();
    assert_eq!(view.book_id, book.id);
    assert_eq!(view.book, None);
    assert_eq!(view.user.as_deref(), Some("Mel Member"));

    // Returning a copy of a deleted book still closes the loan
    let closed = app.services.loans.close_loan(loan.id).await.unwrap();
    assert_eq!(closed.id, loan.id);
}

#[tokio::test]
async fn test_list_loans_filters_by_user_and_book() {
    let app = spawn_app().await;
    let first = add_book(&app.services, "9780000000006", 3).await;
    let second = add_book(&app.services, "9780000000007", 3).await;

    for (user_id, book_id) in [
        (app.member.id, first.id),
        (app.member.id, second.id),
        (app.admin.id, first.id),
    ] {
        app.services
            .loans
            .open_loan(loan_request(user_id, book_id))
            .await
            .unwrap();
    }

    let by_member = app
        .services
        .loans
        .list_loans(LoanQuery {
            user_id: Some(app.member.id),
            ..LoanQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(by_member.len(), 2);

    let by_book = app
        .services
        .loans
        .list_loans(LoanQuery {
            book_id: Some(first.id),
            ..LoanQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(by_book.len(), 2);
    assert!(by_book.iter().all(|l| l.book_id == first.id));
}

/// Same race as above against PostgreSQL row locks.
/// Needs TEST_DATABASE_URL pointing at a disposable database.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_postgres_concurrent_borrow_of_last_copy() {
    use libris_server::{config::AuthConfig, repository::Repository, services::Services};

    use crate::common::{new_user, pg_pool, unique_suffix};

    let services = Services::new(Repository::new(pg_pool().await), &AuthConfig::default()).unwrap();
    let suffix = unique_suffix();
    let book = add_book(&services, &format!("97{:011}", suffix % 100_000_000_000), 1).await;

    let mut borrowers = Vec::new();
    for n in 0..4 {
        let user = services
            .users
            .register(new_user(
                "Racer",
                &format!("racer{}_{}", suffix, n),
                &format!("racer{}_{}@example.org", suffix, n),
                "racer-pass",
            ))
            .await
            .unwrap();
        borrowers.push(user.id);
    }

    let book_id = book.id;
    let barrier = Arc::new(Barrier::new(borrowers.len()));
    let handles: Vec<_> = borrowers
        .into_iter()
        .map(|user_id| {
            let services = services.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                services.loans.open_loan(loan_request(user_id, book_id)).await
            })
        })
        .collect();

    let mut opened = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => opened += 1,
            Err(AppError::OutOfStock(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(opened, 1);
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().stock, 0);
}
