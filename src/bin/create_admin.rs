//! Bootstrap the first administrator account.
//!
//! Refuses to run once an admin exists. Regular accounts register through
//! the API.

use anyhow::Context;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use validator::Validate;

use libris_server::{
    config::AppConfig, models::user::CreateUser, repository::Repository, services::Services,
};

/// Create the initial Libris administrator
#[derive(Debug, Parser)]
#[command(name = "create-admin", version)]
struct Args {
    /// Display name
    #[arg(long)]
    name: Option<String>,
    /// Login username
    #[arg(short, long)]
    username: Option<String>,
    /// Login email
    #[arg(short, long)]
    email: Option<String>,
    /// Postal address
    #[arg(long)]
    address: Option<String>,
    /// Phone number
    #[arg(long)]
    phone: Option<String>,
    /// Password (will prompt if not provided)
    #[arg(short, long)]
    password: Option<String>,
}

fn prompt(value: Option<String>, label: &str, allow_empty: bool) -> anyhow::Result<String> {
    match value {
        Some(v) => Ok(v),
        None => dialoguer::Input::<String>::new()
            .with_prompt(label)
            .allow_empty(allow_empty)
            .interact_text()
            .context("Input error"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "libris_server=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = AppConfig::load().context("Failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let request = CreateUser {
        name: prompt(args.name, "Admin name", false)?,
        username: prompt(args.username, "Admin username", false)?,
        email: prompt(args.email, "Admin email", false)?,
        address: prompt(args.address, "Address (optional)", true)?,
        phone: prompt(args.phone, "Phone (optional)", true)?,
        password: match args.password {
            Some(p) => p,
            None => dialoguer::Password::new()
                .with_prompt("Admin password")
                .with_confirmation("Confirm password", "Passwords do not match")
                .interact()
                .context("Input error")?,
        },
    };
    request.validate()?;

    let services = Services::new(Repository::new(pool), &config.auth)?;
    let admin = services.users.create_admin(request).await?;

    println!("Admin '{}' created with id {}", admin.username, admin.id);
    Ok(())
}
