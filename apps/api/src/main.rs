mod admissions;
mod auth;
mod cache;
mod config;
mod content;
mod db;
mod errors;
mod interview;
mod models;
mod routes;
mod state;
mod storage;
mod validation;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use axum::http::{header, HeaderValue, Method};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::accounts::{create_user, find_user_by_email, grant_role, reset_password};
use crate::cache::PublicCache;
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::interview::templates::seed_default_templates;
use crate::models::user::AppRole;
use crate::routes::build_router;
use crate::state::AppState;

/// School website API: public site content, admissions and the back office.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run migrations, then serve HTTP (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Create a user holding the admin role
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long, env = "ADMIN_PASSWORD")]
        password: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Set a new password and revoke the user's sessions
    ResetPassword {
        #[arg(long)]
        email: String,
        #[arg(long, env = "NEW_PASSWORD")]
        password: String,
    },
    /// Grant a role (admin, moderator, user) to an existing user
    GrantRole {
        #[arg(long)]
        email: String,
        #[arg(long)]
        role: AppRole,
    },
    /// Insert default interview subjects for form types with none configured
    SeedTemplates,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = create_pool(&config.database_url).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, db).await,
        Command::Migrate => run_migrations(&db).await,
        Command::CreateAdmin {
            email,
            password,
            name,
        } => {
            run_migrations(&db).await?;
            let user = create_user(&db, &email, &password, name.as_deref()).await?;
            grant_role(&db, user.id, AppRole::Admin).await?;
            info!("Admin {} ready", user.email);
            Ok(())
        }
        Command::ResetPassword { email, password } => {
            reset_password(&db, &email, &password).await?;
            Ok(())
        }
        Command::GrantRole { email, role } => {
            let user = find_user_by_email(&db, &email)
                .await?
                .with_context(|| format!("No user with email {email}"))?;
            grant_role(&db, user.id, role).await?;
            Ok(())
        }
        Command::SeedTemplates => {
            let seeded = seed_default_templates(&db).await?;
            info!("Seeded interview templates for {} form types", seeded.len());
            Ok(())
        }
    }
}

async fn serve(config: Config, db: sqlx::PgPool) -> Result<()> {
    info!("Starting schoolsite API v{}", env!("CARGO_PKG_VERSION"));

    run_migrations(&db).await?;

    // Initialize Redis
    let redis = redis::Client::open(config.redis_url.clone())?;
    let cache = PublicCache::new(redis, config.public_cache_ttl_secs);
    info!("Redis client initialized");

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    let cors = cors_layer(config.cors_allowed_origin.as_deref())?;

    let state = AppState {
        db,
        cache,
        s3,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Any origin unless `CORS_ALLOWED_ORIGIN` pins one.
fn cors_layer(allowed_origin: Option<&str>) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
    Ok(match allowed_origin {
        Some(origin) => layer.allow_origin(
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("CORS_ALLOWED_ORIGIN '{origin}' is not a valid header"))?,
        ),
        None => layer.allow_origin(Any),
    })
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "schoolsite-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::from_conf(
        aws_sdk_s3::config::Builder::from(&s3_config)
            .force_path_style(true)
            .build(),
    )
}
