mod api;
mod config;
mod error;
mod mailer;
mod models;
mod repository;
mod schema;
mod services;
mod storage;
mod sweeper;

use diesel::Connection;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

use anyhow::Result;
use clap::Parser;
use diesel_async::{pooled_connection::bb8::Pool, AsyncPgConnection};
use payment_gateway::{GatewayConfig, MidtransClient, PaymentGateway};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Args;
use crate::mailer::{LogMailer, Mailer};
use crate::repository::{
    PgReservationRepository, PgReviewRepository, PgUserRepository, PgVenueRepository, ReservationRepository,
    ReviewRepository, UserRepository, VenueRepository,
};
use crate::services::{JwtIssuer, ReservationService, ReviewService, TokenIssuer, UserService, VenueService};
use crate::storage::{ImageStore, LocalImageStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    info!("Running database migrations...");
    let mut conn = PgConnection::establish(&args.database_url)?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("Migration error: {}", e))?;
    info!("Migrations completed successfully");

    let config =
        diesel_async::pooled_connection::AsyncDieselConnectionManager::<AsyncPgConnection>::new(&args.database_url);
    let pool = Pool::builder().build(config).await?;

    let gateway: Arc<dyn PaymentGateway> = Arc::new(MidtransClient::new(GatewayConfig {
        base_url: args.gateway_base_url.clone(),
        server_key: args.gateway_server_key.clone(),
        timeout: args.gateway_timeout(),
        callback_url: args.gateway_callback_url.clone(),
    })?);

    let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool.clone()));
    let venues: Arc<dyn VenueRepository> = Arc::new(PgVenueRepository::new(pool.clone()));
    let reviews: Arc<dyn ReviewRepository> = Arc::new(PgReviewRepository::new(pool.clone()));
    let reservations: Arc<dyn ReservationRepository> = Arc::new(PgReservationRepository::new(pool.clone()));

    let tokens: Arc<dyn TokenIssuer> = Arc::new(JwtIssuer::new(&args.jwt_secret, args.jwt_expiry_hours));
    let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);
    let images: Arc<dyn ImageStore> = Arc::new(LocalImageStore::new(&args.image_dir, args.image_base_url.clone()));

    if let Some(interval) = args.sweep_interval() {
        let sweeper = sweeper::OrphanSweeper::new(reservations.clone(), interval, args.orphan_grace());
        tokio::spawn(async move {
            sweeper.run().await;
        });
    } else {
        warn!("Orphan sweeper disabled");
    }

    if !args.verify_callback_signature {
        warn!("Payment callback signatures are not verified");
    }

    let app_state = api::AppState {
        users: Arc::new(UserService::new(users.clone(), tokens.clone(), mailer.clone())),
        venues: Arc::new(VenueService::new(
            venues.clone(),
            reviews.clone(),
            images,
            args.max_image_bytes,
        )),
        reviews: Arc::new(ReviewService::new(reviews, venues.clone())),
        reservations: Arc::new(ReservationService::new(reservations, venues, users, gateway, mailer)),
        tokens,
        callback_key: args
            .verify_callback_signature
            .then(|| args.gateway_server_key.clone()),
        // Leaves room for the multipart framing around the image itself.
        upload_limit: args.max_image_bytes + 64 * 1024,
    };

    let uploads = args.local_image_route().map(|route| api::StaticFiles {
        route,
        dir: args.image_dir.clone(),
    });

    let app = api::create_router(app_state, uploads);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port)).await?;

    info!("Booking service web server started on port {}", args.port);

    axum::serve(listener, app).await?;

    Ok(())
}
