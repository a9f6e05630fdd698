use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, App, HttpServer};

use linkoja::clients::{GoogleTokenClient, HttpEmailClient, TermiiClient};
use linkoja::clock::SystemClock;
use linkoja::config::AppConfig;
use linkoja::database::Database;
use linkoja::security::{BcryptHasher, JwtService};
use linkoja::services::{Collaborators, Services};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|err| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string())
    })?;
    let bind_address = config.bind_address();

    let db = Database::connect(&config.database_url).await.map_err(|err| {
        log::error!("Failed to initialize database: {err:?}");
        std::io::Error::new(std::io::ErrorKind::Other, err)
    })?;
    log::info!("Database connection established");

    if config.sms.api_key.is_none() {
        log::warn!("TERMII_API_KEY not set; OTP SMS delivery will fail");
    }
    if config.email.api_url.is_none() {
        log::warn!("EMAIL_API_URL not set; outbound email is disabled");
    }

    let services = Services::new(Collaborators {
        store: Arc::new(db),
        hasher: Arc::new(BcryptHasher::new(config.bcrypt_cost)),
        jwt: JwtService::new(&config.jwt),
        google: Arc::new(GoogleTokenClient::new(&config.google, config.http_timeout)),
        sms: Arc::new(TermiiClient::new(&config.sms, config.http_timeout)),
        email: Arc::new(HttpEmailClient::new(&config.email, config.http_timeout)),
        clock: Arc::new(SystemClock),
    });

    log::info!("Starting Linkoja directory service on {}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .configure(linkoja::configure(services.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
