mod config;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod state;
mod utils;

use crate::config::Config;
use crate::middleware::{create_cors, RequestLogging};
use crate::routes::{api_v1_routes, callback_routes, public_routes};
use crate::services::{
    DonationNotifier, DonationRepository, EmailJsNotifier, InMemoryDonationRepository,
    LogNotifier, PayuClient, PgDonationRepository,
};
use crate::state::AppState;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use chrono::Local;
use log::{info, warn};
use std::io;
use std::io::Write;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    let mut log_builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    log_builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S %:z"),
                record.level(),
                record.args()
            )
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e)) // 转换为 io::Result
        })
        .init();

    // 加载配置
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let payu = PayuClient::new(config.payu.clone())?;

    // 捐赠记录存储
    let donations: Arc<dyn DonationRepository> = match &config.database.url {
        Some(url) => Arc::new(PgDonationRepository::connect(url, &config.database).await?),
        None => {
            warn!("DATABASE_URL is not set, donations are kept in memory only");
            Arc::new(InMemoryDonationRepository::new())
        }
    };

    // 捐赠通知
    let notifier: Arc<dyn DonationNotifier> =
        match EmailJsNotifier::from_config(&config.notification)? {
            Some(notifier) => Arc::new(notifier),
            None => {
                info!("EmailJS is not configured, donation notifications are logged only");
                Arc::new(LogNotifier)
            }
        };

    let bind_address = config.bind_address();
    let workers = config.server.workers;
    let allowed_origins = config.server.allowed_origins.clone();

    let app_state = web::Data::new(AppState::new(config, payu, donations, notifier));
    if app_state.upi.is_none() {
        info!("UPI_ID is not set, UPI payment links are disabled");
    }

    info!("Starting donation payment server on {}", bind_address);

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(create_cors(&allowed_origins))
            .wrap(RequestLogging)
            .service(api_v1_routes())
            .service(callback_routes())
            .service(public_routes())
    });

    if let Some(workers) = workers {
        server = server.workers(workers);
    }

    server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run()
        .await?;

    info!("Server stopped");
    Ok(())
}
