use basket_order_service::{build_server, create_pool, order_service, run_migrations, AppConfig};
use dotenvy::dotenv;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let pool = create_pool(&config.database_url, config.db_pool_size)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    run_migrations(&pool)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    log::info!(
        "Starting server at http://{}:{} (currency {})",
        config.host,
        config.port,
        config.currency
    );

    build_server(order_service(pool, &config.currency), &config.host, config.port)?.await
}
