use actix_web::{middleware, web, App, HttpServer};
use log::{error, info};
use movie_rating_backend::bootstrap;
use movie_rating_backend::config::AppConfig;
use movie_rating_backend::db::connect_db;
use movie_rating_backend::routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    let config = AppConfig::from_env();
    let db = connect_db(&config)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    if let Err(e) = bootstrap::ensure_admin(&db, &config).await {
        error!("admin bootstrap failed: {}", e);
    }
    let server_port = config.server_port;

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(db.clone()))
            .wrap(middleware::Logger::default())
            .configure(routes::configure)
    })
    .bind(("0.0.0.0", server_port))?;
    info!("server started at http://0.0.0.0:{}", server_port);
    server.run().await
}
