use actix_web::{web, App, HttpServer};
use care_chat_service::{
    config, db, error, logging,
    routes,
    services::{ProfileClient, RelationshipClient},
    state::AppState,
    websocket::RoomRegistry,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);

    let db = db::init_pool(&cfg.database_url).await?;
    db::run_migrations(&db).await?;

    let relationships = Arc::new(RelationshipClient::new(
        cfg.relationship_service_url.clone(),
        cfg.relationship_timeout,
    )?);
    let profiles = Arc::new(ProfileClient::new(
        cfg.profile_service_url.clone(),
        cfg.relationship_timeout,
    )?);
    let registry = RoomRegistry::new();

    let state = AppState {
        db,
        registry,
        config: cfg.clone(),
        relationships,
        profiles,
    };

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting care-chat-service");

    HttpServer::new(move || {
        let cors = actix_cors::Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .service(routes::chats::create_chat)
            .service(routes::chats::list_chats)
            .service(routes::chats::chat_exists)
            .service(routes::messages::get_history)
            .service(routes::messages::mark_read)
            .service(routes::wsroute::ws_handler)
            .route("/health", web::get().to(|| async { "OK" }))
    })
    .bind(&bind_addr)
    .map_err(|e| error::AppError::StartServer(format!("bind: {e}")))?
    .run()
    .await
    .map_err(|e| error::AppError::StartServer(format!("server: {e}")))
}
