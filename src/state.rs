use crate::{
    config::Config,
    services::{ProfileClient, RelationshipClient},
    websocket::RoomRegistry,
};
use deadpool_postgres::Pool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool,
    pub registry: RoomRegistry,
    pub config: Arc<Config>,
    pub relationships: Arc<RelationshipClient>,
    pub profiles: Arc<ProfileClient>,
}
