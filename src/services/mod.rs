pub mod chat_service;
pub mod message_service;
pub mod profile_client;
pub mod relationship_client;

pub use chat_service::{ChatService, ChatSummary};
pub use message_service::MessageService;
pub use profile_client::{ProfileClient, PublicProfile};
pub use relationship_client::RelationshipClient;
