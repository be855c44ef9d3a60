pub mod chat;
pub mod message;

pub use chat::{canonical_pair, Chat, ChatKind};
pub use message::Message;
