pub mod chat;
pub mod messaging;
