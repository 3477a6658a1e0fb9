pub mod error;
pub mod events;
pub mod ids;
pub mod jwt;
pub mod models;

pub use error::{CoreError, ErrorFrame, ErrorMapper};
pub use events::DomainEvent;
pub use ids::{ChatId, ClientMessageId, MessageId, UserId};
pub use jwt::{AuthConfig, TokenManager, TokenVerifier, UserClaims};
pub use models::{
    Chat, ChatRole, ListMessagesQuery, MediaType, Message, MessageCursor, Participant,
    PerUserChatDeletion, SendMessage, UNSENT_SENTINEL,
};
