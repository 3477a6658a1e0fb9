pub mod repository;
pub mod service;

pub use repository::ChatRepository;
pub use service::{ChatDomainService, ChatDomainServiceImpl};
