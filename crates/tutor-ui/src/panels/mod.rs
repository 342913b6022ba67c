pub mod chat;
pub mod library;
pub mod login;
pub mod notices;
pub mod sessions;
pub mod settings;
