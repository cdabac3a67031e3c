pub mod articles;
pub mod chat;
pub mod health;
pub mod search;
pub mod users;
pub mod ws;
