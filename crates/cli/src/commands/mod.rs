pub mod chat;
pub mod classify;
pub mod health;
pub mod moderate;
pub mod onboard;
pub mod profile;
