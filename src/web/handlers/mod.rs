pub mod auth;
pub mod friends;
pub mod health;
pub mod posts;
