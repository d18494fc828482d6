pub mod app;
pub mod auth;
pub mod config;
pub mod lectures;
pub mod photos;
pub mod registrations;
pub mod state;
pub mod storage;
