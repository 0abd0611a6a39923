// Data models for the wiki API

pub mod article;
pub mod auth;
pub mod profile;
