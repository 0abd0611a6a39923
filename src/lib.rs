// Wiki Gateway - authenticated client for the wiki API

pub mod api;
pub mod auth;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod http_client;
pub mod models;
