// Typed calls to the wiki API, all routed through the gateway

pub mod articles;
pub mod auth;
pub mod profiles;
