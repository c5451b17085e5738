pub mod auth;
pub mod specs;
