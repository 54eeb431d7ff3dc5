//! HTTP request handlers for Casting Agency.

pub mod actors;
pub mod health;
pub mod metrics;
pub mod movies;
mod payload;

pub use actors::{create_actor, delete_actor, list_actors, update_actor};
pub use health::{greeting, health_check};
pub use metrics::metrics_handler;
pub use movies::{create_movie, delete_movie, list_movies, update_movie};
