pub mod dto;
pub mod handlers;
pub mod repo;

pub use handlers::routes as router;
