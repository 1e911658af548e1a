pub mod auth;
pub mod codigos;

pub use auth::SesionService;
