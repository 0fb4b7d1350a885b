//! Backend for the video catalog: pages through the NocoDB videos table and
//! narrows results with facet filters carried in the browser's URL.

pub mod cache;
pub mod config;
pub mod error;
pub mod filters;
pub mod nocodb;
pub mod pagination;
pub mod routes;
pub mod state;
pub mod video;

pub use config::Config;
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
