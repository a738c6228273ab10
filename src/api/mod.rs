pub mod handlers;
pub mod server;

pub use handlers::{ApiError, AppState, PagingConfig};
pub use server::{build_detector, build_router, run_server, ServerConfig};
