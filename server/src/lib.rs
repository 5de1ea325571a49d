pub mod app;
pub mod error;
pub mod logging;
pub mod routes;
pub mod session;
pub mod state;

pub use app::router;
pub use error::{ApiError, ServeError};
pub use state::AppState;
