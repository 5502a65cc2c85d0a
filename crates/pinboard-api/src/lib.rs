pub mod categories;
pub mod error;
pub mod extract;
pub mod health;
pub mod messages;
pub mod posts;
pub mod routes;
pub mod state;
pub mod status;
pub mod users;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner};
