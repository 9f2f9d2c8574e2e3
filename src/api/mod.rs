pub mod handlers;
pub mod render;
pub mod routes;
pub mod server;
pub mod state;

pub use render::{Presenter, NO_DATA_MESSAGE};
pub use routes::create_router;
pub use server::start_api_server;
pub use state::AppState;
