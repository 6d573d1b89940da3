mod body;
mod extract;
mod handlers;
mod middleware;
mod routes;
mod static_files;
mod views;


pub use body::FormBody;
pub use middleware::ViewLocals;
pub use routes::{create_router, with_pipeline};
