//! Results dashboard
//!
//! Read-only HTTP view of a finished run.

mod page;
mod routes;
mod server;

pub use page::render_html;
pub use routes::{dashboard_routes, HealthResponse};
pub use server::DashboardServer;
