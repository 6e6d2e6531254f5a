pub mod app;
pub mod config;
pub mod metrics_server;
pub mod monitor;
pub mod observability;
pub mod provider;
pub mod state;

pub use app::{App, AppError};
pub use state::{DashboardState, Event};
