pub mod app;
pub mod calendar;
pub mod config;
pub mod database;
pub mod errors;
pub mod feed;
pub mod handlers;
pub mod models;
pub mod state;
pub mod storage;
pub mod store;
pub mod summary;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use store::{Backend, CheckedDayStore};
