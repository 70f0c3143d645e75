pub mod aggregate;
pub mod app;
pub mod calendar;
pub mod config;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod models;
pub mod refresh;
pub mod report;
pub mod state;
pub mod store;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use errors::{AppError, StoreError};
pub use state::AppState;
pub use store::{JsonFileStore, RecordStore, SortOrder};
