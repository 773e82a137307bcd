//! HTTP surface: `/health`, `/api/predict`, `/api/backtest`.

pub mod app;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod state;

pub use app::create_app;
pub use error::{AppError, AppResult};
pub use state::AppState;
