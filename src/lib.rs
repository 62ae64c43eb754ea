pub mod app;
pub mod capture;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod gateway;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod profile;
pub mod state;
pub mod storage;
pub mod ui;
pub mod weight;

pub use app::router;
pub use config::Settings;
pub use gateway::GeminiClient;
pub use state::AppState;
pub use storage::load_data;
