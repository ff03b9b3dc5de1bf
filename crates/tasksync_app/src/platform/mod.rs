mod app;
mod config;
mod effects;
mod logging;
mod render;
mod shell;

pub use app::run_app;
