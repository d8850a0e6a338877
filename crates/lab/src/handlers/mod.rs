pub mod assets;
pub mod config;
pub mod experiments;
pub mod ui;
