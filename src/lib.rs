pub mod app;
pub mod capture;
pub mod color;
pub mod data;
pub mod state;
pub mod ui;
