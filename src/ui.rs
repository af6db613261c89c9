//! Ratatui front-end: the table screen, modal dialogs and the terminal loop.
mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
