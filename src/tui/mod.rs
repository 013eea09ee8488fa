//! TUI module: Terminal User Interface using Ratatui.
//!
//! A single page, mirroring the web form it replaces:
//! - Patient data input (two columns)
//! - Prediction result and probability
//! - Disclaimer

mod app;
mod styles;
mod ui;

pub use app::App;
pub use styles::HeartTheme;
pub use ui::form::PatientFormState;
