//! Application systems
//!
//! Window handling and the headless run mode, kept out of main.rs.

mod headless;
mod window;

pub use headless::{run_headless, HeadlessSummary};
pub use window::{WindowError, WindowSystem};
