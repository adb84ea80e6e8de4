//! Progress reporting for pipeline runs

mod console;
mod handler;
mod logging;
mod spinner;

pub use console::ConsoleHandler;
pub use handler::{NoOpHandler, ProgressEvent, ProgressHandler};
pub use logging::LoggingHandler;
pub use spinner::SpinnerHandler;
