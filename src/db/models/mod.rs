mod appointment;
mod availability_window;
mod provider;

pub use appointment::*;
pub use availability_window::*;
pub use provider::*;
