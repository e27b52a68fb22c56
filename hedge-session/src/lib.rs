//! Front-end session logic: who is connected, what they are looking at, and
//! which external calls are in flight.

pub mod dashboard;
pub mod operation;
pub mod state;

pub use dashboard::Dashboard;
pub use operation::{Operation, Tracked};
pub use state::{Session, View};
