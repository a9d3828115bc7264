pub mod watch;

pub use watch::{TickOutcome, TickReport, WatchLoop};
