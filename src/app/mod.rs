mod runtime;
mod startup;


pub use runtime::{run, ShutdownReason};
pub use startup::{build_server, open_cameras, SourceOpener};
