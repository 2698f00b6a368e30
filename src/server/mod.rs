//! HTTP surface: request routing, configuration RPC and MJPEG streaming

pub mod dispatcher;
pub mod request;
pub mod response;
pub mod scheduler;
pub mod session;
pub mod stats;

pub use request::Route;
pub use response::{Response, Status};
pub use scheduler::Server;
pub use session::{handle_connection, SessionContext, SessionError, StreamSettings};
pub use stats::{ServerStats, StatsSnapshot, StreamStats};
