// # ddns-health
//
// Liveness probe server for the DDNS daemon.
//
// ## Architecture
//
// - **router**: axum router answering `GET /` from an injected health check
// - **Listener**: one serving attempt, ended by a cancellation token
// - **Server**: supervised loop that restarts a crashed listener until
//   cancelled, then shuts it down within a fixed grace period
//
// The server does not define what "healthy" means; the daemon supplies a
// zero-argument check and the server only maps its outcome to a status.

pub mod handler;
pub mod server;

pub use handler::{BoxError, HealthCheck, router};
pub use server::{DEFAULT_GRACE_PERIOD, DEFAULT_RESTART_DELAY, HttpListener, Listener, Server};
