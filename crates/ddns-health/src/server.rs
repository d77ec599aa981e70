// # Health Server
//
// Supervised liveness listener.
//
// ## Lifecycle
//
// 1. `run` starts a listener and logs `listening`
// 2. A listener that exits on its own is logged and restarted after
//    `restart_delay`, for as long as the token stays live
// 3. Cancelling the token asks the current listener to shut down and waits
//    at most `grace_period` for it
// 4. `done` is signalled exactly once, after the listener is gone

use crate::handler::{HealthCheck, router};
use async_trait::async_trait;
use axum::Router;
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Maximum time a listener gets to finish in-flight requests after cancellation
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Pause between a listener crash and the next attempt
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_millis(100);

/// One serving attempt
///
/// `serve` runs until `shutdown` is cancelled (returning `Ok`) or until the
/// listener fails. A listener may be started again after it returns.
#[async_trait]
pub trait Listener: Send + Sync {
    /// Serve until `shutdown` is cancelled or the listener fails
    ///
    /// # Errors
    ///
    /// Returns the I/O error that ended serving, such as a failed bind.
    async fn serve(&self, shutdown: CancellationToken) -> io::Result<()>;
}

/// TCP listener serving the health router
pub struct HttpListener {
    address: String,
    router: Router,
}

impl HttpListener {
    /// Create a listener that binds `address` on every serving attempt
    pub fn new(address: impl Into<String>, router: Router) -> Self {
        Self {
            address: address.into(),
            router,
        }
    }
}

#[async_trait]
impl Listener for HttpListener {
    async fn serve(&self, shutdown: CancellationToken) -> io::Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.address).await?;
        axum::serve(listener, self.router.clone())
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
    }
}

/// Health server
///
/// Owned by the daemon, which cancels the token passed to [`Server::run`] and
/// waits on the completion channel before exiting.
pub struct Server {
    address: String,
    listener: Box<dyn Listener>,
    grace_period: Duration,
    restart_delay: Duration,
}

impl Server {
    /// Create a server answering `GET /` on `address` from `healthcheck`
    pub fn new(address: impl Into<String>, healthcheck: HealthCheck) -> Self {
        let address = address.into();
        let listener = HttpListener::new(address.clone(), router(healthcheck));
        Self::with_listener(address, listener)
    }

    /// Create a server around a custom listener
    ///
    /// `address` is only used for logging.
    pub fn with_listener(address: impl Into<String>, listener: impl Listener + 'static) -> Self {
        Self {
            address: address.into(),
            listener: Box::new(listener),
            grace_period: DEFAULT_GRACE_PERIOD,
            restart_delay: DEFAULT_RESTART_DELAY,
        }
    }

    /// Set how long a cancelled listener may take to finish
    ///
    /// Defaults to [`DEFAULT_GRACE_PERIOD`].
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Set the pause between a listener failure and the next attempt
    ///
    /// Defaults to [`DEFAULT_RESTART_DELAY`].
    pub fn with_restart_delay(mut self, restart_delay: Duration) -> Self {
        self.restart_delay = restart_delay;
        self
    }

    /// Serve until `cancel` fires, then signal `done`
    pub async fn run(self, cancel: CancellationToken, done: oneshot::Sender<()>) {
        self.supervise(&cancel).await;
        // The receiver may already be gone; completion is still reached.
        let _ = done.send(());
    }

    /// Spawn [`Server::run`] and return its completion channel
    pub fn spawn(self, cancel: CancellationToken) -> oneshot::Receiver<()> {
        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(self.run(cancel, done_tx));
        done_rx
    }

    async fn supervise(&self, cancel: &CancellationToken) {
        loop {
            // All cancellations funnel into `shut_down`.
            if cancel.is_cancelled() {
                self.shut_down(std::future::ready(Ok(()))).await;
                return;
            }

            info!(address = %self.address, "listening");

            let mut serving = self.listener.serve(cancel.child_token());
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                result = &mut serving => Some(result),
            };

            let Some(result) = outcome else {
                self.shut_down(serving).await;
                return;
            };

            // The listener returned as shutdown began; report its result as
            // the shutdown outcome instead of restarting.
            if cancel.is_cancelled() {
                self.shut_down(std::future::ready(result)).await;
                return;
            }

            match result {
                Ok(()) => warn!(address = %self.address, "listener exited unexpectedly"),
                Err(e) => error!(address = %self.address, error = %e, "listener failed"),
            }

            info!(address = %self.address, delay = ?self.restart_delay, "restarting");
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(self.restart_delay) => {}
            }
        }
    }

    async fn shut_down(&self, serving: impl Future<Output = io::Result<()>>) {
        warn!(address = %self.address, "shutting down (context canceled)");
        match tokio::time::timeout(self.grace_period, serving).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(address = %self.address, error = %e, "failed shutting down"),
            Err(_) => error!(
                address = %self.address,
                grace_period = ?self.grace_period,
                "failed shutting down: grace period exceeded"
            ),
        }
        warn!(address = %self.address, "shut down");
    }
}
