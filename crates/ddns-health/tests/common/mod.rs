//! Scripted listeners for driving the server lifecycle

#![allow(dead_code)]

use async_trait::async_trait;
use ddns_health::Listener;
use std::io;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub enum Behaviour {
    /// Serve until asked to shut down
    Obedient,
    /// Ignore the shutdown request and never return
    Stuck,
    /// Fail the first `n` attempts, then serve normally
    CrashTimes(usize),
    /// Fail every attempt
    CrashAlways,
    /// Cancel the given token, then return before anyone observes it
    CancelAndExit(CancellationToken),
}

pub struct ScriptedListener {
    behaviour: Behaviour,
    attempts: Arc<AtomicUsize>,
    started: mpsc::UnboundedSender<usize>,
}

pub struct Probe {
    attempts: Arc<AtomicUsize>,
    started: mpsc::UnboundedReceiver<usize>,
}

impl ScriptedListener {
    pub fn new(behaviour: Behaviour) -> (Self, Probe) {
        let attempts = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::unbounded_channel();
        let listener = Self {
            behaviour,
            attempts: Arc::clone(&attempts),
            started: tx,
        };
        (listener, Probe { attempts, started: rx })
    }
}

impl Probe {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Wait for the next serving attempt and return its ordinal
    pub async fn next_attempt(&mut self) -> usize {
        self.started.recv().await.expect("listener dropped")
    }
}

#[async_trait]
impl Listener for ScriptedListener {
    async fn serve(&self, shutdown: CancellationToken) -> io::Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.started.send(attempt);

        match &self.behaviour {
            Behaviour::Obedient => {}
            Behaviour::Stuck => std::future::pending::<()>().await,
            Behaviour::CrashTimes(n) if attempt <= *n => {
                return Err(io::Error::other(format!("crash #{attempt}")));
            }
            Behaviour::CrashTimes(_) => {}
            Behaviour::CrashAlways => return Err(io::Error::other("address in use")),
            Behaviour::CancelAndExit(token) => {
                token.cancel();
                return Ok(());
            }
        }

        shutdown.cancelled().await;
        Ok(())
    }
}

/// In-memory log sink for asserting on emitted events
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// Plain-text subscriber writing into this buffer
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .finish()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Number of log lines containing `message`
    pub fn count(&self, message: &str) -> usize {
        self.contents()
            .lines()
            .filter(|line| line.contains(message))
            .count()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
