//! Test doubles for provider update tests

#![allow(dead_code)]

use async_trait::async_trait;
use ddns_core::http::{HttpClient, HttpError, HttpRequest, HttpResponse};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// An HttpClient that answers every request with one scripted response
/// and records what it was sent
pub struct RecordingClient {
    response: Mutex<Option<Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<HttpRequest>>,
    call_count: AtomicUsize,
}

impl RecordingClient {
    pub fn responding(status: u16, body: &str) -> Self {
        let status = http::StatusCode::from_u16(status).expect("valid status code");
        Self::new(Ok(HttpResponse::with_status(status, body.as_bytes().to_vec())))
    }

    pub fn failing(error: HttpError) -> Self {
        Self::new(Err(error))
    }

    fn new(response: Result<HttpResponse, HttpError>) -> Self {
        Self {
            response: Mutex::new(Some(response)),
            requests: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("a request was sent")
    }
}

#[async_trait]
impl HttpClient for RecordingClient {
    async fn request(&self, req: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(req);
        self.response
            .lock()
            .unwrap()
            .take()
            .expect("only one request per update")
    }
}
