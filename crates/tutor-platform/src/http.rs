//! `HttpPort` over the browser's `fetch()` via gloo-net.
//!
//! Paths are appended to the configured API base URL. Every request races a
//! timer; the loser is dropped, which aborts nothing on the wire but frees
//! the caller.

use async_trait::async_trait;
use futures::future::{select, Either};
use gloo_net::http::Request;
use gloo_timers::future::TimeoutFuture;

use tutor_core::ports::{HttpPort, HttpRequest, HttpResponse, Method};
use tutor_types::{config::TutorConfig, Result, TutorError};

pub struct FetchHttp {
    base_url: String,
    timeout_ms: u64,
}

impl FetchHttp {
    pub fn new(config: &TutorConfig) -> Self {
        Self {
            base_url: config.base_url().to_string(),
            timeout_ms: config.request_timeout_ms,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn fetch(&self, req: HttpRequest) -> Result<HttpResponse> {
        let url = self.url(&req.path);
        let mut builder = match req.method {
            Method::Get => Request::get(&url),
            Method::Post => Request::post(&url),
            Method::Put => Request::put(&url),
            Method::Patch => Request::patch(&url),
            Method::Delete => Request::delete(&url),
        };
        for (name, value) in &req.headers {
            builder = builder.header(name, value);
        }

        let request = match req.body {
            Some(body) => builder.body(body),
            None => builder.build(),
        }
        .map_err(|e| TutorError::Network(e.to_string()))?;

        let response = request
            .send()
            .await
            .map_err(|e| TutorError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TutorError::Network(e.to_string()))?;

        log::debug!("{} {} → {}", req.method.as_str(), url, status);
        Ok(HttpResponse { status, body })
    }
}

#[async_trait(?Send)]
impl HttpPort for FetchHttp {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse> {
        let timeout = TimeoutFuture::new(self.timeout_ms.min(u32::MAX as u64) as u32);
        match select(Box::pin(self.fetch(req)), timeout).await {
            Either::Left((result, _)) => result,
            Either::Right(((), _)) => {
                log::warn!("request timed out after {}ms", self.timeout_ms);
                Err(TutorError::Timeout(self.timeout_ms))
            }
        }
    }
}
