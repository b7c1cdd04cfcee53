use crate::backend::{Backend, ConnectionGuard};
use crate::balance::Balancer;
use crate::metrics;
use async_trait::async_trait;
use bytes::Bytes;
use http::{StatusCode, header};
use pingora::prelude::*;
use pingora::{Custom, Error};
use pingora_http::{RequestHeader, ResponseHeader};
use std::sync::Arc;

/// The forwarder: routes the configured resource paths through the balancer
/// and proxies each request to the selected backend over plain HTTP/1.1.
pub struct Gateway {
    balancer: Arc<Balancer>,
    resources: Vec<String>,
}

impl Gateway {
    pub fn new(balancer: Arc<Balancer>, resources: Vec<String>) -> Self {
        Self {
            balancer,
            resources,
        }
    }

    async fn respond_text(
        &self,
        session: &mut Session,
        status: StatusCode,
        body: &'static str,
    ) -> pingora::Result<()> {
        let mut resp = ResponseHeader::build(status, None)?;
        resp.insert_header(header::CONTENT_TYPE, "text/plain; charset=utf-8")?;
        resp.insert_header(header::CONTENT_LENGTH, body.len().to_string())?;

        session.write_response_header(Box::new(resp), false).await?;
        session
            .write_response_body(Some(Bytes::from_static(body.as_bytes())), true)
            .await?;

        Ok(())
    }
}

pub struct RequestCtx {
    backend: Option<Arc<Backend>>,
    /// Holds the active-connection increment; released exactly once when the
    /// ctx drops, whichever way the request ends.
    _guard: Option<ConnectionGuard>,
}

#[async_trait]
impl ProxyHttp for Gateway {
    type CTX = RequestCtx;

    fn new_ctx(&self) -> Self::CTX {
        RequestCtx {
            backend: None,
            _guard: None,
        }
    }

    /// ACCEPT → ROUTE → SELECT, or answer directly (health, 404, 503).
    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> Result<bool> {
        let req = session.req_header();
        let path = req.uri.path().to_string();
        let method = req.method.as_str().to_string();

        if path == "/health" {
            self.respond_text(session, StatusCode::OK, "ok").await?;
            return Ok(true);
        }

        if !self.resources.iter().any(|resource| resource == &path) {
            self.respond_text(session, StatusCode::NOT_FOUND, "not found")
                .await?;
            return Ok(true);
        }

        // The client address doubles as the stickiness key for the keyed policy.
        let key = session.client_addr().map(|addr| addr.to_string());

        let Some(backend) = self.balancer.select(key.as_deref()) else {
            tracing::warn!(path, "no available servers");
            self.respond_text(session, StatusCode::SERVICE_UNAVAILABLE, "no available servers")
                .await?;
            return Ok(true);
        };

        metrics::observe_request(&method, &path, self.balancer.algorithm().as_str());

        ctx._guard = Some(ConnectionGuard::acquire(backend.clone()));
        ctx.backend = Some(backend);

        Ok(false)
    }

    async fn upstream_peer(
        &self,
        _session: &mut Session,
        ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        let backend = ctx
            .backend
            .as_ref()
            .ok_or_else(|| Error::new(Custom("no backend selected")))?;

        tracing::debug!(server = backend.url(), "forwarding request");

        // Upstreams always speak plain HTTP, whatever the front-end scheme.
        let peer = HttpPeer::new((backend.host(), backend.port()), false, String::new());
        Ok(Box::new(peer))
    }

    async fn upstream_request_filter(
        &self,
        _session: &mut Session,
        upstream: &mut RequestHeader,
        ctx: &mut Self::CTX,
    ) -> Result<()> {
        // Everything else streams through untouched.
        if let Some(backend) = ctx.backend.as_ref() {
            upstream.insert_header(header::HOST, backend.url())?;
        }
        Ok(())
    }

    /// FINAL OBSERVATION: outcome logging only. Transport errors have already
    /// been answered (502/500 per pingora's classification); the guard in the
    /// ctx releases the connection count right after this hook.
    async fn logging(&self, session: &mut Session, e: Option<&Error>, ctx: &mut Self::CTX)
    where
        Self::CTX: Send + Sync,
    {
        let server = ctx.backend.as_ref().map(|backend| backend.url());

        if let Some(error) = e {
            tracing::error!(server, error = %error, "failed to forward request");
            return;
        }

        if let Some(server) = server {
            let status = session
                .response_written()
                .map(|resp| resp.status.as_u16())
                .unwrap_or(0);
            tracing::debug!(server, status, "request complete");
        }
    }
}
