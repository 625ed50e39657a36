//! HTTP listener.
//!
//! Binds a TCP socket and serves the application's gated router with
//! `axum::serve`. Closing stops accepting new connections and waits for
//! in-flight requests to finish.

use futures_util::future::BoxFuture;
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::ListenerConfig;
use crate::error::ListenerError;
use crate::lifecycle::Application;
use crate::net::listener::Listener;

/// HTTP/1.1 listener backed by axum.
#[derive(Debug)]
pub struct HttpListener {
    host: String,
    port: u16,
    domain: Option<String>,
    bound: Option<SocketAddr>,
    running: Option<Running>,
}

#[derive(Debug)]
struct Running {
    stop: oneshot::Sender<()>,
    task: JoinHandle<io::Result<()>>,
}

impl HttpListener {
    pub fn new(config: &ListenerConfig) -> Self {
        Self {
            host: config.resolved_host(),
            port: config.resolved_port(),
            domain: config.domain.clone(),
            bound: None,
            running: None,
        }
    }

    fn bind_address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Listener for HttpListener {
    fn kind(&self) -> &'static str {
        "http"
    }

    fn start<'a>(&'a mut self, app: &'a Application) -> BoxFuture<'a, Result<SocketAddr, ListenerError>> {
        Box::pin(async move {
            let address = self.bind_address();
            let listener = TcpListener::bind(&address)
                .await
                .map_err(|source| ListenerError::Bind {
                    address: address.clone(),
                    source,
                })?;
            let local_addr = listener
                .local_addr()
                .map_err(|source| ListenerError::Bind { address, source })?;

            let (stop, stopped) = oneshot::channel::<()>();
            let service = app.http_service();
            let task = tokio::spawn(async move {
                axum::serve(listener, service)
                    .with_graceful_shutdown(async move {
                        let _ = stopped.await;
                    })
                    .await
            });

            self.bound = Some(local_addr);
            self.running = Some(Running { stop, task });
            Ok(local_addr)
        })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), ListenerError>> {
        Box::pin(async move {
            // Never started: nothing to close.
            let Some(Running { stop, task }) = self.running.take() else {
                return Ok(());
            };
            let _ = stop.send(());
            match task.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(ListenerError::Close(e)),
                Err(e) => Err(ListenerError::Task(e.to_string())),
            }
        })
    }

    fn describe_address(&self) -> String {
        let host = self.domain.as_deref().unwrap_or(&self.host);
        let port = self.bound.map(|addr| addr.port()).unwrap_or(self.port);
        let host = if host.contains(':') {
            format!("[{}]", host)
        } else {
            host.to_string()
        };
        if port == 80 {
            format!("http://{}/", host)
        } else {
            format!("http://{}:{}/", host, port)
        }
    }
}
