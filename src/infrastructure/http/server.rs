//! HTTP Server
//!
//! 先绑定监听端口再运行，端口为 0 时由系统分配

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use super::routes::build_router;
use super::state::AppState;
use crate::config::ServerConfig;

/// 已绑定端口的 HTTP 服务器
pub struct HttpServer {
    listener: TcpListener,
    router: Router,
}

impl HttpServer {
    /// 绑定监听地址并组装 Router
    pub async fn bind(settings: &ServerConfig, state: AppState) -> io::Result<Self> {
        let listener = TcpListener::bind(settings.addr()).await?;
        let router = build_router(Arc::new(state), settings);

        tracing::info!(
            addr = %listener.local_addr()?,
            max_body_bytes = settings.max_body_bytes,
            "HTTP server bound"
        );

        Ok(Self { listener, router })
    }

    /// 实际监听地址
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// 运行直到 `shutdown` 完成，等待在途请求结束后返回
    pub async fn run_until<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
