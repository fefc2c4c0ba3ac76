use crate::error::Result;
use crate::grpc::billing::billing_server::BillingServer as BillingServiceServer;
use crate::grpc::BillingGrpcServer;
use coin_ledger::{Config, Ledger};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::{error, info};

pub struct BillingServer {
    config: Arc<Config>,
    ledger: Arc<Ledger>,
}

impl BillingServer {
    pub fn new(config: Config) -> Result<Self> {
        let ledger = Arc::new(Ledger::from_config(&config)?);

        info!(
            "Ledger initialized with {} accounts, emission limit {}",
            ledger.population(),
            config.emission.max_amount
        );

        Ok(Self {
            config: Arc::new(config),
            ledger,
        })
    }

    /// Bind the configured address and serve until Ctrl-C
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self.config.grpc_listen_addr.parse()?;
        let listener = TcpListener::bind(addr).await?;

        self.run(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(
            "{} v{} gRPC server listening on {}",
            self.config.service_name,
            self.config.service_version,
            listener.local_addr()?
        );

        let grpc_server = BillingGrpcServer::new(self.ledger.clone());

        Server::builder()
            .add_service(BillingServiceServer::new(grpc_server))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
            .await?;

        info!("gRPC server stopped");
        self.log_metrics();

        Ok(())
    }

    fn log_metrics(&self) {
        match self.ledger.metrics().encode() {
            Ok(text) => info!("Final ledger metrics:\n{}", text),
            Err(e) => error!("Failed to encode metrics: {}", e),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
