//! Test server harness for end-to-end gRPC testing.
//!
//! Provides `TestAuthServer`, which runs the real handlers behind the real
//! request gate on a random local port, over the in-memory stores.

use crate::fixtures::TestServices;
use crate::mock_session_store::MockSessionStore;
use crate::mock_user_repository::MockUserRepository;
use auth_proto::auth_service_client::AuthServiceClient;
use auth_proto::auth_service_server::AuthServiceServer;
use auth_service::grpc::auth_service::AuthGrpcService;
use auth_service::grpc::policy::PolicyTable;
use auth_service::grpc::request_gate::RequestGateLayer;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::{Channel, Server};

/// In-process auth server for E2E tests.
///
/// # Example
/// ```rust,ignore
/// let server = TestAuthServer::spawn(MockSessionStore::new(), users).await?;
/// let mut client = server.client().await?;
/// let pair = client.login_admin(LoginRequest { .. }).await?;
/// ```
pub struct TestAuthServer {
    addr: SocketAddr,
    services: TestServices,
    shutdown: Option<oneshot::Sender<()>>,
    _handle: JoinHandle<()>,
}

impl TestAuthServer {
    /// Bind to `127.0.0.1:0` and serve in the background.
    pub async fn spawn(
        store: MockSessionStore,
        users: MockUserRepository,
    ) -> Result<Self, anyhow::Error> {
        let services = TestServices::new(store, users);

        let policies = Arc::new(
            PolicyTable::auth_service()
                .map_err(|e| anyhow::anyhow!("Failed to build policy table: {}", e))?,
        );
        let handlers = AuthGrpcService::new(
            services.login.clone(),
            services.rotator.clone(),
            services.user_service.clone(),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;
        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = Server::builder()
            .layer(RequestGateLayer::new(policies, services.verifier.clone()))
            .add_service(AuthServiceServer::new(handlers))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                let _ = shutdown_rx.await;
            });

        let handle = tokio::spawn(async move {
            if let Err(e) = server.await {
                eprintln!("Test server error: {}", e);
            }
        });

        // Give server time to start
        tokio::time::sleep(Duration::from_millis(20)).await;

        Ok(Self {
            addr,
            services,
            shutdown: Some(shutdown_tx),
            _handle: handle,
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Services and stores backing the server.
    pub fn services(&self) -> &TestServices {
        &self.services
    }

    /// Connect a new client.
    pub async fn client(&self) -> Result<AuthServiceClient<Channel>, anyhow::Error> {
        AuthServiceClient::connect(self.url())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to test server: {}", e))
    }
}

impl Drop for TestAuthServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Wrap `message` in a request carrying `Authorization: Bearer <token>`.
pub fn bearer_request<T>(message: T, token: &str) -> tonic::Request<T> {
    let mut request = tonic::Request::new(message);
    let value: MetadataValue<Ascii> = format!("Bearer {}", token)
        .parse()
        .expect("bearer header should be valid metadata");
    request.metadata_mut().insert("authorization", value);
    request
}
