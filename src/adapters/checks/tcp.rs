//! Reference check: the service is up if a TCP connection succeeds.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::domain::models::CheckTarget;
use crate::domain::ports::CheckCapability;

pub struct TcpCheck {
    connect_timeout: Duration,
}

impl TcpCheck {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for TcpCheck {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl CheckCapability for TcpCheck {
    async fn evaluate(&self, target: &CheckTarget) -> bool {
        let address = target.address();
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(&address)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!(%address, error = %e, "tcp check failed");
                false
            }
            Err(_) => {
                tracing::debug!(%address, "tcp check timed out");
                false
            }
        }
    }
}
