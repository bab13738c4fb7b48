use async_trait::async_trait;
use serde::Serialize;
use tlog_health_check::{CheckHealth, HealthStatus};

use crate::connection::ConnectionPool;

#[derive(Debug, Serialize)]
struct ConnectionPoolHealthDetails {
    pool_size: u32,
}

#[derive(Clone, Debug)]
pub struct ConnectionPoolHealthCheck {
    connection_pool: ConnectionPool,
}

impl ConnectionPoolHealthCheck {
    pub fn new(connection_pool: ConnectionPool) -> ConnectionPoolHealthCheck {
        Self { connection_pool }
    }
}

#[async_trait]
impl CheckHealth for ConnectionPoolHealthCheck {
    fn name(&self) -> &'static str {
        "connection_pool"
    }

    async fn check_health(&self) -> HealthStatus {
        if self.connection_pool.access_storage().await.is_err() {
            return HealthStatus::not_ready();
        }
        HealthStatus::ready_with_details(ConnectionPoolHealthDetails {
            pool_size: self.connection_pool.size(),
        })
    }
}
