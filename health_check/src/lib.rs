use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;

/// The health of a single component, as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatusKind {
    NotReady,
    Ready,
    Affected,
    ShutDown,
}

impl HealthStatusKind {
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready | Self::Affected)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: HealthStatusKind,
    pub details: Option<serde_json::Value>,
}

impl HealthStatus {
    pub fn ready() -> Self {
        Self {
            status: HealthStatusKind::Ready,
            details: None,
        }
    }

    pub fn not_ready() -> Self {
        Self {
            status: HealthStatusKind::NotReady,
            details: None,
        }
    }

    pub fn affected(details: impl Serialize) -> Self {
        Self {
            status: HealthStatusKind::Affected,
            details: serde_json::to_value(details).ok(),
        }
    }

    pub fn ready_with_details(details: impl Serialize) -> Self {
        Self {
            status: HealthStatusKind::Ready,
            details: serde_json::to_value(details).ok(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status.is_ready()
    }
}

/// A named, pollable component health check. Implemented by anything the
/// process wants to surface on an aggregate `/health` endpoint — here,
/// the connection pool.
#[async_trait]
pub trait CheckHealth: Send + Sync + 'static {
    fn name(&self) -> &'static str;
    async fn check_health(&self) -> HealthStatus;
}

/// A health check whose status is pushed by the owning component rather
/// than polled, backed by a `tokio::sync::watch` channel.
#[derive(Debug, Clone)]
pub struct ReactiveHealthCheck {
    name: &'static str,
    receiver: watch::Receiver<HealthStatusKind>,
}

impl ReactiveHealthCheck {
    pub fn new(name: &'static str) -> (watch::Sender<HealthStatusKind>, Self) {
        let (sender, receiver) = watch::channel(HealthStatusKind::NotReady);
        (sender, Self { name, receiver })
    }
}

#[async_trait]
impl CheckHealth for ReactiveHealthCheck {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn check_health(&self) -> HealthStatus {
        let status = *self.receiver.borrow();
        HealthStatus {
            status,
            details: None,
        }
    }
}

/// Aggregates all registered component checks into one report.
#[derive(Debug, Default)]
pub struct AppHealthCheck {
    checks: Vec<Box<dyn CheckHealth>>,
}

impl AppHealthCheck {
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    pub fn insert(&mut self, check: Box<dyn CheckHealth>) {
        self.checks.push(check);
    }

    pub async fn check_health(&self) -> AppHealth {
        let mut components = HashMap::with_capacity(self.checks.len());
        let mut overall_ready = true;
        for check in &self.checks {
            let status = check.check_health().await;
            overall_ready &= status.is_ready();
            components.insert(check.name().to_string(), status);
        }
        AppHealth {
            ready: overall_ready,
            components,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AppHealth {
    pub ready: bool,
    pub components: HashMap<String, HealthStatus>,
}
