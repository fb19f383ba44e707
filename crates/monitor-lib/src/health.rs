//! Liveness and readiness state for the monitor service
//!
//! Components report a status; the overall status is the worst of them.
//! The data source component is graded after every evaluation from how
//! many holding/metric pairs came back without data, and the most recent
//! evaluation is echoed in the health response.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Component status, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Serving, but some requests to it fail
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl ComponentHealth {
    pub fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            checked_at: Utc::now(),
        }
    }
}

/// Outcome counts of one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub as_of: NaiveDate,
    pub metrics_evaluated: usize,
    pub data_unavailable: usize,
    pub completed_at: DateTime<Utc>,
}

impl EvaluationSummary {
    pub fn new(as_of: NaiveDate, metrics_evaluated: usize, data_unavailable: usize) -> Self {
        Self {
            as_of,
            metrics_evaluated,
            data_unavailable,
            completed_at: Utc::now(),
        }
    }

    /// Data source grade implied by this evaluation, `None` when it
    /// requested nothing
    fn source_health(&self) -> Option<ComponentHealth> {
        let (total, missing) = (self.metrics_evaluated, self.data_unavailable);
        match missing {
            _ if total == 0 => None,
            0 => Some(ComponentHealth::new(ComponentStatus::Healthy, None)),
            m if m >= total => Some(ComponentHealth::new(
                ComponentStatus::Unhealthy,
                Some(format!("No data for any of {} metrics", total)),
            )),
            m => Some(ComponentHealth::new(
                ComponentStatus::Degraded,
                Some(format!("No data for {} of {} metrics", m, total)),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluation: Option<EvaluationSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names
pub mod components {
    pub const DATA_SOURCE: &str = "data_source";
    pub const ENGINE: &str = "engine";
}

#[derive(Debug, Default)]
struct RegistryState {
    components: BTreeMap<String, ComponentHealth>,
    last_evaluation: Option<EvaluationSummary>,
    ready: bool,
}

impl RegistryState {
    fn overall(&self) -> ComponentStatus {
        self.components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy)
    }
}

/// Shared health state, cheap to clone into handlers
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component as healthy
    pub async fn register(&self, name: &str) {
        self.set(name, ComponentStatus::Healthy, None).await;
    }

    pub async fn set(&self, name: &str, status: ComponentStatus, message: Option<String>) {
        self.state
            .write()
            .await
            .components
            .insert(name.to_string(), ComponentHealth::new(status, message));
    }

    /// Remember `summary` and regrade the data source from it
    pub async fn record_evaluation(&self, summary: EvaluationSummary) {
        let mut state = self.state.write().await;
        if let Some(health) = summary.source_health() {
            state
                .components
                .insert(components::DATA_SOURCE.to_string(), health);
        }
        state.last_evaluation = Some(summary);
    }

    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.ready = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        HealthResponse {
            status: state.overall(),
            components: state.components.clone(),
            last_evaluation: state.last_evaluation.clone(),
        }
    }

    /// Ready once started, as long as no component is unhealthy
    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;

        let reason = if !state.ready {
            Some("Monitor not yet initialized".to_string())
        } else {
            state
                .components
                .iter()
                .find(|(_, c)| c.status == ComponentStatus::Unhealthy)
                .map(|(name, _)| format!("Component '{}' is unhealthy", name))
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}
