//! Process-wide registry of services currently running in degraded mode
//! (C17). `AppState::get_system_health` surfaces this at `/ready`.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    pub status: HealthStatus,
    pub degraded_services: Vec<String>,
    pub reasons: HashMap<String, String>,
}

#[derive(Default)]
pub struct DegradationManager {
    reasons: RwLock<HashMap<String, String>>,
}

impl DegradationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn degrade(&self, service: &str, reason: String) {
        self.reasons.write().insert(service.to_string(), reason);
    }

    pub fn recover(&self, service: &str) {
        self.reasons.write().remove(service);
    }

    pub fn is_degraded(&self, service: &str) -> bool {
        self.reasons.read().contains_key(service)
    }

    pub fn get_system_health(&self) -> SystemHealth {
        let reasons = self.reasons.read().clone();
        let degraded_services: Vec<String> = reasons.keys().cloned().collect();
        let status = if degraded_services.is_empty() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };
        SystemHealth {
            status,
            degraded_services,
            reasons,
        }
    }
}
