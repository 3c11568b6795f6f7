// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Health status reported by feature sources

use serde::{Deserialize, Serialize};

/// Health status of a feature source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum HealthStatus {
    /// Source is readable and offers collections
    Up,
    /// Source is readable but cannot serve anything useful
    Degraded { reason: String },
    /// Source cannot be read
    Down { reason: String },
}

impl HealthStatus {
    /// Check if this health status indicates the source is available
    pub fn is_available(&self) -> bool {
        matches!(self, HealthStatus::Up | HealthStatus::Degraded { .. })
    }

    /// Get a human-readable description of the status
    pub fn description(&self) -> &str {
        match self {
            HealthStatus::Up => "Feature source is healthy",
            HealthStatus::Degraded { reason } | HealthStatus::Down { reason } => reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability() {
        assert!(HealthStatus::Up.is_available());
        assert!(
            HealthStatus::Degraded {
                reason: "empty".into()
            }
            .is_available()
        );
        let down = HealthStatus::Down {
            reason: "directory missing".into(),
        };
        assert!(!down.is_available());
        assert_eq!(down.description(), "directory missing");
    }

    #[test]
    fn serializes_with_status_tag() {
        let json = serde_json::to_value(HealthStatus::Up).unwrap();
        assert_eq!(json, serde_json::json!({"status": "up"}));
    }
}
