//! Upstream data for the root component.
//!
//! Stands in for a database or API call. It is awaited before the component
//! tree is built, so the serializer itself never suspends.

use std::time::Duration;

use serde::Serialize;
use tessera_markup::Value;

/// One row of server data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerItem {
    pub id: u32,
    pub name: String,
}

/// Payload rendered by the server panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerData {
    pub message: String,
    /// Human-readable date, e.g. `Mon Oct 19 2026`
    pub timestamp: String,
    pub items: Vec<ServerItem>,
}

impl ServerData {
    /// Fetch the data after simulating `delay` of upstream latency.
    pub async fn load(delay: Duration) -> Self {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        Self {
            message: "This data was fetched on the server".to_string(),
            timestamp: chrono::Local::now().format("%a %b %d %Y").to_string(),
            items: (1..=3)
                .map(|id| ServerItem {
                    id,
                    name: format!("Server Item {}", id),
                })
                .collect(),
        }
    }

    /// Convert to a prop value.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        Ok(Value::from_json(serde_json::to_value(self)?))
    }
}
