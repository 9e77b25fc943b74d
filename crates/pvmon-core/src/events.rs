// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of PVMon.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Default number of events buffered per subscriber before lagging.
pub const DEFAULT_CAPACITY: usize = 64;

/// Dashboard-wide notification, fanned out to every connected browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardEvent {
    PlantSelected { plant_id: String },
    RegionSelected { region: String },
    DataRefreshed { source: String, count: usize },
}

impl DashboardEvent {
    /// SSE event name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlantSelected { .. } => "plant_selected",
            Self::RegionSelected { .. } => "region_selected",
            Self::DataRefreshed { .. } => "data_refreshed",
        }
    }
}

/// Broadcast channel for [`DashboardEvent`]s. Cloning yields another handle
/// to the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DashboardEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event and returns how many subscribers will see it.
    /// Publishing with nobody listening is not an error.
    pub fn publish(&self, event: DashboardEvent) -> usize {
        let name = event.name();
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(event = name, receivers, "Published dashboard event");
                receivers
            }
            Err(_) => {
                trace!(event = name, "Dropped dashboard event, no subscribers");
                0
            }
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        let delivered = bus.publish(DashboardEvent::RegionSelected {
            region: "south".to_owned(),
        });
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let bus = EventBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.clone().subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(DashboardEvent::PlantSelected {
            plant_id: "p-1".to_owned(),
        });
        bus.publish(DashboardEvent::DataRefreshed {
            source: "fixture".to_owned(),
            count: 25,
        });

        for rx in [&mut first, &mut second] {
            assert_eq!(
                rx.recv().await.unwrap(),
                DashboardEvent::PlantSelected {
                    plant_id: "p-1".to_owned()
                }
            );
            assert_eq!(rx.recv().await.unwrap().name(), "data_refreshed");
        }
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(DashboardEvent::DataRefreshed {
            source: "remote".to_owned(),
            count: 3,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "data_refreshed", "source": "remote", "count": 3})
        );
    }
}
