//! Runtime configuration for the peer session and sync controller.

/// Default buffer size of the inbound message and controller event channels.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Configuration for [`PeerSession`](crate::PeerSession) and
/// [`SyncController`](crate::SyncController).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Human-readable device name, attached to log events.
    pub device_name: String,
    /// Inbound envelopes buffered per subscriber before it starts lagging.
    pub inbound_capacity: usize,
    /// Controller events buffered per subscriber before it starts lagging.
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            device_name: "rooh-avatar device".to_string(),
            inbound_capacity: DEFAULT_CHANNEL_CAPACITY,
            event_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl SyncConfig {
    /// Set the device name.
    pub fn with_device_name(mut self, name: &str) -> Self {
        self.device_name = name.to_string();
        self
    }

    /// Set the inbound buffer size. Zero is raised to one.
    pub fn with_inbound_capacity(mut self, capacity: usize) -> Self {
        self.inbound_capacity = capacity.max(1);
        self
    }

    /// Set the controller event buffer size. Zero is raised to one.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.device_name, "rooh-avatar device");
        assert_eq!(config.inbound_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(config.event_capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn config_builder_pattern() {
        let config = SyncConfig::default()
            .with_device_name("Watch")
            .with_inbound_capacity(8)
            .with_event_capacity(16);

        assert_eq!(config.device_name, "Watch");
        assert_eq!(config.inbound_capacity, 8);
        assert_eq!(config.event_capacity, 16);
    }

    #[test]
    fn zero_capacity_is_raised() {
        let config = SyncConfig::default()
            .with_inbound_capacity(0)
            .with_event_capacity(0);
        assert_eq!(config.inbound_capacity, 1);
        assert_eq!(config.event_capacity, 1);
    }
}
