//! Event publication
//!
//! The engine hands every event it raises to [`EventPublisher::publish`].
//! Events that pass the [`EventFilter`] and have at least one listener are
//! serialized into an [`EventEnvelope`] and published on
//! `<prefix>.events.<name>`.

mod filter;
mod publisher;
mod serializer;

pub use filter::{split_list, EventFilter, EventFilterConfig, FilterDecision};
pub use publisher::{EventPublisher, PublishOutcome};
pub use serializer::EventEnvelope;

/// Header carrying the channel UUID
pub const UNIQUE_ID_HEADER: &str = "Unique-ID";

/// One event raised by the telephony engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelephonyEvent {
    pub name: String,
    /// Headers in arrival order; names may repeat
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl TelephonyEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Last value of the header `name` (exact match)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn unique_id(&self) -> Option<&str> {
        self.header(UNIQUE_ID_HEADER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_takes_last_value() {
        let event = TelephonyEvent::new("CHANNEL_CREATE")
            .with_header("Unique-ID", "abc")
            .with_header("Variable", "1")
            .with_header("Variable", "2");
        assert_eq!(event.unique_id(), Some("abc"));
        assert_eq!(event.header("Variable"), Some("2"));
        assert_eq!(event.header("variable"), None);
    }
}
