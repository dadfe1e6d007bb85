use std::sync::Arc;

use super::event::EventSink;
use crate::api::ILnurlApi;
use crate::resources::ResourceProvider;

/// This struct encapsulates runtime dependencies like the event pipe to the
/// host, the LNURL reply client and the localized resources that all the
/// notification jobs need to properly function.
pub struct Runtime {
    pub event_sink: EventSink,
    pub lnurl_api: Arc<dyn ILnurlApi>,
    pub resources: ResourceProvider,
}

impl Runtime {
    pub fn new(
        event_sink: EventSink,
        lnurl_api: Arc<dyn ILnurlApi>,
        resources: ResourceProvider,
    ) -> Self {
        Self {
            event_sink,
            lnurl_api,
            resources,
        }
    }

    /// Localized string for `key`, or `fallback` when the host has none.
    pub fn resource(&self, key: &str, fallback: &str) -> String {
        self.resources.get_string_or(key, fallback)
    }
}
