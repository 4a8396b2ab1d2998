use logview_core::observability::ResourceAttrSet;
use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;

/// Maps a `logview-core` resource attribute set onto an OpenTelemetry
/// `Resource`, so a host configuring both shares one vocabulary for service
/// identity (`service.name`, `deployment.environment`, ...).
///
/// A duplicate key keeps the last value, matching `Resource::new`.
pub fn resource_from_attrs(attrs: ResourceAttrSet<'_>) -> Resource {
    let owned = attrs
        .iter()
        .map(|attr| KeyValue::new(attr.key().to_string(), attr.value().to_string()));
    Resource::new(owned)
}
