use std::borrow::Cow;

/// A single resource attribute key/value pair (e.g. `service.name`).
///
/// Mirrors OpenTelemetry's dotted attribute naming convention; this type
/// carries no dependency on the OpenTelemetry crates themselves, so
/// `logview-core` stays free of a hard telemetry-backend dependency while
/// `logview-otel` maps these onto `opentelemetry::KeyValue`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceAttr<'a> {
    key: Cow<'a, str>,
    value: Cow<'a, str>,
}

impl<'a> ResourceAttr<'a> {
    pub fn new(key: impl Into<Cow<'a, str>>, value: impl Into<Cow<'a, str>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn into_owned(self) -> ResourceAttr<'static> {
        ResourceAttr {
            key: Cow::Owned(self.key.into_owned()),
            value: Cow::Owned(self.value.into_owned()),
        }
    }
}

pub type ResourceAttrSet<'a> = &'a [ResourceAttr<'a>];

/// Growable, owned collection of [`ResourceAttr`]s.
#[derive(Clone, Debug, Default)]
pub struct OwnedResourceAttrs {
    entries: Vec<ResourceAttr<'static>>,
}

impl OwnedResourceAttrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_owned(
        &mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
    ) {
        self.entries.push(ResourceAttr {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn as_slice(&self) -> ResourceAttrSet<'_> {
        &self.entries
    }
}
