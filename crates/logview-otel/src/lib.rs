//! `tracing`/OpenTelemetry-backed implementation of `logview_core`'s
//! observability contracts.
//!
//! `logview-core` depends only on the [`logview_core::observability::Logger`]
//! trait, so it stays free of a hard telemetry-backend dependency; this
//! crate supplies the concrete implementation, following the lineage's
//! pattern of splitting a portable contract crate from its OpenTelemetry
//! integration.
pub mod logging;
pub mod resource;

pub use logging::TracingLogger;
pub use resource::resource_from_attrs;

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::{
    Resource,
    trace::{self as sdktrace, TracerProvider},
};
use tracing::dispatcher;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

/// Global install-once guard, mirroring the lineage's "no silent double
/// install" contract for process-wide telemetry state.
static INSTALL_STATE: OnceLock<TracerProvider> = OnceLock::new();

/// Failure modes of [`install`].
#[derive(Debug)]
pub enum Error {
    /// `install` was already called once in this process.
    AlreadyInstalled,
    /// Something else set the global `tracing` subscriber first.
    SubscriberAlreadySet,
    /// Installing the global subscriber failed at the `tracing` layer.
    SetGlobalSubscriber(tracing::dispatcher::SetGlobalDefaultError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::AlreadyInstalled => f.write_str("logview-otel::install called more than once"),
            Error::SubscriberAlreadySet => {
                f.write_str("a global tracing subscriber is already set")
            }
            Error::SetGlobalSubscriber(err) => {
                write!(f, "failed to set the global tracing subscriber: {err}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Zero-configuration install: builds a `TracerProvider`, registers it with
/// `opentelemetry::global`, and sets a `fmt + EnvFilter + OpenTelemetry`
/// `tracing` subscriber as the process default.
///
/// A host that wants the `Logger` wired to the adaptor passes
/// [`TracingLogger`] to [`logview_core::consistency::LogViewAdaptor::new`];
/// this function only sets up the `tracing` backend those events flow into.
pub fn install(resource: Resource) -> Result<(), Error> {
    if INSTALL_STATE.get().is_some() {
        return Err(Error::AlreadyInstalled);
    }
    if dispatcher::has_been_set() {
        return Err(Error::SubscriberAlreadySet);
    }

    let tracer_provider = build_tracer_provider(resource);
    opentelemetry::global::set_tracer_provider(tracer_provider.clone());
    let tracer = tracer_provider.versioned_tracer(
        "logview",
        Some(env!("CARGO_PKG_VERSION")),
        Some(std::borrow::Cow::Borrowed(env!("CARGO_PKG_NAME"))),
        None,
    );

    let subscriber = tracing_subscriber::registry()
        .with(build_env_filter())
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_opentelemetry::layer().with_tracer(tracer));
    tracing::subscriber::set_global_default(subscriber).map_err(Error::SetGlobalSubscriber)?;

    INSTALL_STATE
        .set(tracer_provider)
        .map_err(|_| Error::AlreadyInstalled)
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn build_tracer_provider(resource: Resource) -> TracerProvider {
    TracerProvider::builder()
        .with_config(
            sdktrace::config()
                .with_sampler(sdktrace::Sampler::AlwaysOn)
                .with_resource(resource),
        )
        .build()
}
