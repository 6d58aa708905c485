//! ---
//! dab_section: "01-core-protocol"
//! dab_subsection: "module"
//! dab_type: "source"
//! dab_scope: "code"
//! dab_description: "Request routing, device adapters, and telemetry scheduling."
//! dab_version: "v0.0.0-prealpha"
//! dab_owner: "tbd"
//! ---
//! Device-side core of the DAB v2.0 control plane.
//!
//! A request envelope arrives from the transport, the [`bridge`] routes it
//! to the owning [`adapter`] by `deviceId`, the adapter's operation
//! registry binds parameters through the [`dispatch`] layer and invokes
//! the device handler, and the shaped response travels back on the reply
//! channel. Each adapter owns one [`telemetry`] scheduler worker that
//! periodically publishes device and application metrics through the
//! shared [`publish`] callback.

#![warn(missing_docs)]

pub mod adapter;
pub mod bridge;
pub mod dispatch;
pub mod error;
pub mod publish;
pub mod telemetry;
pub mod transport;

pub use adapter::{Device, DeviceAdapter, OperationKind, DISCOVERY_TOPIC, PROTOCOL_VERSION};
pub use bridge::{CatalogueEntry, DeviceBridge};
pub use dispatch::{Arguments, Dispatcher};
pub use error::{DabError, DabResult};
pub use publish::{publish_message, PublishFn, Publisher};
pub use telemetry::{SchedulerHandle, TelemetryProducer, TelemetryScheduler};
pub use transport::{InMemoryTransport, Transport};
