//! Transport envelopes and registry-driven hydration.
//!
//! A producer captures a rendered component into an [`Envelope`]. A consumer
//! decodes it, resolves the component name in its own [`ComponentRegistry`],
//! paints the static markup into a [`MountPoint`] and replaces it with a
//! [`LiveInstance`]. Transported source text is never executed.

pub mod envelope;
pub mod live;
pub mod mount;
pub mod registry;
pub mod store;

pub use envelope::{serialize_component, Envelope, SerializationError, UNKNOWN_COMPONENT};
pub use live::{Event, LiveInstance, Target};
pub use mount::{HydrationError, Hydrator, MountPoint, MountState};
pub use registry::{ComponentRegistry, RegisteredComponent, RegistryError};
pub use store::{EnvelopeStore, FileStore, MemoryStore, TransportError, DEFAULT_SLOT};
