//! Transport envelope for a rendered component.
//!
//! An envelope carries static markup, the component's name, its source text
//! and the props it was rendered with. It is encoded as JSON:
//!
//! ```json
//! { "markup": "...", "componentName": "...", "componentDefinitionSource": "...", "props": {} }
//! ```
//!
//! `componentDefinitionSource` is display text only. Consumers resolve
//! `componentName` against their own registry and never run the source.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Map;

use tessera_markup::{serialize_strict, Component, Invocation, Props, RenderError};

use crate::mount::HydrationError;

/// Name recorded for components that have neither a display name nor a name.
pub const UNKNOWN_COMPONENT: &str = "UnknownComponent";

/// A serialized component, ready for transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    markup: String,
    component_name: String,
    #[serde(default)]
    component_definition_source: String,
    #[serde(default)]
    props: Map<String, serde_json::Value>,
}

impl Envelope {
    /// Render `component` with `props` and capture the result.
    ///
    /// Fails if the component itself cannot render; an envelope without markup
    /// is useless to a consumer.
    pub fn capture(component: &Arc<dyn Component>, props: &Props) -> Result<Self, SerializationError> {
        let component_name = component.label_or(UNKNOWN_COMPONENT).to_string();

        let markup = serialize_strict(&Invocation::new(Arc::clone(component), props.clone()))
            .map_err(|source| {
                tracing::error!("Error serializing component {}: {}", component_name, source);
                SerializationError::Render {
                    component: component_name.clone(),
                    source,
                }
            })?;

        Ok(Self {
            markup,
            component_definition_source: component.source().into_owned(),
            component_name,
            props: props.to_json(),
        })
    }

    /// Encode as the JSON wire format.
    pub fn encode(&self) -> Result<String, SerializationError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from the JSON wire format.
    pub fn decode(text: &str) -> Result<Self, HydrationError> {
        serde_json::from_str(text).map_err(|e| HydrationError::Parse(e.to_string()))
    }

    /// Static markup captured at serialization time.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Name the consumer resolves against its registry.
    pub fn component_name(&self) -> &str {
        &self.component_name
    }

    /// Source text of the component definition. Never executed.
    pub fn component_definition_source(&self) -> &str {
        &self.component_definition_source
    }

    /// Props the markup was rendered with.
    pub fn props(&self) -> Props {
        Props::from_json(self.props.clone())
    }
}

/// Serialize a component invocation into an opaque envelope string.
pub fn serialize_component(
    component: &Arc<dyn Component>,
    props: &Props,
) -> Result<String, SerializationError> {
    Envelope::capture(component, props)?.encode()
}

/// Errors that can occur while producing an envelope.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("Failed to render component {component}: {source}")]
    Render {
        component: String,
        #[source]
        source: RenderError,
    },

    #[error("Failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
}
