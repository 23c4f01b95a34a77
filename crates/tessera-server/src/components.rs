//! Demo components served and exported by tessera.

use std::sync::Arc;

use tessera_envelope::{ComponentRegistry, RegistryError};
use tessera_markup::{component, Callback, Component, Element, Node, Props, RenderError, Value};

/// Render the server data panel. Requires a `data` object prop.
pub fn server_panel() -> Arc<dyn Component> {
    component!("ServerPanel", |props: &Props| {
        let data = props
            .get("data")
            .and_then(Value::as_object)
            .ok_or_else(|| RenderError::MissingProp("data".to_string()))?;

        let pretty = serde_json::to_string_pretty(&serde_json::Value::Object(data.to_json()))
            .map_err(|e| RenderError::InvalidProp {
                key: "data".to_string(),
                message: e.to_string(),
            })?;

        Ok(Element::new("div")
            .attr("className", "bg-blue-50 p-4 rounded")
            .attr("style", Props::new().with("backgroundColor", "#f0f4ff"))
            .child(
                Element::new("h3")
                    .attr("className", "font-medium mb-2")
                    .child("Server-rendered data:"),
            )
            .child(
                Element::new("pre")
                    .attr("className", "bg-blue-100 p-2 rounded text-sm overflow-x-auto")
                    .child(pretty),
            )
            .child(
                Element::new("p")
                    .attr("className", "mt-2 text-sm text-gray-600")
                    .child("This component was rendered at: ")
                    .child(data.get("timestamp").cloned().map(Node::classify)),
            )
            .into())
    })
    .shared()
}

/// Current count: live state first, then the `initialCount` prop.
fn current_count(props: &Props) -> i64 {
    props
        .get_i64("count")
        .or_else(|| props.get_i64("initialCount"))
        .unwrap_or(0)
}

/// Render the interactive counter.
pub fn client_counter() -> Arc<dyn Component> {
    component!("ClientCounter", |props: &Props| {
        let count = current_count(props);

        Ok(Element::new("div")
            .attr("className", "bg-purple-50 p-4 rounded")
            .child(
                Element::new("p")
                    .attr("className", "mb-2")
                    .child("Counter: ")
                    .child(Element::new("span").attr("className", "font-bold").child(count)),
            )
            .child(
                Element::new("button")
                    .attr(
                        "onClick",
                        Callback::new(|state: &mut Props| {
                            let next = current_count(state) + 1;
                            state.insert("count", next);
                        }),
                    )
                    .attr(
                        "className",
                        "bg-purple-500 hover:bg-purple-600 text-white px-3 py-1.5 rounded text-sm",
                    )
                    .child("Increment"),
            )
            .child(
                Element::new("p")
                    .attr("className", "mt-2 text-sm text-gray-600")
                    .child("This is a client component with interactivity"),
            )
            .into())
    })
    .shared()
}

/// Registry a consumer of the demo envelopes starts with.
pub fn demo_registry() -> Result<ComponentRegistry, RegistryError> {
    ComponentRegistry::new()
        .with(client_counter())?
        .with(server_panel())
}
