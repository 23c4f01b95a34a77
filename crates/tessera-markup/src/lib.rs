//! Component tree model and static markup serializer.
//!
//! This crate provides the tree-walking serializer that converts an in-memory
//! component tree into HTML-like markup, together with the node and prop types
//! the tree is built from.

pub mod attributes;
pub mod node;
pub mod serializer;
pub mod value;

pub use attributes::{hyphenate, render_attributes, style_string};
pub use node::{
    panic_message, Cleanup, Component, Element, FnComponent, Invocation, Node, Opaque, RenderError,
};
pub use serializer::{
    expand, expand_strict, is_void_element, serialize, serialize_strict, VOID_ELEMENTS,
};
pub use value::{Callback, Props, Value};

/// Build a [`FnComponent`] whose definition source is the render closure's
/// own token text.
///
/// ```
/// use tessera_markup::{component, serialize, Element, Node, Props};
///
/// let badge = component!("Badge", |props: &Props| {
///     Ok(Element::new("span").child(props.get_str("label").unwrap_or("").to_string()).into())
/// })
/// .shared();
///
/// let markup = serialize(&Node::invoke(badge, Props::new().with("label", "new")));
/// assert_eq!(markup, "<span>new</span>");
/// ```
#[macro_export]
macro_rules! component {
    ($name:expr, $render:expr $(,)?) => {
        $crate::FnComponent::new($name, $render).with_source(stringify!($render))
    };
}
