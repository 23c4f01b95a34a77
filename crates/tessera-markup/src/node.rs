//! Component tree model.
//!
//! A [`Node`] is one unit of a component tree. Every value handed to the
//! serializer classifies into exactly one variant; [`Node::Opaque`] catches
//! anything without a structural meaning.

use std::borrow::Cow;
use std::fmt::{self, Write as _};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::value::{number_to_text, Props, Value};

/// A node in a component tree.
#[derive(Debug, Clone, Default)]
pub enum Node {
    /// Renders nothing (null, unit, booleans).
    #[default]
    Empty,
    /// A string or number.
    Text(Cow<'static, str>),
    /// An ordered list of nodes.
    Sequence(Vec<Node>),
    /// A transparent grouping of children with no tag of its own.
    Fragment(Box<Node>),
    /// A markup-producing element with a literal tag name.
    Element(Element),
    /// A deferred component call.
    Invocation(Invocation),
    /// Anything else; rendered through string coercion.
    Opaque(Opaque),
}

impl Node {
    /// Creates a text node.
    pub fn text(content: impl Into<Cow<'static, str>>) -> Self {
        Node::Text(content.into())
    }

    /// Creates a fragment around the given children.
    pub fn fragment(children: impl IntoIterator<Item = impl Into<Node>>) -> Self {
        Node::Fragment(Box::new(Node::Sequence(
            children.into_iter().map(Into::into).collect(),
        )))
    }

    /// Creates a deferred invocation of `component` with `props`.
    pub fn invoke(component: Arc<dyn Component>, props: Props) -> Self {
        Node::Invocation(Invocation::new(component, props))
    }

    /// Wraps any displayable value as an opaque node.
    pub fn opaque(value: impl fmt::Display + Send + Sync + 'static) -> Self {
        Node::Opaque(Opaque::new(value))
    }

    /// Classify a dynamic prop value into a node.
    pub fn classify(value: Value) -> Self {
        match value {
            Value::Null | Value::Bool(_) => Node::Empty,
            Value::String(s) => Node::Text(Cow::Owned(s)),
            Value::Number(n) => Node::Text(Cow::Owned(number_to_text(&n))),
            Value::Array(items) => Node::Sequence(items.into_iter().map(Node::classify).collect()),
            Value::Node(node) => node,
            Value::Object(props) => {
                Node::Opaque(Opaque::new(JsonText(serde_json::Value::Object(props.to_json()))))
            }
            Value::Callback(_) => Node::Opaque(Opaque::new(Uncoercible)),
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Node::classify(value)
    }
}

impl From<&'static str> for Node {
    fn from(s: &'static str) -> Self {
        Node::Text(Cow::Borrowed(s))
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::Text(Cow::Owned(s))
    }
}

impl From<bool> for Node {
    fn from(_: bool) -> Self {
        Node::Empty
    }
}

impl From<()> for Node {
    fn from(_: ()) -> Self {
        Node::Empty
    }
}

macro_rules! number_nodes {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Node {
                fn from(n: $ty) -> Self {
                    Node::classify(Value::from(n))
                }
            }
        )*
    };
}

number_nodes!(i32, i64, u32, u64, usize, f64);

impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

impl From<Vec<Node>> for Node {
    fn from(nodes: Vec<Node>) -> Self {
        Node::Sequence(nodes)
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<Invocation> for Node {
    fn from(invocation: Invocation) -> Self {
        Node::Invocation(invocation)
    }
}

/// A host element such as `div` or `img`.
#[derive(Debug, Clone)]
pub struct Element {
    tag: Cow<'static, str>,
    attributes: Props,
    children: Vec<Node>,
}

impl Element {
    /// Creates a new element.
    pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Props::new(),
            children: Vec::new(),
        }
    }

    /// Adds an attribute.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name, value);
        self
    }

    /// Replaces all attributes.
    pub fn attrs(mut self, attributes: Props) -> Self {
        self.attributes = attributes;
        self
    }

    /// Adds a child node.
    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Adds multiple child nodes.
    pub fn children(mut self, children: impl IntoIterator<Item = impl Into<Node>>) -> Self {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Returns the tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the attributes.
    pub fn attributes(&self) -> &Props {
        &self.attributes
    }

    /// Returns the child nodes.
    pub fn child_nodes(&self) -> &[Node] {
        &self.children
    }

    pub(crate) fn with_child_nodes(&self, children: Vec<Node>) -> Self {
        Self {
            tag: self.tag.clone(),
            attributes: self.attributes.clone(),
            children,
        }
    }
}

/// Cleanup returned by a mount effect.
pub type Cleanup = Box<dyn FnOnce() + Send>;

/// A renderable component implementation.
pub trait Component: Send + Sync {
    /// Produce the component's tree for the given props.
    fn render(&self, props: &Props) -> Result<Node, RenderError>;

    /// Explicit display name, preferred for diagnostics and envelopes.
    fn display_name(&self) -> Option<&str> {
        None
    }

    /// Implementation name.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Source form of the definition. Informational only.
    fn source(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    /// Effects to start when the component is mounted live. Each returns the
    /// cleanup that releases what it started.
    fn mount_effects(&self, _props: &Props) -> Vec<Cleanup> {
        Vec::new()
    }
}

impl dyn Component {
    /// Resolve a name: display name, then implementation name, then `placeholder`.
    pub fn label_or<'a>(&'a self, placeholder: &'a str) -> &'a str {
        self.display_name().or_else(|| self.name()).unwrap_or(placeholder)
    }

    /// Name used in diagnostics.
    pub fn label(&self) -> &str {
        self.label_or("Component")
    }
}

type RenderFn = dyn Fn(&Props) -> Result<Node, RenderError> + Send + Sync;
type EffectFn = dyn Fn(&Props) -> Cleanup + Send + Sync;

/// A component backed by a closure.
pub struct FnComponent {
    name: Option<String>,
    display_name: Option<String>,
    source: String,
    render: Box<RenderFn>,
    effects: Vec<Box<EffectFn>>,
}

impl FnComponent {
    /// Create a named component from a render closure.
    pub fn new(
        name: impl Into<String>,
        render: impl Fn(&Props) -> Result<Node, RenderError> + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        Self {
            name: (!name.is_empty()).then_some(name),
            display_name: None,
            source: String::new(),
            render: Box::new(render),
            effects: Vec::new(),
        }
    }

    /// Set an explicit display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Attach the source text shipped alongside envelopes.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Register a mount effect.
    pub fn with_effect(
        mut self,
        effect: impl Fn(&Props) -> Cleanup + Send + Sync + 'static,
    ) -> Self {
        self.effects.push(Box::new(effect));
        self
    }

    /// Convert into a shareable component handle.
    pub fn shared(self) -> Arc<dyn Component> {
        Arc::new(self)
    }
}

impl Component for FnComponent {
    fn render(&self, props: &Props) -> Result<Node, RenderError> {
        (self.render)(props)
    }

    fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn source(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.source)
    }

    fn mount_effects(&self, props: &Props) -> Vec<Cleanup> {
        self.effects.iter().map(|effect| effect(props)).collect()
    }
}

impl fmt::Debug for FnComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnComponent")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .field("effects", &self.effects.len())
            .finish()
    }
}

/// A component paired with the props it will be called with.
#[derive(Clone)]
pub struct Invocation {
    component: Arc<dyn Component>,
    props: Props,
}

impl Invocation {
    pub fn new(component: Arc<dyn Component>, props: Props) -> Self {
        Self { component, props }
    }

    pub fn component(&self) -> &Arc<dyn Component> {
        &self.component
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    /// Call the component synchronously.
    ///
    /// Panics inside the implementation are caught and reported as
    /// [`RenderError::Panicked`].
    pub fn call(&self) -> Result<Node, RenderError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.component.render(&self.props)))
            .unwrap_or_else(|payload| Err(RenderError::Panicked(panic_message(&*payload))))
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("component", &self.component.label())
            .field("props", &self.props)
            .finish()
    }
}

/// Text of a caught panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// A value with no structural meaning, rendered via its `Display` form.
#[derive(Clone)]
pub struct Opaque(Arc<dyn fmt::Display + Send + Sync>);

impl Opaque {
    pub fn new(value: impl fmt::Display + Send + Sync + 'static) -> Self {
        Self(Arc::new(value))
    }

    /// Attempt string coercion. A `Display` impl that errors or panics
    /// yields `None`.
    pub fn coerce(&self) -> Option<String> {
        panic::catch_unwind(AssertUnwindSafe(|| {
            let mut out = String::new();
            write!(out, "{}", self.0).ok()?;
            Some(out)
        }))
        .unwrap_or_else(|payload| {
            tracing::warn!("Failed to coerce value to text: {}", panic_message(&*payload));
            None
        })
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Opaque(..)")
    }
}

struct JsonText(serde_json::Value);

impl fmt::Display for JsonText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Callables have no text form.
struct Uncoercible;

impl fmt::Display for Uncoercible {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        Err(fmt::Error)
    }
}

/// Errors raised by a component implementation.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Missing prop: {0}")]
    MissingProp(String),

    #[error("Invalid prop {key}: {message}")]
    InvalidProp { key: String, message: String },

    #[error("Render failed: {0}")]
    Failed(String),

    #[error("Component panicked: {0}")]
    Panicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Callback;

    #[test]
    fn classifies_primitives() {
        assert!(matches!(Node::classify(Value::Null), Node::Empty));
        assert!(matches!(Node::classify(Value::Bool(true)), Node::Empty));
        assert!(matches!(Node::classify(Value::from("x")), Node::Text(t) if t == "x"));
        assert!(matches!(Node::classify(Value::from(7)), Node::Text(t) if t == "7"));
    }

    #[test]
    fn classifies_arrays_as_sequences() {
        let node = Node::classify(Value::from(vec![Value::from("a"), Value::from(1)]));

        match node {
            Node::Sequence(items) => assert_eq!(items.len(), 2),
            other => panic!("Expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn callables_do_not_coerce() {
        match Node::classify(Value::from(Callback::new(|_| {}))) {
            Node::Opaque(opaque) => assert_eq!(opaque.coerce(), None),
            other => panic!("Expected opaque, got {:?}", other),
        }
    }

    #[test]
    fn label_prefers_display_name() {
        let named: Arc<dyn Component> = FnComponent::new("Inner", |_| Ok(Node::Empty)).shared();
        let displayed: Arc<dyn Component> = FnComponent::new("Inner", |_| Ok(Node::Empty))
            .with_display_name("Shown")
            .shared();
        let anonymous: Arc<dyn Component> = FnComponent::new("", |_| Ok(Node::Empty)).shared();

        assert_eq!(named.label(), "Inner");
        assert_eq!(displayed.label(), "Shown");
        assert_eq!(anonymous.label(), "Component");
        assert_eq!(anonymous.label_or("UnknownComponent"), "UnknownComponent");
    }

    #[test]
    fn call_catches_panics() {
        let component = FnComponent::new("Boom", |_| panic!("kaboom")).shared();
        let invocation = Invocation::new(component, Props::new());

        match invocation.call() {
            Err(RenderError::Panicked(message)) => assert_eq!(message, "kaboom"),
            other => panic!("Expected panic error, got {:?}", other),
        }
    }
}
