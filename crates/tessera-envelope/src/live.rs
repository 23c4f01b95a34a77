//! Live component instances.
//!
//! A live instance owns the state a component renders from, the event
//! listeners found in its rendered tree, and the cleanups of its mount
//! effects. Dispatching an event runs the matching handler against the state
//! and re-renders.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tessera_markup::attributes::inner_html;
use tessera_markup::{
    expand_strict, panic_message, serialize, Callback, Cleanup, Component, Invocation, Node,
    Props, RenderError, Value,
};

use crate::mount::HydrationError;

/// Which element an event is aimed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Element with this `id` attribute.
    Id(String),
    /// Element at this child-index path; `[0]` is the first root element.
    Path(Vec<usize>),
    /// First element, in document order, listening for the event.
    First,
}

/// An event dispatched to a live instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Event kind, e.g. `click`.
    pub kind: String,
    pub target: Target,
}

impl Event {
    pub fn new(kind: impl Into<String>, target: Target) -> Self {
        Self {
            kind: kind.into(),
            target,
        }
    }

    /// A click on `target`.
    pub fn click(target: Target) -> Self {
        Self::new("click", target)
    }
}

/// A handler attached to an element of the rendered tree.
#[derive(Debug, Clone)]
struct Listener {
    path: Vec<usize>,
    id: Option<String>,
    kind: String,
    handler: Callback,
}

impl Listener {
    fn matches(&self, event: &Event) -> bool {
        if self.kind != event.kind {
            return false;
        }
        match &event.target {
            Target::Id(id) => self.id.as_deref() == Some(id.as_str()),
            Target::Path(path) => self.path == *path,
            Target::First => true,
        }
    }
}

/// A mounted, interactive component.
pub struct LiveInstance {
    name: String,
    component: Arc<dyn Component>,
    state: Props,
    static_markup: String,
    markup: String,
    listeners: Vec<Listener>,
    cleanups: Vec<Cleanup>,
    released: bool,
}

impl LiveInstance {
    /// Render `component` from `state` and start its mount effects.
    ///
    /// Effects only start once the first render succeeded.
    pub(crate) fn construct(
        name: String,
        component: Arc<dyn Component>,
        state: Props,
        static_markup: String,
    ) -> Result<Self, HydrationError> {
        let mut instance = Self {
            name,
            component,
            state,
            static_markup,
            markup: String::new(),
            listeners: Vec::new(),
            cleanups: Vec::new(),
            released: false,
        };
        let (listeners, markup) = instance.render(&instance.state)?;
        instance.listeners = listeners;
        instance.markup = markup;
        instance.cleanups = instance.component.mount_effects(&instance.state);
        Ok(instance)
    }

    fn render(&self, state: &Props) -> Result<(Vec<Listener>, String), HydrationError> {
        let invocation = Invocation::new(Arc::clone(&self.component), state.clone());
        let tree = expand_strict(&invocation).map_err(|source| HydrationError::Mount {
            component: self.name.clone(),
            source,
        })?;

        let mut listeners = Vec::new();
        collect_listeners(&tree, &mut Vec::new(), &mut 0, &mut listeners);

        Ok((listeners, serialize(&tree)))
    }

    /// Route an event to the first matching listener and re-render.
    ///
    /// The handler runs against a copy of the state. State, markup and
    /// listeners are only replaced once the re-render succeeds, so a failing
    /// handler or render leaves the instance as it was.
    ///
    /// Returns `false` if nothing was listening or the instance is released.
    pub fn dispatch(&mut self, event: &Event) -> Result<bool, HydrationError> {
        if self.released {
            return Ok(false);
        }
        let Some(listener) = self.listeners.iter().find(|l| l.matches(event)) else {
            tracing::debug!("No {} listener for {:?} in {}", event.kind, event.target, self.name);
            return Ok(false);
        };

        let handler = listener.handler.clone();
        let mut next = self.state.clone();
        panic::catch_unwind(AssertUnwindSafe(|| handler.call(&mut next))).map_err(|payload| {
            HydrationError::Mount {
                component: self.name.clone(),
                source: RenderError::Panicked(panic_message(&*payload)),
            }
        })?;

        let (listeners, markup) = self.render(&next).inspect_err(|e| {
            tracing::warn!("Discarding {} event in {}: {}", event.kind, self.name, e);
        })?;

        self.state = next;
        self.listeners = listeners;
        self.markup = markup;
        Ok(true)
    }

    /// Release listeners and run every effect cleanup exactly once.
    pub(crate) fn teardown(&mut self) {
        if self.released {
            return;
        }
        self.listeners.clear();
        for cleanup in self.cleanups.drain(..) {
            cleanup();
        }
        self.released = true;
        tracing::debug!("Released live instance {}", self.name);
    }

    /// Registered component name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Markup attached before the live instance replaced it.
    pub fn static_markup(&self) -> &str {
        &self.static_markup
    }

    /// Current live markup.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// State the component renders from.
    pub fn state(&self) -> &Props {
        &self.state
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for LiveInstance {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for LiveInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveInstance")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .field("cleanups", &self.cleanups.len())
            .field("released", &self.released)
            .finish()
    }
}

/// `onClick` -> `click`.
fn event_kind(key: &str) -> Option<String> {
    let rest = key.strip_prefix("on")?;
    (!rest.is_empty()).then(|| rest.to_lowercase())
}

fn collect_listeners(
    node: &Node,
    path: &mut Vec<usize>,
    index: &mut usize,
    listeners: &mut Vec<Listener>,
) {
    match node {
        Node::Sequence(nodes) => {
            for node in nodes {
                collect_listeners(node, path, index, listeners);
            }
        }
        Node::Fragment(children) => collect_listeners(children, path, index, listeners),
        Node::Element(element) => {
            path.push(*index);
            *index += 1;

            let attributes = element.attributes();
            for (key, value) in attributes.iter() {
                if let (Some(kind), Value::Callback(handler)) = (event_kind(key), value) {
                    listeners.push(Listener {
                        path: path.clone(),
                        id: attributes.get_str("id").map(str::to_string),
                        kind,
                        handler: handler.clone(),
                    });
                }
            }

            // Raw HTML replaces the children in markup
            if inner_html(attributes).is_some() {
                path.pop();
                return;
            }

            let mut child_index = 0;
            for child in element.child_nodes() {
                collect_listeners(child, path, &mut child_index, listeners);
            }
            path.pop();
        }
        Node::Empty | Node::Text(_) | Node::Invocation(_) | Node::Opaque(_) => {}
    }
}
