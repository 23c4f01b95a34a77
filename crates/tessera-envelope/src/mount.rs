//! Mount points and the hydration lifecycle.
//!
//! A mount point moves through `Unmounted -> StaticMarkupAttached ->
//! LiveMounted -> Unmounted`. Hydrating always unmounts first, so the previous
//! live instance is torn down before the next one is constructed.

use std::sync::Arc;

use tessera_markup::{Props, RenderError};

use crate::envelope::Envelope;
use crate::live::{Event, LiveInstance};
use crate::registry::ComponentRegistry;

/// Lifecycle state of a mount point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    Unmounted,
    StaticMarkupAttached,
    LiveMounted,
}

impl MountState {
    fn can_transition_to(self, next: MountState) -> bool {
        matches!(
            (self, next),
            (MountState::Unmounted, MountState::StaticMarkupAttached)
                | (MountState::StaticMarkupAttached, MountState::LiveMounted)
                | (MountState::StaticMarkupAttached, MountState::Unmounted)
                | (MountState::LiveMounted, MountState::Unmounted)
        )
    }
}

/// Errors that can occur during hydration.
#[derive(Debug, thiserror::Error)]
pub enum HydrationError {
    #[error("Malformed envelope: {0}")]
    Parse(String),

    #[error("Component not found in registry: {0}")]
    UnknownComponent(String),

    #[error("Failed to mount component {component}: {source}")]
    Mount {
        component: String,
        #[source]
        source: RenderError,
    },

    #[error("Invalid hydration transition: {from:?} -> {to:?}")]
    InvalidTransition { from: MountState, to: MountState },

    #[error("Mount point {0} has no live instance")]
    NotMounted(String),
}

/// A place in the consuming context where one component is shown.
pub struct MountPoint {
    id: String,
    state: MountState,
    static_markup: String,
    instance: Option<LiveInstance>,
}

impl MountPoint {
    /// Create an empty, unmounted mount point.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: MountState::Unmounted,
            static_markup: String::new(),
            instance: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> MountState {
        self.state
    }

    /// What the mount point currently shows.
    pub fn content(&self) -> &str {
        match &self.instance {
            Some(instance) => instance.markup(),
            None => &self.static_markup,
        }
    }

    /// The live instance, if mounted.
    pub fn instance(&self) -> Option<&LiveInstance> {
        self.instance.as_ref()
    }

    fn transition(&mut self, next: MountState) -> Result<(), HydrationError> {
        if !self.state.can_transition_to(next) {
            return Err(HydrationError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("Mount point {}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Attach static markup ahead of the live instance.
    fn attach_static(&mut self, markup: &str) -> Result<(), HydrationError> {
        self.transition(MountState::StaticMarkupAttached)?;
        self.static_markup = markup.to_string();
        Ok(())
    }

    /// Replace the static markup with a live instance.
    fn attach_live(&mut self, instance: LiveInstance) -> Result<&mut LiveInstance, HydrationError> {
        self.transition(MountState::LiveMounted)?;
        self.static_markup.clear();
        Ok(self.instance.insert(instance))
    }

    /// Tear down whatever is mounted and return to `Unmounted`.
    ///
    /// The live instance is fully released before this returns.
    pub fn unmount(&mut self) {
        if let Some(mut instance) = self.instance.take() {
            instance.teardown();
            tracing::info!("Unmounted {} from {}", instance.name(), self.id);
        }
        self.static_markup.clear();
        if self.state != MountState::Unmounted {
            self.state = MountState::Unmounted;
            tracing::debug!("Mount point {}: -> Unmounted", self.id);
        }
    }

    /// Dispatch an event to the live instance.
    pub fn dispatch(&mut self, event: &Event) -> Result<bool, HydrationError> {
        let instance = self
            .instance
            .as_mut()
            .ok_or_else(|| HydrationError::NotMounted(self.id.clone()))?;
        instance.dispatch(event)
    }
}

impl Drop for MountPoint {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl std::fmt::Debug for MountPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountPoint")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("instance", &self.instance)
            .finish()
    }
}

/// Turns envelopes into live instances using a local registry.
#[derive(Debug, Clone)]
pub struct Hydrator {
    registry: Arc<ComponentRegistry>,
}

impl Hydrator {
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Hydrate `envelope` into `mount`.
    ///
    /// Anything already mounted is torn down first. On any error the mount
    /// point is left `Unmounted` with no content. `overrides` win over the
    /// envelope's props on key collision.
    pub fn hydrate<'m>(
        &self,
        mount: &'m mut MountPoint,
        envelope: &str,
        overrides: &Props,
    ) -> Result<&'m mut LiveInstance, HydrationError> {
        mount.unmount();

        let envelope = Envelope::decode(envelope).inspect_err(|e| {
            tracing::error!("Error hydrating component at {}: {}", mount.id(), e);
        })?;

        let Some(registered) = self.registry.get(envelope.component_name()) else {
            tracing::error!(
                "Component \"{}\" not found in component registry",
                envelope.component_name()
            );
            return Err(HydrationError::UnknownComponent(
                envelope.component_name().to_string(),
            ));
        };

        mount.attach_static(envelope.markup())?;

        let props = envelope.props().merged(overrides);
        let instance = match LiveInstance::construct(
            registered.name.clone(),
            Arc::clone(&registered.component),
            props,
            envelope.markup().to_string(),
        ) {
            Ok(instance) => instance,
            Err(e) => {
                tracing::error!("Error hydrating component {}: {}", registered.name, e);
                mount.unmount();
                return Err(e);
            }
        };

        tracing::info!("Hydrated {} at {}", registered.name, mount.id());
        mount.attach_live(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::serialize_component;
    use crate::live::Target;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;
    use tessera_markup::{serialize, Callback, Component, Element, FnComponent, Node};

    fn counter() -> Arc<dyn Component> {
        FnComponent::new("Counter", |props| {
            let count = props.get_i64("count").unwrap_or(0);
            Ok(Element::new("div")
                .child(Element::new("span").child(count))
                .child(
                    Element::new("button")
                        .attr(
                            "onClick",
                            Callback::new(|state: &mut Props| {
                                let count = state.get_i64("count").unwrap_or(0);
                                state.insert("count", count + 1);
                            }),
                        )
                        .child("+"),
                )
                .into())
        })
        .shared()
    }

    fn hydrator(components: Vec<Arc<dyn Component>>) -> Hydrator {
        let mut registry = ComponentRegistry::new();
        for component in components {
            registry.register(component).unwrap();
        }
        Hydrator::new(Arc::new(registry))
    }

    #[test]
    fn static_markup_round_trips() {
        let props = Props::new().with("count", 3);
        let envelope = serialize_component(&counter(), &props).unwrap();
        let mut mount = MountPoint::new("root");

        let instance = hydrator(vec![counter()])
            .hydrate(&mut mount, &envelope, &Props::new())
            .unwrap();

        assert_eq!(
            instance.static_markup(),
            serialize(&Node::invoke(counter(), props))
        );
        assert_eq!(mount.state(), MountState::LiveMounted);
    }

    #[test]
    fn overrides_win_over_envelope_props() {
        let envelope = serialize_component(&counter(), &Props::new().with("count", 1)).unwrap();
        let mut mount = MountPoint::new("root");

        let instance = hydrator(vec![counter()])
            .hydrate(&mut mount, &envelope, &Props::new().with("count", 10))
            .unwrap();

        assert_eq!(instance.state().get_i64("count"), Some(10));
        assert!(mount.content().contains("<span>10</span>"));
    }

    #[test]
    fn live_events_update_mount_content() {
        let envelope = serialize_component(&counter(), &Props::new()).unwrap();
        let mut mount = MountPoint::new("root");
        hydrator(vec![counter()])
            .hydrate(&mut mount, &envelope, &Props::new())
            .unwrap();

        assert!(mount.dispatch(&Event::click(Target::First)).unwrap());
        assert!(mount.dispatch(&Event::click(Target::First)).unwrap());

        assert_eq!(mount.content(), "<div><span>2</span><button>+</button></div>");
    }

    #[test]
    fn unknown_component_never_mounts() {
        let envelope = serialize_component(&counter(), &Props::new()).unwrap();
        let mut mount = MountPoint::new("root");

        let result = hydrator(vec![]).hydrate(&mut mount, &envelope, &Props::new());

        assert!(matches!(result, Err(HydrationError::UnknownComponent(ref name)) if name == "Counter"));
        assert_eq!(mount.state(), MountState::Unmounted);
        assert!(mount.instance().is_none());
        assert_eq!(mount.content(), "");
    }

    #[test]
    fn malformed_envelope_never_mounts() {
        let mut mount = MountPoint::new("root");

        let result = hydrator(vec![counter()]).hydrate(&mut mount, "{\"markup\":", &Props::new());

        assert!(matches!(result, Err(HydrationError::Parse(_))));
        assert_eq!(mount.state(), MountState::Unmounted);
        assert_eq!(mount.content(), "");
    }

    #[test]
    fn failing_live_render_reverts_to_unmounted() {
        let fragile = FnComponent::new("Fragile", |props| match props.get_str("mode") {
            Some("live") => Err(RenderError::Failed("cannot go live".into())),
            _ => Ok(Node::from("static")),
        })
        .shared();
        let envelope = serialize_component(&fragile, &Props::new()).unwrap();
        let mut mount = MountPoint::new("root");

        let result = hydrator(vec![fragile]).hydrate(
            &mut mount,
            &envelope,
            &Props::new().with("mode", "live"),
        );

        assert!(matches!(result, Err(HydrationError::Mount { .. })));
        assert_eq!(mount.state(), MountState::Unmounted);
        assert_eq!(mount.content(), "");
    }

    #[test]
    fn rehydration_tears_down_before_constructing() {
        let active = Arc::new(AtomicI64::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));

        let effect_active = Arc::clone(&active);
        let effect_log = Arc::clone(&log);
        let tracked = FnComponent::new("Tracked", |props| {
            Ok(Node::from(props.get_str("label").unwrap_or("").to_string()))
        })
        .with_effect(move |props| {
            let label = props.get_str("label").unwrap_or("").to_string();
            let overlapping = effect_active.fetch_add(1, Ordering::SeqCst);
            effect_log
                .lock()
                .unwrap()
                .push(format!("mount {} with {} active", label, overlapping));

            let active = Arc::clone(&effect_active);
            let log = Arc::clone(&effect_log);
            Box::new(move || {
                active.fetch_sub(1, Ordering::SeqCst);
                log.lock().unwrap().push(format!("teardown {}", label));
            })
        })
        .shared();

        let first = serialize_component(&tracked, &Props::new().with("label", "a")).unwrap();
        let second = serialize_component(&tracked, &Props::new().with("label", "b")).unwrap();
        let hydrator = hydrator(vec![tracked]);
        let mut mount = MountPoint::new("root");

        hydrator.hydrate(&mut mount, &first, &Props::new()).unwrap();
        hydrator.hydrate(&mut mount, &second, &Props::new()).unwrap();
        assert_eq!(mount.content(), "b");

        mount.unmount();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "mount a with 0 active".to_string(),
                "teardown a".to_string(),
                "mount b with 0 active".to_string(),
                "teardown b".to_string(),
            ]
        );
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn rejects_invalid_transitions() {
        let mut mount = MountPoint::new("root");

        assert!(matches!(
            mount.transition(MountState::LiveMounted),
            Err(HydrationError::InvalidTransition {
                from: MountState::Unmounted,
                to: MountState::LiveMounted
            })
        ));
    }

    #[test]
    fn dispatch_requires_live_instance() {
        let mut mount = MountPoint::new("empty");
        assert!(matches!(
            mount.dispatch(&Event::click(Target::First)),
            Err(HydrationError::NotMounted(_))
        ));
    }
}
