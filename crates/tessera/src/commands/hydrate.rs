//! Hydrate a stored envelope into a headless mount point.

use std::sync::Arc;

use anyhow::{Context, Result};
use tessera_envelope::{EnvelopeStore, Event, FileStore, Hydrator, MountPoint, Target};
use tessera_markup::{Props, Value};
use tessera_server::demo_registry;

use crate::config::ConfigFile;

/// Markup before and after hydration.
#[derive(Debug)]
pub struct Hydrated {
    pub static_markup: String,
    pub live_markup: String,
}

/// Run the hydrate command.
pub async fn run(
    config: &ConfigFile,
    slot: Option<String>,
    props: &[String],
    clicks: usize,
) -> Result<()> {
    let slot = slot.unwrap_or_else(|| config.store.slot.clone());
    let store = FileStore::new(&config.store.dir);
    let overrides = parse_props(props)?;

    let hydrated = hydrate(&store, &slot, &overrides, clicks)?;

    println!("static: {}", hydrated.static_markup);
    println!("live:   {}", hydrated.live_markup);
    Ok(())
}

/// Hydrate the envelope in `slot`, then click its first button `clicks` times.
pub fn hydrate(
    store: &dyn EnvelopeStore,
    slot: &str,
    overrides: &Props,
    clicks: usize,
) -> Result<Hydrated> {
    let envelope = store
        .get(slot)
        .with_context(|| format!("Failed to read slot {}", slot))?
        .with_context(|| format!("Slot {} is empty. Run 'tessera export' first.", slot))?;

    let registry = demo_registry().context("Failed to build component registry")?;
    let hydrator = Hydrator::new(Arc::new(registry));
    let mut mount = MountPoint::new(slot);

    let static_markup = {
        let instance = hydrator
            .hydrate(&mut mount, &envelope, overrides)
            .context("Failed to hydrate envelope")?;
        instance.static_markup().to_string()
    };

    for _ in 0..clicks {
        let handled = mount
            .dispatch(&Event::click(Target::First))
            .context("Failed to dispatch click")?;
        if !handled {
            tracing::warn!("Component has no click listener");
            break;
        }
    }

    Ok(Hydrated {
        static_markup,
        live_markup: mount.content().to_string(),
    })
}

/// Parse `key=value` overrides. Values that parse as JSON keep their type,
/// anything else is a string.
pub fn parse_props(pairs: &[String]) -> Result<Props> {
    pairs
        .iter()
        .map(|pair| {
            let (key, raw) = pair
                .split_once('=')
                .with_context(|| format!("Invalid prop {:?}, expected key=value", pair))?;
            let value = serde_json::from_str::<serde_json::Value>(raw)
                .map(Value::from_json)
                .unwrap_or_else(|_| Value::from(raw));
            Ok((key.to_string(), value))
        })
        .collect()
}
