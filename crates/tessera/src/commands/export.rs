//! Serialize the counter component into a store slot.

use anyhow::{Context, Result};
use tessera_envelope::{serialize_component, EnvelopeStore, FileStore};
use tessera_markup::Props;
use tessera_server::client_counter;

use crate::config::ConfigFile;

/// Run the export command.
pub async fn run(config: &ConfigFile, slot: Option<String>) -> Result<()> {
    let slot = slot.unwrap_or_else(|| config.store.slot.clone());
    let store = FileStore::new(&config.store.dir);

    let envelope = export(&store, &slot)?;

    println!("{}", envelope);
    Ok(())
}

/// Capture the counter and store its envelope under `slot`.
pub fn export(store: &dyn EnvelopeStore, slot: &str) -> Result<String> {
    let envelope = serialize_component(&client_counter(), &Props::new())
        .context("Failed to serialize component")?;

    store
        .put(slot, &envelope)
        .with_context(|| format!("Failed to store envelope in slot {}", slot))?;
    tracing::info!("Component serialized into slot {}", slot);

    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tessera_envelope::Envelope;

    #[test]
    fn exports_counter_envelope() {
        let temp = tempdir().unwrap();
        let store = FileStore::new(temp.path());

        let envelope = export(&store, "serializedCounter").unwrap();

        assert_eq!(store.get("serializedCounter").unwrap(), Some(envelope.clone()));
        let decoded = Envelope::decode(&envelope).unwrap();
        assert_eq!(decoded.component_name(), "ClientCounter");
        assert!(decoded.markup().contains("Counter: <span"));
    }

    #[test]
    fn rejects_bad_slot() {
        let temp = tempdir().unwrap();
        let store = FileStore::new(temp.path());

        assert!(export(&store, "../outside").is_err());
    }
}
