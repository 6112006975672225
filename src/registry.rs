use crate::{node::Node, Error};
use std::collections::BTreeMap;

/// Registry maps absolute URIs to the root Nodes of registered schema
/// documents. The empty string is a valid key, naming an anonymous schema.
/// Entries have last-writer-wins semantics and persist until unregistered.
#[derive(Debug, Default)]
pub struct Registry(BTreeMap<String, Node>);

impl Registry {
    pub fn new() -> Registry {
        Registry(BTreeMap::new())
    }

    /// Build `schema` rooted at `uri` and store it under `uri`, replacing
    /// any prior entry.
    pub fn register(&mut self, schema: &serde_json::Value, uri: &str) -> Result<(), Error> {
        let root = Node::build(schema, uri)?;
        tracing::debug!(uri, "registered schema");
        self.0.insert(uri.to_string(), root);
        Ok(())
    }

    pub fn lookup(&self, uri: &str) -> Option<&Node> {
        self.0.get(uri)
    }

    pub fn unregister(&mut self, uri: &str) {
        tracing::debug!(uri, "unregistered schema");
        self.0.remove(uri);
    }
}
