use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::error::{LoadError, UnsupportedSchema};
use crate::loader::SpecDocument;
use crate::mapper::{map_resources, MapOptions};
use crate::types::{CatalogEntry, EndpointTemplate, OperationKind, ResourceSchema, SecurityScheme};

/// Read-only registry of every resource found in a document.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<String, CatalogEntry>,
    warnings: Vec<UnsupportedSchema>,
    default_base_url: Option<String>,
    security_schemes: BTreeMap<String, SecurityScheme>,
    source: String,
}

impl Catalog {
    pub fn build(doc: &SpecDocument, opts: MapOptions) -> Result<Self, LoadError> {
        let mapped = map_resources(doc, opts)?;
        let catalog = Self::from_entries(mapped.entries, mapped.warnings)?
            .with_document_defaults(doc);
        tracing::info!(
            source = %catalog.source,
            resources = catalog.entries.len(),
            warnings = catalog.warnings.len(),
            "resource catalog built"
        );
        Ok(catalog)
    }

    /// Assembles a catalog from already mapped entries.
    pub fn from_entries(
        entries: Vec<CatalogEntry>,
        warnings: Vec<UnsupportedSchema>,
    ) -> Result<Self, LoadError> {
        let mut map = HashMap::with_capacity(entries.len());
        for entry in entries {
            if entry.operations.is_empty() {
                return Err(LoadError::incomplete(entry.name(), "no operations"));
            }
            if !entry.supports(OperationKind::Create) && !entry.supports(OperationKind::Read) {
                return Err(LoadError::incomplete(
                    entry.name(),
                    "neither create nor read is available",
                ));
            }
            let name = entry.name().to_string();
            if map.insert(name.clone(), entry).is_some() {
                return Err(LoadError::malformed(format!("duplicate resource name '{name}'")));
            }
        }
        Ok(Self {
            entries: map,
            warnings,
            ..Self::default()
        })
    }

    fn with_document_defaults(mut self, doc: &SpecDocument) -> Self {
        self.default_base_url = doc.default_server();
        self.security_schemes = doc.security_schemes();
        self.source = doc.source.clone();
        self
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn operation(&self, name: &str, kind: OperationKind) -> Option<&EndpointTemplate> {
        self.entries.get(name)?.operation(kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resource names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Every resource schema, sorted by name.
    pub fn schemas(&self) -> Vec<&ResourceSchema> {
        self.names()
            .into_iter()
            .filter_map(|n| self.entries.get(n).map(|e| &e.schema))
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    pub fn warnings(&self) -> &[UnsupportedSchema] {
        &self.warnings
    }

    pub fn default_base_url(&self) -> Option<&str> {
        self.default_base_url.as_deref()
    }

    pub fn security_scheme(&self, name: &str) -> Option<&SecurityScheme> {
        self.security_schemes.get(name)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Shared, swappable reference to the current catalog.
///
/// Readers take a snapshot and keep using it for the rest of their call;
/// [`CatalogHandle::replace`] installs a fully built catalog in one step.
#[derive(Debug, Default)]
pub struct CatalogHandle {
    current: RwLock<Arc<Catalog>>,
}

impl CatalogHandle {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    pub fn snapshot(&self) -> Arc<Catalog> {
        // A poisoned lock still holds a complete catalog.
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Installs `catalog` and returns the previous one.
    pub fn replace(&self, catalog: Catalog) -> Arc<Catalog> {
        let next = Arc::new(catalog);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldKind, FieldSchema, ResourceBinding};

    fn entry(name: &str, kinds: &[OperationKind]) -> CatalogEntry {
        CatalogEntry {
            schema: ResourceSchema {
                name: name.to_string(),
                fields: vec![FieldSchema::new("id", FieldKind::String)],
                identifier: Some("id".to_string()),
            },
            operations: kinds
                .iter()
                .map(|k| {
                    (
                        *k,
                        EndpointTemplate {
                            method: "GET".to_string(),
                            path: format!("/{name}s"),
                            query_params: vec![],
                            security: vec![],
                            asynchronous: None,
                            list_items: None,
                        },
                    )
                })
                .collect(),
            binding: ResourceBinding::default(),
        }
    }

    #[test]
    fn rejects_entries_without_create_or_read() {
        let err = Catalog::from_entries(vec![entry("a", &[OperationKind::Delete])], vec![]).unwrap_err();
        assert!(matches!(err, LoadError::IncompleteResourceSchema { .. }));
        let err = Catalog::from_entries(vec![entry("a", &[])], vec![]).unwrap_err();
        assert!(matches!(err, LoadError::IncompleteResourceSchema { .. }));
    }

    #[test]
    fn replace_swaps_whole_catalog() {
        let first = Catalog::from_entries(vec![entry("a", &[OperationKind::Read])], vec![]).unwrap();
        let handle = CatalogHandle::new(first);
        let before = handle.snapshot();

        let second = Catalog::from_entries(
            vec![entry("b", &[OperationKind::Read]), entry("c", &[OperationKind::Create])],
            vec![],
        )
        .unwrap();
        let old = handle.replace(second);

        assert!(Arc::ptr_eq(&before, &old));
        assert_eq!(before.names(), vec!["a"]);
        assert_eq!(handle.snapshot().names(), vec!["b", "c"]);
        assert!(handle.snapshot().operation("c", OperationKind::Create).is_some());
        assert!(handle.snapshot().operation("c", OperationKind::Read).is_none());
    }
}
