use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use glob::glob;

use crate::compiler::compile_explore;
use crate::config::ExploreConfig;
use crate::dialect::dialect_for;
use crate::error::{ExploreError, Result};
use crate::explore::Explore;
use crate::models::ExploreDefinition;

/// Compiled explores keyed by name, shareable across threads.
#[derive(Debug, Default, Clone)]
pub struct ExploreRegistry {
    explores: HashMap<String, Arc<Explore>>,
}

impl ExploreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile each definition for the dialect configured for it.
    pub fn from_definitions(
        definitions: Vec<ExploreDefinition>,
        config: &ExploreConfig,
    ) -> Result<Self> {
        let mut registry = ExploreRegistry::new();
        for definition in definitions {
            registry.insert_definition(&definition, config)?;
        }
        Ok(registry)
    }

    /// Load every `*.yml` / `*.yaml` explore definition in `dir`.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P, config: &ExploreConfig) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Err(ExploreError::Validation(format!(
                "explores directory not found: {}",
                dir.display()
            )));
        }
        let mut registry = ExploreRegistry::new();
        for pattern in ["*.yml", "*.yaml"] {
            for entry in glob(&format!("{}/{pattern}", dir.display()))
                .map_err(|e| ExploreError::Other(e.into()))?
                .flatten()
            {
                registry.load_explore_file(&entry, config)?;
            }
        }
        tracing::info!(
            dir = %dir.display(),
            explores = registry.explores.len(),
            "loaded explore registry"
        );
        Ok(registry)
    }

    fn load_explore_file(&mut self, path: &Path, config: &ExploreConfig) -> Result<()> {
        let contents = fs::read_to_string(path)?;
        let definition: ExploreDefinition = serde_yaml::from_str(&contents)?;
        self.insert_definition(&definition, config)
    }

    fn insert_definition(
        &mut self,
        definition: &ExploreDefinition,
        config: &ExploreConfig,
    ) -> Result<()> {
        if self.explores.contains_key(&definition.name) {
            return Err(ExploreError::Validation(format!(
                "explore {} is defined more than once",
                definition.name
            )));
        }
        let resolved = config.for_explore(&definition.name);
        let explore = compile_explore(definition, dialect_for(resolved.dialect))?;
        self.explores
            .insert(definition.name.clone(), Arc::new(explore));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Explore>> {
        self.explores.get(name).cloned()
    }

    /// Explore names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.explores.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.explores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.explores.is_empty()
    }
}
