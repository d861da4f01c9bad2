//! Raw and merged definition storage.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{BeanDefinition, MergedDefinition};
use crate::error::{BeanError, BeanResult};

/// Lookups the store needs from its owning factory while merging.
pub(crate) struct MergeEnv<'a> {
    /// Alias resolution for parent names
    pub(crate) canonical: &'a dyn Fn(&str) -> String,
    /// Merged definition of `name` in the parent factory, if there is one
    pub(crate) external: &'a dyn Fn(&str) -> BeanResult<Arc<MergedDefinition>>,
    pub(crate) cache: bool,
}

/// Outcome of a registration.
pub(crate) struct Registered {
    /// `true` if an existing definition was replaced
    pub(crate) replaced: bool,
    /// Names whose merged definitions were reset: the name and its descendants
    pub(crate) reset: Vec<String>,
}

#[derive(Default)]
pub(crate) struct DefinitionStore {
    definitions: RwLock<HashMap<String, Arc<BeanDefinition>>>,
    names: RwLock<Vec<String>>,
    merged: RwLock<HashMap<String, Arc<MergedDefinition>>>,
    already_created: RwLock<HashSet<String>>,
    frozen: AtomicBool,
}

impl DefinitionStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(
        &self,
        name: &str,
        definition: BeanDefinition,
        allow_overriding: bool,
        canonical: &dyn Fn(&str) -> String,
    ) -> BeanResult<Registered> {
        let replaced = {
            let mut definitions = self.definitions.write();
            let replaced = definitions.contains_key(name);
            if replaced {
                if self.is_frozen() {
                    return Err(BeanError::ConfigurationFrozen {
                        name: name.to_owned(),
                        action: "override definition",
                    });
                }
                if !allow_overriding {
                    return Err(BeanError::conflict(name, "a definition is already registered and overriding is disabled"));
                }
            } else {
                self.names.write().push(name.to_owned());
            }
            definitions.insert(name.to_owned(), Arc::new(definition));
            replaced
        };

        // New names too: children may have merged against a parent factory's
        // definition of the same name
        let reset = self.reset_merged(name, canonical);
        Ok(Registered { replaced, reset })
    }

    pub(crate) fn remove(&self, name: &str, canonical: &dyn Fn(&str) -> String) -> BeanResult<Vec<String>> {
        if self.is_frozen() {
            return Err(BeanError::ConfigurationFrozen {
                name: name.to_owned(),
                action: "remove definition",
            });
        }
        if self.definitions.write().remove(name).is_none() {
            return Err(BeanError::not_found(name));
        }
        self.names.write().retain(|n| n != name);
        Ok(self.reset_merged(name, canonical))
    }

    /// Drops the merged definition of `name` and of every definition whose
    /// parent chain passes through it.
    fn reset_merged(&self, name: &str, canonical: &dyn Fn(&str) -> String) -> Vec<String> {
        let children: HashMap<String, String> = self
            .definitions
            .read()
            .iter()
            .filter_map(|(n, d)| d.parent().map(|p| (n.clone(), canonical(p))))
            .collect();

        let mut reset = vec![name.to_owned()];
        let mut i = 0;
        while i < reset.len() {
            let current = reset[i].clone();
            for (child, parent) in &children {
                if *parent == current && *child != current && !reset.contains(child) {
                    reset.push(child.clone());
                }
            }
            i += 1;
        }

        let mut merged = self.merged.write();
        for n in &reset {
            merged.remove(n);
        }
        reset
    }

    pub(crate) fn get(&self, name: &str) -> BeanResult<Arc<BeanDefinition>> {
        self.definitions
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BeanError::not_found(name))
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }

    /// Definition names in registration order.
    pub(crate) fn names(&self) -> Vec<String> {
        self.names.read().clone()
    }

    pub(crate) fn count(&self) -> usize {
        self.names.read().len()
    }

    /// Merged definition for a locally defined `name`.
    pub(crate) fn merged(&self, name: &str, env: &MergeEnv<'_>) -> BeanResult<Arc<MergedDefinition>> {
        let mut visiting = Vec::new();
        self.merged_inner(name, env, &mut visiting)
    }

    fn merged_inner(
        &self,
        name: &str,
        env: &MergeEnv<'_>,
        visiting: &mut Vec<String>,
    ) -> BeanResult<Arc<MergedDefinition>> {
        if let Some(merged) = self.merged.read().get(name) {
            return Ok(merged.clone());
        }

        if visiting.iter().any(|v| v == name) {
            visiting.push(name.to_owned());
            return Err(BeanError::invalid(
                &visiting[0],
                format!("parent definitions form a cycle: {}", visiting.join(" -> ")),
            ));
        }

        let definition = self.get(name)?;
        let merged = match definition.parent() {
            None => MergedDefinition::from_root(name, &definition),
            Some(parent) => {
                let parent_name = (env.canonical)(parent);
                visiting.push(name.to_owned());
                let parent = if parent_name != name && self.contains(&parent_name) {
                    self.merged_inner(&parent_name, env, visiting)
                } else {
                    (env.external)(&parent_name)
                };
                visiting.pop();
                let parent = parent.map_err(|e| match e {
                    BeanError::NotFound { name: missing } => BeanError::invalid(
                        name,
                        format!("could not resolve parent definition '{missing}'"),
                    ),
                    other => other,
                })?;
                MergedDefinition::from_parent(name, &parent, &definition)
            }
        };

        let merged = Arc::new(merged);
        if env.cache || self.already_created.read().contains(name) {
            let mut cache = self.merged.write();
            // Keep the first merge if another thread raced us
            return Ok(cache.entry(name.to_owned()).or_insert(merged).clone());
        }
        Ok(merged)
    }

    /// Evicts merged definitions, keeping those of created beans and all of
    /// them once the configuration is frozen.
    pub(crate) fn clear_merged_cache(&self) {
        if self.is_frozen() {
            return;
        }
        let created = self.already_created.read();
        self.merged.write().retain(|name, _| created.contains(name));
    }

    pub(crate) fn mark_created(&self, name: &str) {
        if !self.already_created.read().contains(name) {
            self.already_created.write().insert(name.to_owned());
        }
    }

    pub(crate) fn clear_created(&self, name: &str) {
        self.already_created.write().remove(name);
    }

    pub(crate) fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    pub(crate) fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }
}
