//! Name/alias table.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{BeanError, BeanResult};
use crate::resolver::ValueResolver;

/// Maps aliases to the names they stand for.
///
/// Chains (`a2 -> a1 -> a`) resolve transitively. Cycles are rejected at
/// registration time, so resolution always terminates.
#[derive(Default)]
pub(crate) struct AliasRegistry {
    aliases: RwLock<HashMap<String, String>>,
}

impl AliasRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers `alias` for `name`.
    ///
    /// An alias equal to the name removes any alias of that spelling.
    /// Registering the same pair again is a no-op.
    pub(crate) fn register(&self, name: &str, alias: &str) -> BeanResult<()> {
        if name.is_empty() || alias.is_empty() {
            return Err(BeanError::invalid(alias, "name and alias must not be empty"));
        }
        let mut aliases = self.aliases.write();
        if alias == name {
            aliases.remove(alias);
            return Ok(());
        }
        if let Some(existing) = aliases.get(alias) {
            if existing == name {
                return Ok(());
            }
            return Err(BeanError::conflict(
                alias,
                format!("alias already registered for '{existing}', cannot point it at '{name}'"),
            ));
        }
        if resolves_to(&aliases, name, alias) {
            return Err(BeanError::conflict(
                alias,
                format!("registering '{alias}' for '{name}' would create an alias cycle"),
            ));
        }
        aliases.insert(alias.to_owned(), name.to_owned());
        tracing::trace!(target: "ferrous_beans", %alias, %name, "registered alias");
        Ok(())
    }

    pub(crate) fn remove(&self, alias: &str) -> BeanResult<()> {
        self.aliases
            .write()
            .remove(alias)
            .map(|_| ())
            .ok_or_else(|| BeanError::not_found(alias))
    }

    pub(crate) fn is_alias(&self, name: &str) -> bool {
        self.aliases.read().contains_key(name)
    }

    /// Follows the alias chain to the canonical name.
    pub(crate) fn canonical_name(&self, name: &str) -> String {
        let aliases = self.aliases.read();
        let mut current = name;
        while let Some(target) = aliases.get(current) {
            current = target;
        }
        current.to_owned()
    }

    /// All aliases that resolve to `name`, directly or through other aliases.
    pub(crate) fn aliases_of(&self, name: &str) -> Vec<String> {
        let aliases = self.aliases.read();
        let mut found = Vec::new();
        collect_aliases(&aliases, name, &mut found);
        found.sort();
        found
    }

    /// Rewrites every alias and target through `resolver`.
    ///
    /// An entry whose alias or target resolves to nothing, or to the same
    /// string, is dropped.
    pub(crate) fn resolve_all(&self, resolver: &dyn ValueResolver) -> BeanResult<()> {
        let mut aliases = self.aliases.write();
        let mut entries: Vec<(String, String)> =
            aliases.iter().map(|(a, n)| (a.clone(), n.clone())).collect();
        entries.sort();

        for (alias, name) in entries {
            let resolved_alias = resolver.resolve_value(&alias);
            let resolved_name = resolver.resolve_value(&name);
            let (Some(resolved_alias), Some(resolved_name)) = (resolved_alias, resolved_name) else {
                aliases.remove(&alias);
                continue;
            };
            if resolved_alias == resolved_name {
                aliases.remove(&alias);
                continue;
            }
            if resolved_alias != alias {
                if let Some(existing) = aliases.get(&resolved_alias) {
                    if *existing == resolved_name {
                        aliases.remove(&alias);
                        continue;
                    }
                    return Err(BeanError::conflict(
                        resolved_alias.clone(),
                        format!("resolved alias already registered for '{existing}'"),
                    ));
                }
                if resolves_to(&aliases, &resolved_name, &resolved_alias) {
                    return Err(BeanError::conflict(resolved_alias, "resolved aliases form a cycle"));
                }
                aliases.remove(&alias);
                aliases.insert(resolved_alias, resolved_name);
            } else if name != resolved_name {
                aliases.insert(alias, resolved_name);
            }
        }
        Ok(())
    }
}

/// `true` if following aliases from `start` reaches `target`.
fn resolves_to(aliases: &HashMap<String, String>, start: &str, target: &str) -> bool {
    let mut current = start;
    while let Some(next) = aliases.get(current) {
        if next == target {
            return true;
        }
        current = next;
    }
    false
}

fn collect_aliases(aliases: &HashMap<String, String>, name: &str, found: &mut Vec<String>) {
    for (alias, target) in aliases {
        if target == name && !found.contains(alias) {
            found.push(alias.clone());
            collect_aliases(aliases, alias, found);
        }
    }
}
