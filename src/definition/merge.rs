//! Parent/child definition merging.

use super::{BeanDefinition, MergedDefinition, PropertyValues};
use crate::scope::SCOPE_SINGLETON;

impl MergedDefinition {
    /// Merged form of a definition without a parent.
    pub(crate) fn from_root(name: &str, def: &BeanDefinition) -> Self {
        Self {
            name: name.to_owned(),
            bean_type: def.bean_type.or_else(|| def.recipe.as_ref().map(|r| r.bean_type)),
            scope: scope_or_default(def.scope.as_deref()),
            lazy_init: def.lazy_init.unwrap_or(false),
            early_reference: def.early_reference.unwrap_or(false),
            is_abstract: def.is_abstract,
            description: def.description.clone(),
            depends_on: def.depends_on.clone(),
            properties: def.properties.clone(),
            constructor_args: def.constructor_args.clone(),
            attributes: def.attributes.clone(),
            recipe: def.recipe.clone(),
            binder: def.binder.clone(),
            init: def.init.clone(),
            destroy: def.destroy.clone(),
        }
    }

    /// Overlays `child` on an already merged `parent`.
    ///
    /// Scalars set on the child win. `abstract` is never inherited.
    /// Keyed collections keep the parent's entries unless the child has the
    /// same key; `depends_on` is the union, parent entries first.
    pub(crate) fn from_parent(name: &str, parent: &MergedDefinition, child: &BeanDefinition) -> Self {
        let recipe = child.recipe.clone().or_else(|| parent.recipe.clone());
        let bean_type = child
            .bean_type
            .or_else(|| child.recipe.as_ref().map(|r| r.bean_type))
            .or(parent.bean_type);

        let scope = match child.scope.as_deref() {
            Some(scope) if !scope.is_empty() => scope.to_owned(),
            _ => parent.scope.clone(),
        };

        let mut depends_on = parent.depends_on.clone();
        for dep in &child.depends_on {
            if !depends_on.contains(dep) {
                depends_on.push(dep.clone());
            }
        }

        let mut constructor_args = parent.constructor_args.clone();
        constructor_args.extend(child.constructor_args.iter().map(|(i, v)| (*i, v.clone())));

        let mut attributes = parent.attributes.clone();
        attributes.extend(child.attributes.iter().map(|(k, v)| (k.clone(), v.clone())));

        Self {
            name: name.to_owned(),
            bean_type,
            scope,
            lazy_init: child.lazy_init.unwrap_or(parent.lazy_init),
            early_reference: child.early_reference.unwrap_or(parent.early_reference),
            is_abstract: child.is_abstract,
            description: child.description.clone().or_else(|| parent.description.clone()),
            depends_on,
            properties: PropertyValues::merged_with_parent(&parent.properties, &child.properties),
            constructor_args,
            attributes,
            recipe,
            binder: child.binder.clone().or_else(|| parent.binder.clone()),
            init: child.init.clone().or_else(|| parent.init.clone()),
            destroy: child.destroy.clone().or_else(|| parent.destroy.clone()),
        }
    }
}

fn scope_or_default(scope: Option<&str>) -> String {
    match scope {
        Some(scope) if !scope.is_empty() => scope.to_owned(),
        _ => SCOPE_SINGLETON.to_owned(),
    }
}
