//! Bean lookup and the creation protocol.

use std::sync::Arc;
use std::time::Instant;

use super::destroy::DisposableAdapter;
use super::{original_name, BeanFactory, CreationContext};
use crate::definition::{MergedDefinition, PropertyArg, ResolvedValue, Value};
use crate::error::{BeanError, BeanResult};
use crate::internal::{creation_stack, FrameKind, StackGuard};
use crate::post_processor::BeanPostProcessor;
use crate::producer::Producer;
use crate::scope::ScopeKind;
use crate::AnyArc;

type Processors = [Arc<dyn BeanPostProcessor>];

impl BeanFactory {
    pub(crate) fn do_get_bean(&self, requested: &str) -> BeanResult<AnyArc> {
        let (deref, name) = self.transformed(requested);

        if let Some(object) = self.inner.singletons.get(&name, true) {
            tracing::trace!(target: "ferrous_beans", bean = %name, "returning cached singleton");
            return self.object_for_instance(object, &name, deref);
        }

        if creation_stack::is_independent_in_creation(self.inner.id, &name) {
            return Err(BeanError::CircularReference {
                path: creation_stack::cycle_path(self.inner.id, &name),
                name,
            });
        }

        if !self.inner.definitions.contains(&name) {
            if let Some(parent) = self.parent() {
                return parent.get_bean(&original_name(deref, &name));
            }
            return Err(BeanError::not_found(name));
        }

        self.inner.definitions.mark_created(&name);
        let result = self.create_scoped(&name);
        if result.is_err() && !self.inner.singletons.contains(&name) {
            self.inner.definitions.clear_created(&name);
        }
        self.object_for_instance(result?, &name, deref)
    }

    fn create_scoped(&self, name: &str) -> BeanResult<AnyArc> {
        let merged = self.local_merged(name)?;
        if merged.is_abstract() {
            return Err(BeanError::invalid(name, "abstract definitions cannot be instantiated"));
        }

        for dependency in merged.depends_on() {
            let dependency = self.canonical_name(dependency);
            if self.inner.singletons.graph().is_dependent(name, &dependency) {
                return Err(BeanError::CircularReference {
                    name: name.to_owned(),
                    path: vec![name.to_owned(), dependency.clone(), name.to_owned()],
                });
            }
            self.inner.singletons.graph().register_dependent(&dependency, name);
            self.get_bean(&dependency)?;
        }

        match self.inner.scopes.resolve(name, merged.scope())? {
            ScopeKind::Singleton => self
                .inner
                .singletons
                .get_or_create(name, || self.create_bean(name, &merged)),
            ScopeKind::Prototype => self.create_bean(name, &merged),
            ScopeKind::Custom(scope) => scope.get(name, &mut || self.create_bean(name, &merged)),
        }
    }

    /// Runs the creation protocol once and reports it to the observers.
    fn create_bean(&self, name: &str, merged: &MergedDefinition) -> BeanResult<AnyArc> {
        let kind = if merged.is_singleton() {
            FrameKind::Singleton
        } else {
            FrameKind::Independent
        };
        let max_depth = self.inner.config.read().max_creation_depth;
        let _frame = StackGuard::push(self.inner.id, name, kind, max_depth)?;

        let observers = &self.inner.observers;
        let notify = observers.has_observers();
        let started = Instant::now();
        if notify {
            observers.creating(name);
        }
        tracing::debug!(target: "ferrous_beans", bean = %name, scope = %merged.scope(), "creating bean instance");

        match self.do_create_bean(name, merged) {
            Ok(object) => {
                if notify {
                    observers.created(name, started.elapsed());
                }
                Ok(object)
            }
            Err(error) => {
                tracing::debug!(target: "ferrous_beans", bean = %name, %error, "bean creation failed");
                if notify {
                    observers.creation_failed(name, &error);
                }
                Err(error)
            }
        }
    }

    fn do_create_bean(&self, name: &str, merged: &MergedDefinition) -> BeanResult<AnyArc> {
        let processors = self.inner.post_processors.snapshot();

        for processor in &processors {
            if let Some(object) = processor.before_instantiation(merged.bean_type(), name)? {
                tracing::debug!(target: "ferrous_beans", bean = %name, "instantiation short-circuited by post-processor");
                return apply_after_initialization(&processors, object, name);
            }
        }

        let recipe = merged
            .recipe
            .as_ref()
            .ok_or_else(|| BeanError::invalid(name, "definition has no supplier"))?;
        let ctx = CreationContext::new(self, name, merged);
        let raw = (recipe.supplier)(&ctx).map_err(|e| BeanError::from_callback(name, e))?;

        let (allow_circular, allow_raw_injection) = {
            let config = self.inner.config.read();
            (
                config.allow_circular_references,
                config.allow_raw_injection_despite_wrapping,
            )
        };
        let early_exposure = merged.is_singleton()
            && allow_circular
            && merged.allows_early_reference()
            && self.inner.singletons.is_owned_by_current_thread(name);
        if early_exposure {
            tracing::trace!(target: "ferrous_beans", bean = %name, "exposing early reference");
            let chain = processors.clone();
            let early = raw.clone();
            let early_name = name.to_owned();
            self.inner.singletons.add_early_factory(
                name,
                Box::new(move || {
                    chain
                        .iter()
                        .fold(early, |object, p| p.early_reference(object, &early_name))
                }),
            );
        }

        self.populate(name, merged, &raw, &processors)?;
        let mut exposed = self.initialize(name, merged, raw.clone(), &processors)?;

        if early_exposure {
            if let Some(early) = self.inner.singletons.early_reference_taken(name) {
                if Arc::ptr_eq(&exposed, &raw) {
                    exposed = early;
                } else if !allow_raw_injection
                    && !self.inner.singletons.graph().dependents(name).is_empty()
                {
                    return Err(BeanError::RawReferenceWrapped { name: name.to_owned() });
                }
            }
        }

        if !merged.is_prototype() {
            let adapter = DisposableAdapter::new(
                name,
                raw,
                Some(merged),
                &processors,
                self.inner.observers.snapshot(),
            );
            if let Some(adapter) = adapter {
                match self.inner.scopes.resolve(name, merged.scope())? {
                    ScopeKind::Custom(scope) => {
                        scope.register_destruction_callback(name, adapter.into_callback())
                    }
                    _ => self
                        .inner
                        .singletons
                        .register_disposable(name, adapter.into_callback()),
                }
            }
        }

        Ok(exposed)
    }

    fn populate(
        &self,
        name: &str,
        merged: &MergedDefinition,
        bean: &AnyArc,
        processors: &Processors,
    ) -> BeanResult<()> {
        for processor in processors {
            if !processor.after_instantiation(bean, name)? {
                tracing::trace!(target: "ferrous_beans", bean = %name, "property population vetoed");
                return Ok(());
            }
        }

        let mut values = merged.properties().clone();
        for processor in processors {
            values = processor.process_properties(values, bean, name)?;
        }
        if values.is_empty() {
            return Ok(());
        }

        let binder = merged
            .binder
            .as_ref()
            .ok_or_else(|| BeanError::invalid(name, "properties are declared but no binder is set"))?;
        let converter = self.converter_chain();
        for (property, value) in values.iter() {
            let resolved = self.resolve_value(name, value)?;
            let arg = PropertyArg::new(name, property, &resolved, &converter);
            binder(bean, &arg).map_err(|e| BeanError::from_callback(name, e))?;
        }
        Ok(())
    }

    fn initialize(
        &self,
        name: &str,
        merged: &MergedDefinition,
        bean: AnyArc,
        processors: &Processors,
    ) -> BeanResult<AnyArc> {
        let mut bean = bean;
        for processor in processors {
            bean = processor.before_initialization(bean, name)?;
        }
        if let Some(init) = &merged.init {
            tracing::trace!(target: "ferrous_beans", bean = %name, "invoking init callback");
            init(name, &bean).map_err(|e| BeanError::from_callback(name, e))?;
        }
        apply_after_initialization(processors, bean, name)
    }

    /// Resolves a declared value: placeholders and expressions in text,
    /// bean references (recorded as dependencies of `bean`), and lists.
    pub(crate) fn resolve_value(&self, bean: &str, value: &Value) -> BeanResult<ResolvedValue> {
        match value {
            Value::Text(text) => {
                let resolved = self.resolve_embedded_value(text).ok_or_else(|| {
                    BeanError::invalid(bean, format!("could not resolve placeholders in '{text}'"))
                })?;
                match self.expression_resolver() {
                    Some(expressions) => expressions.evaluate(&resolved, bean),
                    None => Ok(ResolvedValue::Text(resolved)),
                }
            }
            Value::Integer(v) => Ok(ResolvedValue::Integer(*v)),
            Value::Float(v) => Ok(ResolvedValue::Float(*v)),
            Value::Bool(v) => Ok(ResolvedValue::Bool(*v)),
            Value::Ref(target) => {
                let object = self.get_bean(target)?;
                self.register_dependent_bean(target, bean);
                Ok(ResolvedValue::Bean {
                    name: self.canonical_name(target),
                    object,
                })
            }
            Value::List(items) => items
                .iter()
                .map(|item| self.resolve_value(bean, item))
                .collect::<BeanResult<Vec<_>>>()
                .map(ResolvedValue::List),
        }
    }

    /// The producer view of `object` if `name`'s definition declares one.
    pub(crate) fn producer_of(&self, name: &str, object: &AnyArc) -> Option<Arc<dyn Producer>> {
        if !self.inner.definitions.contains(name) {
            return None;
        }
        self.local_merged(name).ok()?.producer_of(object)
    }

    /// Maps a bean object to what a lookup returns: the object itself, the
    /// producer for `&name`, or the producer's product.
    fn object_for_instance(&self, object: AnyArc, name: &str, deref: bool) -> BeanResult<AnyArc> {
        let producer = self.producer_of(name, &object);
        if deref {
            return match producer {
                Some(_) => Ok(object),
                None => Err(BeanError::NotAProducer { name: name.to_owned() }),
            };
        }
        match producer {
            Some(producer) => self.product_of(name, producer.as_ref()),
            None => Ok(object),
        }
    }

    fn product_of(&self, name: &str, producer: &dyn Producer) -> BeanResult<AnyArc> {
        // Only finished singleton producers get their product cached
        let shared = producer.is_singleton() && self.inner.singletons.contains(name);
        let products = self.inner.singletons.products();
        if shared {
            if let Some(product) = products.get(name) {
                return Ok(product);
            }
        }

        let product = producer.get_object().map_err(|e| e.into_bean_error(name))?;
        let processors = self.inner.post_processors.snapshot();
        if !shared {
            return apply_after_initialization(&processors, product, name);
        }
        if let Some(product) = products.get(name) {
            return Ok(product);
        }
        let product = apply_after_initialization(&processors, product, name)?;
        tracing::trace!(target: "ferrous_beans", bean = %name, "caching producer product");
        Ok(products.insert_if_absent(name, product))
    }
}

fn apply_after_initialization(processors: &Processors, bean: AnyArc, name: &str) -> BeanResult<AnyArc> {
    let mut bean = bean;
    for processor in processors {
        bean = processor.after_initialization(bean, name)?;
    }
    Ok(bean)
}
