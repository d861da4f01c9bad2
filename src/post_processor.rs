//! Post-processor hooks around bean instantiation, initialization and
//! destruction.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::definition::PropertyValues;
use crate::error::{BeanResult, BoxError};
use crate::type_hint::TypeHint;
use crate::AnyArc;

/// Hooks invoked for every bean the factory creates.
///
/// Every method has a pass-through default, so implementations override only
/// what they need. Hooks returning an object may substitute a different one
/// (a wrapper, a proxy); the next processor sees the substitute.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{AnyArc, BeanDefinition, BeanFactory, BeanPostProcessor, BeanResult};
/// use std::sync::{Arc, Mutex};
///
/// #[derive(Default)]
/// struct Audit {
///     seen: Mutex<Vec<String>>,
/// }
///
/// impl BeanPostProcessor for Audit {
///     fn after_initialization(&self, bean: AnyArc, name: &str) -> BeanResult<AnyArc> {
///         self.seen.lock().unwrap().push(name.to_owned());
///         Ok(bean)
///     }
/// }
///
/// let audit = Arc::new(Audit::default());
/// let factory = BeanFactory::new();
/// factory.add_post_processor(audit.clone());
/// factory.register_definition("a", BeanDefinition::of(|_| Ok(1u32))).unwrap();
/// factory.get_bean("a").unwrap();
///
/// assert_eq!(*audit.seen.lock().unwrap(), vec!["a"]);
/// ```
pub trait BeanPostProcessor: Send + Sync {
    /// Before the supplier runs. Returning an object skips instantiation,
    /// population and initialization; only
    /// [`after_initialization`](BeanPostProcessor::after_initialization) still applies.
    fn before_instantiation(&self, _bean_type: Option<TypeHint>, _name: &str) -> BeanResult<Option<AnyArc>> {
        Ok(None)
    }

    /// After instantiation. Returning `false` skips property population.
    fn after_instantiation(&self, _bean: &AnyArc, _name: &str) -> BeanResult<bool> {
        Ok(true)
    }

    /// Rewrites the property values before they are bound.
    fn process_properties(&self, values: PropertyValues, _bean: &AnyArc, _name: &str) -> BeanResult<PropertyValues> {
        Ok(values)
    }

    /// The object handed out as an early reference during a circular lookup.
    fn early_reference(&self, bean: AnyArc, _name: &str) -> AnyArc {
        bean
    }

    fn before_initialization(&self, bean: AnyArc, _name: &str) -> BeanResult<AnyArc> {
        Ok(bean)
    }

    fn after_initialization(&self, bean: AnyArc, _name: &str) -> BeanResult<AnyArc> {
        Ok(bean)
    }

    /// Before a bean is destroyed. Errors are logged, not propagated.
    fn before_destruction(&self, _bean: &AnyArc, _name: &str) -> Result<(), BoxError> {
        Ok(())
    }

    /// Whether [`before_destruction`](BeanPostProcessor::before_destruction)
    /// should run for `bean` at all.
    fn requires_destruction(&self, _bean: &AnyArc) -> bool {
        false
    }
}

/// Ordered processor chain.
///
/// Programmatically added processors always run before discovered ones.
/// Within each list, registration order is authoritative.
#[derive(Default)]
pub(crate) struct PostProcessorPipeline {
    programmatic: RwLock<Vec<Arc<dyn BeanPostProcessor>>>,
    discovered: RwLock<Vec<Arc<dyn BeanPostProcessor>>>,
}

impl PostProcessorPipeline {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, processor: Arc<dyn BeanPostProcessor>) {
        push_last(&mut self.programmatic.write(), processor);
    }

    pub(crate) fn add_discovered(&self, processor: Arc<dyn BeanPostProcessor>) {
        push_last(&mut self.discovered.write(), processor);
    }

    /// The chain in execution order.
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn BeanPostProcessor>> {
        let mut all = self.programmatic.read().clone();
        all.extend(self.discovered.read().iter().cloned());
        all
    }

    pub(crate) fn len(&self) -> usize {
        self.programmatic.read().len() + self.discovered.read().len()
    }

    pub(crate) fn copy_from(&self, other: &PostProcessorPipeline) {
        let programmatic = other.programmatic.read().clone();
        let discovered = other.discovered.read().clone();
        for p in programmatic {
            self.add(p);
        }
        for p in discovered {
            self.add_discovered(p);
        }
    }
}

/// Appends `processor`, moving it to the end if it is already present.
fn push_last(list: &mut Vec<Arc<dyn BeanPostProcessor>>, processor: Arc<dyn BeanPostProcessor>) {
    list.retain(|p| !Arc::ptr_eq(p, &processor));
    list.push(processor);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;
    impl BeanPostProcessor for Noop {}

    #[test]
    fn programmatic_run_before_discovered_and_readding_moves_last() {
        let pipeline = PostProcessorPipeline::new();
        let a: Arc<dyn BeanPostProcessor> = Arc::new(Noop);
        let b: Arc<dyn BeanPostProcessor> = Arc::new(Noop);
        let d: Arc<dyn BeanPostProcessor> = Arc::new(Noop);

        pipeline.add_discovered(d.clone());
        pipeline.add(a.clone());
        pipeline.add(b.clone());
        pipeline.add(a.clone());

        let chain = pipeline.snapshot();
        assert_eq!(pipeline.len(), 3);
        assert!(Arc::ptr_eq(&chain[0], &b));
        assert!(Arc::ptr_eq(&chain[1], &a));
        assert!(Arc::ptr_eq(&chain[2], &d));
    }
}
