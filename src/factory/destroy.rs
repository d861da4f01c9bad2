//! Destruction of individual beans.

use std::sync::Arc;

use crate::definition::{CallbackFn, MergedDefinition};
use crate::observer::LifecycleObserver;
use crate::post_processor::BeanPostProcessor;
use crate::scope::DestructionCallback;
use crate::AnyArc;

/// Everything needed to tear one bean down after the factory forgets it.
///
/// Runs the destruction-aware post-processors, then the definition's destroy
/// callback. Failures are logged and swallowed: teardown is best-effort.
pub(crate) struct DisposableAdapter {
    name: String,
    bean: AnyArc,
    destroy: Option<CallbackFn>,
    processors: Vec<Arc<dyn BeanPostProcessor>>,
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl DisposableAdapter {
    /// An adapter for `bean`, or `None` when nothing would run on destruction.
    pub(crate) fn new(
        name: &str,
        bean: AnyArc,
        definition: Option<&MergedDefinition>,
        processors: &[Arc<dyn BeanPostProcessor>],
        observers: Vec<Arc<dyn LifecycleObserver>>,
    ) -> Option<Self> {
        let destroy = definition.and_then(|d| d.destroy.clone());
        let processors: Vec<_> = processors
            .iter()
            .filter(|p| p.requires_destruction(&bean))
            .cloned()
            .collect();
        if destroy.is_none() && processors.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_owned(),
            bean,
            destroy,
            processors,
            observers,
        })
    }

    pub(crate) fn destroy(self) {
        for processor in &self.processors {
            if let Err(error) = processor.before_destruction(&self.bean, &self.name) {
                tracing::warn!(
                    target: "ferrous_beans",
                    bean = %self.name,
                    %error,
                    "destruction post-processor failed"
                );
            }
        }
        if let Some(destroy) = &self.destroy {
            tracing::debug!(target: "ferrous_beans", bean = %self.name, "invoking destroy callback");
            if let Err(error) = destroy(&self.name, &self.bean) {
                tracing::warn!(
                    target: "ferrous_beans",
                    bean = %self.name,
                    %error,
                    "destroy callback failed"
                );
            }
        }
        for observer in &self.observers {
            observer.destroyed(&self.name);
        }
    }

    pub(crate) fn into_callback(self) -> DestructionCallback {
        Box::new(move || self.destroy())
    }
}
