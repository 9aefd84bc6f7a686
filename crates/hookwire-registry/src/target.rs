//! Registration targets — the four kinds of thing a hooking can invoke.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use hookwire_core::result::HookResult;
use hookwire_core::traits::handler::{HandlerFactory, HookHandler, StaticHookFn};
use hookwire_core::HookError;

/// Take-once holder for a handler factory.
///
/// The factory is consumed outside the registry lock (factories are foreign
/// code and may re-enter the registry), so it lives in its own cell that can
/// be cloned out of a registration and drained exactly once.
pub struct FactoryCell(Arc<Mutex<Option<HandlerFactory>>>);

impl FactoryCell {
    fn new(factory: HandlerFactory) -> Self {
        Self(Arc::new(Mutex::new(Some(factory))))
    }

    /// Takes the factory out of the cell. Returns `None` if it already ran.
    pub(crate) fn take(&self) -> Option<HandlerFactory> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Clone for FactoryCell {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl fmt::Debug for FactoryCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FactoryCell")
    }
}

/// What a registration invokes when its hook fires.
///
/// A closed set of variants; resolution precedence during dispatch is
/// static call, then unresolved factory, then live instance, then cached or
/// container-resolved type identifier.
#[derive(Clone)]
pub enum HookTarget {
    /// A live handler instance used directly.
    Instance(Arc<dyn HookHandler>),
    /// A zero-argument factory producing an instance; runs at most once,
    /// after which the stored target is rewritten to `Type` in place.
    Factory(FactoryCell),
    /// A type identifier resolved lazily through the service container (or
    /// the legacy resolver) and cached until its refcount reaches zero.
    Type(String),
    /// A pure function call with no instance; the registration's method
    /// field carries a `Type::method` style marker label.
    Static(StaticHookFn),
}

impl HookTarget {
    /// Creates a live-instance target.
    pub fn instance(handler: Arc<dyn HookHandler>) -> Self {
        Self::Instance(handler)
    }

    /// Creates a factory target from a one-shot producer.
    pub fn factory(factory: impl FnOnce() -> Arc<dyn HookHandler> + Send + 'static) -> Self {
        Self::Factory(FactoryCell::new(Box::new(factory)))
    }

    /// Creates a type-identifier target for lazy container resolution.
    pub fn type_name(name: impl Into<String>) -> Self {
        Self::Type(name.into())
    }

    /// Creates a static-call target from a pure function.
    pub fn static_call(
        func: impl Fn(&[Value]) -> HookResult<Value> + Send + Sync + 'static,
    ) -> Self {
        Self::Static(Arc::new(func))
    }

    /// Returns the type identifier for targets that carry one.
    pub(crate) fn as_type(&self) -> Option<&str> {
        match self {
            Self::Type(name) => Some(name),
            _ => None,
        }
    }

    /// Validates the target/method pair at registration time.
    ///
    /// The variant set already rules out most malformed targets; what is
    /// left is string-shaped: a type identifier must be non-empty, and every
    /// non-static target needs a method name to invoke.
    pub(crate) fn validate(&self, method: &str) -> HookResult<()> {
        if let Self::Type(name) = self {
            if name.trim().is_empty() {
                return Err(HookError::invalid_target(
                    "target must be a live instance, a factory returning an instance, \
                     or a non-empty type identifier",
                ));
            }
        }
        if method.is_empty() && !matches!(self, Self::Static(_)) {
            return Err(HookError::invalid_target(
                "a method name is required unless the target is a static call",
            ));
        }
        Ok(())
    }

    /// Identity match used by value-based removal.
    ///
    /// Instances, factories, and static calls match by pointer identity
    /// (data pointer only, never the vtable); type identifiers match by
    /// string equality.
    pub(crate) fn matches(&self, other: &HookTarget) -> bool {
        match (self, other) {
            (Self::Instance(a), Self::Instance(b)) => data_ptr_eq(a, b),
            (Self::Factory(a), Self::Factory(b)) => a.ptr_eq(b),
            (Self::Type(a), Self::Type(b)) => a == b,
            (Self::Static(a), Self::Static(b)) => data_ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for HookTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(handler) => write!(f, "Instance({})", handler.type_name()),
            Self::Factory(_) => f.write_str("Factory"),
            Self::Type(name) => write!(f, "Type({name})"),
            Self::Static(_) => f.write_str("Static"),
        }
    }
}

fn data_ptr_eq<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Noop;

    impl HookHandler for Noop {
        fn type_name(&self) -> &str {
            "Noop"
        }

        fn invoke(&self, _method: &str, args: &[Value]) -> HookResult<Value> {
            Ok(args.first().cloned().unwrap_or(Value::Null))
        }
    }

    #[test]
    fn test_validate_rejects_empty_type_name() {
        let target = HookTarget::type_name("  ");
        assert!(target.validate("handle").is_err());
    }

    #[test]
    fn test_validate_rejects_empty_method_for_instance() {
        let target = HookTarget::instance(Arc::new(Noop));
        assert!(target.validate("").is_err());
        assert!(target.validate("handle").is_ok());
    }

    #[test]
    fn test_validate_allows_static_without_method() {
        let target = HookTarget::static_call(|args| Ok(args[0].clone()));
        assert!(target.validate("").is_ok());
    }

    #[test]
    fn test_instance_match_is_pointer_identity() {
        let handler: Arc<dyn HookHandler> = Arc::new(Noop);
        let a = HookTarget::instance(Arc::clone(&handler));
        let b = HookTarget::instance(Arc::clone(&handler));
        let c = HookTarget::instance(Arc::new(Noop));
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
    }

    #[test]
    fn test_type_match_is_string_equality() {
        let a = HookTarget::type_name("OrderSync");
        let b = HookTarget::type_name("OrderSync");
        let c = HookTarget::type_name("StockSync");
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
        assert!(!a.matches(&HookTarget::instance(Arc::new(Noop))));
    }

    #[test]
    fn test_factory_cell_takes_once() {
        let target = HookTarget::factory(|| Arc::new(Noop) as Arc<dyn HookHandler>);
        let HookTarget::Factory(cell) = &target else {
            panic!("expected factory");
        };
        assert!(cell.take().is_some());
        assert!(cell.take().is_none());
    }
}
