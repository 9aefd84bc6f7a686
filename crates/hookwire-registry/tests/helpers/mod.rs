//! Shared harness for registry integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use serde_json::{json, Value};

use hookwire_core::config::RegistryConfig;
use hookwire_core::result::HookResult;
use hookwire_core::traits::bus::EventBus;
use hookwire_core::traits::container::{LegacyResolver, ServiceContainer};
use hookwire_core::traits::handler::HookHandler;
use hookwire_core::HookError;
use hookwire_registry::{HookRegistry, MemoryBus};

static INIT_TRACING: Once = Once::new();

/// A fresh bus + container + resolver + registry per test.
pub struct Rig {
    pub bus: Arc<MemoryBus>,
    pub container: Arc<TestContainer>,
    pub legacy: Arc<TestResolver>,
    pub registry: Arc<HookRegistry>,
}

impl Rig {
    pub fn new() -> Self {
        INIT_TRACING.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .try_init();
        });

        let bus = Arc::new(MemoryBus::new());
        let container = Arc::new(TestContainer::default());
        let legacy = Arc::new(TestResolver::default());
        let registry = HookRegistry::new(
            Arc::clone(&bus) as Arc<dyn EventBus>,
            Arc::clone(&container) as Arc<dyn ServiceContainer>,
            Some(Arc::clone(&legacy) as Arc<dyn LegacyResolver>),
            RegistryConfig::default(),
        );
        Self {
            bus,
            container,
            legacy,
            registry,
        }
    }

    /// Fires `hook` with a single string argument and expects success.
    pub fn fire_str(&self, hook: &str, value: &str) -> Value {
        self.bus.fire(hook, &[json!(value)]).expect("fire should succeed")
    }
}

/// Handler that appends a fixed tag to the string value being filtered and
/// counts its invocations. Responds to the `append` method only.
pub struct Recorder {
    type_name: String,
    tag: String,
    pub calls: AtomicUsize,
}

impl Recorder {
    pub fn new(type_name: &str, tag: &str) -> Arc<Self> {
        Arc::new(Self {
            type_name: type_name.to_string(),
            tag: tag.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HookHandler for Recorder {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn invoke(&self, method: &str, args: &[Value]) -> HookResult<Value> {
        match method {
            "append" => {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let mut value = args
                    .first()
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                value.push_str(&self.tag);
                Ok(Value::String(value))
            }
            other => Err(HookError::handler(format!(
                "{} has no method '{other}'",
                self.type_name
            ))),
        }
    }
}

/// Handler delegating to a closure; used for re-entrant scenarios where the
/// handler needs to call back into the registry mid-dispatch.
pub struct ClosureHandler {
    type_name: String,
    func: Box<dyn Fn(&str, &[Value]) -> HookResult<Value> + Send + Sync>,
}

impl ClosureHandler {
    pub fn new(
        type_name: &str,
        func: impl Fn(&str, &[Value]) -> HookResult<Value> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            type_name: type_name.to_string(),
            func: Box::new(func),
        })
    }
}

impl HookHandler for ClosureHandler {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn invoke(&self, method: &str, args: &[Value]) -> HookResult<Value> {
        (self.func)(method, args)
    }
}

/// Service container backed by a map, counting `get` calls so tests can
/// observe cache hits versus fresh resolutions.
#[derive(Default)]
pub struct TestContainer {
    handlers: Mutex<HashMap<String, Arc<dyn HookHandler>>>,
    pub gets: AtomicUsize,
}

impl TestContainer {
    pub fn insert(&self, handler: Arc<dyn HookHandler>) {
        let mut handlers = self.handlers.lock().expect("container lock");
        handlers.insert(handler.type_name().to_string(), handler);
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

impl ServiceContainer for TestContainer {
    fn has(&self, type_name: &str) -> bool {
        let handlers = self.handlers.lock().expect("container lock");
        handlers.contains_key(type_name)
    }

    fn get(&self, type_name: &str) -> HookResult<Arc<dyn HookHandler>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let handlers = self.handlers.lock().expect("container lock");
        handlers
            .get(type_name)
            .cloned()
            .ok_or_else(|| HookError::resolution(format!("container has no '{type_name}'")))
    }
}

/// Legacy resolver backed by a map; errors on unknown types.
#[derive(Default)]
pub struct TestResolver {
    handlers: Mutex<HashMap<String, Arc<dyn HookHandler>>>,
    pub gets: AtomicUsize,
}

impl TestResolver {
    pub fn insert(&self, handler: Arc<dyn HookHandler>) {
        let mut handlers = self.handlers.lock().expect("resolver lock");
        handlers.insert(handler.type_name().to_string(), handler);
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

impl LegacyResolver for TestResolver {
    fn get_instance_of(&self, type_name: &str) -> HookResult<Arc<dyn HookHandler>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let handlers = self.handlers.lock().expect("resolver lock");
        handlers
            .get(type_name)
            .cloned()
            .ok_or_else(|| HookError::resolution(format!("no legacy instance for '{type_name}'")))
    }
}
