//! Capability handler registry
//!
//! Every externally visible effect of a program goes through one of eight
//! capability interfaces (Data, Io, Output, Input, Cache, Port, Script,
//! Suspend) plus a separate Debug hook. Each handler reports its own
//! availability, so calling code asks before use instead of null-checking.
//!
//! Each capability is independently swappable: `switch_*` substitutes the
//! backing API (retaining exactly one original per run) and `reset_*`
//! restores that original. The closure-scoped `with_*` forms restore on
//! every exit path and are what the engine uses around nested, reduced-
//! privilege sub-programs.
//!
//! Three variants exist per capability: a default working implementation
//! (local filesystem, in-memory cache), a deny stub whose every operation
//! fails with "Not allowed" (sandboxing untrusted programs), and a null/test
//! stub returning canned values.

pub mod cache;
pub mod data;
pub mod debug;
pub mod input;
pub mod io;
pub mod output;
pub mod port;
pub mod script;
pub mod suspend;

pub use cache::{CacheApi, DefaultCacheApi, DenyCacheApi, NullCacheApi};
pub use data::{DataApi, DefaultDataApi, DenyDataApi, Locator, NullDataApi, Scheme};
pub use debug::{DebugHook, NoopDebugHook, TracingDebugHook};
pub use input::{DefaultInputApi, DenyInputApi, InputApi, NullInputApi};
pub use io::{DefaultIoApi, DenyIoApi, IoApi, NullIoApi};
pub use output::{CaptureOutputApi, DefaultOutputApi, DenyOutputApi, OutputApi};
pub use port::{DefaultPortApi, DenyPortApi, NullPortApi, PortApi};
pub use script::{DenyScriptApi, NullScriptApi, RegistryScriptApi, ScriptApi, StoredScript};
pub use suspend::{DenySuspendApi, MemorySuspendApi, ResumeStore, SuspendApi};

/* ===================== Handler Set ===================== */

/// One handler instance per capability, plus the debug hook.
///
/// A set belongs to exactly one run (or one suspend/resume chain of a run)
/// and must be driven by one thread at a time; independent programs get
/// independent sets.
pub struct HandlerSet {
    data: Box<dyn DataApi>,
    io: Box<dyn IoApi>,
    output: Box<dyn OutputApi>,
    input: Box<dyn InputApi>,
    cache: Box<dyn CacheApi>,
    port: Box<dyn PortApi>,
    script: Box<dyn ScriptApi>,
    suspend: Box<dyn SuspendApi>,
    debug: Box<dyn DebugHook>,

    retained: Retained,
}

/// The one original retained per capability for `reset_*`.
#[derive(Default)]
struct Retained {
    data: Option<Box<dyn DataApi>>,
    io: Option<Box<dyn IoApi>>,
    output: Option<Box<dyn OutputApi>>,
    input: Option<Box<dyn InputApi>>,
    cache: Option<Box<dyn CacheApi>>,
    port: Option<Box<dyn PortApi>>,
    script: Option<Box<dyn ScriptApi>>,
    suspend: Option<Box<dyn SuspendApi>>,
}

impl HandlerSet {
    /// Working defaults: filesystem data/io, stdout, stdin, in-memory cache
    /// and resume store, empty port and script registries.
    pub fn defaults() -> Self {
        Self {
            data: Box::new(DefaultDataApi::new(std::env::temp_dir())),
            io: Box::new(DefaultIoApi),
            output: Box::new(DefaultOutputApi),
            input: Box::new(DefaultInputApi),
            cache: Box::new(DefaultCacheApi::new()),
            port: Box::new(DefaultPortApi::new()),
            script: Box::new(RegistryScriptApi::new()),
            suspend: Box::new(MemorySuspendApi::new()),
            debug: Box::new(NoopDebugHook),
            retained: Retained::default(),
        }
    }

    /// Deny everything: the sandbox set for untrusted programs.
    pub fn deny_all() -> Self {
        Self {
            data: Box::new(DenyDataApi),
            io: Box::new(DenyIoApi),
            output: Box::new(DenyOutputApi),
            input: Box::new(DenyInputApi),
            cache: Box::new(DenyCacheApi),
            port: Box::new(DenyPortApi),
            script: Box::new(DenyScriptApi),
            suspend: Box::new(DenySuspendApi),
            debug: Box::new(NoopDebugHook),
            retained: Retained::default(),
        }
    }

    /// Canned results everywhere: the isolated-test set.
    pub fn null_set() -> Self {
        Self {
            data: Box::new(NullDataApi),
            io: Box::new(NullIoApi),
            output: Box::new(CaptureOutputApi::new()),
            input: Box::new(NullInputApi::default()),
            cache: Box::new(NullCacheApi),
            port: Box::new(NullPortApi),
            script: Box::new(NullScriptApi),
            suspend: Box::new(MemorySuspendApi::new()),
            debug: Box::new(NoopDebugHook),
            retained: Retained::default(),
        }
    }

    /* ----- accessors ----- */

    pub fn data(&self) -> &dyn DataApi {
        self.data.as_ref()
    }
    pub fn io(&self) -> &dyn IoApi {
        self.io.as_ref()
    }
    pub fn output(&self) -> &dyn OutputApi {
        self.output.as_ref()
    }
    pub fn input(&self) -> &dyn InputApi {
        self.input.as_ref()
    }
    pub fn cache(&self) -> &dyn CacheApi {
        self.cache.as_ref()
    }
    pub fn port(&self) -> &dyn PortApi {
        self.port.as_ref()
    }
    pub fn script(&self) -> &dyn ScriptApi {
        self.script.as_ref()
    }
    pub fn suspend(&self) -> &dyn SuspendApi {
        self.suspend.as_ref()
    }
    pub fn debug(&self) -> &dyn DebugHook {
        self.debug.as_ref()
    }

    pub fn set_debug(&mut self, hook: Box<dyn DebugHook>) {
        self.debug = hook;
    }

    /* ----- switch / reset (one retained original per run) ----- */

    pub fn switch_data(&mut self, api: Box<dyn DataApi>) {
        let prev = std::mem::replace(&mut self.data, api);
        self.retained.data.get_or_insert(prev);
    }
    pub fn reset_data(&mut self) {
        if let Some(orig) = self.retained.data.take() {
            self.data = orig;
        }
    }

    pub fn switch_io(&mut self, api: Box<dyn IoApi>) {
        let prev = std::mem::replace(&mut self.io, api);
        self.retained.io.get_or_insert(prev);
    }
    pub fn reset_io(&mut self) {
        if let Some(orig) = self.retained.io.take() {
            self.io = orig;
        }
    }

    pub fn switch_output(&mut self, api: Box<dyn OutputApi>) {
        let prev = std::mem::replace(&mut self.output, api);
        self.retained.output.get_or_insert(prev);
    }
    pub fn reset_output(&mut self) {
        if let Some(orig) = self.retained.output.take() {
            self.output = orig;
        }
    }

    pub fn switch_input(&mut self, api: Box<dyn InputApi>) {
        let prev = std::mem::replace(&mut self.input, api);
        self.retained.input.get_or_insert(prev);
    }
    pub fn reset_input(&mut self) {
        if let Some(orig) = self.retained.input.take() {
            self.input = orig;
        }
    }

    pub fn switch_cache(&mut self, api: Box<dyn CacheApi>) {
        let prev = std::mem::replace(&mut self.cache, api);
        self.retained.cache.get_or_insert(prev);
    }
    pub fn reset_cache(&mut self) {
        if let Some(orig) = self.retained.cache.take() {
            self.cache = orig;
        }
    }

    pub fn switch_port(&mut self, api: Box<dyn PortApi>) {
        let prev = std::mem::replace(&mut self.port, api);
        self.retained.port.get_or_insert(prev);
    }
    pub fn reset_port(&mut self) {
        if let Some(orig) = self.retained.port.take() {
            self.port = orig;
        }
    }

    pub fn switch_script(&mut self, api: Box<dyn ScriptApi>) {
        let prev = std::mem::replace(&mut self.script, api);
        self.retained.script.get_or_insert(prev);
    }
    pub fn reset_script(&mut self) {
        if let Some(orig) = self.retained.script.take() {
            self.script = orig;
        }
    }

    pub fn switch_suspend(&mut self, api: Box<dyn SuspendApi>) {
        let prev = std::mem::replace(&mut self.suspend, api);
        self.retained.suspend.get_or_insert(prev);
    }
    pub fn reset_suspend(&mut self) {
        if let Some(orig) = self.retained.suspend.take() {
            self.suspend = orig;
        }
    }

    /* ----- scoped swaps (restore on every exit path) ----- */

    pub fn with_data<R>(
        &mut self,
        api: Box<dyn DataApi>,
        f: impl FnOnce(&mut HandlerSet) -> R,
    ) -> R {
        let prev = std::mem::replace(&mut self.data, api);
        let result = f(self);
        self.data = prev;
        result
    }

    pub fn with_io<R>(&mut self, api: Box<dyn IoApi>, f: impl FnOnce(&mut HandlerSet) -> R) -> R {
        let prev = std::mem::replace(&mut self.io, api);
        let result = f(self);
        self.io = prev;
        result
    }

    pub fn with_output<R>(
        &mut self,
        api: Box<dyn OutputApi>,
        f: impl FnOnce(&mut HandlerSet) -> R,
    ) -> R {
        let prev = std::mem::replace(&mut self.output, api);
        let result = f(self);
        self.output = prev;
        result
    }

    pub fn with_suspend<R>(
        &mut self,
        api: Box<dyn SuspendApi>,
        f: impl FnOnce(&mut HandlerSet) -> R,
    ) -> R {
        let prev = std::mem::replace(&mut self.suspend, api);
        let result = f(self);
        self.suspend = prev;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RuntimeError;
    use crate::value::Value;

    #[test]
    fn test_switch_and_reset_restore_original() {
        let mut set = HandlerSet::null_set();
        assert!(set.cache().is_available());

        set.switch_cache(Box::new(DenyCacheApi));
        assert!(!set.cache().is_available());

        // A second switch must not clobber the retained original
        set.switch_cache(Box::new(DefaultCacheApi::new()));
        set.reset_cache();
        assert!(set.cache().is_available());
        assert!(matches!(set.cache().get("k"), Ok(None)));
    }

    #[test]
    fn test_reset_without_switch_is_noop() {
        let mut set = HandlerSet::null_set();
        set.reset_data();
        assert!(set.data().is_available());
    }

    #[test]
    fn test_scoped_swap_restores_after_error() {
        let mut set = HandlerSet::null_set();

        let result: Result<Value, RuntimeError> =
            set.with_output(Box::new(DenyOutputApi), |hs| {
                hs.output().print("blocked")?;
                Ok(Value::Void)
            });

        assert!(matches!(result, Err(RuntimeError::NotAllowed { .. })));
        // Original capture output is back
        assert!(set.output().print("after").is_ok());
    }

    #[test]
    fn test_deny_set_reports_unavailable() {
        let set = HandlerSet::deny_all();
        assert!(!set.data().is_available());
        assert!(!set.io().is_available());
        assert!(!set.output().is_available());
        assert!(!set.input().is_available());
        assert!(!set.cache().is_available());
        assert!(!set.port().is_available());
        assert!(!set.script().is_available());
        assert!(!set.suspend().is_available());
    }
}
