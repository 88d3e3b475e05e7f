//! Python adapter.
//!
//! Adapter logic only runs with the interpreter lock held. `enter_layer`
//! takes the lock before the gated transition and gives it back immediately
//! if the transition fails; a successful entry keeps it until the same thread
//! exits the layer.

mod gil;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use polycall_bridge::{
    Adapter, AdapterBase, AdapterHandle, BridgeError, BridgeResult, Layer, ThreadKey,
    TopologyManager, Transition,
};

pub use gil::{EmulatedInterpreter, GilState, InterpreterLock};

use crate::hook::{TransitionHook, run_hook};

pub struct PythonAdapter {
    interpreter: Arc<dyn InterpreterLock>,
    held: Mutex<HashMap<ThreadKey, Vec<GilState>>>,
    hook: Option<Arc<dyn TransitionHook>>,
}

impl PythonAdapter {
    #[must_use]
    pub fn new(interpreter: Arc<dyn InterpreterLock>) -> Self {
        Self {
            interpreter,
            held: Mutex::new(HashMap::new()),
            hook: None,
        }
    }

    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn TransitionHook>) -> Self {
        self.hook = Some(hook);
        self
    }
}

impl Adapter for PythonAdapter {
    fn language(&self) -> &'static str {
        "python"
    }

    fn init(&self, layer: Layer) -> BridgeResult<()> {
        if !self.interpreter.is_initialized() {
            return Err(BridgeError::runtime(layer, "interpreter not initialized"));
        }
        Ok(())
    }

    fn enter_layer(&self, base: &AdapterBase, transition: &Transition) -> BridgeResult<()> {
        let state = self.interpreter.ensure(transition.thread)?;
        if let Err(err) = base.execute_transition(transition) {
            self.interpreter.release(transition.thread, state);
            return Err(err);
        }
        self.held
            .lock()
            .entry(transition.thread)
            .or_default()
            .push(state);
        Ok(())
    }

    fn exit_layer(&self, transition: &Transition) -> BridgeResult<()> {
        let state = {
            let mut held = self.held.lock();
            let state = held.get_mut(&transition.thread).and_then(Vec::pop);
            if held.get(&transition.thread).is_some_and(Vec::is_empty) {
                held.remove(&transition.thread);
            }
            state
        };
        if let Some(state) = state {
            self.interpreter.release(transition.thread, state);
        }
        Ok(())
    }

    fn on_enter(&self, transition: &Transition) -> BridgeResult<()> {
        run_hook(self.hook.as_ref(), transition)
    }

    fn cleanup(&self) {
        let outstanding: Vec<(ThreadKey, Vec<GilState>)> = self.held.lock().drain().collect();
        for (thread, states) in outstanding {
            for state in states.into_iter().rev() {
                self.interpreter.release(thread, state);
            }
        }
    }
}

/// Build and initialize a Python adapter bound to `interpreter`.
pub fn create_python_adapter(
    manager: Arc<dyn TopologyManager>,
    interpreter: Arc<dyn InterpreterLock>,
) -> BridgeResult<AdapterHandle> {
    AdapterHandle::new(
        Layer::Python,
        manager,
        Box::new(PythonAdapter::new(interpreter)),
    )
}
