//! Process-wide emulated host runtimes backing ABI-created adapters.

use std::sync::{Arc, OnceLock};

use polycall_adapters::{EmulatedAsyncHandle, EmulatedInterpreter, EmulatedNodeEnv};

static INTERPRETER: OnceLock<Arc<EmulatedInterpreter>> = OnceLock::new();
static NODE_ENV: OnceLock<Arc<EmulatedNodeEnv>> = OnceLock::new();
static NODE_ASYNC: OnceLock<Arc<EmulatedAsyncHandle>> = OnceLock::new();

/// The interpreter every ABI-created Python adapter shares.
pub fn interpreter() -> Arc<EmulatedInterpreter> {
    Arc::clone(INTERPRETER.get_or_init(|| Arc::new(EmulatedInterpreter::new())))
}

pub fn node_env() -> Arc<EmulatedNodeEnv> {
    Arc::clone(NODE_ENV.get_or_init(|| Arc::new(EmulatedNodeEnv::new())))
}

/// Event-loop wakeup signalled after each successful Node.js entry.
pub fn node_async_handle() -> Arc<EmulatedAsyncHandle> {
    Arc::clone(NODE_ASYNC.get_or_init(|| Arc::new(EmulatedAsyncHandle::new())))
}
