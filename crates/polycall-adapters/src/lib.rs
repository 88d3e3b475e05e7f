//! # polycall-adapters
//!
//! Concrete adapters for the polycall bridge. Each one encodes the
//! concurrency discipline its host runtime demands:
//!
//! - **Python**: the interpreter lock is held for exactly the span between a
//!   successful entry and the matching exit, and is never leaked on failure.
//! - **Go**: entry is only legal on the adapter's owner thread.
//! - **Node.js**: entry runs inside a handle scope and wakes the event loop
//!   instead of calling back on a foreign thread.
//! - **Native**: no extra discipline.
//!
//! Host runtimes are reached through small traits ([`InterpreterLock`],
//! [`NodeEnv`], [`AsyncSignal`]); in-process emulations are provided for
//! embedders without a live runtime and for tests.

#![deny(unsafe_code)]

pub mod go;
pub mod hook;
pub mod native;
pub mod nodejs;
pub mod python;

pub use go::{GoAdapter, create_go_adapter, create_go_adapter_for};
pub use hook::TransitionHook;
pub use native::{NativeAdapter, create_native_adapter};
pub use nodejs::{
    AsyncSignal, EmulatedAsyncHandle, EmulatedNodeEnv, NodeAdapter, NodeEnv, ScopeId,
    create_nodejs_adapter,
};
pub use python::{
    EmulatedInterpreter, GilState, InterpreterLock, PythonAdapter, create_python_adapter,
};
