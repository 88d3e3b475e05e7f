//! Entry bodies supplied by the embedding runtime.

use std::sync::Arc;

use polycall_bridge::{BridgeResult, Transition};

/// Work performed once a transition into a layer has been granted.
pub trait TransitionHook: Send + Sync {
    fn on_enter(&self, transition: &Transition) -> BridgeResult<()>;
}

impl<F> TransitionHook for F
where
    F: Fn(&Transition) -> BridgeResult<()> + Send + Sync,
{
    fn on_enter(&self, transition: &Transition) -> BridgeResult<()> {
        self(transition)
    }
}

/// Run `hook` if present; absent hooks succeed.
pub(crate) fn run_hook(
    hook: Option<&Arc<dyn TransitionHook>>,
    transition: &Transition,
) -> BridgeResult<()> {
    match hook {
        Some(hook) => hook.on_enter(transition),
        None => Ok(()),
    }
}
