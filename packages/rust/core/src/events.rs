//! Synchronous, ordered hook dispatch around pipeline phases.
//!
//! Consumers register hooks per [`PhaseEvent`]; dispatch runs them in
//! registration order, each receiving the active item by `&mut` reference.
//! A hook may rewrite or wholesale replace the item; the next hook (and the
//! controller) observes the result. A hook error aborts dispatch and
//! propagates to the controller, which aborts the phase.

use bindery_shared::{Item, Result};
use tracing::trace;

/// Hook points surrounding the two transformation phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseEvent {
    PreParse,
    PostParse,
    PreDecorate,
    PostDecorate,
}

impl PhaseEvent {
    /// Stable name used in traces.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreParse => "pre_parse",
            Self::PostParse => "post_parse",
            Self::PreDecorate => "pre_decorate",
            Self::PostDecorate => "post_decorate",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::PreParse => 0,
            Self::PostParse => 1,
            Self::PreDecorate => 2,
            Self::PostDecorate => 3,
        }
    }
}

/// A registered hook. Its capability set is exactly {read item, write item}.
pub type Hook = Box<dyn Fn(&mut Item) -> Result<()> + Send + Sync>;

/// Ordered hook registry for all phase events.
///
/// Hooks for one event run strictly sequentially; no hook ever observes a
/// partially applied mutation from another. Dispatch with zero registered
/// hooks is a no-op. Hooks must not assume any other hook is present.
#[derive(Default)]
pub struct EventBus {
    hooks: [Vec<Hook>; 4],
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook for `event`. Hooks run in registration order.
    pub fn on<F>(&mut self, event: PhaseEvent, hook: F)
    where
        F: Fn(&mut Item) -> Result<()> + Send + Sync + 'static,
    {
        self.hooks[event.index()].push(Box::new(hook));
    }

    /// Number of hooks registered for `event`.
    pub fn hook_count(&self, event: PhaseEvent) -> usize {
        self.hooks[event.index()].len()
    }

    /// Invoke every hook registered for `event`, in registration order.
    ///
    /// The item is the phase's active value: hooks read and rewrite it, and
    /// the caller keeps ownership, so it observes the final state as soon as
    /// dispatch returns.
    pub fn dispatch(&self, event: PhaseEvent, item: &mut Item) -> Result<()> {
        let hooks = &self.hooks[event.index()];
        if hooks.is_empty() {
            return Ok(());
        }

        trace!(event = event.as_str(), hooks = hooks.len(), "dispatching");
        for hook in hooks {
            hook(item)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("pre_parse", &self.hooks[0].len())
            .field("post_parse", &self.hooks[1].len())
            .field("pre_decorate", &self.hooks[2].len())
            .field("post_decorate", &self.hooks[3].len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_shared::{BinderyError, ItemConfig};
    use std::sync::{Arc, Mutex};

    fn item() -> Item {
        Item::new("seed", ItemConfig::default())
    }

    #[test]
    fn dispatch_runs_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            bus.on(PhaseEvent::PreParse, move |_item| {
                order.lock().unwrap().push(tag);
                Ok(())
            });
        }

        // Deterministic across repeated dispatches.
        for _ in 0..3 {
            order.lock().unwrap().clear();
            bus.dispatch(PhaseEvent::PreParse, &mut item()).unwrap();
            assert_eq!(*order.lock().unwrap(), ["first", "second", "third"]);
        }
    }

    #[test]
    fn later_hooks_observe_earlier_mutations() {
        let mut bus = EventBus::new();
        bus.on(PhaseEvent::PreParse, |item| {
            item.original_content.push_str("+a");
            Ok(())
        });
        bus.on(PhaseEvent::PreParse, |item| {
            assert!(item.original_content.ends_with("+a"));
            item.original_content.push_str("+b");
            Ok(())
        });

        let mut active = item();
        bus.dispatch(PhaseEvent::PreParse, &mut active).unwrap();
        assert_eq!(active.original_content, "seed+a+b");
    }

    #[test]
    fn hooks_may_replace_the_item_wholesale() {
        let mut bus = EventBus::new();
        bus.on(PhaseEvent::PreDecorate, |item| {
            *item = Item::new("replacement", ItemConfig::default());
            Ok(())
        });

        let mut active = item();
        bus.dispatch(PhaseEvent::PreDecorate, &mut active).unwrap();
        assert_eq!(active.original_content, "replacement");
    }

    #[test]
    fn dispatch_with_no_hooks_is_noop() {
        let bus = EventBus::new();
        let mut active = item();
        bus.dispatch(PhaseEvent::PostParse, &mut active).unwrap();
        assert_eq!(active.original_content, "seed");
    }

    #[test]
    fn hook_error_aborts_dispatch() {
        let calls = Arc::new(Mutex::new(0usize));
        let mut bus = EventBus::new();

        bus.on(PhaseEvent::PostDecorate, |_item| {
            Err(BinderyError::validation("hook rejected item"))
        });
        {
            let calls = Arc::clone(&calls);
            bus.on(PhaseEvent::PostDecorate, move |_item| {
                *calls.lock().unwrap() += 1;
                Ok(())
            });
        }

        let err = bus
            .dispatch(PhaseEvent::PostDecorate, &mut item())
            .unwrap_err();
        assert!(err.to_string().contains("hook rejected item"));
        // The second hook never ran.
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn events_are_isolated_per_name() {
        let mut bus = EventBus::new();
        bus.on(PhaseEvent::PreParse, |item| {
            item.original_content.push('!');
            Ok(())
        });

        assert_eq!(bus.hook_count(PhaseEvent::PreParse), 1);
        assert_eq!(bus.hook_count(PhaseEvent::PostParse), 0);

        let mut active = item();
        bus.dispatch(PhaseEvent::PostParse, &mut active).unwrap();
        assert_eq!(active.original_content, "seed");
    }
}
