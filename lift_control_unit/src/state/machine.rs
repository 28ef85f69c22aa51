//! Hierarchical state machine engine.
//!
//! A state forest is described by a closed enum implementing [`StateTree`]
//! (parent links and event handling) and [`StateBehavior`] (per-state
//! `action`/`entry`/`exit` against a caller-supplied context). The engine
//! [`Hsm`] owns only the current leaf and a single pending-event slot.
//!
//! One [`Hsm::process`] step:
//! 1. Without a pending event, only the tick-action chain runs.
//! 2. The pending event is offered to the current state, then to each
//!    ancestor, until one returns a target. No match means "stay".
//! 3. A different target exits up to the least common ancestor (leaf to
//!    root), enters down from it (root to leaf) and clears the event. An
//!    event raised by those exit/entry callbacks is cleared with it.
//! 4. A target equal to the current state runs no exit/entry and keeps the
//!    event pending; it is dispatched again on the next step.
//! 5. The action of the current state and of every ancestor runs.

use std::fmt::Debug;
use std::iter;

use heapless::Vec as HVec;
use thiserror::Error;
use tracing::{debug, error, trace};

/// Static description of a state forest.
///
/// `STATES` must list every state reachable through `parent` or
/// `handle_event`; [`Hsm::new`] validates their depth once.
pub trait StateTree: Copy + Eq + Debug + 'static {
    /// Closed event set. "No event" is represented by an empty slot.
    type Event: Copy + Eq + Debug;

    /// Every state of the forest.
    const STATES: &'static [Self];

    /// Diagnostic name.
    fn name(self) -> &'static str;

    /// Parent state, `None` for a root.
    fn parent(self) -> Option<Self>;

    /// Target state for `event`, `None` to defer to the parent.
    fn handle_event(self, event: Self::Event) -> Option<Self>;
}

/// Per-state callbacks run against a context `C`.
///
/// Implementations match exhaustively over the state enum, so omitting a
/// callback for a state is an explicit empty arm.
pub trait StateBehavior<C>: StateTree {
    /// Run every tick while this state or a descendant is current.
    fn action(self, ctx: &mut C, events: &mut EventSlot<Self::Event>);

    /// Run once when a transition enters this state.
    fn entry(self, ctx: &mut C, events: &mut EventSlot<Self::Event>);

    /// Run once when a transition leaves this state.
    fn exit(self, ctx: &mut C, events: &mut EventSlot<Self::Event>);
}

/// Single pending-event register. Last write wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSlot<E> {
    pending: Option<E>,
}

impl<E: Copy> EventSlot<E> {
    pub const fn new() -> Self {
        Self { pending: None }
    }

    /// Record `event`, replacing any unconsumed one.
    #[inline]
    pub fn trigger(&mut self, event: E) {
        self.pending = Some(event);
    }

    #[inline]
    pub const fn pending(&self) -> Option<E> {
        self.pending
    }

    #[inline]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    #[inline]
    pub fn take(&mut self) -> Option<E> {
        self.pending.take()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.pending = None;
    }
}

impl<E: Copy> Default for EventSlot<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors detected when building a machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HsmError {
    /// A state nests deeper than the engine supports (or its parents loop).
    #[error("state '{state}' nests deeper than {max} levels")]
    DepthExceeded { state: &'static str, max: usize },
}

/// `state` followed by each of its ancestors up to the root.
#[inline]
pub fn ancestors<S: StateTree>(state: S) -> impl Iterator<Item = S> {
    iter::successors(Some(state), |s| s.parent())
}

/// Number of levels from `state` up to its root (a root has depth 1).
#[inline]
pub fn depth<S: StateTree>(state: S) -> usize {
    ancestors(state).count()
}

/// Deepest state that is an ancestor of both `a` and `b` (a state counts as
/// its own ancestor). `None` when they belong to different trees.
pub fn least_common_ancestor<S: StateTree>(a: S, b: S) -> Option<S> {
    let (mut a, mut b) = (Some(a), Some(b));
    let (mut da, mut db) = (a.map_or(0, depth), b.map_or(0, depth));

    while da > db {
        a = a.and_then(S::parent);
        da -= 1;
    }
    while db > da {
        b = b.and_then(S::parent);
        db -= 1;
    }

    while let (Some(x), Some(y)) = (a, b) {
        if x == y {
            return Some(x);
        }
        a = x.parent();
        b = y.parent();
    }
    None
}

/// Check that `state` has at most `max` levels. A parent cycle never reaches
/// a root and fails the same way.
fn check_depth<S: StateTree>(state: S, max: usize) -> Result<(), HsmError> {
    if ancestors(state).take(max + 1).count() > max {
        return Err(HsmError::DepthExceeded {
            state: state.name(),
            max,
        });
    }
    Ok(())
}

/// Hierarchical state machine with entry paths bounded by `DEPTH` levels.
#[derive(Debug, Clone)]
pub struct Hsm<S: StateTree, const DEPTH: usize> {
    current: S,
    events: EventSlot<S::Event>,
}

impl<S: StateTree, const DEPTH: usize> Hsm<S, DEPTH> {
    /// Build a machine starting in `initial`.
    ///
    /// No entry callback runs for `initial`.
    ///
    /// # Errors
    /// `HsmError::DepthExceeded` if any state of the forest nests deeper
    /// than `DEPTH`.
    pub fn new(initial: S) -> Result<Self, HsmError> {
        for &state in S::STATES {
            check_depth(state, DEPTH)?;
        }
        check_depth(initial, DEPTH)?;

        Ok(Self {
            current: initial,
            events: EventSlot::new(),
        })
    }

    /// Current (leaf) state.
    #[inline]
    pub const fn current(&self) -> S {
        self.current
    }

    /// Pending event, if any.
    #[inline]
    pub fn pending(&self) -> Option<S::Event> {
        self.events.pending()
    }

    /// Whether `state` is the current state or one of its ancestors.
    pub fn is_in(&self, state: S) -> bool {
        ancestors(self.current).any(|s| s == state)
    }

    /// Record an event for the next [`process`](Self::process) step.
    #[inline]
    pub fn trigger(&mut self, event: S::Event) {
        self.events.trigger(event);
    }

    /// Advance the machine by one step.
    pub fn process<C>(&mut self, ctx: &mut C)
    where
        S: StateBehavior<C>,
    {
        if let Some(event) = self.events.pending() {
            let next = self.dispatch(event);
            if next != self.current {
                self.transition(ctx, event, next);
            } else {
                trace!(state = self.current.name(), ?event, "event retained");
            }
        }

        for state in ancestors(self.current) {
            state.action(ctx, &mut self.events);
        }
    }

    fn dispatch(&self, event: S::Event) -> S {
        ancestors(self.current)
            .find_map(|s| s.handle_event(event))
            .unwrap_or(self.current)
    }

    fn transition<C>(&mut self, ctx: &mut C, event: S::Event, next: S)
    where
        S: StateBehavior<C>,
    {
        let lca = least_common_ancestor(self.current, next);
        debug!(
            from = self.current.name(),
            to = next.name(),
            lca = ?lca.map(S::name),
            ?event,
            "state transition"
        );

        for state in ancestors(self.current).take_while(|&s| Some(s) != lca) {
            state.exit(ctx, &mut self.events);
        }

        let mut path: HVec<S, DEPTH> = HVec::new();
        for state in ancestors(next).take_while(|&s| Some(s) != lca) {
            if path.push(state).is_err() {
                error!(state = state.name(), max = DEPTH, "entry path overflow");
                break;
            }
        }
        for &state in path.iter().rev() {
            state.entry(ctx, &mut self.events);
        }

        // Also drops any event raised by the exit or entry callbacks above.
        self.events.clear();
        self.current = next;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    //   Root ─┬─ A ─┬─ A1 ── A1x
    //         │     └─ A2
    //         └─ B
    //   Orphan
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum T {
        Root,
        A,
        A1,
        A1x,
        A2,
        B,
        Orphan,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Ev {
        ToA2,
        ToB,
        ToOrphan,
        ToRoot,
        Descend,
        Back,
        Stay,
        Unhandled,
    }

    use Ev::*;
    use T::*;

    impl StateTree for T {
        type Event = Ev;
        const STATES: &'static [Self] = &[Root, A, A1, A1x, A2, B, Orphan];

        fn name(self) -> &'static str {
            match self {
                Root => "Root",
                A => "A",
                A1 => "A1",
                A1x => "A1x",
                A2 => "A2",
                B => "B",
                Orphan => "Orphan",
            }
        }

        fn parent(self) -> Option<Self> {
            match self {
                Root | Orphan => None,
                A | B => Some(Root),
                A1 | A2 => Some(A),
                A1x => Some(A1),
            }
        }

        fn handle_event(self, event: Ev) -> Option<Self> {
            match (self, event) {
                (Root, ToB) => Some(B),
                (Root, ToOrphan) => Some(Orphan),
                (Root, ToRoot) => Some(Root),
                (Root, Descend) => Some(A1x),
                (A, ToA2) => Some(A2),
                (A2, Stay) => Some(A2),
                (Orphan, Back) => Some(A1x),
                _ => None,
            }
        }
    }

    #[derive(Debug, Default)]
    struct Log(Vec<String>);

    impl Log {
        fn take(&mut self) -> Vec<String> {
            std::mem::take(&mut self.0)
        }
    }

    impl StateBehavior<Log> for T {
        fn action(self, log: &mut Log, _: &mut EventSlot<Ev>) {
            match self {
                B => {}
                _ => log.0.push(format!("action:{}", self.name())),
            }
        }

        fn entry(self, log: &mut Log, events: &mut EventSlot<Ev>) {
            log.0.push(format!("entry:{}", self.name()));
            if self == Orphan {
                events.trigger(Back);
            }
        }

        fn exit(self, log: &mut Log, _: &mut EventSlot<Ev>) {
            log.0.push(format!("exit:{}", self.name()));
        }
    }

    fn machine(initial: T) -> Hsm<T, 4> {
        Hsm::new(initial).unwrap()
    }

    #[test]
    fn depths() {
        assert_eq!(depth(Root), 1);
        assert_eq!(depth(A1), 3);
        assert_eq!(depth(A1x), 4);
        assert_eq!(depth(Orphan), 1);
    }

    #[test]
    fn lca_is_deepest_common_ancestor_for_all_pairs() {
        for &a in T::STATES {
            for &b in T::STATES {
                let expected = ancestors(a).find(|x| ancestors(b).any(|y| y == *x));
                assert_eq!(least_common_ancestor(a, b), expected, "lca({a:?}, {b:?})");
                assert_eq!(least_common_ancestor(b, a), expected, "lca({b:?}, {a:?})");
            }
        }
        assert_eq!(least_common_ancestor(A1x, A2), Some(A));
        assert_eq!(least_common_ancestor(A1x, A1), Some(A1));
        assert_eq!(least_common_ancestor(B, A1x), Some(Root));
        assert_eq!(least_common_ancestor(Orphan, A), None);
    }

    #[test]
    fn action_only_tick_runs_every_level() {
        let mut sm = machine(A1x);
        let mut log = Log::default();
        sm.process(&mut log);
        assert_eq!(
            log.take(),
            ["action:A1x", "action:A1", "action:A", "action:Root"]
        );
        assert_eq!(sm.current(), A1x);
    }

    #[test]
    fn sibling_transition_exits_to_lca_then_enters() {
        let mut sm = machine(A1x);
        let mut log = Log::default();
        sm.trigger(ToA2);
        sm.process(&mut log);
        assert_eq!(
            log.take(),
            [
                "exit:A1x",
                "exit:A1",
                "entry:A2",
                "action:A2",
                "action:A",
                "action:Root"
            ]
        );
        assert_eq!(sm.current(), A2);
        assert_eq!(sm.pending(), None);
    }

    #[test]
    fn event_handled_by_ancestor() {
        let mut sm = machine(A1x);
        let mut log = Log::default();
        sm.trigger(ToB);
        sm.process(&mut log);
        // B has no action.
        assert_eq!(
            log.take(),
            [
                "exit:A1x",
                "exit:A1",
                "exit:A",
                "entry:B",
                "action:Root"
            ]
        );
        assert!(sm.is_in(Root));
        assert!(!sm.is_in(A));
    }

    #[test]
    fn transition_to_ancestor_runs_no_entry() {
        let mut sm = machine(A1x);
        let mut log = Log::default();
        sm.trigger(ToRoot);
        sm.process(&mut log);
        assert_eq!(
            log.take(),
            ["exit:A1x", "exit:A1", "exit:A", "action:Root"]
        );
        assert_eq!(sm.current(), Root);
    }

    #[test]
    fn transition_to_descendant_enters_root_to_leaf() {
        let mut sm = machine(Root);
        let mut log = Log::default();
        sm.trigger(Descend);
        sm.process(&mut log);
        assert_eq!(
            log.take(),
            [
                "entry:A",
                "entry:A1",
                "entry:A1x",
                "action:A1x",
                "action:A1",
                "action:A",
                "action:Root"
            ]
        );
    }

    #[test]
    fn cross_tree_transition_drops_event_raised_by_entry() {
        let mut sm = machine(A1x);
        let mut log = Log::default();
        sm.trigger(ToOrphan);
        sm.process(&mut log);
        assert_eq!(
            log.take(),
            [
                "exit:A1x",
                "exit:A1",
                "exit:A",
                "exit:Root",
                "entry:Orphan",
                "action:Orphan"
            ]
        );
        assert_eq!(sm.current(), Orphan);
        // Quirk kept on purpose: the slot is cleared after the entry
        // callbacks, so the `Back` raised by `Orphan` entry is lost.
        assert_eq!(sm.pending(), None);

        sm.process(&mut log);
        assert_eq!(log.take(), ["action:Orphan"]);
        assert_eq!(sm.current(), Orphan);

        // Only an event raised outside the callbacks moves it on.
        sm.trigger(Back);
        sm.process(&mut log);
        assert_eq!(
            log.take(),
            [
                "exit:Orphan",
                "entry:Root",
                "entry:A",
                "entry:A1",
                "entry:A1x",
                "action:A1x",
                "action:A1",
                "action:A",
                "action:Root"
            ]
        );
        assert_eq!(sm.current(), A1x);
        assert_eq!(sm.pending(), None);
    }

    #[test]
    fn unhandled_event_is_retained() {
        let mut sm = machine(A1x);
        let mut log = Log::default();
        sm.trigger(Unhandled);
        for _ in 0..3 {
            sm.process(&mut log);
            assert_eq!(sm.pending(), Some(Unhandled));
            assert_eq!(sm.current(), A1x);
            assert_eq!(
                log.take(),
                ["action:A1x", "action:A1", "action:A", "action:Root"]
            );
        }
    }

    #[test]
    fn self_target_is_retained_without_exit_or_entry() {
        let mut sm = machine(A2);
        let mut log = Log::default();
        sm.trigger(Stay);
        sm.process(&mut log);
        assert_eq!(log.take(), ["action:A2", "action:A", "action:Root"]);
        assert_eq!(sm.pending(), Some(Stay));
    }

    #[test]
    fn retained_event_is_overwritten() {
        let mut sm = machine(A1x);
        let mut log = Log::default();
        sm.trigger(Unhandled);
        sm.process(&mut log);
        sm.trigger(ToA2);
        sm.process(&mut log);
        assert_eq!(sm.current(), A2);
        assert_eq!(sm.pending(), None);
    }

    #[test]
    fn event_slot_last_write_wins() {
        let mut slot = EventSlot::new();
        assert!(!slot.is_pending());
        slot.trigger(ToA2);
        slot.trigger(ToB);
        assert_eq!(slot.pending(), Some(ToB));
        assert_eq!(slot.take(), Some(ToB));
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn too_deep_forest_rejected() {
        let err = Hsm::<T, 3>::new(Root).unwrap_err();
        assert_eq!(
            err,
            HsmError::DepthExceeded {
                state: "A1x",
                max: 3
            }
        );
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Cyclic {
        X,
        Y,
    }

    impl StateTree for Cyclic {
        type Event = ();
        const STATES: &'static [Self] = &[Cyclic::X, Cyclic::Y];

        fn name(self) -> &'static str {
            match self {
                Cyclic::X => "X",
                Cyclic::Y => "Y",
            }
        }

        fn parent(self) -> Option<Self> {
            match self {
                Cyclic::X => Some(Cyclic::Y),
                Cyclic::Y => Some(Cyclic::X),
            }
        }

        fn handle_event(self, _: ()) -> Option<Self> {
            None
        }
    }

    #[test]
    fn parent_cycle_rejected() {
        let err = Hsm::<Cyclic, 8>::new(Cyclic::X).unwrap_err();
        assert!(matches!(err, HsmError::DepthExceeded { max: 8, .. }));
    }
}
