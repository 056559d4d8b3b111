// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Guarded-transition automata.
//!
//! Every simulated entity is a finite-state machine described by a static
//! table of [`Transition`]s. A transition leaves its `from` state for its `to`
//! state when its guard holds, running its optional action on the way.
//!
//! Guards never read shared state directly. Each entity is instead handed a
//! read-only [`Automaton::View`], a snapshot of everything it may observe
//! about other entities. Actions may mutate only the entity itself and report
//! side effects on others through [`Automaton::Effect`], which the owner of
//! the entity then applies.
//!
//! The driver calls [`fire`] on every entity repeatedly until no transition
//! is enabled anywhere, which is the fixed point for the current instant.

use std::fmt::{Debug, Display};

use log::trace;
use rand::RngCore;

use crate::error::SimulationError;
use crate::types::SimTime;

/// Guard predicate of a transition.
pub type Guard<A> = fn(&A, &<A as Automaton>::View) -> bool;

/// Action run when a transition fires.
pub type Action<A> = fn(
    &mut A,
    &<A as Automaton>::View,
    &mut dyn RngCore,
) -> Result<Option<<A as Automaton>::Effect>, SimulationError>;

/// A single `(from, to, guard, action)` entry of a transition table.
pub struct Transition<A: Automaton> {
    /// Human-readable name, used in logs.
    pub name: &'static str,
    pub from: A::State,
    pub to: A::State,
    pub guard: Guard<A>,
    pub action: Option<Action<A>>,
}

/// An entity driven by a static transition table.
pub trait Automaton: Sized + 'static {
    /// Enumerated automaton states.
    type State: Copy + Eq + Debug + 'static;
    /// Read-only snapshot of cross-entity state observed by guards.
    type View;
    /// Side effect on other entities produced by an action.
    type Effect;
    /// Identifies one entity among those of the same kind in logs.
    type Id: Display;

    /// Entity kind, used in logs.
    const KIND: &'static str;
    /// Transition table, evaluated in order.
    const TRANSITIONS: &'static [Transition<Self>];

    /// Identity of this entity.
    fn id(&self) -> Self::Id;

    /// Simulated time carried by `view`.
    fn time(view: &Self::View) -> SimTime;

    /// Current state.
    fn state(&self) -> Self::State;

    /// Switches to `state`, called after the action of a fired transition.
    fn enter(&mut self, state: Self::State);
}

/// Outcome of firing a single transition.
pub struct Fired<A: Automaton> {
    pub name: &'static str,
    pub from: A::State,
    pub to: A::State,
    pub effect: Option<A::Effect>,
}

/// Fires the first enabled transition leaving the current state, if any.
///
/// At most one transition fires per call.
///
/// # Errors
///
/// Propagates invariant violations detected by the transition's action.
/// The automaton stays in its current state in that case.
pub fn fire<A: Automaton>(
    automaton: &mut A,
    view: &A::View,
    rng: &mut dyn RngCore,
) -> Result<Option<Fired<A>>, SimulationError> {
    let from = automaton.state();
    let Some(transition) = A::TRANSITIONS
        .iter()
        .find(|t| t.from == from && (t.guard)(automaton, view))
    else {
        return Ok(None);
    };
    let effect = match transition.action {
        Some(action) => action(automaton, view, rng)?,
        None => None,
    };
    automaton.enter(transition.to);
    trace!(
        "{} {} {}: {:?} -> {:?} at {}",
        A::KIND,
        automaton.id(),
        transition.name,
        from,
        transition.to,
        A::time(view)
    );
    Ok(Some(Fired {
        name: transition.name,
        from,
        to: transition.to,
        effect,
    }))
}

/// Returns `true` iff some transition leaving the current state is enabled.
pub fn enabled<A: Automaton>(automaton: &A, view: &A::View) -> bool {
    let from = automaton.state();
    A::TRANSITIONS
        .iter()
        .any(|t| t.from == from && (t.guard)(automaton, view))
}
