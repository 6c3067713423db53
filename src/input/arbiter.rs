// MiBuddy — State-Hold Arbiter
//
// Damps mapper noise near thresholds: a proposal only displaces the held
// (state, activity) once the hold time has passed, unless its state strictly
// outranks the held one.

use log::debug;

use crate::mochi::types::{Activity, EmotionalState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldArbiter {
    hold_ms: u32,
    state: EmotionalState,
    activity: Activity,
    last_change_ms: u32,
}

impl HoldArbiter {
    /// Holding Happy + Idle from `now_ms`. A hold of 0 disables damping.
    pub fn new(hold_ms: u32, now_ms: u32) -> Self {
        Self { hold_ms, state: EmotionalState::Happy, activity: Activity::Idle, last_change_ms: now_ms }
    }

    pub fn hold_ms(&self) -> u32 {
        self.hold_ms
    }

    pub fn set_hold_ms(&mut self, hold_ms: u32) {
        self.hold_ms = hold_ms;
    }

    pub fn held(&self) -> (EmotionalState, Activity) {
        (self.state, self.activity)
    }

    /// Force the held pair, e.g. after a manual `set`.
    pub fn reset(&mut self, state: EmotionalState, activity: Activity, now_ms: u32) {
        self.state = state;
        self.activity = activity;
        self.last_change_ms = now_ms;
    }

    /// Arbitrate one proposal. Returns the pair to display.
    ///
    /// Re-proposing the held pair is a no-op: it does not restart the hold,
    /// so a steady proposal cannot keep a lower-priority change waiting.
    pub fn arbitrate(&mut self, state: EmotionalState, activity: Activity, now_ms: u32) -> (EmotionalState, Activity) {
        if (state, activity) == (self.state, self.activity) {
            return self.held();
        }

        let hold_expired = self.hold_ms == 0 || now_ms.wrapping_sub(self.last_change_ms) >= self.hold_ms;
        let higher_priority = state.outranks(self.state);

        if hold_expired || higher_priority {
            debug!(
                target: "mochi_input",
                "{} + {} -> {} + {} (expired={}, preempt={})",
                self.state, self.activity, state, activity, hold_expired, higher_priority
            );
            self.reset(state, activity, now_ms);
        }
        self.held()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    use EmotionalState as S;

    #[test]
    fn higher_priority_preempts_the_hold() {
        let mut arb = HoldArbiter::new(1000, 0);
        assert_eq!(arb.arbitrate(S::Worried, Activity::Idle, 200), (S::Worried, Activity::Idle));
    }

    #[test]
    fn lower_priority_waits_for_the_hold() {
        let mut arb = HoldArbiter::new(1000, 0);
        assert_eq!(arb.arbitrate(S::Cool, Activity::Idle, 200), (S::Happy, Activity::Idle));
        assert_eq!(arb.arbitrate(S::Cool, Activity::Idle, 1000), (S::Cool, Activity::Idle));
    }

    #[test]
    fn same_priority_activity_change_also_waits() {
        let mut arb = HoldArbiter::new(500, 0);
        assert_eq!(arb.arbitrate(S::Happy, Activity::Bounce, 100).1, Activity::Idle);
        assert_eq!(arb.arbitrate(S::Happy, Activity::Bounce, 600).1, Activity::Bounce);
    }

    #[test]
    fn repeated_proposal_does_not_restart_the_hold() {
        let mut arb = HoldArbiter::new(1000, 0);
        arb.arbitrate(S::Panic, Activity::Vibrate, 100);
        arb.arbitrate(S::Panic, Activity::Vibrate, 900);
        assert_eq!(arb.arbitrate(S::Happy, Activity::Idle, 1100), (S::Happy, Activity::Idle));
    }

    #[test]
    fn zero_hold_passes_everything() {
        let mut arb = HoldArbiter::new(0, 0);
        for (i, s) in S::ALL.iter().enumerate() {
            assert_eq!(arb.arbitrate(*s, Activity::Nod, i as u32).0, *s);
        }
    }

    fn any_state() -> impl Strategy<Value = EmotionalState> {
        (0u8..8).prop_map(|i| EmotionalState::try_from(i).unwrap())
    }

    proptest! {
        #[test]
        fn output_is_held_or_proposed(
            held in any_state(),
            proposed in any_state(),
            hold in 1u32..5000,
            dt in 0u32..10_000,
        ) {
            let mut arb = HoldArbiter::new(hold, 0);
            arb.reset(held, Activity::Idle, 0);
            let out = arb.arbitrate(proposed, Activity::Wiggle, dt).0;

            let accept = dt >= hold || proposed.priority() < held.priority();
            prop_assert_eq!(out, if accept { proposed } else { held });
        }
    }
}
