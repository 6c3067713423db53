// MiBuddy — Periodic Timer
//
// The UI loop owns every timer and polls them with the current millisecond
// tick; nothing here spawns threads or sleeps. A paused timer keeps its
// period but never fires, so no work happens while the app is in background.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Running,
    Paused,
}

#[derive(Debug, Clone)]
pub struct PeriodicTimer {
    period_ms: u32,
    next_due_ms: Option<u32>,
    state: TimerState,
}

impl PeriodicTimer {
    /// Create a running timer. The first expiry is one period after the first poll.
    pub fn new(period_ms: u32) -> Self {
        Self {
            period_ms: period_ms.max(1),
            next_due_ms: None,
            state: TimerState::Running,
        }
    }

    /// Create a timer that stays silent until [`resume`](Self::resume).
    pub fn paused(period_ms: u32) -> Self {
        Self {
            state: TimerState::Paused,
            ..Self::new(period_ms)
        }
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    pub fn set_period(&mut self, period_ms: u32) {
        self.period_ms = period_ms.max(1);
        self.next_due_ms = None;
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn pause(&mut self) {
        self.state = TimerState::Paused;
    }

    pub fn resume(&mut self) {
        if self.state == TimerState::Paused {
            self.state = TimerState::Running;
            self.next_due_ms = None;
        }
    }

    /// Returns `true` once per elapsed period. Late polls fire once and
    /// re-arm from `now_ms` rather than replaying missed periods.
    pub fn poll(&mut self, now_ms: u32) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        match self.next_due_ms {
            None => {
                self.next_due_ms = Some(now_ms.wrapping_add(self.period_ms));
                false
            }
            Some(due) if now_ms.wrapping_sub(due) < u32::MAX / 2 => {
                self.next_due_ms = Some(now_ms.wrapping_add(self.period_ms));
                true
            }
            Some(_) => false,
        }
    }
}
