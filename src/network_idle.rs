use std::time::{Duration, Instant};

/// Snapshot of a page's loading progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadState {
    pub ready_state: String,
    // number of resource timing entries recorded so far
    pub resources: u64,
}

impl LoadState {
    pub fn new(ready_state: &str, resources: u64) -> Self {
        LoadState {
            ready_state: ready_state.into(),
            resources,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.ready_state == "complete"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleStatus {
    Idle,
    Busy,
    TimedOut,
}

/// Decides from successive `LoadState` samples when a page has gone quiet:
/// the document is complete and the resource count has not moved for
/// `window`. Anything still busy at `deadline` has timed out.
#[derive(Debug)]
pub struct IdleTracker {
    window: Duration,
    deadline: Instant,
    last_count: Option<u64>,
    quiet_since: Option<Instant>,
}

impl IdleTracker {
    pub fn new(window: Duration, deadline: Instant) -> Self {
        IdleTracker {
            window,
            deadline,
            last_count: None,
            quiet_since: None,
        }
    }

    pub fn observe(&mut self, state: &LoadState, now: Instant) -> IdleStatus {
        match self.quiet_since {
            Some(since) if self.last_count == Some(state.resources) => {
                if state.is_complete() && now.saturating_duration_since(since) >= self.window {
                    return IdleStatus::Idle;
                }
            }
            _ => {
                self.last_count = Some(state.resources);
                self.quiet_since = Some(now);
            }
        }
        if now >= self.deadline {
            IdleStatus::TimedOut
        } else {
            IdleStatus::Busy
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(500);

    fn tracker(start: Instant) -> IdleTracker {
        IdleTracker::new(WINDOW, start + Duration::from_secs(30))
    }

    #[test]
    fn stable_complete_page_is_idle() {
        let t0 = Instant::now();
        let mut t = tracker(t0);
        let state = LoadState::new("complete", 12);

        assert_eq!(t.observe(&state, t0), IdleStatus::Busy);
        assert_eq!(
            t.observe(&state, t0 + Duration::from_millis(300)),
            IdleStatus::Busy
        );
        assert_eq!(t.observe(&state, t0 + WINDOW), IdleStatus::Idle);
    }

    #[test]
    fn new_resources_reset_the_window() {
        let t0 = Instant::now();
        let mut t = tracker(t0);

        t.observe(&LoadState::new("complete", 3), t0);
        // a late request lands just before the window would close
        let t1 = t0 + Duration::from_millis(450);
        assert_eq!(t.observe(&LoadState::new("complete", 4), t1), IdleStatus::Busy);
        assert_eq!(
            t.observe(&LoadState::new("complete", 4), t0 + WINDOW),
            IdleStatus::Busy
        );
        assert_eq!(
            t.observe(&LoadState::new("complete", 4), t1 + WINDOW),
            IdleStatus::Idle
        );
    }

    #[test]
    fn loading_document_is_never_idle() {
        let t0 = Instant::now();
        let mut t = tracker(t0);
        let state = LoadState::new("interactive", 5);

        t.observe(&state, t0);
        assert_eq!(
            t.observe(&state, t0 + Duration::from_secs(5)),
            IdleStatus::Busy
        );
        assert_eq!(
            t.observe(&LoadState::new("complete", 5), t0 + Duration::from_secs(6)),
            IdleStatus::Idle
        );
    }

    #[test]
    fn busy_past_deadline_times_out() {
        let t0 = Instant::now();
        let mut t = tracker(t0);

        for i in 0..30u64 {
            let status = t.observe(&LoadState::new("complete", i), t0 + Duration::from_secs(i));
            assert_eq!(status, IdleStatus::Busy);
        }
        assert_eq!(
            t.observe(&LoadState::new("complete", 99), t0 + Duration::from_secs(30)),
            IdleStatus::TimedOut
        );
    }
}
