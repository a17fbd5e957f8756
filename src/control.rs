use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// What the engine should do at a suspension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    Continue,
    Cancel,
}

#[derive(Debug, Default)]
struct ControlState {
    paused_since: Option<Instant>,
    paused_total: Duration,
    cancelled: bool,
}

impl ControlState {
    fn close_pause_window(&mut self) {
        if let Some(since) = self.paused_since.take() {
            self.paused_total += since.elapsed();
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<ControlState>,
    changed: Condvar,
}

/// Cooperative run signal. Cloning shares the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    inner: Arc<Inner>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `false` if already paused or cancelled.
    pub fn pause(&self) -> bool {
        let mut state = self.lock();
        if state.cancelled || state.paused_since.is_some() {
            return false;
        }
        state.paused_since = Some(Instant::now());
        true
    }

    /// Returns `false` if not paused.
    pub fn resume(&self) -> bool {
        let mut state = self.lock();
        if state.paused_since.is_none() {
            return false;
        }
        state.close_pause_window();
        self.inner.changed.notify_all();
        true
    }

    /// Request cancellation. Also releases a paused run.
    pub fn cancel(&self) {
        let mut state = self.lock();
        state.cancelled = true;
        state.close_pause_window();
        self.inner.changed.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused_since.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Total time spent paused, including a pause still in effect.
    pub fn paused_duration(&self) -> Duration {
        let state = self.lock();
        state.paused_total + state.paused_since.map(|s| s.elapsed()).unwrap_or_default()
    }

    /// Block while paused, then report whether to go on.
    pub fn checkpoint(&self) -> Checkpoint {
        let guard = self.lock();
        let state = self
            .inner
            .changed
            .wait_while(guard, |s| s.paused_since.is_some() && !s.cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        if state.cancelled {
            Checkpoint::Cancel
        } else {
            Checkpoint::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn checkpoint_continues_when_idle() {
        let control = RunControl::new();
        assert_eq!(control.checkpoint(), Checkpoint::Continue);
    }

    #[test]
    fn pause_then_resume_accumulates_duration() {
        let control = RunControl::new();
        assert!(control.pause());
        assert!(!control.pause());
        assert!(control.is_paused());
        thread::sleep(Duration::from_millis(10));
        assert!(control.resume());
        assert!(!control.resume());

        let paused = control.paused_duration();
        assert!(paused >= Duration::from_millis(10));
        assert_eq!(control.paused_duration(), paused);
    }

    #[test]
    fn checkpoint_blocks_until_resumed() {
        let control = RunControl::new();
        control.pause();
        let remote = control.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.resume();
        });
        assert_eq!(control.checkpoint(), Checkpoint::Continue);
        assert!(!control.is_paused());
        handle.join().unwrap();
    }

    #[test]
    fn cancel_releases_a_paused_run() {
        let control = RunControl::new();
        control.pause();
        let remote = control.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });
        assert_eq!(control.checkpoint(), Checkpoint::Cancel);
        assert!(!control.is_paused());
        assert!(!control.pause());
        handle.join().unwrap();
    }
}
