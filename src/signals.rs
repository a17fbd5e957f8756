use crate::control::RunControl;

/// Keeps the handlers installed until dropped.
pub struct SignalGuard {
    #[cfg(unix)]
    handle: signal_hook::iterator::Handle,
    #[cfg(unix)]
    thread: Option<std::thread::JoinHandle<()>>,
}

/// Map SIGINT / SIGTERM to cancel, SIGUSR1 to pause and SIGUSR2 to resume.
#[cfg(unix)]
pub fn install(control: &RunControl) -> std::io::Result<SignalGuard> {
    use signal_hook::consts::{SIGINT, SIGTERM, SIGUSR1, SIGUSR2};
    use signal_hook::iterator::Signals;
    use tracing::info;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGUSR1, SIGUSR2])?;
    let handle = signals.handle();
    let control = control.clone();
    let thread = std::thread::spawn(move || {
        for signal in signals.forever() {
            match signal {
                SIGUSR1 => {
                    if control.pause() {
                        info!("paused, send SIGUSR2 to resume");
                    }
                }
                SIGUSR2 => {
                    if control.resume() {
                        info!("resumed");
                    }
                }
                _ => {
                    info!(signal, "cancellation requested");
                    control.cancel();
                }
            }
        }
    });
    Ok(SignalGuard {
        handle,
        thread: Some(thread),
    })
}

#[cfg(not(unix))]
pub fn install(_control: &RunControl) -> std::io::Result<SignalGuard> {
    Ok(SignalGuard {})
}

#[cfg(unix)]
impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
