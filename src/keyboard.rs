//! C10 — Keyboard supervisor.
//!
//! A context-scoped resource: `acquire` starts an OS-global keyboard
//! listener on its own thread; `release` (via `Drop`) tears it down. The
//! listener is passive — it only sets flags the orchestrator polls at row
//! boundaries (§4.10); it never suspends the orchestrator directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use rdev::{listen, Event, EventType, Key};
use tracing::{error, warn};

/// The pause/resume flags, isolated from the OS listener thread so the
/// polling semantics can be unit-tested without starting a real listener
/// (which needs OS-level input-hook permissions unavailable in CI/sandboxes).
#[derive(Debug, Default)]
pub struct PauseResumeFlags {
    pause: Arc<AtomicBool>,
    resume: Arc<AtomicBool>,
}

impl PauseResumeFlags {
    pub fn new() -> PauseResumeFlags {
        PauseResumeFlags { pause: Arc::new(AtomicBool::new(false)), resume: Arc::new(AtomicBool::new(false)) }
    }

    pub fn request_pause(&self) {
        self.pause.store(true, Ordering::Relaxed);
    }

    pub fn request_resume(&self) {
        self.resume.store(true, Ordering::Relaxed);
    }

    pub fn pause_requested(&self) -> bool {
        self.pause.load(Ordering::Relaxed)
    }

    pub fn resume_requested(&self) -> bool {
        self.resume.load(Ordering::Relaxed)
    }

    pub fn clear_pause(&self) {
        self.pause.store(false, Ordering::Relaxed);
    }

    pub fn clear_resume(&self) {
        self.resume.store(false, Ordering::Relaxed);
    }
}

/// Default pause/resume keys per §4.10: ESC pauses, F9 resumes.
pub const DEFAULT_PAUSE_KEY: Key = Key::Escape;
pub const DEFAULT_RESUME_KEY: Key = Key::F9;

/// Owns the background listener thread for its lifetime. `acquire`/`release`
/// give the scoped-resource semantics §4.10 asks for.
pub struct KeyboardSupervisor {
    flags: PauseResumeFlags,
    stopped: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl KeyboardSupervisor {
    /// Starts the listener thread. `pause_key`/`resume_key` let callers
    /// override the defaults (ESC/F9).
    pub fn acquire(pause_key: Key, resume_key: Key) -> KeyboardSupervisor {
        let flags = PauseResumeFlags::new();
        let pause = flags.pause.clone();
        let resume = flags.resume.clone();
        let stopped = Arc::new(AtomicBool::new(false));
        let stopped_for_thread = stopped.clone();

        let handle = thread::spawn(move || {
            let callback = move |event: Event| {
                if stopped_for_thread.load(Ordering::Relaxed) {
                    return;
                }
                if let EventType::KeyPress(key) = event.event_type {
                    if key == pause_key {
                        pause.store(true, Ordering::Relaxed);
                    } else if key == resume_key {
                        resume.store(true, Ordering::Relaxed);
                    }
                }
            };
            if let Err(e) = listen(callback) {
                error!("keyboard listener failed to start: {e:?}");
            }
        });

        KeyboardSupervisor { flags, stopped, handle: Some(handle) }
    }

    pub fn pause_requested(&self) -> bool {
        self.flags.pause_requested()
    }

    pub fn resume_requested(&self) -> bool {
        self.flags.resume_requested()
    }

    pub fn clear_pause(&self) {
        self.flags.clear_pause();
    }

    pub fn clear_resume(&self) {
        self.flags.clear_resume();
    }
}

impl Drop for KeyboardSupervisor {
    fn drop(&mut self) {
        // `rdev::listen` blocks its thread in a platform event loop with no
        // portable stop() in this version; `stopped` only silences further
        // flag updates. The thread itself detaches and exits with the
        // process — acceptable for this crate's one-run-per-process CLI.
        // TODO: switch to `rdev::grab` with an explicit stop channel once
        // that path stabilizes across platforms, for a true thread join here.
        self.stopped.store(true, Ordering::Relaxed);
        if self.handle.take().is_some() {
            warn!("keyboard supervisor released; listener thread detaches (rdev has no portable stop)");
        }
    }
}
