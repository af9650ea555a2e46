//! Access to the speaker from several interrupt handlers.
//!
//! The USB interrupt drives the class, while e.g. a button interrupt requests diagnostics and the main loop reads the
//! status. All of them go through a critical section.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::CriticalSectionMutex;

use crate::i2s::DmaMonitor;
use crate::sink::AudioSink;
use crate::uac1::Uac1Speaker;

pub struct SharedSpeaker<S: AudioSink, D: DmaMonitor> {
    speaker: CriticalSectionMutex<RefCell<Option<Uac1Speaker<S, D>>>>,
}

impl<S: AudioSink, D: DmaMonitor> Default for SharedSpeaker<S, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: AudioSink, D: DmaMonitor> SharedSpeaker<S, D> {
    pub const fn new() -> Self {
        Self {
            speaker: CriticalSectionMutex::new(RefCell::new(None)),
        }
    }

    /// Hands the speaker over. A previously installed speaker is returned.
    pub fn install(&self, speaker: Uac1Speaker<S, D>) -> Option<Uac1Speaker<S, D>> {
        self.speaker.lock(|cell| cell.borrow_mut().replace(speaker))
    }

    /// Runs `f` on the speaker, inside a critical section. Returns `None` if no speaker is installed.
    pub fn with<R>(&self, f: impl FnOnce(&mut Uac1Speaker<S, D>) -> R) -> Option<R> {
        self.speaker.lock(|cell| cell.borrow_mut().as_mut().map(f))
    }
}
