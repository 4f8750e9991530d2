//! Presentation sink: where side-effect intents go after a mutation
//! commits. The sink never mutates game state.

use boardwalk_core::{Effect, Severity, Sound};
use tracing::{debug, error, info, warn};

pub trait PresentationSink: Send + Sync {
    fn emit_sound(&self, sound: Sound, muted: bool);
    fn append_log(&self, entry: &str);
    fn notify(&self, message: &str, severity: Severity);
}

/// Default sink: structured logging only. A UI shell would swap in its own
/// implementation driving audio and toasts.
pub struct TracingSink;

impl PresentationSink for TracingSink {
    fn emit_sound(&self, sound: Sound, muted: bool) {
        if !muted {
            debug!(?sound, "sound cue");
        }
    }

    fn append_log(&self, entry: &str) {
        info!(target: "boardwalk::game", "{}", entry);
    }

    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info => info!("{}", message),
            Severity::Warning => warn!("{}", message),
            Severity::Error => error!("{}", message),
        }
    }
}

/// Swallows everything; for tests.
pub struct NullSink;

impl PresentationSink for NullSink {
    fn emit_sound(&self, _sound: Sound, _muted: bool) {}
    fn append_log(&self, _entry: &str) {}
    fn notify(&self, _message: &str, _severity: Severity) {}
}

/// Feed a reducer's effect list to a sink.
pub fn dispatch_effects(sink: &dyn PresentationSink, effects: &[Effect], muted: bool) {
    for effect in effects {
        match effect {
            Effect::Sound(sound) => sink.emit_sound(*sound, muted),
            Effect::Log(entry) => sink.append_log(entry),
            Effect::Notify { message, severity } => sink.notify(message, *severity),
        }
    }
}
