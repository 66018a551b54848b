//! Application-facing event types and the listener registry (spec §6
//! "Application interface": "Event callbacks / listener registry for open,
//! message, error, close").
//!
//! The callback-slot shape is grounded on a data channel's `On*HdlrFn`
//! pattern, simplified to plain (non-`Arc<Mutex<..>>`) storage: spec §5
//! guarantees the engine is driven single-threadedly, so there is no
//! concurrent handler mutation to guard against here (contrast
//! `handle::SharedRetransmitter`, which does add that guard at its single
//! multi-threaded seam).

use crate::close::CloseDescriptor;
use crate::frame::Payload;

/// One application-visible occurrence (spec §6).
#[derive(Debug, Clone)]
pub enum AppEvent {
    Open,
    Message(Payload),
    Error(String),
    Close(CloseDescriptor),
}

type OpenHandler = Box<dyn FnMut() + Send>;
type MessageHandler = Box<dyn FnMut(&Payload) + Send>;
type ErrorHandler = Box<dyn FnMut(&str) + Send>;
type CloseHandler = Box<dyn FnMut(&CloseDescriptor) + Send>;

/// Holds at most one callback per event kind, mirroring the application
/// interface's "listener registry" (spec §6) without pulling in a general
/// multi-subscriber event-bus -- this crate only ever has one application
/// on the other end of the façade.
#[derive(Default)]
pub struct Listeners {
    on_open: Option<OpenHandler>,
    on_message: Option<MessageHandler>,
    on_error: Option<ErrorHandler>,
    on_close: Option<CloseHandler>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_on_open(&mut self, f: impl FnMut() + Send + 'static) {
        self.on_open = Some(Box::new(f));
    }

    pub fn set_on_message(&mut self, f: impl FnMut(&Payload) + Send + 'static) {
        self.on_message = Some(Box::new(f));
    }

    pub fn set_on_error(&mut self, f: impl FnMut(&str) + Send + 'static) {
        self.on_error = Some(Box::new(f));
    }

    pub fn set_on_close(&mut self, f: impl FnMut(&CloseDescriptor) + Send + 'static) {
        self.on_close = Some(Box::new(f));
    }

    pub fn dispatch(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Open => {
                if let Some(f) = &mut self.on_open {
                    f();
                }
            }
            AppEvent::Message(p) => {
                if let Some(f) = &mut self.on_message {
                    f(p);
                }
            }
            AppEvent::Error(e) => {
                if let Some(f) = &mut self.on_error {
                    f(e);
                }
            }
            AppEvent::Close(c) => {
                if let Some(f) = &mut self.on_close {
                    f(c);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn dispatch_invokes_the_matching_handler_only() {
        let mut listeners = Listeners::new();
        let opens = Arc::new(AtomicUsize::new(0));
        let messages = Arc::new(AtomicUsize::new(0));

        let opens2 = opens.clone();
        listeners.set_on_open(move || {
            opens2.fetch_add(1, Ordering::SeqCst);
        });
        let messages2 = messages.clone();
        listeners.set_on_message(move |_| {
            messages2.fetch_add(1, Ordering::SeqCst);
        });

        listeners.dispatch(&AppEvent::Open);
        listeners.dispatch(&AppEvent::Message(Payload::Text("hi".into())));

        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert_eq!(messages.load(Ordering::SeqCst), 1);
    }
}
