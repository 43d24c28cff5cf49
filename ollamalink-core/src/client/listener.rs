//! Listener capabilities for streamed calls
//!
//! The two flows deliberately take different listener shapes: the completion
//! decoder consults a boolean continue-signal after every partial frame,
//! while the chat reader only notifies and always runs to a terminal frame,
//! an error line, or end of stream. Keeping the traits separate makes that
//! asymmetry visible in the type system instead of papering over it.

use crate::protocol::ResponseFrame;

/// Cancellable observer for the completion stream.
pub trait StreamListener {
    /// Called once per partial frame, and once with the synthesized terminal
    /// frame when the service reports an in-band error.
    ///
    /// Return `false` to stop reading; the call then yields no result.
    fn on_frame(&mut self, frame: &ResponseFrame) -> bool;
}

impl<F> StreamListener for F
where
    F: FnMut(&ResponseFrame) -> bool,
{
    fn on_frame(&mut self, frame: &ResponseFrame) -> bool {
        self(frame)
    }
}

/// Fire-and-forget observer for the chat stream.
pub trait ChatListener {
    /// Called once per received frame, terminal and error frames included.
    fn on_frame(&mut self, frame: &ResponseFrame);
}

impl<F> ChatListener for F
where
    F: FnMut(&ResponseFrame),
{
    fn on_frame(&mut self, frame: &ResponseFrame) {
        self(frame)
    }
}
