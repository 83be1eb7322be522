/// Receives notifications from a map surface.
pub trait Messenger {
    /// Called after the surface content changed and should be drawn again.
    fn request_redraw(&self);
}

/// Messenger that ignores all notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyMessenger;

impl Messenger for DummyMessenger {
    fn request_redraw(&self) {}
}
