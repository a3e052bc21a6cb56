use ptt_capture_core::KeyEvent;

/// Commands sent from the key source to the main application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// A normalized key event to feed the controller.
    Key(KeyEvent),
    /// Input ended; tear down and exit.
    Shutdown,
}
