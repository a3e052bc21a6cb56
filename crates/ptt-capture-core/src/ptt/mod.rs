mod event;
mod key_event;
mod machine;

pub use {
    event::PttEvent,
    key_event::{KeyEvent, KeyPhase},
    machine::{PttState, PttStateMachine, SAFETY_CEILING_ACTION},
};
