//! The reader session: chapter sequencing, page cursor, input translation and
//! the runtime that carries out session effects.

mod cursor;
mod navigation;
mod runtime;
mod sequencer;
mod session;

pub use cursor::{CursorView, PageCursor, StepOutcome};
pub use navigation::{ClickZone, NavigationController, ReaderInput};
pub use runtime::{Presenter, ReaderRuntime};
pub use sequencer::{
    next_chapter, pick_entry_chapter, prev_chapter, readable_sequence, resolve_sequence,
};
pub use session::{Effect, ReaderSession, RenderView, SessionCommand, SessionState};
