//! Window/screen tiling (§4.D): rows on a screen partition vertically among
//! windows, each showing part of a buffer through its own saved `Face`.
//!
//! Core invariants, maintained by every operation below:
//! * A screen's windows always sum to `Screen::rows` and leave no gaps.
//! * Exactly one screen is current, and exactly one window on it is current.
//! * A window's `face.top_line` is reframed before it's ever rendered with
//!   point outside its row span.

mod screen;
mod window;

pub use screen::{Screen, ScreenManager};
pub use window::{Face, Window, WindowFlags};
