//! The display differ (§4.F): turns buffer/window/screen state into the
//! minimal set of terminal writes needed to bring the screen in sync.
//!
//! Two row arrays drive everything: the *virtual* rows rebuilt fresh every
//! frame from whatever the windows want to show, and the *physical* rows
//! carried across frames representing what the terminal actually holds.
//! [`differ::Differ::update`] reconciles them one row at a time via
//! [`row::diff_row`], after [`vt::vt_putc`] has expanded each source byte
//! (tabs, control characters, high-bit bytes) into display form.

mod differ;
mod message;
mod row;
mod vt;

pub use differ::{Differ, Sink};
pub use message::{Attr, MessageLine};
pub use row::{Row, RowDiff, RowFlags, diff_row};
pub use vt::{expand_byte, visual_column, vt_putc};
