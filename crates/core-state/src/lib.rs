//! Buffer-centric editor state: the buffer collection (§4.B), marks and
//! regions (§4.C), and the edit primitives every editing command funnels
//! through (§4.E).
//!
//! Window/screen tiling (§4.D) and the rings themselves (§4.H) live in
//! their own crates; this one owns the data a buffer needs regardless of
//! whether any window is currently displaying it.

mod buffer;
mod edit;
mod mark;

pub use buffer::{Buffer, BufferFlags, BufferManager, ClearFlags, FindFlags, MACRO_PREFIX_CHAR, file_base_name};
pub use edit::{CaseMode, CaseScope, DeleteMode, DeleteOutcome, case_convert, delete_chars, delete_tab, insert_chars, insert_newline, insert_tab, overwrite_chars, overwrite_string};
pub use mark::{Mark, MarkId, MarkOpts, MarkTable, Region, get_line_region, get_region};
