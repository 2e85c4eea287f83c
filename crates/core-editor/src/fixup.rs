//! Propagates a single buffer mutation's [`FixupEvent`]s to every window
//! face that displays that buffer, across every screen (§4.D / §4.A).
//!
//! A buffer has no idea which windows show it; the editor is the one place
//! that can walk every screen's window list and apply the event to the
//! `Face`s (and saved window marks) that reference the mutated buffer.

use core_model::{Face, ScreenManager};
use core_text::{Fixupable, FixupEvent, apply_fixup, apply_fixup_top_line};

/// Apply `events` to every window across `screens` whose `buffer_index`
/// matches `buffer_index`.
pub fn propagate(screens: &mut ScreenManager, buffer_index: usize, events: &[FixupEvent]) {
    for screen in screens.screens_mut() {
        for window in screen.windows_mut() {
            if window.buffer_index != buffer_index {
                continue;
            }
            for ev in events {
                apply_face(&mut window.face, ev);
            }
        }
    }
}

fn apply_face(face: &mut Face, ev: &FixupEvent) {
    apply_fixup(&mut face.point, ev);
    apply_fixup_top_line(&mut face.top_line, ev);
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::ScreenManager;
    use core_text::{LineStore, Point, insert_chars, insert_newline};

    #[test]
    fn split_moves_a_following_window_top_line() {
        let mut store = LineStore::new();
        let mut point = Point::new(store.header(), 0);
        insert_chars(&mut store, &mut point, b"abcdef").unwrap();
        let line1 = store.first();

        let face = Face::new(Point::new(line1, 0), line1);
        let mut screens = ScreenManager::new();
        screens.insert(80, 24, 0, face);

        let mut split_point = Point::new(line1, 3);
        let ev = insert_newline(&mut store, &mut split_point).unwrap();
        propagate(&mut screens, 0, &[ev]);

        let win = &screens.current().windows()[0];
        assert_eq!(win.face.top_line, line1);
    }
}
