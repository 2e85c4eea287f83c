//! `ExtendedKey` encoding (§6): a 16-bit value whose low byte is the raw
//! byte (or function-key ordinal) and whose high byte carries modifier
//! flags, plus the ASCII control-character canonicalisation every raw
//! byte read from the terminal passes through first.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct KeyMod: u16 {
        const CTRL = 0x0100;
        const META = 0x0200;
        /// Cursor-key prefix (arrows).
        const PREFIX1 = 0x0400;
        /// Editing-key prefix (Insert/Delete/Home/End/PageUp/PageDown).
        const PREFIX2 = 0x0800;
        /// Reserved for a third class of prefixed sequences.
        const PREFIX3 = 0x1000;
        const SHFT = 0x2000;
        const FKEY = 0x4000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtendedKey(pub u16);

impl ExtendedKey {
    pub fn new(byte: u8, mods: KeyMod) -> Self {
        Self(mods.bits() | byte as u16)
    }

    pub fn byte(self) -> u8 {
        (self.0 & 0x00FF) as u8
    }

    pub fn mods(self) -> KeyMod {
        KeyMod::from_bits_truncate(self.0 & 0xFF00)
    }
}

/// Canonicalise a raw input byte per §6: `0x00..0x1F` and `0x7F` become
/// `CTRL | (c ^ 0x40)`, except the null byte, which is represented as
/// `CTRL | SPACE` rather than `CTRL | '@'`.
pub fn canonicalize_ascii(byte: u8) -> ExtendedKey {
    if byte == 0x00 {
        ExtendedKey::new(b' ', KeyMod::CTRL)
    } else if byte <= 0x1F || byte == 0x7F {
        ExtendedKey::new(byte ^ 0x40, KeyMod::CTRL)
    } else {
        ExtendedKey::new(byte, KeyMod::empty())
    }
}

/// Translate a crossterm key event into an `ExtendedKey`. Returns `None`
/// for events with no plain-byte or function-key representation (e.g. a
/// bare modifier press).
pub fn from_crossterm(event: &KeyEvent) -> Option<ExtendedKey> {
    let mut mods = KeyMod::empty();
    if event.modifiers.contains(KeyModifiers::CONTROL) {
        mods |= KeyMod::CTRL;
    }
    if event.modifiers.contains(KeyModifiers::ALT) {
        mods |= KeyMod::META;
    }
    if event.modifiers.contains(KeyModifiers::SHIFT) {
        mods |= KeyMod::SHFT;
    }

    match event.code {
        KeyCode::Char(c) if c.is_ascii() => {
            if mods.contains(KeyMod::CTRL) {
                // Crossterm reports Ctrl-<letter> as the plain letter plus a
                // modifier rather than the 0x00..0x1F control byte; fold it
                // back to that byte before canonicalising.
                let ctrl_byte = (c as u8).to_ascii_uppercase() & 0x1F;
                let canon = canonicalize_ascii(ctrl_byte);
                Some(ExtendedKey::new(canon.byte(), canon.mods() | (mods - KeyMod::CTRL)))
            } else {
                Some(ExtendedKey::new(c as u8, mods))
            }
        }
        KeyCode::Enter => Some(ExtendedKey::new(b'\r', mods)),
        KeyCode::Tab => Some(ExtendedKey::new(b'\t', mods)),
        KeyCode::Backspace => Some(ExtendedKey::new(0x7F, mods | KeyMod::CTRL)),
        KeyCode::Esc => Some(ExtendedKey::new(0x1B, mods | KeyMod::CTRL)),
        KeyCode::Up => Some(ExtendedKey::new(0, mods | KeyMod::PREFIX1)),
        KeyCode::Down => Some(ExtendedKey::new(1, mods | KeyMod::PREFIX1)),
        KeyCode::Left => Some(ExtendedKey::new(2, mods | KeyMod::PREFIX1)),
        KeyCode::Right => Some(ExtendedKey::new(3, mods | KeyMod::PREFIX1)),
        KeyCode::Home => Some(ExtendedKey::new(0, mods | KeyMod::PREFIX2)),
        KeyCode::End => Some(ExtendedKey::new(1, mods | KeyMod::PREFIX2)),
        KeyCode::PageUp => Some(ExtendedKey::new(2, mods | KeyMod::PREFIX2)),
        KeyCode::PageDown => Some(ExtendedKey::new(3, mods | KeyMod::PREFIX2)),
        KeyCode::Insert => Some(ExtendedKey::new(4, mods | KeyMod::PREFIX2)),
        KeyCode::Delete => Some(ExtendedKey::new(5, mods | KeyMod::PREFIX2)),
        KeyCode::F(n) => Some(ExtendedKey::new(n, mods | KeyMod::FKEY)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_byte_canonicalises_with_caret_offset() {
        let key = canonicalize_ascii(0x01); // Ctrl-A
        assert_eq!(key.byte(), b'A');
        assert!(key.mods().contains(KeyMod::CTRL));
    }

    #[test]
    fn del_canonicalises_to_ctrl_question_mark() {
        let key = canonicalize_ascii(0x7F);
        assert_eq!(key.byte(), b'?');
        assert!(key.mods().contains(KeyMod::CTRL));
    }

    #[test]
    fn null_byte_is_ctrl_space() {
        let key = canonicalize_ascii(0x00);
        assert_eq!(key.byte(), b' ');
        assert!(key.mods().contains(KeyMod::CTRL));
    }

    #[test]
    fn printable_byte_carries_no_modifier() {
        let key = canonicalize_ascii(b'x');
        assert_eq!(key.byte(), b'x');
        assert!(key.mods().is_empty());
    }

    #[test]
    fn function_key_sets_fkey_flag() {
        let event = KeyEvent::new(KeyCode::F(5), KeyModifiers::NONE);
        let key = from_crossterm(&event).unwrap();
        assert_eq!(key.byte(), 5);
        assert!(key.mods().contains(KeyMod::FKEY));
    }

    #[test]
    fn arrow_key_sets_prefix1() {
        let event = KeyEvent::new(KeyCode::Left, KeyModifiers::NONE);
        let key = from_crossterm(&event).unwrap();
        assert!(key.mods().contains(KeyMod::PREFIX1));
    }
}
