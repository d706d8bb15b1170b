use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use unicode_width::UnicodeWidthStr;

pub const DEFAULT_CHAR_LIMIT: usize = 256;
pub const PLACEHOLDER: &str = "Type to filter...";
pub const PROMPT: &str = "> ";

/// Single-line editable text field. The cursor is a char index into `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    cursor: usize,
    char_limit: usize,
}

impl Default for TextInput {
    fn default() -> Self {
        Self::new(DEFAULT_CHAR_LIMIT)
    }
}

impl TextInput {
    pub fn new(char_limit: usize) -> Self {
        Self {
            value: String::new(),
            cursor: 0,
            char_limit,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn char_count(&self) -> usize {
        self.value.chars().count()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Display columns between the start of the value and the cursor.
    pub fn cursor_width(&self) -> usize {
        UnicodeWidthStr::width(&self.value[..self.byte_offset(self.cursor)])
    }

    /// Applies an editing key. Returns true when the value changed.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('a') if ctrl => {
                self.cursor = 0;
                false
            }
            KeyCode::Char('e') if ctrl => {
                self.cursor = self.char_count();
                false
            }
            KeyCode::Char('u') if ctrl => self.delete_before_cursor(),
            KeyCode::Char('k') if ctrl => self.delete_after_cursor(),
            KeyCode::Char(_) if ctrl => false,
            KeyCode::Char(ch) => self.insert_char(ch),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                false
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.char_count());
                false
            }
            KeyCode::Home => {
                self.cursor = 0;
                false
            }
            KeyCode::End => {
                self.cursor = self.char_count();
                false
            }
            _ => false,
        }
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        if ch.is_control() || self.char_count() >= self.char_limit {
            return false;
        }
        let at = self.byte_offset(self.cursor);
        self.value.insert(at, ch);
        self.cursor += 1;
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_offset(self.cursor);
        self.value.remove(at);
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.char_count() {
            return false;
        }
        let at = self.byte_offset(self.cursor);
        self.value.remove(at);
        true
    }

    fn delete_before_cursor(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let at = self.byte_offset(self.cursor);
        self.value.replace_range(..at, "");
        self.cursor = 0;
        true
    }

    fn delete_after_cursor(&mut self) -> bool {
        let at = self.byte_offset(self.cursor);
        if at >= self.value.len() {
            return false;
        }
        self.value.truncate(at);
        true
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map(|(idx, _)| idx)
            .unwrap_or(self.value.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn typed(text: &str) -> TextInput {
        let mut input = TextInput::default();
        for ch in text.chars() {
            input.handle_key(&key(KeyCode::Char(ch)));
        }
        input
    }

    #[test]
    fn typing_appends_and_counts_chars() {
        let input = typed("héllo");
        assert_eq!(input.value(), "héllo");
        assert_eq!(input.char_count(), 5);
        assert_eq!(input.cursor(), 5);
    }

    #[test]
    fn editing_in_the_middle() {
        let mut input = typed("abd");
        input.handle_key(&key(KeyCode::Left));
        input.handle_key(&key(KeyCode::Char('c')));
        assert_eq!(input.value(), "abcd");
        input.handle_key(&key(KeyCode::Home));
        assert!(input.handle_key(&key(KeyCode::Delete)));
        assert_eq!(input.value(), "bcd");
        input.handle_key(&key(KeyCode::End));
        assert!(input.handle_key(&key(KeyCode::Backspace)));
        assert_eq!(input.value(), "bc");
    }

    #[test]
    fn backspace_at_start_is_noop() {
        let mut input = typed("x");
        input.handle_key(&key(KeyCode::Home));
        assert!(!input.handle_key(&key(KeyCode::Backspace)));
        assert_eq!(input.value(), "x");
    }

    #[test]
    fn respects_char_limit() {
        let mut input = TextInput::new(3);
        for ch in "abcdef".chars() {
            input.insert_char(ch);
        }
        assert_eq!(input.value(), "abc");
    }

    #[test]
    fn control_shortcuts_clear_ranges() {
        let mut input = typed("hello world");
        for _ in 0..5 {
            input.handle_key(&key(KeyCode::Left));
        }
        assert!(input.handle_key(&KeyEvent::new(KeyCode::Char('k'), KeyModifiers::CONTROL)));
        assert_eq!(input.value(), "hello ");
        assert!(input.handle_key(&KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL)));
        assert_eq!(input.value(), "");
        assert!(!input.handle_key(&KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn cursor_width_counts_wide_glyphs() {
        let input = typed("🦀a");
        assert_eq!(input.cursor_width(), 3);
    }
}
