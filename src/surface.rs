//! Renderer capability set
//!
//! The interpreter never touches an editor buffer directly; it drives this
//! trait, implemented by the host over its buffer primitives. Offsets are
//! character offsets into an append-only buffer. [`StringSurface`] is a
//! plain in-memory implementation used by the test suite and by hosts that
//! just want the text.

/// The buffer operations the terminal display needs from its host.
pub trait BufferSurface {
    /// Total buffer size.
    fn size(&self) -> usize;
    /// Insert text at `offset`, shifting trailing content. Returns the
    /// offset just after the inserted text.
    fn insert_at(&mut self, offset: usize, text: &str) -> usize;
    /// Overwrite characters starting at `offset` up to the end of the line,
    /// inserting any remainder. Returns the offset just after the written
    /// text.
    fn overwrite_at(&mut self, offset: usize, text: &str) -> usize;
    /// Replace `[begin, end)` with placeholder blanks without shifting
    /// trailing content. Newlines in the range are preserved.
    fn erase_range(&mut self, begin: usize, end: usize);
    /// Remove `[begin, end)`, shifting trailing content left.
    fn delete_range(&mut self, begin: usize, end: usize);
    /// Offset of the first character of the line containing `offset`.
    fn line_start(&self, offset: usize) -> usize;
    /// Offset of the line's terminating newline (or end of buffer).
    fn line_end(&self, offset: usize) -> usize;
    /// (row, col) of an offset.
    fn row_col(&self, offset: usize) -> (usize, usize);
    /// Offset of (row, col), clamped to the end of the row (and the end of
    /// the buffer for rows past the last).
    fn offset_of(&self, row: usize, col: usize) -> usize;
    /// Tag subsequent writes with a named style scope (`None` clears it).
    fn set_style_scope(&mut self, scope: Option<&str>);
}

/// In-memory [`BufferSurface`] backed by a char vector.
///
/// Tracks the active style scope and which scope each character was written
/// under, which is all the test suite needs to assert styling.
#[derive(Debug, Default)]
pub struct StringSurface {
    chars: Vec<char>,
    scope: Option<String>,
    /// Scope each character was written under, parallel to `chars`.
    char_scopes: Vec<Option<String>>,
}

impl StringSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current buffer contents.
    pub fn contents(&self) -> String {
        self.chars.iter().collect()
    }

    /// The style scope active for subsequent writes.
    pub fn active_scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Scope the character at `offset` was written under.
    pub fn scope_at(&self, offset: usize) -> Option<&str> {
        self.char_scopes.get(offset).and_then(|s| s.as_deref())
    }
}

impl BufferSurface for StringSurface {
    fn size(&self) -> usize {
        self.chars.len()
    }

    fn insert_at(&mut self, offset: usize, text: &str) -> usize {
        let offset = offset.min(self.chars.len());
        for (i, ch) in text.chars().enumerate() {
            self.chars.insert(offset + i, ch);
            self.char_scopes.insert(offset + i, self.scope.clone());
        }
        offset + text.chars().count()
    }

    fn overwrite_at(&mut self, offset: usize, text: &str) -> usize {
        let mut pos = offset.min(self.chars.len());
        let mut chars = text.chars().peekable();
        while let Some(&ch) = chars.peek() {
            if pos >= self.chars.len() || self.chars[pos] == '\n' {
                break;
            }
            self.chars[pos] = ch;
            self.char_scopes[pos] = self.scope.clone();
            pos += 1;
            chars.next();
        }
        let remainder: String = chars.collect();
        if remainder.is_empty() {
            pos
        } else {
            self.insert_at(pos, &remainder)
        }
    }

    fn erase_range(&mut self, begin: usize, end: usize) {
        let end = end.min(self.chars.len());
        for i in begin..end {
            if self.chars[i] != '\n' {
                self.chars[i] = ' ';
                self.char_scopes[i] = None;
            }
        }
    }

    fn delete_range(&mut self, begin: usize, end: usize) {
        let end = end.min(self.chars.len());
        if begin < end {
            self.chars.drain(begin..end);
            self.char_scopes.drain(begin..end);
        }
    }

    fn line_start(&self, offset: usize) -> usize {
        let offset = offset.min(self.chars.len());
        self.chars[..offset]
            .iter()
            .rposition(|&c| c == '\n')
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    fn line_end(&self, offset: usize) -> usize {
        let offset = offset.min(self.chars.len());
        self.chars[offset..]
            .iter()
            .position(|&c| c == '\n')
            .map(|i| offset + i)
            .unwrap_or(self.chars.len())
    }

    fn row_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.chars.len());
        let row = self.chars[..offset].iter().filter(|&&c| c == '\n').count();
        let col = offset - self.line_start(offset);
        (row, col)
    }

    fn offset_of(&self, row: usize, col: usize) -> usize {
        let mut start = 0usize;
        for _ in 0..row {
            match self.chars[start..].iter().position(|&c| c == '\n') {
                Some(i) => start = start + i + 1,
                None => return self.chars.len(),
            }
        }
        let end = self.line_end(start);
        (start + col).min(end)
    }

    fn set_style_scope(&mut self, scope: Option<&str>) {
        self.scope = scope.map(|s| s.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface(text: &str) -> StringSurface {
        let mut s = StringSurface::new();
        s.insert_at(0, text);
        s
    }

    #[test]
    fn test_insert_and_size() {
        let mut s = StringSurface::new();
        assert_eq!(s.insert_at(0, "abc"), 3);
        assert_eq!(s.insert_at(1, "XY"), 3);
        assert_eq!(s.contents(), "aXYbc");
        assert_eq!(s.size(), 5);
    }

    #[test]
    fn test_overwrite_within_line() {
        let mut s = surface("hello\nworld");
        assert_eq!(s.overwrite_at(0, "HE"), 2);
        assert_eq!(s.contents(), "HEllo\nworld");
    }

    #[test]
    fn test_overwrite_spills_past_line_end() {
        let mut s = surface("ab\ncd");
        // Overwrites "b", then inserts the rest before the newline.
        assert_eq!(s.overwrite_at(1, "XYZ"), 4);
        assert_eq!(s.contents(), "aXYZ\ncd");
    }

    #[test]
    fn test_overwrite_at_buffer_end_appends() {
        let mut s = surface("ab");
        assert_eq!(s.overwrite_at(2, "cd"), 4);
        assert_eq!(s.contents(), "abcd");
    }

    #[test]
    fn test_erase_keeps_newlines() {
        let mut s = surface("ab\ncd");
        s.erase_range(1, 4);
        assert_eq!(s.contents(), "a \n d");
    }

    #[test]
    fn test_delete_shifts() {
        let mut s = surface("abcdef");
        s.delete_range(1, 3);
        assert_eq!(s.contents(), "adef");
    }

    #[test]
    fn test_line_geometry() {
        let s = surface("ab\ncde\nf");
        assert_eq!(s.line_start(4), 3);
        assert_eq!(s.line_end(4), 6);
        assert_eq!(s.row_col(5), (1, 2));
        assert_eq!(s.offset_of(1, 1), 4);
        assert_eq!(s.offset_of(1, 99), 6);
        assert_eq!(s.offset_of(99, 0), 8);
    }

    #[test]
    fn test_scopes_recorded() {
        let mut s = StringSurface::new();
        s.set_style_scope(Some("sgr.red-on-default"));
        s.insert_at(0, "hi");
        s.set_style_scope(None);
        s.insert_at(2, "!");
        assert_eq!(s.scope_at(0), Some("sgr.red-on-default"));
        assert_eq!(s.scope_at(2), None);
    }
}
