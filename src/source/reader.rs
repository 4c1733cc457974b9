//! Backing stores for source units.
//!
//! Every store hands out the same [`LineReader`] contract, so the lexer never
//! knows whether it is reading a buffer or a file.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, ErrorKind};
use std::path::{Path, PathBuf};

/// Pull interface over the lines of one open unit.
pub trait LineReader {
    /// Starts the next line, appending at most `max` characters of it to
    /// `out`. Returns `None` at the end of the unit, otherwise whether the
    /// line has more characters left for [`continue_line`](Self::continue_line).
    fn next_line(&mut self, max: usize, out: &mut String) -> Option<bool>;

    /// Appends the next piece (at most `max` characters) of the line started
    /// by the last `next_line`. Returns whether more is still left.
    fn continue_line(&mut self, max: usize, out: &mut String) -> bool;
}

/// A named collection of units.
pub trait SourceReader {
    /// Label used in logs.
    fn name(&self) -> &str;

    fn contains(&self, unit: &str) -> bool;

    fn open(&mut self, unit: &str) -> Option<Box<dyn LineReader>>;
}

/// Line reader over any buffered byte stream.
pub struct StreamLines<R> {
    inner: R,
    in_line: bool,
    done: bool,
}

impl<R: BufRead> StreamLines<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            in_line: false,
            done: false,
        }
    }

    fn next_byte(&mut self) -> Option<u8> {
        let byte = loop {
            match self.inner.fill_buf() {
                Ok([]) => return None,
                Ok(buf) => break buf[0],
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::warn!("read error, treating as end of unit: {e}");
                    return None;
                }
            }
        };
        self.inner.consume(1);
        Some(byte)
    }

    fn peek_byte(&mut self) -> Option<u8> {
        match self.inner.fill_buf() {
            Ok([]) | Err(_) => None,
            Ok(buf) => Some(buf[0]),
        }
    }

    /// Reads up to `max` characters of the current line. Returns whether the
    /// line continues past what was read.
    fn read_piece(&mut self, max: usize, out: &mut String) -> bool {
        let mut bytes = Vec::new();
        let mut chars = 0;
        loop {
            if chars >= max {
                // a cap of N characters never splits a UTF-8 sequence
                while let Some(b) = self.peek_byte() {
                    if b & 0xC0 != 0x80 {
                        break;
                    }
                    bytes.push(b);
                    self.inner.consume(1);
                }
                match self.peek_byte() {
                    None => {
                        self.done = true;
                        self.in_line = false;
                    }
                    Some(b'\n') => {
                        self.inner.consume(1);
                        self.in_line = false;
                    }
                    Some(b'\r') => {
                        self.inner.consume(1);
                        if self.peek_byte() == Some(b'\n') {
                            self.inner.consume(1);
                        }
                        self.in_line = false;
                    }
                    Some(_) => self.in_line = true,
                }
                break;
            }
            match self.next_byte() {
                None => {
                    self.done = true;
                    self.in_line = false;
                    break;
                }
                Some(b'\n') => {
                    self.in_line = false;
                    break;
                }
                Some(b'\r') if self.peek_byte() == Some(b'\n') => {
                    self.inner.consume(1);
                    self.in_line = false;
                    break;
                }
                Some(b) => {
                    if b & 0xC0 != 0x80 {
                        chars += 1;
                    }
                    bytes.push(b);
                }
            }
        }
        out.push_str(&String::from_utf8_lossy(&bytes));
        self.in_line
    }
}

impl<R: BufRead> LineReader for StreamLines<R> {
    fn next_line(&mut self, max: usize, out: &mut String) -> Option<bool> {
        // drop whatever is left of an abandoned line
        while self.in_line {
            match self.next_byte() {
                None => {
                    self.done = true;
                    self.in_line = false;
                }
                Some(b'\n') => self.in_line = false,
                Some(_) => {}
            }
        }
        if self.done {
            return None;
        }
        if self.peek_byte().is_none() {
            self.done = true;
            return None;
        }
        Some(self.read_piece(max.max(1), out))
    }

    fn continue_line(&mut self, max: usize, out: &mut String) -> bool {
        if !self.in_line {
            return false;
        }
        self.read_piece(max.max(1), out)
    }
}

/// Named in-memory buffers.
#[derive(Debug, Default)]
pub struct StringReader {
    name: String,
    units: HashMap<String, String>,
}

impl StringReader {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: HashMap::new(),
        }
    }

    /// Adds (or replaces) a unit.
    pub fn insert(&mut self, unit: impl Into<String>, text: impl Into<String>) {
        self.units.insert(unit.into(), text.into());
    }
}

impl SourceReader for StringReader {
    fn name(&self) -> &str {
        &self.name
    }

    fn contains(&self, unit: &str) -> bool {
        self.units.contains_key(unit)
    }

    fn open(&mut self, unit: &str) -> Option<Box<dyn LineReader>> {
        let text = self.units.get(unit)?.clone();
        Some(Box::new(StreamLines::new(Cursor::new(text.into_bytes()))))
    }
}

/// Units stored as files: either explicitly named paths or `<root>/<unit>.<ext>`.
#[derive(Debug)]
pub struct FileReader {
    name: String,
    root: Option<PathBuf>,
    extension: String,
    named: HashMap<String, PathBuf>,
}

impl FileReader {
    /// Reader resolving unit `a` to `<root>/a.<extension>`.
    pub fn rooted(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let root = root.into();
        Self {
            name: root.display().to_string(),
            root: Some(root),
            extension: extension.into(),
            named: HashMap::new(),
        }
    }

    /// Reader with no root; units must be added with [`add_file`](Self::add_file).
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root: None,
            extension: String::new(),
            named: HashMap::new(),
        }
    }

    /// Registers `path` under `unit`.
    pub fn add_file(&mut self, unit: impl Into<String>, path: impl Into<PathBuf>) {
        self.named.insert(unit.into(), path.into());
    }

    fn locate(&self, unit: &str) -> Option<PathBuf> {
        if let Some(path) = self.named.get(unit) {
            return Some(path.clone());
        }
        let root = self.root.as_ref()?;
        let mut path = root.join(unit);
        if !self.extension.is_empty() && path.extension().is_none() {
            path.set_extension(&self.extension);
        }
        path.is_file().then_some(path)
    }
}

impl SourceReader for FileReader {
    fn name(&self) -> &str {
        &self.name
    }

    fn contains(&self, unit: &str) -> bool {
        self.locate(unit).is_some()
    }

    fn open(&mut self, unit: &str) -> Option<Box<dyn LineReader>> {
        let path = self.locate(unit)?;
        match File::open(&path) {
            Ok(file) => Some(Box::new(StreamLines::new(BufReader::new(file)))),
            Err(e) => {
                log::warn!("cannot open {}: {e}", path.display());
                None
            }
        }
    }
}

/// Unit name for a file path: its stem.
pub fn unit_name_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Drains a reader completely; handy for tests and diagnostics.
pub fn read_all_lines(reader: &mut dyn LineReader, max: usize) -> Vec<String> {
    let mut lines = Vec::new();
    loop {
        let mut line = String::new();
        let Some(mut more) = reader.next_line(max, &mut line) else {
            break;
        };
        while more {
            more = reader.continue_line(max, &mut line);
        }
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_lines_and_handles_crlf() {
        let mut reader = StringReader::new("mem");
        reader.insert("a", "one\r\ntwo\n\nthree");
        let mut lines = reader.open("a").expect("unit a");
        assert_eq!(read_all_lines(lines.as_mut(), 80), ["one", "two", "", "three"]);
    }

    #[test]
    fn long_lines_come_in_pieces() {
        let mut reader = StringReader::new("mem");
        reader.insert("a", "abcdefghij\nxy");
        let mut lines = reader.open("a").expect("unit a");

        let mut buf = String::new();
        assert_eq!(lines.next_line(4, &mut buf), Some(true));
        assert_eq!(buf, "abcd");
        assert!(lines.continue_line(4, &mut buf));
        assert!(!lines.continue_line(4, &mut buf));
        assert_eq!(buf, "abcdefghij");

        buf.clear();
        assert_eq!(lines.next_line(4, &mut buf), Some(false));
        assert_eq!(buf, "xy");
        assert_eq!(lines.next_line(4, &mut buf), None);
    }

    #[test]
    fn abandoned_line_is_skipped() {
        let mut reader = StringReader::new("mem");
        reader.insert("a", "abcdefghij\nnext");
        let mut lines = reader.open("a").expect("unit a");
        let mut buf = String::new();
        assert_eq!(lines.next_line(3, &mut buf), Some(true));
        buf.clear();
        assert_eq!(lines.next_line(10, &mut buf), Some(false));
        assert_eq!(buf, "next");
    }

    #[test]
    fn unknown_units_are_not_found() {
        let mut reader = StringReader::new("mem");
        assert!(!reader.contains("nope"));
        assert!(reader.open("nope").is_none());
    }
}
