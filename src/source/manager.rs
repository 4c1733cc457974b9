use std::collections::HashMap;

use super::position::{PosId, PositionArena, SourcePosition};
use super::reader::{LineReader, SourceReader, StringReader};
use super::UnitId;

/// Unit names plus every position minted while parsing. A finished program
/// owns one of these, so positions can be rendered long after parsing.
#[derive(Debug, Default)]
pub struct SourceMap {
    units: Vec<String>,
    positions: PositionArena,
}

impl SourceMap {
    pub fn unit_name(&self, id: UnitId) -> &str {
        self.units.get(id.get()).map(String::as_str).unwrap_or("<unknown>")
    }

    pub fn position(&self, id: PosId) -> Option<&SourcePosition> {
        self.positions.get(id)
    }

    pub fn positions(&self) -> &PositionArena {
        &self.positions
    }

    /// `unit:line:column`
    pub fn location(&self, id: PosId) -> String {
        match self.positions.get(id) {
            Some(p) => format!("{}:{}:{}", self.unit_name(p.unit), p.line, p.column),
            None => "<unknown>".to_string(),
        }
    }

    /// `unit:line:column`, followed by the import chain that led there.
    pub fn describe(&self, id: PosId) -> String {
        let mut text = self.location(id);
        let mut caller = self.positions.get(id).and_then(|p| p.caller);
        while let Some(c) = caller {
            text.push_str(" (imported from ");
            text.push_str(&self.location(c));
            text.push(')');
            caller = self.positions.get(c).and_then(|p| p.caller);
        }
        text
    }

    pub fn line_of(&self, id: PosId) -> u32 {
        self.positions.get(id).map(|p| p.line).unwrap_or(0)
    }
}

struct OpenUnit {
    unit: UnitId,
    lines: Box<dyn LineReader>,
    line: u32,
    caller: Option<PosId>,
}

/// Multiplexes the registered readers and tracks the stack of open units
/// (the main unit at the bottom, nested imports above it).
pub struct SourceManager {
    buffers: StringReader,
    readers: Vec<Box<dyn SourceReader>>,
    current: Option<usize>,
    unit_ids: HashMap<String, UnitId>,
    map: SourceMap,
    stack: Vec<OpenUnit>,
    last: Option<(UnitId, u32)>,
}

impl Default for SourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceManager {
    pub fn new() -> Self {
        Self {
            buffers: StringReader::new("<buffers>"),
            readers: Vec::new(),
            current: None,
            unit_ids: HashMap::new(),
            map: SourceMap::default(),
            stack: Vec::new(),
            last: None,
        }
    }

    /// Adds a backing store. The first one registered becomes current and is
    /// searched first.
    pub fn register_reader(&mut self, reader: Box<dyn SourceReader>) {
        log::debug!("registered source reader '{}'", reader.name());
        self.readers.push(reader);
        if self.current.is_none() {
            self.current = Some(0);
        }
    }

    /// Adds a named in-memory unit. Buffers are searched before any reader.
    pub fn add_buffer(&mut self, unit: impl Into<String>, text: impl Into<String>) {
        self.buffers.insert(unit, text);
    }

    pub fn contains(&self, unit: &str) -> bool {
        self.buffers.contains(unit) || self.readers.iter().any(|r| r.contains(unit))
    }

    /// Opens the main unit of a parse.
    pub fn open(&mut self, unit: &str) -> bool {
        self.open_unit(unit, None)
    }

    /// Opens a unit on behalf of an import at `caller`.
    pub fn open_nested(&mut self, unit: &str, caller: PosId) -> bool {
        self.open_unit(unit, Some(caller))
    }

    fn open_unit(&mut self, unit: &str, caller: Option<PosId>) -> bool {
        let Some(lines) = self.locate(unit) else {
            log::debug!("unit '{unit}' not found");
            return false;
        };
        let id = self.intern_unit(unit);
        log::debug!("opened unit '{unit}' (depth {})", self.stack.len() + 1);
        self.stack.push(OpenUnit {
            unit: id,
            lines,
            line: 0,
            caller,
        });
        true
    }

    fn locate(&mut self, unit: &str) -> Option<Box<dyn LineReader>> {
        if let Some(lines) = self.buffers.open(unit) {
            return Some(lines);
        }
        if let Some(cur) = self.current {
            if let Some(lines) = self.readers[cur].open(unit) {
                return Some(lines);
            }
        }
        for (index, reader) in self.readers.iter_mut().enumerate() {
            if Some(index) == self.current {
                continue;
            }
            if let Some(lines) = reader.open(unit) {
                self.current = Some(index);
                return Some(lines);
            }
        }
        None
    }

    fn intern_unit(&mut self, unit: &str) -> UnitId {
        if let Some(&id) = self.unit_ids.get(unit) {
            return id;
        }
        let id = UnitId::new(self.map.units.len() as u32);
        self.map.units.push(unit.to_string());
        self.unit_ids.insert(unit.to_string(), id);
        id
    }

    /// Pulls the start of the next line of the current unit (at most `max`
    /// characters). `None` means the unit is exhausted; otherwise the flag
    /// says whether [`continue_line`](Self::continue_line) has more.
    pub fn next_line(&mut self, max: usize, out: &mut String) -> Option<bool> {
        let top = self.stack.last_mut()?;
        let more = top.lines.next_line(max, out)?;
        top.line += 1;
        Some(more)
    }

    pub fn continue_line(&mut self, max: usize, out: &mut String) -> bool {
        match self.stack.last_mut() {
            Some(top) => top.lines.continue_line(max, out),
            None => false,
        }
    }

    /// Mints a position for `column` on the current line of the current unit.
    pub fn current_position(&mut self, column: u32) -> PosId {
        let (unit, line, caller) = match self.stack.last() {
            Some(top) => (top.unit, top.line.max(1), top.caller),
            None => match self.last {
                Some((unit, line)) => (unit, line.max(1), None),
                None => {
                    debug_assert!(false, "position requested with no unit ever opened");
                    return PosId::NONE;
                }
            },
        };
        self.map.positions.alloc(SourcePosition {
            unit,
            line,
            column: column.max(1),
            caller,
        })
    }

    /// Pops the current unit. Returns `false` when nothing is left open,
    /// i.e. the end of all input.
    pub fn close_current_unit(&mut self) -> bool {
        if let Some(top) = self.stack.pop() {
            log::debug!("closed unit '{}'", self.map.unit_name(top.unit));
            self.last = Some((top.unit, top.line));
        }
        !self.stack.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn current_unit(&self) -> Option<&str> {
        self.stack.last().map(|top| self.map.unit_name(top.unit))
    }

    /// Forgets open units and starts a fresh position arena. Unit ids stay
    /// stable across parses.
    pub fn begin(&mut self) {
        self.stack.clear();
        self.last = None;
        self.map.positions = PositionArena::new();
    }

    pub fn map(&self) -> &SourceMap {
        &self.map
    }

    /// Hands the positions minted since [`begin`](Self::begin) to the caller.
    pub fn take_map(&mut self) -> SourceMap {
        SourceMap {
            units: self.map.units.clone(),
            positions: std::mem::take(&mut self.map.positions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SourceManager {
        let mut sources = SourceManager::new();
        sources.add_buffer("main", "line one\nline two");
        sources.add_buffer("lib", "lib line");
        sources
    }

    #[test]
    fn unknown_unit_is_a_plain_false() {
        let mut sources = manager();
        assert!(!sources.open("missing"));
        assert_eq!(sources.depth(), 0);
    }

    #[test]
    fn nested_units_unwind_in_order() {
        let mut sources = manager();
        assert!(sources.open("main"));

        let mut line = String::new();
        assert_eq!(sources.next_line(100, &mut line), Some(false));
        assert_eq!(line, "line one");
        let import_pos = sources.current_position(1);

        assert!(sources.open_nested("lib", import_pos));
        assert_eq!(sources.current_unit(), Some("lib"));
        line.clear();
        assert_eq!(sources.next_line(100, &mut line), Some(false));
        let inner = sources.current_position(5);
        assert_eq!(sources.map().describe(inner), "lib:1:5 (imported from main:1:1)");
        assert_eq!(sources.next_line(100, &mut line), None);
        assert!(sources.close_current_unit());

        line.clear();
        assert_eq!(sources.next_line(100, &mut line), Some(false));
        assert_eq!(line, "line two");
        let pos = sources.current_position(3);
        assert_eq!(sources.map().location(pos), "main:2:3");
        assert!(!sources.close_current_unit());
    }

    #[test]
    fn taken_map_keeps_positions() {
        let mut sources = manager();
        sources.begin();
        assert!(sources.open("main"));
        let mut line = String::new();
        sources.next_line(100, &mut line);
        let pos = sources.current_position(2);
        let map = sources.take_map();
        assert_eq!(map.location(pos), "main:1:2");
        assert!(sources.map().positions().is_empty());
    }
}
