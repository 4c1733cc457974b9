//! Immutable source positions, minted once and shared by every AST node
//! that refers to them.

use super::UnitId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Positions per arena block.
pub const BLOCK_SIZE: usize = 512;

/// Handle to a [`SourcePosition`] inside a [`PositionArena`].
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PosId(u32);

impl PosId {
    /// Placeholder for nodes synthesized without a source location.
    pub const NONE: PosId = PosId(u32::MAX);

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

impl fmt::Display for PosId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePosition {
    pub unit: UnitId,
    /// 1-based.
    pub line: u32,
    /// 1-based.
    pub column: u32,
    /// Position of the `import` that pulled this unit in, if any.
    pub caller: Option<PosId>,
}

/// Bulk-lifetime store for positions. Blocks never move once allocated, and
/// positions are never changed or reused after they are issued.
#[derive(Debug, Default)]
pub struct PositionArena {
    blocks: Vec<Vec<SourcePosition>>,
    len: usize,
}

impl PositionArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, pos: SourcePosition) -> PosId {
        if self.blocks.last().is_none_or(|b| b.len() == BLOCK_SIZE) {
            self.blocks.push(Vec::with_capacity(BLOCK_SIZE));
        }
        let id = PosId(self.len as u32);
        if let Some(block) = self.blocks.last_mut() {
            block.push(pos);
        }
        self.len += 1;
        id
    }

    pub fn get(&self, id: PosId) -> Option<&SourcePosition> {
        if id.is_none() {
            return None;
        }
        let index = id.index();
        self.blocks
            .get(index / BLOCK_SIZE)
            .and_then(|block| block.get(index % BLOCK_SIZE))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: u32) -> SourcePosition {
        SourcePosition {
            unit: UnitId::new(0),
            line,
            column: 1,
            caller: None,
        }
    }

    #[test]
    fn handles_stay_valid_across_blocks() {
        let mut arena = PositionArena::new();
        let ids: Vec<PosId> = (0..1200).map(|i| arena.alloc(at(i + 1))).collect();

        assert_eq!(arena.block_count(), 3);
        assert_eq!(arena.get(ids[0]).map(|p| p.line), Some(1));
        assert_eq!(arena.get(ids[511]).map(|p| p.line), Some(512));
        assert_eq!(arena.get(ids[512]).map(|p| p.line), Some(513));
        assert_eq!(arena.get(ids[1199]).map(|p| p.line), Some(1200));
    }

    #[test]
    fn out_of_range_handles_are_rejected() {
        let mut arena = PositionArena::new();
        arena.alloc(at(1));
        assert!(arena.get(PosId(7)).is_none());
        assert!(arena.get(PosId::NONE).is_none());
    }
}
