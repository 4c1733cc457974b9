mod manager;
mod position;
mod reader;
mod unitid;

pub use manager::{SourceManager, SourceMap};
pub use position::{BLOCK_SIZE, PosId, PositionArena, SourcePosition};
pub use reader::{
    FileReader, LineReader, SourceReader, StreamLines, StringReader, read_all_lines,
    unit_name_for,
};
pub use unitid::UnitId;
