pub mod matcher;
pub mod table;
pub mod track;

pub use table::{FrameOutcome, TrackTable};
pub use track::{Track, TrackLabel};
