pub mod landmark;
pub mod sequence;

pub use landmark::{Landmark, LandmarkId, Pose};
pub use sequence::{Frame, FrameRecord, PoseSequence, SequenceRecord};
