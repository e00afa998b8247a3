pub mod decoder;
pub mod stream;

pub use decoder::{ChatStreamDecoder, DATA_PREFIX, DONE_SENTINEL, DecoderLimits, DecoderState};
pub use stream::{DeltaStream, decode};
