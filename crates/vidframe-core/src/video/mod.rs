pub mod decoder;
pub mod frame;

pub use frame::VideoFrame;
