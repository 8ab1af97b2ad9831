pub mod assembler;
pub mod display;
pub mod error;
pub mod graphics;
pub mod imaging;
pub mod read_string;
pub mod session;

pub use assembler::{AssembledResult, ResultAssembler, ResultSnapshot, TextEntry};
pub use display::{DisplaySink, DisplayState};
pub use error::AssembleError;
pub use session::{DeviceSession, SessionError, SessionStatus, SystemDiscoverer};
