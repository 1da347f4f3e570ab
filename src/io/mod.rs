// Purpose - inbound message surface and text conversion

pub mod converter;
pub mod message;

pub use message::{Atom, BufferEvent, Message};
