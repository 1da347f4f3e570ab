use std::fmt;

/// One element of an inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Float(f32),
    Int(i64),
    Symbol(String),
}

impl Atom {
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Atom::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Atom::Symbol(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Float(v) => write!(f, "{v}"),
            Atom::Int(v) => write!(f, "{v}"),
            Atom::Symbol(s) => f.write_str(s),
        }
    }
}

impl From<f32> for Atom {
    fn from(value: f32) -> Self {
        Atom::Float(value)
    }
}

impl From<i64> for Atom {
    fn from(value: i64) -> Self {
        Atom::Int(value)
    }
}

impl From<&str> for Atom {
    fn from(value: &str) -> Self {
        Atom::Symbol(value.to_owned())
    }
}

/// Notifications sent by the buffer object the writer is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferEvent {
    /// Contents or size changed.
    Modified,
    /// The name now points at a different buffer.
    Rebound,
}

/// Inbound message surface of a [`CurveWriter`](crate::writer::CurveWriter).
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// `set <name>`: rebind the destination buffer.
    Set(Vec<Atom>),
    /// `list n1 n2 ...`: compile and render a curve.
    List(Vec<Atom>),
    /// A bare number. Rejected; the writer wants lists.
    Float(f32),
    /// `curve <bias>`: curvature for trailing partial segments.
    Curve(f32),
    Notify(BufferEvent),
}

impl Message {
    /// Convenience constructor for a list of floats.
    pub fn list(values: &[f32]) -> Self {
        Message::List(values.iter().copied().map(Atom::Float).collect())
    }

    pub fn set(name: &str) -> Self {
        Message::Set(vec![Atom::from(name)])
    }
}
