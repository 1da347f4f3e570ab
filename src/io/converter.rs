use crate::{
    error::CurveError,
    io::message::{Atom, BufferEvent, Message},
};

/// Parse one whitespace-separated token. Anything numeric becomes a float.
pub fn parse_atom(token: &str) -> Atom {
    match token.parse::<f32>() {
        Ok(value) => Atom::Float(value),
        Err(_) => Atom::Symbol(token.to_owned()),
    }
}

/// Parse a textual message such as `set env`, `list 0 100 0 1 100 0`,
/// `curve -0.5` or a bare number list.
pub fn parse_message(line: &str) -> Result<Message, CurveError> {
    let mut tokens = line.split_whitespace();
    let Some(head) = tokens.next() else {
        return Err(CurveError::Parse("empty message".into()));
    };
    let rest: Vec<Atom> = tokens.map(parse_atom).collect();

    match parse_atom(head) {
        Atom::Float(value) if rest.is_empty() => Ok(Message::Float(value)),
        first @ Atom::Float(_) => {
            let mut atoms = Vec::with_capacity(rest.len() + 1);
            atoms.push(first);
            atoms.extend(rest);
            Ok(Message::List(atoms))
        }
        Atom::Symbol(selector) => match selector.as_str() {
            "set" => Ok(Message::Set(rest)),
            "list" => Ok(Message::List(rest)),
            "float" => single_float(&selector, &rest).map(Message::Float),
            "curve" => single_float(&selector, &rest).map(Message::Curve),
            "notify" => match rest.first().and_then(Atom::as_symbol) {
                Some("modified") | Some("buffer_modified") => {
                    Ok(Message::Notify(BufferEvent::Modified))
                }
                Some("rebound") | Some("globalsymbol_binding") => {
                    Ok(Message::Notify(BufferEvent::Rebound))
                }
                _ => Err(CurveError::Parse(format!("unknown notification in '{line}'"))),
            },
            _ => Err(CurveError::UnknownMessage { selector }),
        },
        Atom::Int(_) => Err(CurveError::Parse(format!("unexpected integer in '{line}'"))),
    }
}

fn single_float(selector: &str, rest: &[Atom]) -> Result<f32, CurveError> {
    match rest {
        [Atom::Float(value)] => Ok(*value),
        _ => Err(CurveError::Parse(format!("'{selector}' takes one number"))),
    }
}
