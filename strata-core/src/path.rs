//! Dotted/bracketed paths into JSON object graphs.
//!
//! `owner.address.city`, `tags[0]`, `meta["content-type"]` and
//! `rows[2].cells['a.b']` are all valid paths. A bracketed integer indexes
//! an array, or names a key when the container is an object.

use serde_json::Value;
use smallvec::SmallVec;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

type Segments = SmallVec<[Segment; 4]>;

fn parse(path: &str) -> Option<Segments> {
    let mut segments = Segments::new();
    let mut chars = path.chars().peekable();
    let mut key = String::new();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !key.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut key)));
                }
            }
            '[' => {
                if !key.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut key)));
                }
                let mut inner = String::new();
                let quote = match chars.peek() {
                    Some(&q) if q == '"' || q == '\'' => {
                        chars.next();
                        Some(q)
                    }
                    _ => None,
                };
                loop {
                    match (chars.next()?, quote) {
                        (c, Some(q)) if c == q => {
                            if chars.next()? != ']' {
                                return None;
                            }
                            segments.push(Segment::Key(inner));
                            break;
                        }
                        (']', None) => {
                            let trimmed = inner.trim();
                            let segment = match trimmed.parse::<usize>() {
                                Ok(index) => Segment::Index(index),
                                Err(_) => Segment::Key(trimmed.to_string()),
                            };
                            segments.push(segment);
                            break;
                        }
                        (c, _) => inner.push(c),
                    }
                }
            }
            c => key.push(c),
        }
    }
    if !key.is_empty() {
        segments.push(Segment::Key(key));
    }

    (!segments.is_empty()).then_some(segments)
}

fn step<'a>(value: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match (value, segment) {
        (Value::Object(map), Segment::Key(key)) => map.get(key),
        (Value::Object(map), Segment::Index(index)) => map.get(&index.to_string()),
        (Value::Array(items), Segment::Index(index)) => items.get(*index),
        _ => None,
    }
}

fn step_mut<'a>(value: &'a mut Value, segment: &Segment) -> Option<&'a mut Value> {
    match (value, segment) {
        (Value::Object(map), Segment::Key(key)) => map.get_mut(key),
        (Value::Object(map), Segment::Index(index)) => map.get_mut(&index.to_string()),
        (Value::Array(items), Segment::Index(index)) => items.get_mut(*index),
        _ => None,
    }
}

/// Read the value at `path`. Any missing segment yields `None`.
pub fn nested_property<'a>(object: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = parse(path)?;
    segments.iter().try_fold(object, step)
}

/// Replace the value at `path`, but only if the final container and key
/// already exist. Returns the value found at `path` afterwards, so a
/// write that could not land behaves like [`nested_property`].
pub fn set_nested_property(object: &mut Value, path: &str, value: Value) -> Option<Value> {
    let segments = parse(path)?;
    let (last, parents) = segments.split_last()?;

    let mut parent = &mut *object;
    for segment in parents {
        parent = step_mut(parent, segment)?;
    }
    if let Some(slot) = step_mut(parent, last) {
        *slot = value;
    }
    step(parent, last).cloned()
}
