// XML → field bag normalization
//
// The router answers most calls with small XML documents whose meaning lives
// in element names and attributes. Decoders downstream never see XML: they get
// a JSON-shaped tree with these conventions:
//
// - attributes become keys prefixed with `-` (`<device id="17">` → `"-id": "17"`)
// - an element with only text becomes a string, an empty element becomes `""`
// - text next to attributes or children is stored under `#text`
// - repeated sibling elements collapse into an array, in document order
// - every scalar stays a string; typing happens at the decode boundary

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};

use crate::error::Error;

/// A flattened XML element: child element names and `-attribute` keys to values.
pub type FieldBag = Map<String, Value>;

/// Key under which mixed-content text is stored.
pub const TEXT_KEY: &str = "#text";

/// Prefix marking attribute keys.
pub const ATTR_PREFIX: char = '-';

struct Frame {
    name: String,
    fields: FieldBag,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self, Error> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut fields = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::Xml(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Xml(e.to_string()))?
                .into_owned();
            fields.insert(format!("{ATTR_PREFIX}{key}"), Value::String(value));
        }
        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        let Self {
            name,
            mut fields,
            text,
        } = self;
        let value = if fields.is_empty() {
            Value::String(text)
        } else {
            if !text.is_empty() {
                fields.insert(TEXT_KEY.to_owned(), Value::String(text));
            }
            Value::Object(fields)
        };
        (name, value)
    }
}

/// Insert `value` under `key`, turning repeated keys into an array.
fn insert_child(fields: &mut FieldBag, key: String, value: Value) {
    match fields.get_mut(&key) {
        None => {
            fields.insert(key, value);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}

/// Parse an XML document into a bag keyed by its root element name.
///
/// `<devicelist version="1"><device/></devicelist>` becomes
/// `{"devicelist": {"-version": "1", "device": ""}}`.
pub fn xml_to_field_bag(bytes: &[u8]) -> Result<FieldBag, Error> {
    let text = std::str::from_utf8(bytes).map_err(|e| Error::Xml(e.to_string()))?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root = Map::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            Error::Xml(format!("at byte {}: {e}", reader.buffer_position()))
        })?;
        match event {
            Event::Start(start) => stack.push(Frame::open(&start)?),
            Event::Empty(start) => {
                let (name, value) = Frame::open(&start)?.close();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.fields, name, value),
                    None => insert_child(&mut root, name, value),
                }
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    let unescaped = t.unescape().map_err(|e| Error::Xml(e.to_string()))?;
                    top.text.push_str(&unescaped);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| Error::Xml("unbalanced closing tag".into()))?;
                let (name, value) = frame.close();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.fields, name, value),
                    None => insert_child(&mut root, name, value),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Error::Xml("unexpected end of document".into()));
    }
    if root.is_empty() {
        return Err(Error::Xml("document has no root element".into()));
    }
    Ok(root)
}

/// Parse an XML document and return the bag of its root element `root`.
pub fn root_field_bag(bytes: &[u8], root: &str) -> Result<FieldBag, Error> {
    let mut doc = xml_to_field_bag(bytes)?;
    match doc.remove(root) {
        Some(Value::Object(fields)) => Ok(fields),
        Some(Value::String(_)) => Ok(Map::new()),
        Some(other) => Err(Error::Deserialization {
            message: format!("root element <{root}> has unexpected shape"),
            body: other.to_string(),
        }),
        None => Err(Error::Deserialization {
            message: format!("missing root element <{root}>"),
            body: String::from_utf8_lossy(bytes).into_owned(),
        }),
    }
}

/// View a value that may be a single object or an array of objects as a list.
///
/// Repeated elements only become arrays when there is more than one of them,
/// so every list-shaped field needs this.
pub fn one_or_many(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::String(s)) if s.is_empty() => Vec::new(),
        Some(other) => vec![other],
    }
}
