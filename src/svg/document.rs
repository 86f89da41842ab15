//! Parsed SVG document.
//!
//! The document is kept as a flat token stream: element tags are decoded
//! into [`Tag`] so their attributes can be rewritten, everything else
//! (text, comments, declarations, end tags) is kept verbatim. Serializing
//! the stream gives back the source markup with only the edited
//! attributes changed.

use quick_xml::{
    escape::unescape,
    events::{BytesStart, Event},
    Reader, Writer,
};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;

use super::{Result, SvgError};

/// Element names that carry editable paint
pub const GRAPHICAL_TAGS: [&str; 6] = ["path", "circle", "rect", "ellipse", "polygon", "polyline"];

/// Prefix for ids synthesized for graphical elements without one
pub const SYNTHETIC_ID_PREFIX: &str = "svg-element-";

/// Attributes copied onto an outline overlay
const OUTLINE_GEOMETRY: [&str; 13] = [
    "d", "x", "y", "width", "height", "cx", "cy", "r", "rx", "ry", "points", "transform", "pathLength",
];

#[derive(Debug, Clone, PartialEq)]
struct Tag {
    /// Qualified name as written in the source
    name: String,
    /// Attributes in source order, values unescaped
    attributes: Vec<(String, String)>,
    self_closing: bool,
}

impl Tag {
    fn from_bytes(start: &BytesStart<'_>, self_closing: bool, position: u64) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| SvgError::Parse {
                position,
                reason: e.to_string(),
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let raw = String::from_utf8_lossy(&attr.value);
            let value = match unescape(&raw) {
                Ok(value) => value.into_owned(),
                Err(_) => raw.into_owned(),
            };
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            self_closing,
        })
    }

    fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn set(&mut self, key: &str, value: Option<&str>) {
        match value {
            Some(value) => match self.attributes.iter_mut().find(|(k, _)| k == key) {
                Some((_, v)) => *v = value.to_string(),
                None => self.attributes.push((key.to_string(), value.to_string())),
            },
            None => self.attributes.retain(|(k, _)| k != key),
        }
    }

    fn to_event(&self) -> Event<'_> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        if self.self_closing {
            Event::Empty(start)
        } else {
            Event::Start(start)
        }
    }
}

#[derive(Debug, Clone)]
enum Token {
    Tag(Tag),
    Verbatim(Event<'static>),
}

/// A borrowed view of one graphical element
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementRef<'a> {
    pub node: usize,
    pub tag: &'a str,
    pub id: &'a str,
}

/// Parsed SVG document with unique ids on every graphical element
#[derive(Debug, Clone)]
pub struct SvgDocument {
    tokens: Vec<Token>,
    /// Token positions of graphical elements, in document order
    graphical: Vec<usize>,
    /// Element id -> token position
    by_id: HashMap<String, usize>,
}

impl SvgDocument {
    /// Parse markup and synthesize ids for graphical elements that lack one.
    ///
    /// Synthesized ids are `svg-element-<index>`, where index counts graphical
    /// elements in document order. Ids that would collide with an existing
    /// one get a `-<n>` suffix.
    pub fn parse(markup: &str) -> Result<Self> {
        let mut reader = Reader::from_str(markup);
        let mut tokens = Vec::new();
        let mut saw_root = false;

        loop {
            let position = reader.buffer_position() as u64;
            match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(Event::Start(start)) => {
                    let tag = Tag::from_bytes(&start, false, position)?;
                    check_root(&mut saw_root, &tag)?;
                    tokens.push(Token::Tag(tag));
                }
                Ok(Event::Empty(start)) => {
                    let tag = Tag::from_bytes(&start, true, position)?;
                    check_root(&mut saw_root, &tag)?;
                    tokens.push(Token::Tag(tag));
                }
                Ok(event) => tokens.push(Token::Verbatim(event.into_owned())),
                Err(e) => {
                    return Err(SvgError::Parse {
                        position: reader.error_position() as u64,
                        reason: e.to_string(),
                    })
                }
            }
        }

        if !saw_root {
            return Err(SvgError::NoSvgRoot);
        }

        let mut document = Self {
            tokens,
            graphical: Vec::new(),
            by_id: HashMap::new(),
        };
        document.assign_ids();
        Ok(document)
    }

    fn assign_ids(&mut self) {
        let mut reserved = HashSet::new();
        let mut used = HashSet::new();

        for token in &self.tokens {
            if let Token::Tag(tag) = token {
                if let Some(id) = tag.get("id").map(str::trim).filter(|id| !id.is_empty()) {
                    reserved.insert(id.to_string());
                    if !is_graphical(tag) {
                        used.insert(id.to_string());
                    }
                }
            }
        }

        let mut index = 0usize;
        for (position, token) in self.tokens.iter_mut().enumerate() {
            let Token::Tag(tag) = token else { continue };

            if is_graphical(tag) {
                let authored = tag
                    .get("id")
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string);

                let id = match authored {
                    Some(id) if !used.contains(&id) => id,
                    Some(id) => unique_id(&id, &used, &reserved),
                    None => unique_id(&format!("{SYNTHETIC_ID_PREFIX}{index}"), &used, &reserved),
                };

                if tag.get("id") != Some(id.as_str()) {
                    tag.set("id", Some(&id));
                }
                used.insert(id.clone());
                self.graphical.push(position);
                index += 1;
            }

            if let Some(id) = tag.get("id") {
                self.by_id.entry(id.to_string()).or_insert(position);
            }
        }
    }

    /// Graphical elements in document order
    pub fn graphical_elements(&self) -> impl Iterator<Item = ElementRef<'_>> + '_ {
        self.graphical.iter().filter_map(move |&node| {
            let tag = self.tag(node)?;
            Some(ElementRef {
                node,
                tag: tag.local_name(),
                id: tag.get("id").unwrap_or_default(),
            })
        })
    }

    /// Token position of the element with this id
    pub fn node_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn attribute(&self, node: usize, name: &str) -> Option<&str> {
        self.tag(node)?.get(name)
    }

    /// Set (`Some`) or remove (`None`) an attribute. Returns false when `node` is not an element.
    pub fn set_attribute(&mut self, node: usize, name: &str, value: Option<&str>) -> bool {
        match self.tokens.get_mut(node) {
            Some(Token::Tag(tag)) => {
                tag.set(name, value);
                true
            }
            _ => false,
        }
    }

    pub fn set_attribute_by_id(&mut self, id: &str, name: &str, value: Option<&str>) -> bool {
        match self.node_of(id) {
            Some(node) => self.set_attribute(node, name, value),
            None => false,
        }
    }

    /// Serialize back to markup
    pub fn to_markup(&self) -> Result<String> {
        self.serialize(None)
    }

    /// Serialize with an outline drawn over one graphical element.
    ///
    /// The outline is a bare copy of the element's geometry, stroked in
    /// `color` and written right after the element closes. The document
    /// itself is not touched. An unknown id gives the plain markup.
    pub fn to_markup_outlined(&self, id: &str, color: &str) -> Result<String> {
        let overlay = self
            .node_of(id)
            .filter(|node| self.graphical.contains(node))
            .and_then(|node| Some((node, outline_of(self.tag(node)?, color))));
        self.serialize(overlay.as_ref().map(|(node, tag)| (*node, tag)))
    }

    fn serialize(&self, overlay: Option<(usize, &Tag)>) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        // Elements still open inside the outlined one
        let mut open: Option<usize> = None;

        for (position, token) in self.tokens.iter().enumerate() {
            let written = match token {
                Token::Tag(tag) => writer.write_event(tag.to_event()),
                Token::Verbatim(event) => writer.write_event(event.clone()),
            };
            written.map_err(|e| SvgError::Serialize(e.to_string()))?;

            let Some((node, outline)) = overlay else { continue };
            let closed = match (token, open.as_mut()) {
                (Token::Tag(tag), None) if position == node => tag.self_closing,
                (Token::Tag(tag), Some(depth)) if !tag.self_closing => {
                    *depth += 1;
                    false
                }
                (Token::Verbatim(Event::End(_)), Some(depth)) => {
                    *depth -= 1;
                    *depth == 0
                }
                _ => false,
            };
            if position == node && !closed {
                open = Some(1);
            }
            if closed {
                open = None;
                writer
                    .write_event(outline.to_event())
                    .map_err(|e| SvgError::Serialize(e.to_string()))?;
            }
        }

        String::from_utf8(writer.into_inner().into_inner())
            .map_err(|e| SvgError::Serialize(e.to_string()))
    }

    fn tag(&self, node: usize) -> Option<&Tag> {
        match self.tokens.get(node) {
            Some(Token::Tag(tag)) => Some(tag),
            _ => None,
        }
    }
}

fn is_graphical(tag: &Tag) -> bool {
    GRAPHICAL_TAGS.contains(&tag.local_name())
}

fn outline_of(tag: &Tag, color: &str) -> Tag {
    let mut attributes: Vec<(String, String)> = tag
        .attributes
        .iter()
        .filter(|(key, _)| OUTLINE_GEOMETRY.contains(&key.as_str()))
        .cloned()
        .collect();
    for (key, value) in [
        ("fill", "none"),
        ("stroke", color),
        ("stroke-width", "2"),
        ("vector-effect", "non-scaling-stroke"),
    ] {
        attributes.push((key.to_string(), value.to_string()));
    }
    Tag {
        name: tag.name.clone(),
        attributes,
        self_closing: true,
    }
}

fn check_root(saw_root: &mut bool, tag: &Tag) -> Result<()> {
    if !*saw_root {
        if tag.local_name() != "svg" {
            return Err(SvgError::NoSvgRoot);
        }
        *saw_root = true;
    }
    Ok(())
}

fn unique_id(base: &str, used: &HashSet<String>, reserved: &HashSet<String>) -> String {
    let taken = |id: &str| used.contains(id) || reserved.contains(id);
    if !taken(base) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
