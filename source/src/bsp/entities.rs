use std::fmt;

use super::{BspError, BspResult};

/// The entity lump: a text block of `{ "key" "value" ... }` entries.
///
/// Parsing is lazy. [`Entities::iter`] walks the text from the start every time it is
/// called, so the sequence can be restarted freely.
#[derive(Clone, Default)]
pub struct Entities {
    text: Box<[u8]>,
}

impl fmt::Debug for Entities {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl Entities {
    pub fn new(text: impl Into<Box<[u8]>>) -> Self {
        Self { text: text.into() }
    }

    pub fn iter(&self) -> EntityIter<'_> {
        EntityIter {
            text: &self.text,
            pos: 0,
            failed: false,
        }
    }

    /// Parse every entity, failing on the first malformed block.
    pub fn parse_all(&self) -> BspResult<Vec<Entity>> {
        self.iter().collect()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.text
    }
}

/// One entity block. Pairs are kept in file order, repeated keys included
/// (entity outputs use the same key many times).
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Entity {
    /// Byte offset of the block's opening brace within the lump
    pub offset: usize,
    pairs: Vec<(String, String)>,
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map()
            .entries(self.pairs.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl Entity {
    pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            offset: 0,
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value of the last pair with this key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn classname(&self) -> Option<&str> {
        self.get("classname")
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.pairs
    }

    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.pairs.clone()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    OutsideBlock,
    InsideBlock,
    /// Key read, waiting for its value
    AfterKey,
}

pub struct EntityIter<'a> {
    text: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> EntityIter<'a> {
    fn malformed(&mut self, offset: usize, reason: &'static str) -> BspError {
        self.failed = true;
        BspError::MalformedEntityBlock { offset, reason }
    }

    /// Read a quoted string starting at the opening quote under the cursor.
    /// Strings never span lines, so a newline before the closing quote leaves it unterminated.
    fn read_quoted(&mut self) -> BspResult<String> {
        let (text, start) = (self.text, self.pos);
        let body = &text[start + 1..];
        let len = match body.iter().position(|&b| b == b'"' || b == b'\n') {
            Some(len) if body[len] == b'"' => len,
            _ => return Err(self.malformed(start, "unterminated string")),
        };
        self.pos = start + 1 + len + 1;
        Ok(String::from_utf8_lossy(&body[..len]).into_owned())
    }

    fn next_block(&mut self) -> Option<BspResult<Entity>> {
        let mut state = State::OutsideBlock;
        let mut entity = Entity::default();
        let mut key = String::new();

        while let Some(&b) = self.text.get(self.pos) {
            if b.is_ascii_whitespace() || b == 0 {
                self.pos += 1;
                continue;
            }
            match (state, b) {
                (State::OutsideBlock, b'{') => {
                    entity.offset = self.pos;
                    state = State::InsideBlock;
                    self.pos += 1;
                }
                (State::OutsideBlock, _) => {
                    return Some(Err(self.malformed(self.pos, "expected '{'")));
                }
                (State::InsideBlock, b'}') => {
                    self.pos += 1;
                    return Some(Ok(entity));
                }
                (State::InsideBlock, b'"') => match self.read_quoted() {
                    Ok(k) => {
                        key = k;
                        state = State::AfterKey;
                    }
                    Err(e) => return Some(Err(e)),
                },
                (State::AfterKey, b'"') => match self.read_quoted() {
                    Ok(value) => {
                        entity.pairs.push((std::mem::take(&mut key), value));
                        state = State::InsideBlock;
                    }
                    Err(e) => return Some(Err(e)),
                },
                (State::AfterKey, b'}') => {
                    return Some(Err(self.malformed(self.pos, "key without a value")));
                }
                (_, _) => {
                    return Some(Err(self.malformed(self.pos, "expected a quoted string")));
                }
            }
        }

        match state {
            State::OutsideBlock => None,
            _ => Some(Err(self.malformed(entity.offset, "block is never closed"))),
        }
    }
}

impl<'a> Iterator for EntityIter<'a> {
    type Item = BspResult<Entity>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        self.next_block()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = r#"{
"world_maxs" "1024 1024 512"
"classname" "worldspawn"
}
{
"origin" "0 0 64"
"classname" "light"
"_light" "255 255 255 200"
}
{
"OnTrigger" "door,Open,,0,-1"
"OnTrigger" "door,Close,,5,-1"
}
"#;

    #[test]
    fn parses_blocks_in_order() {
        let entities = Entities::new(format!("{TEXT}\0").into_bytes());
        let parsed = entities.parse_all().unwrap();

        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].classname(), Some("worldspawn"));
        assert_eq!(parsed[1].get("_light"), Some("255 255 255 200"));
        assert_eq!(parsed[1].offset, TEXT.find("{\n\"origin").unwrap());

        // no classname is still data
        assert_eq!(parsed[2].classname(), None);
        assert_eq!(parsed[2].len(), 2);
        assert_eq!(parsed[2].get("OnTrigger"), Some("door,Close,,5,-1"));
    }

    #[test]
    fn iteration_restarts() {
        let entities = Entities::new(TEXT.as_bytes());
        assert_eq!(entities.iter().count(), 3);
        let first = entities.iter().next().unwrap().unwrap();
        assert_eq!(first.classname(), Some("worldspawn"));
    }

    #[test]
    fn unterminated_string_reports_offset() {
        let text = "{\n\"classname\" \"light\"\n}\n{\n\"origin\" \"0 0 0\n}";
        let quote = text.rfind("\"0 0 0").unwrap();
        let entities = Entities::new(text.as_bytes());
        let mut iter = entities.iter();

        assert!(iter.next().unwrap().is_ok());
        match iter.next() {
            Some(Err(BspError::MalformedEntityBlock { offset, .. })) => assert_eq!(offset, quote),
            other => panic!("expected a malformed block, got {other:?}"),
        }
        assert!(iter.next().is_none());

        // an unterminated value followed by more blocks
        let text = "{\"origin\" \"0 0 0\n}\n{\"classname\" \"light\"}";
        let quote = text.find("\"0 0 0").unwrap();
        match Entities::new(text.as_bytes()).parse_all() {
            Err(BspError::MalformedEntityBlock { offset, reason }) => {
                assert_eq!(offset, quote);
                assert_eq!(reason, "unterminated string");
            }
            other => panic!("expected a malformed block, got {other:?}"),
        }
    }

    #[test]
    fn structural_faults() {
        let cases = [
            ("x{}", 0),
            ("{\"classname\"}", 12),
            ("{\"a\" \"b\" c}", 9),
            ("\n{\"a\" \"b\"", 1),
        ];
        for (text, expected) in cases {
            match Entities::new(text.as_bytes()).parse_all() {
                Err(BspError::MalformedEntityBlock { offset, .. }) => {
                    assert_eq!(offset, expected, "{text:?}")
                }
                other => panic!("{text:?} parsed as {other:?}"),
            }
        }
    }

    #[test]
    fn empty_lump() {
        assert_eq!(Entities::new(&b"\0"[..]).iter().count(), 0);
        assert_eq!(Entities::default().iter().count(), 0);
    }
}
