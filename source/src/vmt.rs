//! Valve material (`.vmt`) files.
//!
//! A material is a KeyValues text block: a shader name followed by a `{ }` block of
//! parameters. Nested blocks (proxies, `>=dx90` fallbacks) are noted but not merged.

use ahash::AHashMap;
use thiserror::Error;

/// Parameters whose value names a texture.
pub const TEXTURE_PARAMS: [&str; 11] = [
    "$basetexture",
    "$basetexture2",
    "$bumpmap",
    "$bumpmap2",
    "$normalmap",
    "$detail",
    "$envmapmask",
    "$blendmodulatetexture",
    "$selfillummask",
    "$phongexponenttexture",
    "$lightwarptexture",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VMTError {
    #[error("material ends inside a block")]
    UnexpectedEnd,
    #[error("unterminated string at byte {0}")]
    UnterminatedString(usize),
    #[error("material has no shader")]
    MissingShader,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Open,
    Close,
    Text(&'a str),
}

struct Tokens<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    fn skip_trivia(&mut self) {
        loop {
            let rest = &self.source[self.pos..];
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();
            if !trimmed.starts_with("//") {
                return;
            }
            self.pos += trimmed.find('\n').unwrap_or(trimmed.len());
        }
    }

    fn next(&mut self) -> Result<Option<Token<'a>>, VMTError> {
        loop {
            self.skip_trivia();
            let source = self.source;
            let rest = &source[self.pos..];
            let Some(c) = rest.chars().next() else {
                return Ok(None);
            };

            let token = match c {
                '{' => {
                    self.pos += 1;
                    Token::Open
                }
                '}' => {
                    self.pos += 1;
                    Token::Close
                }
                '"' => {
                    let Some(len) = rest[1..].find('"') else {
                        return Err(VMTError::UnterminatedString(self.pos));
                    };
                    self.pos += len + 2;
                    Token::Text(&rest[1..1 + len])
                }
                _ => {
                    let len = rest
                        .find(|c: char| c.is_whitespace() || matches!(c, '"' | '{' | '}'))
                        .unwrap_or(rest.len());
                    self.pos += len;
                    Token::Text(&rest[..len])
                }
            };

            // platform conditions such as `[$WIN32]` trail a key or value
            match token {
                Token::Text(text) if text.starts_with('[') && text.ends_with(']') => continue,
                token => return Ok(Some(token)),
            }
        }
    }

    fn expect(&mut self) -> Result<Token<'a>, VMTError> {
        self.next()?.ok_or(VMTError::UnexpectedEnd)
    }
}

#[derive(Debug, Clone, Default)]
pub struct VMT {
    /// Lower-cased shader name
    pub shader: String,
    pub source: String,
    /// Top level parameters, keys lower-cased
    pub data: AHashMap<String, String>,
    /// Names of nested blocks, in file order
    pub blocks: Vec<String>,
}

impl VMT {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VMTError> {
        Self::from_string(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn from_string(source: String) -> Result<Self, VMTError> {
        let source = source.trim_start_matches('\u{feff}').to_owned();
        let mut tokens = Tokens::new(&source);

        let shader = match tokens.next()? {
            Some(Token::Text(shader)) if !shader.is_empty() => shader.to_ascii_lowercase(),
            _ => return Err(VMTError::MissingShader),
        };
        if tokens.expect()? != Token::Open {
            return Err(VMTError::MissingShader);
        }

        let mut data = AHashMap::new();
        let mut blocks = Vec::new();

        loop {
            let key = match tokens.expect()? {
                Token::Close => break,
                Token::Open => {
                    skip_block(&mut tokens)?;
                    continue;
                }
                Token::Text(key) => key,
            };
            match tokens.expect()? {
                Token::Text(value) => {
                    data.insert(key.to_ascii_lowercase(), value.to_owned());
                }
                Token::Open => {
                    blocks.push(key.to_owned());
                    skip_block(&mut tokens)?;
                }
                Token::Close => {
                    log::debug!("{shader}: parameter {key:?} has no value");
                    break;
                }
            }
        }

        Ok(Self {
            shader,
            data,
            blocks,
            source,
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    /// Texture parameters present in this material, with their texture paths (forward slashes).
    pub fn textures(&self) -> Vec<(&'static str, String)> {
        TEXTURE_PARAMS
            .iter()
            .filter_map(|&param| {
                let value = self.get(param)?.trim();
                (!value.is_empty()).then(|| (param, value.replace('\\', "/")))
            })
            .collect()
    }
}

/// Skip the rest of a block whose opening brace has been read.
fn skip_block(tokens: &mut Tokens) -> Result<(), VMTError> {
    let mut depth = 1;
    while depth > 0 {
        match tokens.expect()? {
            Token::Open => depth += 1,
            Token::Close => depth -= 1,
            Token::Text(_) => (),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BRICK: &str = r#"// brick wall
"LightmappedGeneric"
{
	"$basetexture" "brick\brick01"
	"$bumpmap" "brick/brick01_normal"
	$surfaceprop brick
	"$detail" "" // empty
	"%keywords" "[$X360] stone"
	"Proxies"
	{
		"AnimatedTexture" { "animatedtexturevar" "$basetexture" }
	}
	">=dx90"
	{
		"$basetexture" "brick/brick01_hdr"
	}
	"$EnvMapMask" "brick/brick01_mask" [$WIN32]
}
"#;

    #[test]
    fn parses_top_level_block() {
        let vmt = VMT::from_string(BRICK.to_owned()).unwrap();

        assert_eq!(vmt.shader, "lightmappedgeneric");
        assert_eq!(vmt.get("$surfaceprop"), Some("brick"));
        assert_eq!(vmt.get("$BaseTexture"), Some("brick\\brick01"));
        assert_eq!(vmt.blocks, vec!["Proxies".to_owned(), ">=dx90".to_owned()]);
        assert_eq!(vmt.get("%keywords"), Some("[$X360] stone"));
    }

    #[test]
    fn lists_texture_parameters() {
        let vmt = VMT::from_string(BRICK.to_owned()).unwrap();
        assert_eq!(
            vmt.textures(),
            vec![
                ("$basetexture", "brick/brick01".to_owned()),
                ("$bumpmap", "brick/brick01_normal".to_owned()),
                ("$envmapmask", "brick/brick01_mask".to_owned()),
            ]
        );
    }

    #[test]
    fn errors() {
        let parse = |text: &str| VMT::from_string(text.to_owned()).unwrap_err();

        assert_eq!(parse(""), VMTError::MissingShader);
        assert_eq!(parse("{ }"), VMTError::MissingShader);
        assert_eq!(
            parse("\"VertexLitGeneric\" { \"$basetexture\" "),
            VMTError::UnexpectedEnd
        );
        assert_eq!(
            parse("Water { \"$normalmap\" \"dev/water"),
            VMTError::UnterminatedString(21)
        );
    }

    #[test]
    fn bare_tokens_and_bytes() {
        let vmt = VMT::from_bytes(b"UnlitGeneric{$basetexture dev/white}").unwrap();
        assert_eq!(vmt.shader, "unlitgeneric");
        assert_eq!(vmt.textures(), vec![("$basetexture", "dev/white".to_owned())]);
    }
}
