//! Built-in session for Maya ASCII (`.ma`) scenes.
//!
//! References live in the file header as MEL statements:
//!
//! ```text
//! file -rdi 1 -ns "chair" -rfn "chairRN" -typ "mayaAscii" "Z:/projects/demo/chair.ma";
//! file -r -ns "chair" -dr 1 -rfn "chairRN" -typ "mayaAscii" "Z:/projects/demo/chair.ma";
//! ```
//!
//! The document keeps the original text untouched and only splices the
//! quoted path tokens of edited nodes back in when saving.

use std::collections::HashMap;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use super::{is_enumerable_node, SceneDocument, SceneError, SceneHost, SceneReference};
use crate::scanner::{detect_scene_format, SceneFormat};

const HEADER: &str = "//Maya ASCII";
const REFERENCE_FLAGS: [&str; 4] = ["-r", "-reference", "-rdi", "-referenceDepthInfo"];
const NODE_FLAGS: [&str; 2] = ["-rfn", "-referenceNode"];
const NAMESPACE_FLAGS: [&str; 2] = ["-ns", "-namespace"];

/// Opens `.ma` files itself; `.mb` files are refused.
#[derive(Debug, Default, Clone, Copy)]
pub struct MayaAsciiHost;

impl SceneHost for MayaAsciiHost {
    fn open(&self, path: &Path) -> Result<Box<dyn SceneDocument>, SceneError> {
        if detect_scene_format(path) == Some(SceneFormat::Binary) {
            return Err(SceneError::UnsupportedFormat {
                path: path.to_path_buf(),
                message: "binary scene documents need an external host".to_string(),
            });
        }
        Ok(Box::new(MayaAsciiDocument::load(path)?))
    }
}

#[derive(Debug, Clone)]
struct ReferenceStatement {
    node: String,
    /// Quoted path token, quotes included
    span: Range<usize>,
    path: String,
    /// `-r` (load) rather than `-rdi` (depth info)
    loads_reference: bool,
}

#[derive(Debug)]
pub struct MayaAsciiDocument {
    path: PathBuf,
    source: String,
    statements: Vec<ReferenceStatement>,
    edits: HashMap<String, String>,
}

impl MayaAsciiDocument {
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let bytes = fs::read(path).map_err(|e| SceneError::Load {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if bytes.starts_with(b"FOR4") || bytes.starts_with(b"FOR8") {
            return Err(SceneError::UnsupportedFormat {
                path: path.to_path_buf(),
                message: "file holds a binary scene despite its extension".to_string(),
            });
        }

        let source = String::from_utf8(bytes).map_err(|_| SceneError::Load {
            path: path.to_path_buf(),
            message: "file is not valid UTF-8 text".to_string(),
        })?;

        Self::from_source(path, source)
    }

    /// Parse an in-memory scene; `path` is only used for reporting and as
    /// the default save location.
    pub fn from_source(path: &Path, source: String) -> Result<Self, SceneError> {
        let load_error = |message: String| SceneError::Load {
            path: path.to_path_buf(),
            message,
        };

        if !source.trim_start_matches('\u{feff}').starts_with(HEADER) {
            return Err(load_error(format!("missing `{}` header", HEADER)));
        }

        let statements = parse_reference_statements(&source).map_err(load_error)?;

        Ok(Self {
            path: path.to_path_buf(),
            source,
            statements,
            edits: HashMap::new(),
        })
    }

    /// Current text of the document with pending edits applied.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;

        for statement in &self.statements {
            let Some(new_path) = self.edits.get(&statement.node) else {
                continue;
            };
            out.push_str(&self.source[cursor..statement.span.start]);
            out.push('"');
            out.push_str(&escape(new_path));
            out.push('"');
            cursor = statement.span.end;
        }

        out.push_str(&self.source[cursor..]);
        out
    }

    fn current_path<'a>(&'a self, statement: &'a ReferenceStatement) -> &'a str {
        self.edits
            .get(&statement.node)
            .map(String::as_str)
            .unwrap_or(&statement.path)
    }
}

impl SceneDocument for MayaAsciiDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn references(&self) -> Vec<SceneReference> {
        let mut order: Vec<&str> = Vec::new();
        let mut primary: HashMap<&str, &ReferenceStatement> = HashMap::new();

        for statement in &self.statements {
            match primary.get(statement.node.as_str()) {
                None => {
                    order.push(&statement.node);
                    primary.insert(&statement.node, statement);
                }
                Some(existing) if !existing.loads_reference && statement.loads_reference => {
                    primary.insert(&statement.node, statement);
                }
                Some(_) => {}
            }
        }

        order
            .into_iter()
            .filter(|node| is_enumerable_node(node))
            .filter_map(|node| {
                primary.get(node).map(|statement| SceneReference {
                    node: node.to_string(),
                    path: self.current_path(statement).to_string(),
                })
            })
            .collect()
    }

    fn set_reference_path(&mut self, node: &str, path: &str) -> Result<(), SceneError> {
        if !self.statements.iter().any(|s| s.node == node) {
            return Err(SceneError::UnknownNode(node.to_string()));
        }
        if path.is_empty() {
            return Err(SceneError::RejectedPath {
                node: node.to_string(),
                reason: "empty path".to_string(),
            });
        }
        if path.chars().any(char::is_control) {
            return Err(SceneError::RejectedPath {
                node: node.to_string(),
                reason: "path contains control characters".to_string(),
            });
        }

        self.edits.insert(node.to_string(), path.to_string());
        Ok(())
    }

    fn is_modified(&self) -> bool {
        self.statements
            .iter()
            .any(|s| self.edits.get(&s.node).is_some_and(|p| *p != s.path))
    }

    fn save_as(&mut self, target: &Path) -> Result<(), SceneError> {
        let content = self.render();
        let save_error = |source| SceneError::Save {
            path: target.to_path_buf(),
            source,
        };

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let staging = target.with_file_name(format!(".{}.refrepath-tmp", file_name));

        fs::write(&staging, &content).map_err(save_error)?;
        if let Err(e) = fs::rename(&staging, target) {
            let _ = fs::remove_file(&staging);
            return Err(save_error(e));
        }

        self.statements = parse_reference_statements(&content).map_err(|message| {
            SceneError::Load {
                path: target.to_path_buf(),
                message,
            }
        })?;
        self.source = content;
        self.path = target.to_path_buf();
        self.edits.clear();
        Ok(())
    }
}

#[derive(Debug)]
struct Token {
    text: String,
    span: Range<usize>,
    quoted: bool,
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn line(&self, at: usize) -> usize {
        self.src[..at].matches('\n').count() + 1
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }
    }

    /// Read a quoted string; the cursor sits on the opening quote.
    fn quoted(&mut self) -> Result<Token, String> {
        let start = self.pos;
        self.bump();
        let mut text = String::new();

        loop {
            match self.bump() {
                Some('"') => {
                    return Ok(Token {
                        text,
                        span: start..self.pos,
                        quoted: true,
                    })
                }
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(c) => text.push(c),
                    None => break,
                },
                Some(c) => text.push(c),
                None => break,
            }
        }

        Err(format!("unterminated string starting on line {}", self.line(start)))
    }

    fn word(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == ';' || c == '"' {
                break;
            }
            self.bump();
        }
        Token {
            text: self.src[start..self.pos].to_string(),
            span: start..self.pos,
            quoted: false,
        }
    }

    /// Read tokens up to and including the terminating `;`. Tokens after
    /// the first are only kept when `keep` accepts the first one.
    fn statement(&mut self, keep: impl Fn(&Token) -> bool) -> Result<Vec<Token>, String> {
        let start = self.pos;
        let mut tokens: Vec<Token> = Vec::new();
        let mut keeping = true;

        loop {
            match self.peek() {
                None => {
                    return Err(format!(
                        "statement starting on line {} is not terminated",
                        self.line(start)
                    ))
                }
                Some(';') => {
                    self.bump();
                    return Ok(tokens);
                }
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('"') => {
                    let token = self.quoted()?;
                    if keeping {
                        tokens.push(token);
                    }
                }
                Some(_) => {
                    let token = self.word();
                    if keeping {
                        tokens.push(token);
                    }
                }
            }

            if tokens.len() == 1 && keeping && !keep(&tokens[0]) {
                keeping = false;
                tokens.clear();
            }
        }
    }
}

fn parse_reference_statements(source: &str) -> Result<Vec<ReferenceStatement>, String> {
    let mut cursor = Cursor { src: source, pos: 0 };
    let mut statements = Vec::new();

    while let Some(c) = cursor.peek() {
        if c.is_whitespace() || c == '\u{feff}' {
            cursor.bump();
            continue;
        }
        if source[cursor.pos..].starts_with("//") {
            cursor.skip_line();
            continue;
        }

        let tokens = cursor.statement(|first| !first.quoted && first.text == "file")?;
        if let Some(statement) = reference_statement(&tokens) {
            statements.push(statement);
        }
    }

    Ok(statements)
}

fn flag_value<'a>(tokens: &'a [Token], flags: &[&str]) -> Option<&'a str> {
    tokens
        .windows(2)
        .find(|pair| !pair[0].quoted && flags.contains(&pair[0].text.as_str()))
        .map(|pair| pair[1].text.as_str())
}

fn reference_statement(tokens: &[Token]) -> Option<ReferenceStatement> {
    let first = tokens.first()?;
    if first.quoted || first.text != "file" {
        return None;
    }

    let is_flag = |t: &Token, name: &str| !t.quoted && t.text == name;
    let loads_reference = tokens.iter().any(|t| is_flag(t, "-r") || is_flag(t, "-reference"));
    let is_reference = tokens
        .iter()
        .any(|t| REFERENCE_FLAGS.iter().any(|flag| is_flag(t, flag)));
    if !is_reference {
        return None;
    }

    let path_token = tokens.last().filter(|t| t.quoted && tokens.len() > 1)?;

    let node = flag_value(tokens, &NODE_FLAGS)
        .map(str::to_string)
        .or_else(|| flag_value(tokens, &NAMESPACE_FLAGS).map(|ns| format!("{}RN", ns)))
        .unwrap_or_else(|| path_token.text.clone());

    Some(ReferenceStatement {
        node,
        span: path_token.span.clone(),
        path: path_token.text.clone(),
        loads_reference,
    })
}

fn escape(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out
}
