use std::cell::OnceCell;
use std::collections::HashMap;

use serde::Serialize;

/// Sentinel for "no position".
pub const NOPOS: usize = usize::MAX;

/// Half-open byte range into a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn at(pos: usize) -> Self {
        Self { start: pos, end: pos }
    }

    pub fn none() -> Self {
        Self { start: NOPOS, end: NOPOS }
    }

    pub fn is_none(&self) -> bool {
        self.start == NOPOS
    }
}

/// Identity of a source file within one compilation context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceId(pub u32);

impl SourceId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Maps byte offsets to 1-based (line, column) pairs. Built on first use
/// and cached on the owning [`Source`].
#[derive(Debug, Clone)]
pub struct LineMap {
    starts: Vec<usize>,
}

impl LineMap {
    pub fn build(content: &str) -> Self {
        let mut starts = vec![0];
        for (i, b) in content.bytes().enumerate() {
            if b == b'\n' {
                starts.push(i + 1);
            }
        }
        LineMap { starts }
    }

    pub fn line_col(&self, pos: usize) -> (usize, usize) {
        let line = match self.starts.binary_search(&pos) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        (line + 1, pos - self.starts[line] + 1)
    }

    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.starts.get(line - 1).copied()
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }
}

/// An in-memory source file. The front-end never touches the filesystem;
/// the driver hands content in.
pub struct Source {
    pub name: String,
    pub content: String,
    pub hash: u32,
    line_map: OnceCell<LineMap>,
}

impl Source {
    fn new(name: String, content: String) -> Self {
        let hash = name
            .bytes()
            .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(b as u32));
        Source {
            name,
            content,
            hash,
            line_map: OnceCell::new(),
        }
    }

    pub fn line_map(&self) -> &LineMap {
        self.line_map.get_or_init(|| LineMap::build(&self.content))
    }

    pub fn line_col(&self, pos: usize) -> (usize, usize) {
        self.line_map().line_col(pos)
    }

    /// The full text of the line containing `pos`, without its newline.
    pub fn line_text(&self, pos: usize) -> &str {
        let (line, _) = self.line_col(pos);
        let start = self.line_map().line_start(line).unwrap_or(0);
        let rest = &self.content[start..];
        match rest.find('\n') {
            Some(off) => &rest[..off],
            None => rest,
        }
    }
}

/// Registry of the sources seen by one compilation context.
#[derive(Default)]
pub struct Sources {
    files: Vec<Source>,
}

impl Sources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, content: &str) -> SourceId {
        let id = SourceId(self.files.len() as u32);
        self.files.push(Source::new(name.to_string(), content.to_string()));
        id
    }

    pub fn get(&self, id: SourceId) -> &Source {
        &self.files[id.index()]
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Optional per-compilation-unit table of node end offsets, keyed by the
/// node's start offset. Consulted by diagnostics that need a range wider
/// than the node's own span.
#[derive(Default, Debug, Clone)]
pub struct EndPosTable {
    map: HashMap<usize, usize>,
}

impl EndPosTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&mut self, start: usize, end: usize) {
        self.map.insert(start, end);
    }

    pub fn end_pos(&self, span: Span) -> usize {
        self.map.get(&span.start).copied().unwrap_or(span.end)
    }
}
