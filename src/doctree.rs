use std::collections::HashMap;

use crate::source::LineMap;

/// Closed set of doc-tree node kinds exposed to the doc-comment
/// collaborator. The core never interprets these; it only carries them
/// across the interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocTreeKind {
    DocComment,
    Author,
    Param,
    Return,
    See,
    Since,
    SerialData,
    SerialField,
    Serial,
    Throws,
    Deprecated,
    Hidden,
    Provides,
    Uses,
    Link,
    LinkPlain,
    Literal,
    Code,
    Index,
    InheritDoc,
    DocRoot,
    Value,
    Reference,
    Text,
    Comment,
    Entity,
    Identifier,
    Attribute,
    StartElement,
    EndElement,
    Erroneous,
    UnknownBlockTag,
    UnknownInlineTag,
}

/// One attached doc comment: its text and the offset of its first
/// character within the source file. Positions inside the comment are
/// comment-relative and translate through the unit's line map.
#[derive(Debug, Clone)]
pub struct DocComment {
    pub text: String,
    pub start: usize,
}

impl DocComment {
    /// Translates a comment-relative offset to (line, col) in the owning
    /// source.
    pub fn line_col(&self, offset: usize, line_map: &LineMap) -> (usize, usize) {
        line_map.line_col(self.start + offset)
    }
}

/// Per-compilation-unit table mapping a declaration's start offset to its
/// doc comment. Lookups read the stored comment; a missing entry means
/// the declaration has none.
#[derive(Debug, Default)]
pub struct DocCommentTable {
    map: HashMap<usize, DocComment>,
}

impl DocCommentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, decl_start: usize, comment: DocComment) {
        self.map.insert(decl_start, comment);
    }

    pub fn comment_for(&self, decl_start: usize) -> Option<&DocComment> {
        self.map.get(&decl_start)
    }

    pub fn text_for(&self, decl_start: usize) -> Option<&str> {
        self.map.get(&decl_start).map(|c| c.text.as_str())
    }
}
