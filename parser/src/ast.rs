//! Token and block tree types.

/// Source location information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset just past the last character.
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

/// Token types.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A whitespace-delimited word, with any trailing `;` removed.
    Word(String),
    /// A `;` closing the innermost open block.
    Terminator,
}

/// A token with its span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn word(text: impl Into<String>, span: Span) -> Self {
        Self {
            kind: TokenKind::Word(text.into()),
            span,
        }
    }

    pub fn terminator(span: Span) -> Self {
        Self {
            kind: TokenKind::Terminator,
            span,
        }
    }

    /// The word text, or `None` for a terminator.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Word(w) => Some(w),
            TokenKind::Terminator => None,
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self.kind, TokenKind::Terminator)
    }

    /// True if this is a `;` written directly after `word`, with no separator.
    pub fn terminates(&self, word: Span) -> bool {
        self.is_terminator() && self.span.start == word.end
    }
}

/// A child of a block: either a word or a nested block.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Word(Token),
    Block(Block),
}

impl Node {
    /// The word text, if this node is a word.
    pub fn word(&self) -> Option<&str> {
        match self {
            Node::Word(t) => t.text(),
            Node::Block(_) => None,
        }
    }

    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Node::Word(_) => None,
            Node::Block(b) => Some(b),
        }
    }

    /// Position used when reporting an error about this node.
    pub fn span(&self) -> Span {
        match self {
            Node::Word(t) => t.span,
            Node::Block(b) => b.span(),
        }
    }
}

/// An ordered sequence of words and nested blocks.
///
/// Every block except the root was opened by a keyword; `opener` records
/// where that keyword sits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub opener: Option<Span>,
    pub children: Vec<Node>,
}

impl Block {
    /// Create the top-level block.
    pub fn root() -> Self {
        Self::default()
    }

    /// Create a block opened by the keyword at `span`.
    pub fn opened_at(span: Span) -> Self {
        Self {
            opener: Some(span),
            children: Vec::new(),
        }
    }

    /// Take the children out of the block.
    pub fn into_children(mut self) -> Vec<Node> {
        std::mem::take(&mut self.children)
    }

    pub fn push(&mut self, node: Node) {
        self.children.push(node);
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Position of the first child, falling back to the opening keyword.
    pub fn span(&self) -> Span {
        self.children
            .first()
            .map(Node::span)
            .or(self.opener)
            .unwrap_or_default()
    }
}

// Nesting depth is bounded only by the input, so the tree is torn down
// with an explicit stack instead of recursive drops.
impl Drop for Block {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(node) = pending.pop() {
            if let Node::Block(mut block) = node {
                pending.append(&mut block.children);
            }
        }
    }
}
