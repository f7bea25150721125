//! Block building.
//!
//! A block-opening keyword (`macro`, `tag`, `cap`, and the actions) starts a
//! nested block right after itself; the block collects every following
//! statement until a `;` closes it. A keyword that carries its own `;`
//! (`accept;`) opens nothing and the `;` closes the enclosing block instead.
//! A `;` standing alone (`accept ;`) is not attached to the keyword.

use crate::{Block, Node, Token, TokenKind};
use rulec_core::tables::is_block_keyword;

/// Build the block tree for a token stream.
pub fn build_blocks(tokens: Vec<Token>) -> Block {
    let mut builder = BlockBuilder::new();
    let mut tokens = tokens.into_iter().peekable();

    while let Some(token) = tokens.next() {
        let opens = match &token.kind {
            TokenKind::Terminator => {
                builder.close();
                continue;
            }
            TokenKind::Word(word) => is_block_keyword(word),
        };
        let span = token.span;
        let terminated = tokens.next_if(|t| t.terminates(span)).is_some();
        builder.current().push(Node::Word(token));
        if terminated {
            builder.close();
        } else if opens {
            builder.open.push(Block::opened_at(span));
        }
    }

    builder.finish()
}

struct BlockBuilder {
    root: Block,
    open: Vec<Block>,
}

impl BlockBuilder {
    fn new() -> Self {
        Self {
            root: Block::root(),
            open: Vec::new(),
        }
    }

    fn current(&mut self) -> &mut Block {
        match self.open.last_mut() {
            Some(block) => block,
            None => &mut self.root,
        }
    }

    /// Close the innermost nested block. A block with no statements yet
    /// stays open; the root is never closed.
    fn close(&mut self) {
        if self.open.last().is_some_and(|b| !b.is_empty()) {
            if let Some(block) = self.open.pop() {
                self.current().push(Node::Block(block));
            }
        }
    }

    /// Close everything still open at end of input, dropping empty blocks.
    fn finish(mut self) -> Block {
        while let Some(block) = self.open.pop() {
            if !block.is_empty() {
                self.current().push(Node::Block(block));
            }
        }
        tracing::trace!(statements = self.root.len(), "built block tree");
        self.root
    }
}
