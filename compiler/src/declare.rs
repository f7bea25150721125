//! Declaration resolution.
//!
//! Splits the top-level statements into the three declaration registries
//! (macros, tags, capabilities) and the residual base rule body.

use crate::literal::{parse_bounded, parse_u32, split_invocation};
use crate::{CompileError, CompileResult};
use rulec_core::tables::{is_reserved, is_valid_name};
use rulec_core::Tag;
use rulec_parser::{Block, Node, Span, Token};
use std::collections::{BTreeMap, HashMap};

/// A reusable, parameterized rule fragment.
#[derive(Debug)]
pub(crate) struct MacroDef {
    /// Parameter name (without `$`) to positional index.
    pub params: HashMap<String, usize>,
    pub body: Vec<Node>,
}

/// A capability before its rules are rendered.
#[derive(Debug)]
pub(crate) struct CapabilityDef {
    pub name: String,
    pub id: u32,
    pub default: bool,
    pub body: Vec<Node>,
}

/// Everything declared by one source file.
#[derive(Debug, Default)]
pub(crate) struct Declarations {
    pub macros: HashMap<String, MacroDef>,
    /// Tags in declaration order.
    pub tags: Vec<Tag>,
    /// Capabilities in declaration order.
    pub capabilities: Vec<CapabilityDef>,
    /// Top-level statements that are not declarations.
    pub base: Vec<Node>,
}

impl Declarations {
    /// Walk the top-level statements and collect declarations.
    pub fn resolve(root: Block) -> CompileResult<Self> {
        let mut decls = Self::default();
        let mut nodes = root.into_children().into_iter().peekable();

        while let Some(node) = nodes.next() {
            let kind = match node.word().map(str::to_lowercase).as_deref() {
                Some("macro") => "macro",
                Some("tag") => "tag",
                Some("cap") => "capability",
                _ => {
                    decls.base.push(node);
                    continue;
                }
            };

            // The declaration body must be a block that starts with a name.
            let block = match nodes.next_if(|n| {
                matches!(n, Node::Block(b) if matches!(b.children.first(), Some(Node::Word(_))))
            }) {
                Some(Node::Block(block)) => block,
                _ => return Err(CompileError::missing_declaration_name(kind, node.span())),
            };

            match kind {
                "macro" => decls.declare_macro(block)?,
                "tag" => decls.declare_tag(block)?,
                _ => decls.declare_capability(block)?,
            }
        }

        tracing::debug!(
            macros = decls.macros.len(),
            tags = decls.tags.len(),
            capabilities = decls.capabilities.len(),
            base_statements = decls.base.len(),
            "resolved declarations"
        );
        Ok(decls)
    }

    /// Get a tag by (lower-case) name.
    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == name)
    }

    // ==================== MACRO ====================

    /// Syntax: macro name[(p0,p1,...)] <statement>* ;
    fn declare_macro(&mut self, block: Block) -> CompileResult<()> {
        let (name_token, body) = split_name(block, "macro")?;
        let text = word_text(&name_token).to_lowercase();
        let (name, params) = split_invocation(&text);
        check_name("macro", name, name_token.span)?;
        if self.macros.contains_key(name) {
            return Err(CompileError::duplicate_declaration("macro", name, name_token.span));
        }

        let mut param_map = HashMap::new();
        for (idx, param) in params.into_iter().enumerate() {
            let param = param.strip_prefix('$').unwrap_or(param);
            if !is_valid_name(param) {
                return Err(CompileError::invalid_name("macro parameter", param, name_token.span));
            }
            if param_map.insert(param.to_string(), idx).is_some() {
                return Err(CompileError::duplicate_declaration(
                    "macro parameter",
                    param,
                    name_token.span,
                ));
            }
        }

        self.macros.insert(
            name.to_string(),
            MacroDef {
                params: param_map,
                body,
            },
        );
        Ok(())
    }

    // ==================== TAG ====================

    /// Syntax: tag name [id N] [default V] [flag bits name]* [enum N name]* ;
    fn declare_tag(&mut self, block: Block) -> CompileResult<()> {
        let (name_token, body) = split_name(block, "tag")?;
        let name = word_text(&name_token).to_lowercase();
        check_name("tag", &name, name_token.span)?;
        if self.tag(&name).is_some() {
            return Err(CompileError::duplicate_declaration("tag", name, name_token.span));
        }

        let mut tag = Tag::new(name, 0);
        let mut id = None;
        let mut default: Option<Token> = None;
        let mut nodes = body.into_iter();

        while let Some(node) = nodes.next() {
            let token = match node {
                Node::Word(token) => token,
                Node::Block(b) => return Err(CompileError::unexpected_block(b.span())),
            };
            match word_text(&token).to_lowercase().as_str() {
                "id" => {
                    if id.is_some() {
                        return Err(CompileError::duplicate_directive("tag", "id", token.span));
                    }
                    let value = next_word(&mut nodes, token.span, "Missing numeric value for tag ID")?;
                    let tag_id = parse_u32(word_text(&value)).ok_or_else(|| {
                        CompileError::invalid_value("Invalid or out of range tag ID", value.span)
                    })?;
                    if self.tags.iter().any(|t| t.id == tag_id) {
                        return Err(CompileError::duplicate_id("tag", tag_id, value.span));
                    }
                    id = Some(tag_id);
                }
                "default" => {
                    if default.is_some() {
                        return Err(CompileError::duplicate_directive(
                            "tag",
                            "default",
                            token.span,
                        ));
                    }
                    default = Some(next_word(&mut nodes, token.span, "Missing value for tag default")?);
                }
                "flag" => {
                    let bits = next_word(&mut nodes, token.span, "Missing tag flag bit index")?;
                    let mut mask = 0u32;
                    for bit in word_text(&bits).split(',').filter(|b| !b.is_empty()) {
                        let bit = bit.to_lowercase();
                        mask |= match tag.flag(&bit) {
                            Some(flag) => flag,
                            None => 1u32 << parse_bounded(&bit, 31).ok_or_else(|| {
                                CompileError::invalid_value(
                                    format!(
                                        "Bit index '{}' invalid, out of range, or references an undefined flag name",
                                        bit
                                    ),
                                    bits.span,
                                )
                            })?,
                        };
                    }
                    let flag_name = next_word(&mut nodes, bits.span, "Missing tag flag name")?;
                    let key = declare_value_name(&tag.flags, &flag_name, "tag flag")?;
                    tag.flags.insert(key, mask);
                }
                "enum" => {
                    let value = next_word(&mut nodes, token.span, "Missing tag enum value")?;
                    let number = parse_u32(word_text(&value)).ok_or_else(|| {
                        CompileError::invalid_value(
                            "Tag enum value invalid or out of range",
                            value.span,
                        )
                    })?;
                    let enum_name = next_word(&mut nodes, value.span, "Missing tag enum name")?;
                    let key = declare_value_name(&tag.enums, &enum_name, "tag enum")?;
                    tag.enums.insert(key, number);
                }
                other => {
                    return Err(CompileError::unrecognized_directive(
                        "keyword in tag definition",
                        other,
                        token.span,
                    ));
                }
            }
        }

        tag.id = id.ok_or_else(|| CompileError::missing_directive("tag", "id", name_token.span))?;

        // A symbolic default names an enum value first, then a flag.
        if let Some(token) = default {
            let value = word_text(&token).to_lowercase();
            let resolved = tag
                .enum_value(&value)
                .or_else(|| tag.flag(&value))
                .or_else(|| parse_u32(&value))
                .ok_or_else(|| {
                    CompileError::invalid_value(
                        format!("Invalid tag default '{}'", word_text(&token)),
                        token.span,
                    )
                })?;
            tag.default = Some(resolved);
        }

        self.tags.push(tag);
        Ok(())
    }

    // ==================== CAPABILITY ====================

    /// Syntax: cap name [id N] [default] <statement>* ;
    fn declare_capability(&mut self, block: Block) -> CompileResult<()> {
        let (name_token, body) = split_name(block, "capability")?;
        let name = word_text(&name_token).to_lowercase();
        check_name("capability", &name, name_token.span)?;
        if self.capabilities.iter().any(|c| c.name == name) {
            return Err(CompileError::duplicate_declaration("capability", name, name_token.span));
        }

        let mut id = None;
        let mut default = false;
        let mut rules = Vec::new();
        let mut nodes = body.into_iter();

        while let Some(node) = nodes.next() {
            match node.word().map(str::to_lowercase).as_deref() {
                Some("id") => {
                    if id.is_some() {
                        return Err(CompileError::duplicate_directive(
                            "capability",
                            "id",
                            node.span(),
                        ));
                    }
                    let value = next_word(&mut nodes, node.span(), "Missing value for capability ID")?;
                    let cap_id = parse_u32(word_text(&value)).ok_or_else(|| {
                        CompileError::invalid_value("Invalid or out of range capability ID", value.span)
                    })?;
                    if self.capabilities.iter().any(|c| c.id == cap_id) {
                        return Err(CompileError::duplicate_id("capability", cap_id, value.span));
                    }
                    id = Some(cap_id);
                }
                Some("default") => default = true,
                _ => rules.push(node),
            }
        }

        let id = id.ok_or_else(|| {
            CompileError::missing_directive("capability", "id", name_token.span)
        })?;
        self.capabilities.push(CapabilityDef {
            name,
            id,
            default,
            body: rules,
        });
        Ok(())
    }
}

/// Separate a declaration block into its name token and the rest.
fn split_name(block: Block, kind: &'static str) -> CompileResult<(Token, Vec<Node>)> {
    let span = block.span();
    let mut children = block.into_children().into_iter();
    match children.next() {
        Some(Node::Word(token)) => Ok((token, children.collect())),
        _ => Err(CompileError::missing_declaration_name(kind, span)),
    }
}

/// Take the next statement, which must be a word.
fn next_word(
    nodes: &mut impl Iterator<Item = Node>,
    after: Span,
    message: &str,
) -> CompileResult<Token> {
    match nodes.next() {
        Some(Node::Word(token)) => Ok(token),
        _ => Err(CompileError::missing_argument(message, after)),
    }
}

fn word_text(token: &Token) -> &str {
    token.text().unwrap_or_default()
}

/// Check the identifier grammar and the reserved-word set.
fn check_name(kind: &'static str, name: &str, span: Span) -> CompileResult<()> {
    if !is_valid_name(name) {
        return Err(CompileError::invalid_name(kind, name, span));
    }
    if is_reserved(name) {
        return Err(CompileError::reserved_word(kind, name, span));
    }
    Ok(())
}

/// Validate a flag or enum name and return its lower-case key.
fn declare_value_name(
    existing: &BTreeMap<String, u32>,
    token: &Token,
    kind: &'static str,
) -> CompileResult<String> {
    let name = word_text(token).to_lowercase();
    if !is_valid_name(&name) {
        return Err(CompileError::invalid_name(kind, name, token.span));
    }
    if existing.contains_key(&name) {
        return Err(CompileError::duplicate_declaration(kind, name, token.span));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rulec_parser::parse_blocks;

    fn resolve(source: &str) -> CompileResult<Declarations> {
        Declarations::resolve(parse_blocks(source))
    }

    #[test]
    fn test_base_statements_keep_order() {
        // GIVEN
        let source = "drop ipprotocol udp; tag t id 1; accept;";

        // WHEN
        let decls = resolve(source).unwrap();

        // THEN
        let words: Vec<_> = decls.base.iter().filter_map(Node::word).collect();
        assert_eq!(words, vec!["drop", "accept"]);
        assert_eq!(decls.base.len(), 3);
        assert_eq!(decls.tags.len(), 1);
    }

    #[test]
    fn test_macro_params_are_positional() {
        // GIVEN
        let source = "macro Allow($Port,proto) accept dport $port; ;";

        // WHEN
        let decls = resolve(source).unwrap();

        // THEN
        let def = decls.macros.get("allow").unwrap();
        assert_eq!(def.params.get("port"), Some(&0));
        assert_eq!(def.params.get("proto"), Some(&1));
        assert_eq!(def.body.len(), 2);
    }

    #[test]
    fn test_macro_duplicate_and_reserved() {
        let err = resolve("macro m accept; ; macro M drop; ;").unwrap_err();
        assert!(matches!(err, CompileError::DuplicateDeclaration { kind: "macro", .. }));

        let err = resolve("macro ipsrc accept; ;").unwrap_err();
        assert!(matches!(err, CompileError::ReservedWord { .. }));

        let err = resolve("macro 9lives accept; ;").unwrap_err();
        assert!(matches!(err, CompileError::InvalidName { .. }));
    }

    #[test]
    fn test_tag_with_flags_enums_and_default() {
        // GIVEN
        let source = "tag Perms id 0x10 flag 0 read flag 1 write flag read,write,4 all enum 7 seven default all;";

        // WHEN
        let decls = resolve(source).unwrap();

        // THEN
        let tag = decls.tag("perms").unwrap();
        assert_eq!(tag.id, 16);
        assert_eq!(tag.flag("read"), Some(1));
        assert_eq!(tag.flag("write"), Some(2));
        assert_eq!(tag.flag("all"), Some(0b10011));
        assert_eq!(tag.enum_value("seven"), Some(7));
        assert_eq!(tag.default, Some(0b10011));
    }

    #[test]
    fn test_tag_numeric_default() {
        let decls = resolve("tag t id 1 default 0x20;").unwrap();
        assert_eq!(decls.tags[0].default, Some(32));
    }

    #[test]
    fn test_tag_requires_id() {
        let err = resolve("tag t enum 1 one;").unwrap_err();
        assert!(matches!(
            err,
            CompileError::MissingDirective { kind: "tag", directive: "id", .. }
        ));
    }

    #[test]
    fn test_tag_rejects_duplicate_id_directive() {
        let err = resolve("tag t id 1 id 2;").unwrap_err();
        assert!(matches!(err, CompileError::DuplicateDirective { .. }));
    }

    #[test]
    fn test_tag_duplicate_name() {
        // WHEN
        let err = resolve("tag role id 1; tag ROLE id 2;").unwrap_err();

        // THEN
        assert!(matches!(err, CompileError::DuplicateDeclaration { kind: "tag", .. }));
        assert_eq!(err.position(), (1, 20));
    }

    #[test]
    fn test_tag_ids_unique() {
        let err = resolve("tag a id 1; tag b id 1;").unwrap_err();
        assert!(matches!(err, CompileError::DuplicateId { kind: "tag", id: 1, .. }));
    }

    #[test]
    fn test_tag_value_errors() {
        let err = resolve("tag t id 4294967296;").unwrap_err();
        assert!(matches!(err, CompileError::InvalidValue { .. }));

        let err = resolve("tag t id 1 flag 32 big;").unwrap_err();
        assert!(matches!(err, CompileError::InvalidValue { .. }));

        let err = resolve("tag t id 1 enum 1 a enum 2 a;").unwrap_err();
        assert!(matches!(err, CompileError::DuplicateDeclaration { kind: "tag enum", .. }));

        let err = resolve("tag t id 1 colour red;").unwrap_err();
        assert!(matches!(err, CompileError::UnrecognizedDirective { .. }));

        let err = resolve("tag t id 1 default nope;").unwrap_err();
        assert!(matches!(err, CompileError::InvalidValue { .. }));
    }

    #[test]
    fn test_capability_declaration() {
        // GIVEN
        let source = "cap Admin id 1000 default accept ipprotocol tcp; ;";

        // WHEN
        let decls = resolve(source).unwrap();

        // THEN
        let cap = &decls.capabilities[0];
        assert_eq!(cap.name, "admin");
        assert_eq!(cap.id, 1000);
        assert!(cap.default);
        assert_eq!(cap.body.len(), 2);
    }

    #[test]
    fn test_capability_duplicate_name_position() {
        // GIVEN
        let source = "cap c1 id 1 accept;\ncap c1 id 2 drop;";

        // WHEN
        let err = resolve(source).unwrap_err();

        // THEN
        assert!(matches!(err, CompileError::DuplicateDeclaration { kind: "capability", .. }));
        assert_eq!(err.position(), (2, 5));
    }

    #[test]
    fn test_capability_duplicate_id() {
        let err = resolve("cap a id 7 accept; cap b id 7 drop;").unwrap_err();
        assert!(matches!(err, CompileError::DuplicateId { kind: "capability", id: 7, .. }));
    }

    #[test]
    fn test_capability_requires_id() {
        let err = resolve("cap a accept;").unwrap_err();
        assert!(matches!(err, CompileError::MissingDirective { .. }));
    }

    #[test]
    fn test_declaration_missing_name() {
        let err = resolve("tag").unwrap_err();
        assert!(matches!(err, CompileError::MissingDeclarationName { kind: "tag", .. }));
        assert_eq!(err.position(), (1, 1));
    }
}
