//! Action rendering.
//!
//! Walks a statement list (a capability body, a macro body, or the base rule
//! set) and emits rules: each action is preceded by the predicates of its
//! match block. `include` expands a macro in place.

use crate::declare::Declarations;
use crate::literal::{parse_bounded, parse_node_address, parse_number, split_invocation};
use crate::{CompileError, CompileResult};
use rulec_core::{Action, Rule};
use rulec_parser::{Node, Span, Token};
use std::collections::HashMap;

/// Variable bindings of the macro expansion being rendered.
#[derive(Debug, Default)]
pub(crate) struct Scope {
    /// Parameter name (lower-case, without `$`) to argument text.
    bindings: HashMap<String, String>,
    /// Macros being expanded, outermost first.
    chain: Vec<String>,
}

impl Scope {
    /// Replace a `$name` word with its binding; other words pass through.
    pub fn substitute(&self, text: &str, span: Span) -> CompileResult<String> {
        match text.strip_prefix('$') {
            Some(name) => {
                let name = name.to_lowercase();
                self.bindings
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| CompileError::undefined_variable(name, span))
            }
            None => Ok(text.to_string()),
        }
    }
}

/// Renders statement lists against one set of declarations.
pub(crate) struct Renderer<'a> {
    pub(crate) decls: &'a Declarations,
}

impl<'a> Renderer<'a> {
    pub fn new(decls: &'a Declarations) -> Self {
        Self { decls }
    }

    /// Render a top-level statement list (capability body or base set).
    pub fn render(&self, nodes: &[Node]) -> CompileResult<Vec<Rule>> {
        let mut rules = Vec::new();
        self.render_actions(nodes, &Scope::default(), &mut rules)?;
        Ok(rules)
    }

    fn render_actions(&self, nodes: &[Node], scope: &Scope, out: &mut Vec<Rule>) -> CompileResult<()> {
        let mut nodes = nodes.iter().peekable();

        while let Some(node) = nodes.next() {
            let token = match node {
                Node::Word(token) => token,
                Node::Block(b) => {
                    return Err(CompileError::unrecognized_directive(
                        "action or directive",
                        "block",
                        b.span(),
                    ))
                }
            };
            let word = token.text().unwrap_or_default().to_lowercase();

            match word.as_str() {
                "include" => {
                    let name = match nodes.next() {
                        Some(Node::Word(name)) => name,
                        _ => {
                            return Err(CompileError::missing_argument(
                                "Include directive is missing a macro name",
                                token.span,
                            ))
                        }
                    };
                    self.include(name, scope, out)?;
                }
                "drop" | "accept" | "break" => {
                    if let Some(Node::Block(block)) = nodes.next_if(|n| n.as_block().is_some()) {
                        self.render_matches(&block.children, scope, out)?;
                    }
                    out.push(Rule::Action(match word.as_str() {
                        "drop" => Action::Drop,
                        "accept" => Action::Accept,
                        _ => Action::Break,
                    }));
                }
                "tee" | "watch" => {
                    let args = match nodes.next_if(|n| n.as_block().is_some_and(|b| b.len() >= 2)) {
                        Some(Node::Block(block)) => &block.children,
                        _ => {
                            return Err(CompileError::missing_argument(
                                "The tee and watch actions require two parameters (max length or -1 for all, target)",
                                token.span,
                            ))
                        }
                    };
                    let length = argument(&args[0], scope, token.span)?;
                    let length = parse_number(&length.0)
                        .filter(|n| (-1..=0xffff).contains(n))
                        .ok_or_else(|| {
                            CompileError::invalid_value(
                                "Tee/watch max packet length to forward invalid or out of range",
                                length.1,
                            )
                        })? as i32;
                    let address = target(&args[1], scope, token.span)?;
                    self.render_matches(&args[2..], scope, out)?;
                    out.push(Rule::Action(if word == "tee" {
                        Action::Tee { address, length }
                    } else {
                        Action::Watch { address, length }
                    }));
                }
                "redirect" => {
                    let args = match nodes.next_if(|n| n.as_block().is_some()) {
                        Some(Node::Block(block)) => &block.children,
                        _ => {
                            return Err(CompileError::missing_argument(
                                "The redirect action requires a target parameter",
                                token.span,
                            ))
                        }
                    };
                    let address = target(&args[0], scope, token.span)?;
                    self.render_matches(&args[1..], scope, out)?;
                    out.push(Rule::Action(Action::Redirect { address }));
                }
                "priority" => {
                    let args = match nodes.next_if(|n| n.as_block().is_some()) {
                        Some(Node::Block(block)) => &block.children,
                        _ => {
                            return Err(CompileError::missing_argument(
                                "The priority action requires a QoS bucket (0-8)",
                                token.span,
                            ))
                        }
                    };
                    let (bucket, span) = argument(&args[0], scope, token.span)?;
                    let qos_bucket = parse_bounded(&bucket, 8).ok_or_else(|| {
                        CompileError::invalid_value(
                            format!("Invalid QoS bucket '{}' (expected 0-8)", bucket),
                            span,
                        )
                    })? as u8;
                    self.render_matches(&args[1..], scope, out)?;
                    out.push(Rule::Action(Action::Priority { qos_bucket }));
                }
                _ => {
                    return Err(CompileError::unrecognized_directive(
                        "action or directive",
                        word,
                        token.span,
                    ))
                }
            }
        }

        Ok(())
    }

    /// Expand `name(arg,...)` in place.
    fn include(&self, invocation: &Token, scope: &Scope, out: &mut Vec<Rule>) -> CompileResult<()> {
        let text = invocation.text().unwrap_or_default();
        let (name, args) = split_invocation(text);
        let name = name.to_lowercase();

        let def = self
            .decls
            .macros
            .get(&name)
            .ok_or_else(|| CompileError::undefined_macro(&name, invocation.span))?;
        if scope.chain.contains(&name) {
            return Err(CompileError::macro_recursion(name, &scope.chain, invocation.span));
        }

        let args = args
            .into_iter()
            .map(|arg| scope.substitute(arg, invocation.span))
            .collect::<CompileResult<Vec<_>>>()?;

        let mut bindings = HashMap::with_capacity(def.params.len());
        for (param, &idx) in &def.params {
            let value = args.get(idx).ok_or_else(|| {
                CompileError::missing_argument(
                    format!("Missing one or more required parameters of macro '{}'", name),
                    invocation.span,
                )
            })?;
            bindings.insert(param.clone(), value.clone());
        }

        let mut chain = scope.chain.clone();
        chain.push(name);
        tracing::trace!(chain = %chain.join(" -> "), "expanding macro");

        let inner = Scope { bindings, chain };
        self.render_actions(&def.body, &inner, out)
    }
}

/// Substituted text and position of an action argument.
fn argument(node: &Node, scope: &Scope, action: Span) -> CompileResult<(String, Span)> {
    match node {
        Node::Word(token) => Ok((
            scope.substitute(token.text().unwrap_or_default(), token.span)?,
            token.span,
        )),
        Node::Block(_) => Err(CompileError::missing_argument(
            "Action argument must be a word",
            action,
        )),
    }
}

fn target(node: &Node, scope: &Scope, action: Span) -> CompileResult<String> {
    let (text, span) = argument(node, scope, action)?;
    parse_node_address(&text).ok_or_else(|| {
        CompileError::invalid_value(
            format!("Missing or invalid node address target '{}'", text),
            span,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rulec_core::{MatchKind, MatchPredicate};
    use rulec_parser::parse_blocks;

    fn render(source: &str) -> CompileResult<Vec<Rule>> {
        let decls = Declarations::resolve(parse_blocks(source))?;
        Renderer::new(&decls).render(&decls.base)
    }

    fn ipv4_dest(ip: &str) -> Rule {
        Rule::Match(MatchPredicate::new(MatchKind::Ipv4Dest { ip: ip.to_string() }))
    }

    #[test]
    fn test_actions_without_matches() {
        let rules = render("accept; drop; break;").unwrap();
        assert_eq!(
            rules,
            vec![
                Rule::Action(Action::Accept),
                Rule::Action(Action::Drop),
                Rule::Action(Action::Break),
            ]
        );
    }

    #[test]
    fn test_tee_and_watch() {
        // GIVEN
        let source = "tee -1 DEADBEEF00 ipprotocol tcp; watch 128 0123456789;";

        // WHEN
        let rules = render(source).unwrap();

        // THEN
        assert_eq!(
            rules,
            vec![
                Rule::Match(MatchPredicate::new(MatchKind::IpProtocol { ip_protocol: 6 })),
                Rule::Action(Action::Tee {
                    address: "deadbeef00".to_string(),
                    length: -1
                }),
                Rule::Action(Action::Watch {
                    address: "0123456789".to_string(),
                    length: 128
                }),
            ]
        );
    }

    #[test]
    fn test_tee_argument_errors() {
        let err = render("tee 1;").unwrap_err();
        assert!(matches!(err, CompileError::MissingArgument { .. }));
        assert_eq!(err.position(), (1, 1));

        let err = render("tee 65536 deadbeef00;").unwrap_err();
        assert!(matches!(err, CompileError::InvalidValue { .. }));
        assert_eq!(err.position(), (1, 5));

        let err = render("watch -1 beef;").unwrap_err();
        assert!(matches!(err, CompileError::InvalidValue { .. }));
        assert_eq!(err.position(), (1, 10));
    }

    #[test]
    fn test_redirect_and_priority() {
        let rules = render("redirect feedfacecc vlan 1; priority 3;").unwrap();
        assert_eq!(
            rules,
            vec![
                Rule::Match(MatchPredicate::new(MatchKind::VlanId { vlan_id: 1 })),
                Rule::Action(Action::Redirect {
                    address: "feedfacecc".to_string()
                }),
                Rule::Action(Action::Priority { qos_bucket: 3 }),
            ]
        );

        let err = render("priority 9;").unwrap_err();
        assert!(matches!(err, CompileError::InvalidValue { .. }));

        let err = render("redirect;").unwrap_err();
        assert!(matches!(err, CompileError::MissingArgument { .. }));
    }

    #[test]
    fn test_unrecognized_directive() {
        let err = render("allow ipsrc 10.0.0.0/8;").unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnrecognizedDirective { ref keyword, .. } if keyword == "allow"
        ));
        assert_eq!(err.position(), (1, 1));
    }

    #[test]
    fn test_include_binds_parameters() {
        // GIVEN
        let source = "macro allow_web(dst) accept ipdest $dst; ; include ALLOW_WEB(203.0.113.0/24);";

        // WHEN
        let rules = render(source).unwrap();

        // THEN
        assert_eq!(
            rules,
            vec![ipv4_dest("203.0.113.0/24"), Rule::Action(Action::Accept)]
        );
    }

    #[test]
    fn test_nested_include_resolves_caller_scope() {
        // GIVEN
        let source = "
            macro inner(net) accept ipdest $net; ;
            macro outer(n) include inner($n) ;
            include outer(10.1.0.0/16);
        ";

        // WHEN
        let rules = render(source).unwrap();

        // THEN
        assert_eq!(
            rules,
            vec![ipv4_dest("10.1.0.0/16"), Rule::Action(Action::Accept)]
        );
    }

    #[test]
    fn test_include_errors() {
        let err = render("include nothing;").unwrap_err();
        assert!(matches!(err, CompileError::UndefinedMacro { .. }));

        let err = render("macro m(a,b) accept; ; include m(1);").unwrap_err();
        assert!(matches!(err, CompileError::MissingArgument { .. }));

        let err = render("macro m accept ipsrc $x; ; include m;").unwrap_err();
        assert!(matches!(err, CompileError::UndefinedVariable { .. }));
    }

    #[test]
    fn test_reserved_word_bound_to_match_argument() {
        // GIVEN
        let source = "macro proto(p) accept ipprotocol $p; ; include proto(icmp);";

        // WHEN
        let err = render(source).unwrap_err();

        // THEN
        assert!(matches!(err, CompileError::MissingArgument { .. }));
        assert_eq!(err.position(), (1, 23));
    }

    #[test]
    fn test_self_include_is_rejected() {
        // GIVEN
        let source = "macro a include b ; macro b include a ; include a;";

        // WHEN
        let err = render(source).unwrap_err();

        // THEN
        assert!(matches!(
            err,
            CompileError::MacroRecursionLimitExceeded { ref chain, .. } if chain == "a -> b -> a"
        ));
    }

    #[test]
    fn test_scope_substitution() {
        let scope = Scope {
            bindings: HashMap::from([("port".to_string(), "80".to_string())]),
            chain: Vec::new(),
        };
        assert_eq!(scope.substitute("$PORT", Span::default()).unwrap(), "80");
        assert_eq!(scope.substitute("tcp", Span::default()).unwrap(), "tcp");
        assert!(scope.substitute("$other", Span::default()).is_err());
    }
}
