//! Schema token scanner.
//!
//! Candidates are `:Name`, `|Name` and `|:Name`. Each candidate is classified
//! by the innermost bracket it sits in: inside a relationship pattern
//! (`-[` ... `]`) it names a relationship type, inside a node pattern,
//! list or bare predicate a `:Name` names a label. Candidates in string
//! literals and map literals are ignored. Matching is still lexical; a
//! label split across lines or hidden behind a parameter is missed.

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

// Group 1 is the sigil, group 2 is the name.
static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(:|\|:?)([A-Za-z0-9_]+)").expect("token pattern compiles"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Node,
    Relationship,
    List,
    Map,
}

/// Incremental bracket and quote tracker over the query bytes.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    scopes: Vec<Scope>,
    quote: Option<u8>,
    last: Option<u8>,
}

impl<'a> Cursor<'a> {
    fn new(query: &'a str) -> Self {
        Self {
            bytes: query.as_bytes(),
            pos: 0,
            scopes: Vec::new(),
            quote: None,
            last: None,
        }
    }

    fn advance_to(&mut self, end: usize) {
        while self.pos < end {
            let b = self.bytes[self.pos];
            self.pos += 1;
            if let Some(q) = self.quote {
                if b == b'\\' {
                    self.pos += 1;
                } else if b == q {
                    self.quote = None;
                }
                continue;
            }
            match b {
                b'\'' | b'"' | b'`' => self.quote = Some(b),
                b'(' => self.scopes.push(Scope::Node),
                b'[' if matches!(self.last, Some(b'-' | b'<')) => {
                    self.scopes.push(Scope::Relationship)
                }
                b'[' => self.scopes.push(Scope::List),
                b'{' => self.scopes.push(Scope::Map),
                b')' | b']' | b'}' => {
                    self.scopes.pop();
                }
                _ => {}
            }
            if !b.is_ascii_whitespace() {
                self.last = Some(b);
            }
        }
    }

    fn classify(&self, sigil: &str) -> Option<TokenKind> {
        if self.quote.is_some() {
            return None;
        }
        match self.scopes.last() {
            Some(Scope::Relationship) => Some(TokenKind::RelationshipType),
            Some(Scope::Map) => None,
            Some(Scope::Node | Scope::List) | None => {
                (!sigil.starts_with('|')).then_some(TokenKind::Label)
            }
        }
    }
}

/// Which schema namespace a token refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Node label
    Label,
    /// Relationship type
    RelationshipType,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label => write!(f, "label"),
            Self::RelationshipType => write!(f, "relationship type"),
        }
    }
}

/// A schema reference found in query text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaToken {
    /// Namespace of the reference
    pub kind: TokenKind,
    /// Name as written in the query
    pub name: String,
}

/// Extract distinct schema tokens in the order they first appear.
///
/// Two tokens are the same when kind and lowercased name match; the first
/// spelling wins.
#[must_use]
pub fn scan(query: &str) -> Vec<SchemaToken> {
    let mut seen: IndexSet<(TokenKind, String)> = IndexSet::new();
    let mut tokens = Vec::new();
    let mut cursor = Cursor::new(query);

    for caps in TOKEN_RE.captures_iter(query) {
        let (Some(sigil), Some(name)) = (caps.get(1), caps.get(2)) else { continue };
        cursor.advance_to(sigil.start());
        let Some(kind) = cursor.classify(sigil.as_str()) else { continue };
        if seen.insert((kind, name.as_str().to_lowercase())) {
            tokens.push(SchemaToken {
                kind,
                name: name.as_str().to_string(),
            });
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(name: &str) -> SchemaToken {
        SchemaToken { kind: TokenKind::Label, name: name.to_string() }
    }

    fn rel(name: &str) -> SchemaToken {
        SchemaToken { kind: TokenKind::RelationshipType, name: name.to_string() }
    }

    #[test]
    fn test_scan_labels_and_relationships_in_text_order() {
        let tokens = scan("MATCH (u:User)-[:MemberOf*1..]->(g:Group) RETURN u");
        assert_eq!(tokens, vec![label("User"), rel("MemberOf"), label("Group")]);
    }

    #[test]
    fn test_scan_dedupes_case_insensitively() {
        let tokens = scan("MATCH (a:User), (b:user), (c:USER) RETURN a");
        assert_eq!(tokens, vec![label("User")]);
    }

    #[test]
    fn test_scan_same_name_in_both_namespaces() {
        let tokens = scan("MATCH (n:Owns)-[:Owns]->(m) RETURN n");
        assert_eq!(tokens, vec![label("Owns"), rel("Owns")]);
    }

    #[test]
    fn test_scan_named_relationship_alternatives() {
        let tokens =
            scan("MATCH (p)-[r:GetChanges|GetChangesAll|:GetChangesInFilteredSet]->(d:Domain) RETURN p");
        assert_eq!(
            tokens,
            vec![
                rel("GetChanges"),
                rel("GetChangesAll"),
                rel("GetChangesInFilteredSet"),
                label("Domain"),
            ]
        );
    }

    #[test]
    fn test_scan_incoming_relationship() {
        let tokens = scan("MATCH (g:Group)<-[:MemberOf]-(u) RETURN u");
        assert_eq!(tokens, vec![label("Group"), rel("MemberOf")]);
    }

    #[test]
    fn test_scan_ignores_bare_colon() {
        assert!(scan("RETURN 'a: b'").is_empty());
        assert!(scan("MATCH (n) RETURN n").is_empty());
    }

    #[test]
    fn test_scan_skips_map_literals() {
        let tokens = scan("MATCH (c:Computer {unconstraineddelegation:true}) RETURN c");
        assert_eq!(tokens, vec![label("Computer")]);
        let tokens = scan("MATCH (a)-[r:Owns {inherited: false}]->(b) RETURN a");
        assert_eq!(tokens, vec![rel("Owns")]);
    }

    #[test]
    fn test_scan_skips_string_literals() {
        let tokens = scan("MATCH (u:User) WHERE u.name = 'x:Fake|:Other' RETURN u");
        assert_eq!(tokens, vec![label("User")]);
        let tokens = scan(r#"MATCH (u:User) WHERE u.note = "it\"s:Fake" RETURN u"#);
        assert_eq!(tokens, vec![label("User")]);
    }

    #[test]
    fn test_scan_label_predicates() {
        let tokens = scan("MATCH (n) WHERE (n:User OR n:Computer) AND NOT n:Group RETURN n");
        assert_eq!(tokens, vec![label("User"), label("Computer"), label("Group")]);
    }

    #[test]
    fn test_scan_list_brackets_are_not_relationships() {
        let tokens = scan("MATCH (g:Group) RETURN [x IN g.tags | x:Tag], collect(g.name)[0..5]");
        assert_eq!(tokens, vec![label("Group"), label("Tag")]);
    }
}
