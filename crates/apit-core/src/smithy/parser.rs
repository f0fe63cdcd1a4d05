use std::collections::HashMap;

use log::warn;

use crate::error::{Diagnostic, ParseError};
use crate::node::{Decimal, NodeValue};
use crate::ordered::OrderedMap;
use crate::schema::ids;

use super::ast::{Ast, Member, Shape, ShapeRef};
use super::prelude::{self, PRELUDE_NAMESPACE};
use super::scanner::{Scanner, Token, TokenKind};
use super::traits;

const SIMPLE_TYPES: &[&str] = &[
    "blob",
    "boolean",
    "string",
    "byte",
    "short",
    "integer",
    "long",
    "float",
    "double",
    "bigInteger",
    "bigDecimal",
    "timestamp",
    "document",
];

/// Parse one IDL document into an AST.
pub fn parse(path: &str, source: &str) -> Result<Ast, ParseError> {
    Parser::new(path, source).parse()
}

struct Elided {
    shape: String,
    member: String,
    line: usize,
    column: usize,
}

struct Apply {
    shape: String,
    member: Option<String>,
    traits: OrderedMap<NodeValue>,
    line: usize,
    column: usize,
}

pub struct Parser<'a> {
    path: String,
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    ast: Ast,
    namespace: Option<String>,
    uses: HashMap<String, String>,
    input_suffix: String,
    output_suffix: String,
    docs: Vec<String>,
    pending: OrderedMap<NodeValue>,
    bound_resources: HashMap<String, String>,
    elided: Vec<Elided>,
    applies: Vec<Apply>,
}

impl<'a> Parser<'a> {
    pub fn new(path: &str, source: &'a str) -> Self {
        let mut ast = Ast::new();
        ast.smithy = "1.0".to_string();
        Self {
            path: path.to_string(),
            source,
            tokens: Scanner::new(source).collect(),
            pos: 0,
            ast,
            namespace: None,
            uses: HashMap::new(),
            input_suffix: "Input".to_string(),
            output_suffix: "Output".to_string(),
            docs: Vec::new(),
            pending: OrderedMap::new(),
            bound_resources: HashMap::new(),
            elided: Vec::new(),
            applies: Vec::new(),
        }
    }

    pub fn parse(mut self) -> Result<Ast, ParseError> {
        loop {
            self.skip_ws()?;
            let tok = self.peek().clone();
            match tok.kind {
                TokenKind::Eof => break,
                TokenKind::Dollar => self.parse_control()?,
                TokenKind::At => self.parse_trait()?,
                TokenKind::Symbol => match tok.text.as_str() {
                    "namespace" => self.parse_namespace()?,
                    "use" => self.parse_use()?,
                    "metadata" => self.parse_metadata()?,
                    "apply" => self.parse_apply()?,
                    _ => self.parse_shape()?,
                },
                _ => return Err(self.syntax(&tok, format!("unexpected {}", tok.kind))),
            }
        }
        if !self.pending.is_empty() {
            let tok = self.peek().clone();
            return Err(self.syntax(&tok, "traits are not followed by a shape"));
        }
        self.bind_prelude();
        self.resolve_elided()?;
        self.run_applies()?;
        self.rewrite_enum_traits();
        Ok(self.ast)
    }

    // -- token plumbing ----------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn diagnostic(&self, tok: &Token, message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(message, &self.path, self.source, tok.line, tok.column)
    }

    fn syntax(&self, tok: &Token, message: impl Into<String>) -> ParseError {
        ParseError::Syntax(self.diagnostic(tok, message))
    }

    /// Skip newlines, commas, and comments. Doc comments are collected for
    /// the next shape or member.
    fn skip_ws(&mut self) -> Result<(), ParseError> {
        loop {
            let tok = self.peek().clone();
            match tok.kind {
                TokenKind::Newline | TokenKind::Comma | TokenKind::BlockComment => {
                    self.advance();
                }
                TokenKind::LineComment => {
                    if tok.is_doc_comment() {
                        let line = tok.text[1..].strip_prefix(' ').unwrap_or(&tok.text[1..]);
                        self.docs.push(line.to_string());
                    }
                    self.advance();
                }
                TokenKind::Undefined => {
                    return Err(ParseError::Lexical(self.diagnostic(&tok, tok.text.clone())));
                }
                _ => return Ok(()),
            }
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        self.skip_ws()?;
        let tok = self.advance();
        if tok.kind != kind {
            return Err(self.syntax(&tok, format!("expected {kind}, found {}", tok.kind)));
        }
        Ok(tok)
    }

    fn expect_identifier(&mut self) -> Result<Token, ParseError> {
        self.skip_ws()?;
        let tok = self.advance();
        if tok.kind != TokenKind::Symbol {
            return Err(self.syntax(&tok, format!("expected an identifier, found {}", tok.kind)));
        }
        Ok(tok)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn at_symbol(&self, text: &str) -> bool {
        self.peek().is_symbol(text)
    }

    /// Raw shape id text: `a.b#C$d`, `C`, or `C$d`.
    fn parse_shape_id_text(&mut self) -> Result<(String, Token), ParseError> {
        let first = self.expect_identifier()?;
        let mut text = first.text.clone();
        while self.at(TokenKind::Dot) {
            self.advance();
            text.push('.');
            text.push_str(&self.advance_identifier()?);
        }
        if self.at(TokenKind::Hash) {
            self.advance();
            text.push('#');
            text.push_str(&self.advance_identifier()?);
        }
        if self.at(TokenKind::Dollar) {
            self.advance();
            text.push('$');
            text.push_str(&self.advance_identifier()?);
        }
        Ok((text, first))
    }

    fn advance_identifier(&mut self) -> Result<String, ParseError> {
        let tok = self.advance();
        if tok.kind != TokenKind::Symbol {
            return Err(self.syntax(&tok, "malformed shape id"));
        }
        Ok(tok.text)
    }

    fn current_namespace(&self, tok: &Token) -> Result<String, ParseError> {
        self.namespace
            .clone()
            .ok_or_else(|| self.syntax(tok, "namespace must be declared first"))
    }

    /// Resolve a shape reference. Relative names go through `use` aliases,
    /// then the current namespace; prelude names are rebound after parsing.
    fn resolve_shape_id(&self, raw: &str, tok: &Token) -> Result<String, ParseError> {
        let (id, member) = match raw.split_once('$') {
            Some((id, member)) => (id, Some(member)),
            None => (raw, None),
        };
        let absolute = if id.contains('#') {
            id.to_string()
        } else if let Some(alias) = self.uses.get(id) {
            alias.clone()
        } else {
            ids::absolute(&self.current_namespace(tok)?, id)
        };
        Ok(match member {
            Some(m) => format!("{absolute}${m}"),
            None => absolute,
        })
    }

    fn parse_shape_ref(&mut self) -> Result<String, ParseError> {
        let (raw, tok) = self.parse_shape_id_text()?;
        self.resolve_shape_id(&raw, &tok)
    }

    fn resolve_trait_id(&self, raw: &str, tok: &Token) -> Result<String, ParseError> {
        if raw.contains('#') {
            Ok(raw.to_string())
        } else if let Some(alias) = self.uses.get(raw) {
            Ok(alias.clone())
        } else if prelude::is_prelude_trait(raw) {
            Ok(prelude::trait_id(raw))
        } else {
            Ok(ids::absolute(&self.current_namespace(tok)?, raw))
        }
    }

    // -- statements ----------------------------------------------------------

    fn parse_control(&mut self) -> Result<(), ParseError> {
        self.advance();
        let key = self.advance_identifier()?;
        self.expect(TokenKind::Colon)?;
        let tok = self.peek().clone();
        let value = self.parse_node()?;
        match (key.as_str(), value.as_string()) {
            ("version", Some(v)) => {
                self.ast.smithy = if v.contains('.') {
                    v.to_string()
                } else {
                    format!("{v}.0")
                };
            }
            ("operationInputSuffix", Some(v)) => self.input_suffix = v.to_string(),
            ("operationOutputSuffix", Some(v)) => self.output_suffix = v.to_string(),
            ("version" | "operationInputSuffix" | "operationOutputSuffix", None) => {
                return Err(self.syntax(&tok, format!("${key} requires a string value")));
            }
            _ => warn!(
                "[WARNING]: {}:{}:{}: ignoring unknown control statement ${}",
                self.path, tok.line, tok.column, key
            ),
        }
        Ok(())
    }

    fn parse_namespace(&mut self) -> Result<(), ParseError> {
        let kw = self.advance();
        self.docs.clear();
        if self.namespace.is_some() {
            return Err(self.syntax(&kw, "namespace may only be declared once"));
        }
        let (ns, tok) = self.parse_shape_id_text()?;
        if !ids::is_namespace(&ns) {
            return Err(self.syntax(&tok, format!("invalid namespace {ns}")));
        }
        self.namespace = Some(ns);
        Ok(())
    }

    fn parse_use(&mut self) -> Result<(), ParseError> {
        self.advance();
        self.docs.clear();
        let (id, tok) = self.parse_shape_id_text()?;
        if !ids::is_absolute(&id) {
            return Err(self.syntax(&tok, format!("use requires an absolute shape id: {id}")));
        }
        self.uses.insert(ids::local_name(&id).to_string(), id);
        Ok(())
    }

    fn parse_metadata(&mut self) -> Result<(), ParseError> {
        self.advance();
        self.docs.clear();
        self.skip_ws()?;
        let tok = self.advance();
        let key = match tok.kind {
            TokenKind::Symbol | TokenKind::String => tok.text.clone(),
            _ => return Err(self.syntax(&tok, "expected a metadata key")),
        };
        self.expect(TokenKind::Equals)?;
        let value = self.parse_node()?;
        if let Some(existing) = self.ast.metadata.get(&key) {
            if *existing != value {
                return Err(self.syntax(&tok, format!("conflicting metadata for {key}")));
            }
        }
        self.ast.metadata.put(key, value);
        Ok(())
    }

    fn parse_apply(&mut self) -> Result<(), ParseError> {
        let kw = self.advance();
        self.docs.clear();
        if !self.pending.is_empty() {
            return Err(self.syntax(&kw, "traits cannot precede an apply statement"));
        }
        let target = self.parse_shape_ref()?;
        self.skip_ws()?;
        if self.at(TokenKind::OpenBrace) {
            self.advance();
            loop {
                self.skip_ws()?;
                if self.at(TokenKind::CloseBrace) {
                    self.advance();
                    break;
                }
                if !self.at(TokenKind::At) {
                    let tok = self.peek().clone();
                    return Err(self.syntax(&tok, "expected a trait in apply block"));
                }
                self.parse_trait()?;
            }
        } else {
            self.parse_trait()?;
        }
        let traits = std::mem::take(&mut self.pending);
        self.docs.clear();
        let (shape, member) = match target.split_once('$') {
            Some((s, m)) => (s.to_string(), Some(m.to_string())),
            None => (target, None),
        };
        self.applies.push(Apply {
            shape,
            member,
            traits,
            line: kw.line,
            column: kw.column,
        });
        Ok(())
    }

    /// `@name` or `@name(...)`, pushed onto the pending trait list.
    fn parse_trait(&mut self) -> Result<(), ParseError> {
        self.expect(TokenKind::At)?;
        let (raw, tok) = self.parse_shape_id_text()?;
        let id = self.resolve_trait_id(&raw, &tok)?;
        let value = if self.at(TokenKind::OpenParen) {
            self.advance();
            self.skip_ws()?;
            let value = if self.at(TokenKind::CloseParen) {
                NodeValue::object()
            } else if self.at_object_key() {
                self.parse_object_body(TokenKind::CloseParen)?
            } else {
                let v = self.parse_node()?;
                self.skip_ws()?;
                v
            };
            self.expect(TokenKind::CloseParen)?;
            value
        } else {
            NodeValue::object()
        };
        self.pending.put(id, value);
        Ok(())
    }

    fn at_object_key(&self) -> bool {
        let tok = self.peek();
        let next = self.tokens.get(self.pos + 1).map(|t| t.kind);
        matches!(tok.kind, TokenKind::Symbol | TokenKind::String) && next == Some(TokenKind::Colon)
    }

    /// Traits collected so far, with doc comments as the documentation trait.
    fn take_traits(&mut self) -> OrderedMap<NodeValue> {
        let mut traits = OrderedMap::new();
        if !self.docs.is_empty() {
            traits.put(traits::DOCUMENTATION, NodeValue::from(self.docs.join("\n")));
            self.docs.clear();
        }
        for (k, v) in std::mem::take(&mut self.pending) {
            traits.put(k, v);
        }
        traits
    }

    // -- node values ----------------------------------------------------------

    fn parse_node(&mut self) -> Result<NodeValue, ParseError> {
        self.skip_ws()?;
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::String => {
                self.advance();
                Ok(NodeValue::String(tok.text))
            }
            TokenKind::Number => {
                self.advance();
                Decimal::parse(&tok.text)
                    .map(NodeValue::Number)
                    .ok_or_else(|| self.syntax(&tok, format!("bad number {}", tok.text)))
            }
            TokenKind::Symbol => match tok.text.as_str() {
                "true" => {
                    self.advance();
                    Ok(NodeValue::Bool(true))
                }
                "false" => {
                    self.advance();
                    Ok(NodeValue::Bool(false))
                }
                "null" => {
                    self.advance();
                    Ok(NodeValue::Null)
                }
                _ => Ok(NodeValue::String(self.parse_shape_id_text()?.0)),
            },
            TokenKind::OpenBracket => {
                self.advance();
                let mut items = Vec::new();
                loop {
                    self.skip_ws()?;
                    if self.at(TokenKind::CloseBracket) {
                        self.advance();
                        break;
                    }
                    items.push(self.parse_node()?);
                }
                Ok(NodeValue::Array(items))
            }
            TokenKind::OpenBrace => {
                self.advance();
                let obj = self.parse_object_body(TokenKind::CloseBrace)?;
                self.expect(TokenKind::CloseBrace)?;
                Ok(obj)
            }
            _ => Err(self.syntax(&tok, format!("expected a value, found {}", tok.kind))),
        }
    }

    /// `key: value` pairs up to (not including) `close`.
    fn parse_object_body(&mut self, close: TokenKind) -> Result<NodeValue, ParseError> {
        let mut map = OrderedMap::new();
        loop {
            self.skip_ws()?;
            if self.at(close) {
                break;
            }
            let tok = self.advance();
            if !matches!(tok.kind, TokenKind::Symbol | TokenKind::String) {
                return Err(self.syntax(&tok, format!("expected an object key, found {}", tok.kind)));
            }
            self.expect(TokenKind::Colon)?;
            let value = self.parse_node()?;
            map.put(tok.text, value);
        }
        Ok(NodeValue::Object(map))
    }

    // -- shapes -------------------------------------------------------------------

    fn declare(&mut self, tok: &Token, id: &str, shape: Shape) -> Result<(), ParseError> {
        if self.ast.shapes.has(id) {
            return Err(ParseError::Reference(
                self.diagnostic(tok, format!("duplicate shape {id}")),
            ));
        }
        self.ast.put_shape(id, shape);
        Ok(())
    }

    fn parse_shape(&mut self) -> Result<(), ParseError> {
        let kw = self.advance();
        let name_tok = self.expect_identifier()?;
        let ns = self.current_namespace(&kw)?;
        let id = ids::absolute(&ns, &name_tok.text);
        let traits = self.take_traits();
        let mut shape = Shape::new(kw.text.as_str());
        shape.traits = traits;
        let mut extra: Vec<(String, Shape)> = Vec::new();

        match kw.text.as_str() {
            t if SIMPLE_TYPES.contains(&t) => {
                self.parse_mixins(&mut shape)?;
            }
            "enum" | "intEnum" => {
                self.parse_mixins(&mut shape)?;
                self.parse_enum_members(&mut shape)?;
            }
            "list" | "set" => {
                if kw.text == "set" {
                    if self.ast.major_version() >= 2 {
                        return Err(ParseError::Unsupported(
                            self.diagnostic(&kw, "set shapes are not supported in version 2 models"),
                        ));
                    }
                    shape.shape_type = "list".to_string();
                    shape.traits.put(traits::UNIQUE_ITEMS, NodeValue::object());
                }
                self.parse_mixins(&mut shape)?;
                let mut members = self.parse_members(&id)?;
                shape.member = Some(self.take_member(&mut members, "member", &kw)?);
            }
            "map" => {
                self.parse_mixins(&mut shape)?;
                let mut members = self.parse_members(&id)?;
                shape.key = Some(self.take_member(&mut members, "key", &kw)?);
                shape.value = Some(self.take_member(&mut members, "value", &kw)?);
            }
            "structure" | "union" => {
                self.parse_structure_body(&id, &mut shape)?;
            }
            "service" => {
                self.parse_mixins(&mut shape)?;
                self.parse_service_body(&mut shape)?;
            }
            "resource" => {
                self.parse_mixins(&mut shape)?;
                self.parse_resource_body(&mut shape)?;
            }
            "operation" => {
                self.parse_mixins(&mut shape)?;
                extra = self.parse_operation_body(&ns, &name_tok.text, &mut shape)?;
            }
            other => {
                return Err(self.syntax(&kw, format!("unknown shape type {other}")));
            }
        }
        self.declare(&name_tok, &id, shape)?;
        for (io_id, io) in extra {
            self.declare(&name_tok, &io_id, io)?;
        }
        Ok(())
    }

    fn take_member(
        &self,
        members: &mut OrderedMap<Member>,
        name: &str,
        tok: &Token,
    ) -> Result<Member, ParseError> {
        members
            .delete(name)
            .ok_or_else(|| self.syntax(tok, format!("missing `{name}` member")))
    }

    /// Optional `with [A, B]`.
    fn parse_mixins(&mut self, shape: &mut Shape) -> Result<(), ParseError> {
        self.skip_ws()?;
        if !self.at_symbol("with") {
            return Ok(());
        }
        self.advance();
        self.expect(TokenKind::OpenBracket)?;
        loop {
            self.skip_ws()?;
            if self.at(TokenKind::CloseBracket) {
                self.advance();
                break;
            }
            let target = self.parse_shape_ref()?;
            shape.mixins.push(ShapeRef::new(target));
        }
        Ok(())
    }

    /// `[for Resource] [with [..]] { members }`
    fn parse_structure_body(&mut self, id: &str, shape: &mut Shape) -> Result<(), ParseError> {
        self.skip_ws()?;
        if self.at_symbol("for") {
            self.advance();
            let resource = self.parse_shape_ref()?;
            self.bound_resources.insert(id.to_string(), resource);
        }
        self.parse_mixins(shape)?;
        shape.members = self.parse_members(id)?;
        Ok(())
    }

    /// `{ [traits] name: Target [= default] ... }`, including elided `$name`.
    fn parse_members(&mut self, shape_id: &str) -> Result<OrderedMap<Member>, ParseError> {
        self.expect(TokenKind::OpenBrace)?;
        self.docs.clear();
        let mut members = OrderedMap::new();
        loop {
            self.skip_ws()?;
            let tok = self.peek().clone();
            match tok.kind {
                TokenKind::CloseBrace => {
                    self.advance();
                    break;
                }
                TokenKind::At => {
                    self.parse_trait()?;
                    continue;
                }
                _ => {}
            }
            let elided = tok.kind == TokenKind::Dollar;
            if elided {
                self.advance();
            }
            let name_tok = self.expect_identifier()?;
            let target = if elided {
                self.elided.push(Elided {
                    shape: shape_id.to_string(),
                    member: name_tok.text.clone(),
                    line: name_tok.line,
                    column: name_tok.column,
                });
                String::new()
            } else {
                self.expect(TokenKind::Colon)?;
                self.parse_shape_ref()?
            };
            let mut member = Member::new(target);
            member.traits = self.take_traits();
            self.skip_ws()?;
            if self.at(TokenKind::Equals) {
                self.advance();
                let value = self.parse_node()?;
                member.traits.put(traits::DEFAULT, value);
            }
            if members.has(&name_tok.text) {
                return Err(self.syntax(&name_tok, format!("duplicate member {}", name_tok.text)));
            }
            members.put(name_tok.text, member);
        }
        if !self.pending.is_empty() {
            let tok = self.peek().clone();
            return Err(self.syntax(&tok, "traits are not followed by a member"));
        }
        self.docs.clear();
        Ok(members)
    }

    fn parse_enum_members(&mut self, shape: &mut Shape) -> Result<(), ParseError> {
        self.expect(TokenKind::OpenBrace)?;
        self.docs.clear();
        loop {
            self.skip_ws()?;
            let tok = self.peek().clone();
            match tok.kind {
                TokenKind::CloseBrace => {
                    self.advance();
                    break;
                }
                TokenKind::At => {
                    self.parse_trait()?;
                    continue;
                }
                _ => {}
            }
            let name_tok = self.expect_identifier()?;
            let mut member = Member::new(format!("{PRELUDE_NAMESPACE}#Unit"));
            member.traits = self.take_traits();
            self.skip_ws()?;
            if self.at(TokenKind::Equals) {
                self.advance();
                let value = self.parse_node()?;
                member.traits.put(traits::ENUM_VALUE, value);
            }
            if shape.members.has(&name_tok.text) {
                return Err(self.syntax(&name_tok, format!("duplicate member {}", name_tok.text)));
            }
            shape.members.put(name_tok.text, member);
        }
        self.docs.clear();
        Ok(())
    }

    fn parse_shape_ref_list(&mut self) -> Result<Vec<ShapeRef>, ParseError> {
        self.expect(TokenKind::OpenBracket)?;
        let mut refs = Vec::new();
        loop {
            self.skip_ws()?;
            if self.at(TokenKind::CloseBracket) {
                self.advance();
                break;
            }
            refs.push(ShapeRef::new(self.parse_shape_ref()?));
        }
        Ok(refs)
    }

    fn parse_shape_ref_map(&mut self) -> Result<OrderedMap<ShapeRef>, ParseError> {
        self.expect(TokenKind::OpenBrace)?;
        let mut map = OrderedMap::new();
        loop {
            self.skip_ws()?;
            if self.at(TokenKind::CloseBrace) {
                self.advance();
                break;
            }
            let key = self.advance();
            if !matches!(key.kind, TokenKind::Symbol | TokenKind::String) {
                return Err(self.syntax(&key, "expected a key"));
            }
            self.expect(TokenKind::Colon)?;
            map.put(key.text, ShapeRef::new(self.parse_shape_ref()?));
        }
        Ok(map)
    }

    fn parse_service_body(&mut self, shape: &mut Shape) -> Result<(), ParseError> {
        self.expect(TokenKind::OpenBrace)?;
        loop {
            self.skip_ws()?;
            if self.at(TokenKind::CloseBrace) {
                self.advance();
                break;
            }
            let key = self.expect_identifier()?;
            self.expect(TokenKind::Colon)?;
            match key.text.as_str() {
                "version" => {
                    let value = self.parse_node()?;
                    let version = value
                        .as_string()
                        .ok_or_else(|| self.syntax(&key, "service version must be a string"))?;
                    shape.version = Some(version.to_string());
                }
                "operations" => shape.operations = self.parse_shape_ref_list()?,
                "resources" => shape.resources = self.parse_shape_ref_list()?,
                "errors" => shape.errors = self.parse_shape_ref_list()?,
                other => {
                    self.parse_node()?;
                    warn!(
                        "[WARNING]: {}:{}:{}: ignoring service property {}",
                        self.path, key.line, key.column, other
                    );
                }
            }
        }
        self.docs.clear();
        Ok(())
    }

    fn parse_resource_body(&mut self, shape: &mut Shape) -> Result<(), ParseError> {
        self.expect(TokenKind::OpenBrace)?;
        loop {
            self.skip_ws()?;
            if self.at(TokenKind::CloseBrace) {
                self.advance();
                break;
            }
            let key = self.expect_identifier()?;
            self.expect(TokenKind::Colon)?;
            match key.text.as_str() {
                "identifiers" => shape.identifiers = self.parse_shape_ref_map()?,
                "properties" => shape.properties = self.parse_shape_ref_map()?,
                "create" => shape.create = Some(ShapeRef::new(self.parse_shape_ref()?)),
                "put" => shape.put = Some(ShapeRef::new(self.parse_shape_ref()?)),
                "read" => shape.read = Some(ShapeRef::new(self.parse_shape_ref()?)),
                "update" => shape.update = Some(ShapeRef::new(self.parse_shape_ref()?)),
                "delete" => shape.delete = Some(ShapeRef::new(self.parse_shape_ref()?)),
                "list" => shape.list = Some(ShapeRef::new(self.parse_shape_ref()?)),
                "operations" => shape.operations = self.parse_shape_ref_list()?,
                "collectionOperations" => {
                    shape.collection_operations = self.parse_shape_ref_list()?
                }
                "resources" => shape.resources = self.parse_shape_ref_list()?,
                other => {
                    return Err(self.syntax(&key, format!("unknown resource property {other}")));
                }
            }
        }
        self.docs.clear();
        Ok(())
    }

    /// Operation body. Inline `input :=` / `output :=` structures are
    /// returned so they can be declared after the operation itself.
    fn parse_operation_body(
        &mut self,
        ns: &str,
        name: &str,
        shape: &mut Shape,
    ) -> Result<Vec<(String, Shape)>, ParseError> {
        let mut inline = Vec::new();
        self.expect(TokenKind::OpenBrace)?;
        loop {
            self.skip_ws()?;
            if self.at(TokenKind::CloseBrace) {
                self.advance();
                break;
            }
            let key = self.expect_identifier()?;
            self.skip_ws()?;
            let walrus = self.at(TokenKind::Colon)
                && self
                    .tokens
                    .get(self.pos + 1)
                    .is_some_and(|t| t.kind == TokenKind::Equals);
            match key.text.as_str() {
                "input" | "output" if walrus => {
                    self.advance();
                    self.advance();
                    let (suffix, marker) = if key.text == "input" {
                        (self.input_suffix.clone(), traits::INPUT)
                    } else {
                        (self.output_suffix.clone(), traits::OUTPUT)
                    };
                    let io_id = ids::absolute(ns, &format!("{name}{suffix}"));
                    self.docs.clear();
                    self.skip_ws()?;
                    while self.at(TokenKind::At) {
                        self.parse_trait()?;
                        self.skip_ws()?;
                    }
                    let mut io = Shape::new("structure");
                    io.traits.put(marker, NodeValue::object());
                    for (k, v) in self.take_traits() {
                        io.traits.put(k, v);
                    }
                    self.parse_structure_body(&io_id, &mut io)?;
                    let target = ShapeRef::new(io_id.clone());
                    if key.text == "input" {
                        shape.input = Some(target);
                    } else {
                        shape.output = Some(target);
                    }
                    inline.push((io_id, io));
                }
                "input" => {
                    self.expect(TokenKind::Colon)?;
                    shape.input = Some(ShapeRef::new(self.parse_shape_ref()?));
                }
                "output" => {
                    self.expect(TokenKind::Colon)?;
                    shape.output = Some(ShapeRef::new(self.parse_shape_ref()?));
                }
                "errors" => {
                    self.expect(TokenKind::Colon)?;
                    shape.errors = self.parse_shape_ref_list()?;
                }
                other => {
                    return Err(self.syntax(&key, format!("unknown operation property {other}")));
                }
            }
        }
        self.docs.clear();
        Ok(inline)
    }

    // -- post-processing --------------------------------------------------------

    /// Relative names that matched nothing in this file fall back to the prelude.
    fn bind_prelude(&mut self) {
        let Some(ns) = self.namespace.clone() else {
            return;
        };
        let prefix = format!("{ns}#");
        let declared: Vec<String> = self.ast.shape_ids();
        for shape in self.ast.shapes.values_mut() {
            for target in shape.targets_mut() {
                let Some(name) = target.strip_prefix(&prefix) else {
                    continue;
                };
                if prelude::is_prelude_shape(name) && !declared.iter().any(|d| d.as_str() == target.as_str()) {
                    *target = prelude::shape_id(name);
                }
            }
        }
    }

    fn resolve_elided(&mut self) -> Result<(), ParseError> {
        for e in std::mem::take(&mut self.elided) {
            let Some(shape) = self.ast.get_shape(&e.shape) else {
                continue;
            };
            let from_resource = self
                .bound_resources
                .get(&e.shape)
                .and_then(|r| self.ast.get_shape(r))
                .and_then(|r| r.identifiers.get(&e.member).or(r.properties.get(&e.member)))
                .map(|r| r.target.clone());
            let from_mixin = shape
                .mixins
                .iter()
                .find_map(|m| self.ast.flattened_members(&m.target).get(&e.member).cloned());
            let target = match (&from_resource, &from_mixin) {
                (Some(t), _) => t.clone(),
                (None, Some(m)) if !m.target.is_empty() => m.target.clone(),
                _ => {
                    let tok = Token {
                        kind: TokenKind::Symbol,
                        text: e.member.clone(),
                        line: e.line,
                        column: e.column,
                    };
                    return Err(ParseError::Reference(self.diagnostic(
                        &tok,
                        format!("cannot resolve target of elided member ${}", e.member),
                    )));
                }
            };
            let mut traits = from_mixin.map(|m| m.traits).unwrap_or_default();
            if let Some(member) = self
                .ast
                .shapes
                .get_mut(&e.shape)
                .and_then(|s| s.members.get_mut(&e.member))
            {
                for (k, v) in std::mem::take(&mut member.traits) {
                    traits.put(k, v);
                }
                member.target = target;
                member.traits = traits;
            }
        }
        Ok(())
    }

    fn run_applies(&mut self) -> Result<(), ParseError> {
        for apply in std::mem::take(&mut self.applies) {
            let tok = Token {
                kind: TokenKind::Symbol,
                text: apply.shape.clone(),
                line: apply.line,
                column: apply.column,
            };
            let unresolved = || format!("apply target {} is not defined in this file", apply.shape);
            let Some(shape) = self.ast.shapes.get_mut(&apply.shape) else {
                let diag = Diagnostic::new(unresolved(), &self.path, self.source, tok.line, tok.column);
                return Err(ParseError::Reference(diag));
            };
            let traits = match &apply.member {
                None => &mut shape.traits,
                Some(m) => {
                    let member = match m.as_str() {
                        "member" => shape.member.as_mut(),
                        "key" => shape.key.as_mut(),
                        "value" => shape.value.as_mut(),
                        _ => None,
                    };
                    match member {
                        Some(member) => &mut member.traits,
                        None => match shape.members.get_mut(m) {
                            Some(member) => &mut member.traits,
                            None => {
                                let msg = format!("{}${} has no such member", apply.shape, m);
                                let diag =
                                    Diagnostic::new(msg, &self.path, self.source, tok.line, tok.column);
                                return Err(ParseError::Reference(diag));
                            }
                        },
                    }
                }
            };
            for (k, v) in apply.traits {
                traits.put(k, v);
            }
        }
        Ok(())
    }

    /// Strings carrying the legacy `@enum` trait become `enum` shapes.
    fn rewrite_enum_traits(&mut self) {
        for shape in self.ast.shapes.values_mut() {
            if shape.shape_type != "string" {
                continue;
            }
            let Some(NodeValue::Array(entries)) = shape.traits.delete(traits::ENUM) else {
                continue;
            };
            shape.shape_type = "enum".to_string();
            for entry in entries {
                let Some(value) = entry.get_string("value") else {
                    continue;
                };
                let name = entry
                    .get_string("name")
                    .map(str::to_string)
                    .unwrap_or_else(|| enum_symbol(value));
                let mut member = Member::new(format!("{PRELUDE_NAMESPACE}#Unit"));
                member.traits.put(traits::ENUM_VALUE, NodeValue::from(value));
                if let Some(doc) = entry.get_string("documentation") {
                    member.traits.put(traits::DOCUMENTATION, NodeValue::from(doc));
                }
                shape.members.put(name, member);
            }
        }
    }
}

/// A member name for an enum value that is not itself an identifier.
fn enum_symbol(value: &str) -> String {
    if ids::is_identifier(value) {
        return value.to_string();
    }
    let mut symbol: String = value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if !symbol.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        symbol.insert(0, '_');
    }
    symbol
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Ast {
        parse("test.smithy", src).unwrap()
    }

    #[test]
    fn test_structure_members_and_prelude() {
        let ast = parse_ok(
            r#"$version: "2"
namespace example.items

/// An item.
structure Foo {
    @required
    name: String
    age: Integer
    next: Foo
}
"#,
        );
        assert_eq!(ast.smithy, "2.0");
        let foo = ast.get_shape("example.items#Foo").unwrap();
        assert_eq!(foo.shape_type, "structure");
        assert_eq!(foo.members.keys(), vec!["name", "age", "next"]);
        let name = foo.members.get("name").unwrap();
        assert_eq!(name.target, "smithy.api#String");
        assert!(name.has_trait("smithy.api#required"));
        assert_eq!(foo.members.get("age").unwrap().target, "smithy.api#Integer");
        assert_eq!(foo.members.get("next").unwrap().target, "example.items#Foo");
        assert_eq!(
            foo.traits.get(traits::DOCUMENTATION).and_then(NodeValue::as_string),
            Some("An item.")
        );
    }

    #[test]
    fn test_inline_operation_io() {
        let ast = parse_ok(
            r#"$version: "2"
namespace example.items

@http(method: "GET", uri: "/items/{id}")
@readonly
operation GetItem {
    input := {
        @required
        @httpLabel
        id: String
    }
    output := {
        @httpPayload
        item: Item
    }
    errors: [NotFound]
}

structure Item {}

@error("client")
@httpError(404)
structure NotFound {}
"#,
        );
        assert_eq!(
            ast.shape_ids(),
            vec![
                "example.items#GetItem",
                "example.items#GetItemInput",
                "example.items#GetItemOutput",
                "example.items#Item",
                "example.items#NotFound",
            ]
        );
        let op = ast.get_shape("example.items#GetItem").unwrap();
        assert_eq!(op.input.as_ref().unwrap().target, "example.items#GetItemInput");
        assert_eq!(op.errors[0].target, "example.items#NotFound");
        let http = op.traits.get("smithy.api#http").unwrap();
        assert_eq!(http.get_string("uri"), Some("/items/{id}"));
        let input = ast.get_shape("example.items#GetItemInput").unwrap();
        assert!(input.has_trait(traits::INPUT));
        let err = ast.get_shape("example.items#NotFound").unwrap();
        assert_eq!(err.traits.get("smithy.api#httpError").and_then(NodeValue::as_int), Some(404));
        assert_eq!(err.traits.get("smithy.api#error").and_then(NodeValue::as_string), Some("client"));
    }

    #[test]
    fn test_use_and_custom_traits() {
        let ast = parse_ok(
            r#"namespace example.a
use example.b#Shared

@customThing(level: 3)
structure A { s: Shared }
"#,
        );
        let a = ast.get_shape("example.a#A").unwrap();
        assert_eq!(a.members.get("s").unwrap().target, "example.b#Shared");
        let custom = a.traits.get("example.a#customThing").unwrap();
        assert_eq!(custom.get_int("level", 0), 3);
    }

    #[test]
    fn test_elided_members_from_resource_and_mixin() {
        let ast = parse_ok(
            r#"$version: "2"
namespace example.r

resource City {
    identifiers: { cityId: CityId }
    read: GetCity
}

string CityId

@mixin
structure Named {
    @required
    name: String
}

structure CityData for City with [Named] {
    $cityId
    @documentation("the name")
    $name
}
"#,
        );
        let data = ast.get_shape("example.r#CityData").unwrap();
        let id = data.members.get("cityId").unwrap();
        assert_eq!(id.target, "example.r#CityId");
        let name = data.members.get("name").unwrap();
        assert_eq!(name.target, "smithy.api#String");
        assert!(name.has_trait("smithy.api#required"));
        assert!(name.has_trait(traits::DOCUMENTATION));
    }

    #[test]
    fn test_unresolvable_elision_is_reference_error() {
        let err = parse("x.smithy", "$version: \"2\"\nnamespace a\nstructure S { $nope }\n").unwrap_err();
        assert!(matches!(err, ParseError::Reference(_)));
    }

    #[test]
    fn test_apply_and_defaults() {
        let ast = parse_ok(
            r#"$version: "2"
namespace a
structure S {
    count: Integer = 5
}
apply S$count @range(min: 1, max: 10)
apply S {
    @tags(["x"])
}
"#,
        );
        let s = ast.get_shape("a#S").unwrap();
        let count = s.members.get("count").unwrap();
        assert_eq!(count.traits.get(traits::DEFAULT).and_then(NodeValue::as_int), Some(5));
        assert_eq!(
            count.traits.get("smithy.api#range").map(|r| r.get_int("max", 0)),
            Some(10)
        );
        assert_eq!(s.tags(), vec!["x"]);
    }

    #[test]
    fn test_apply_to_unknown_shape_fails() {
        let err = parse("x.smithy", "namespace a\napply Other @sensitive\n").unwrap_err();
        assert!(matches!(err, ParseError::Reference(_)));
    }

    #[test]
    fn test_enum_shapes_and_v1_rewrite() {
        let ast = parse_ok(
            r#"$version: "1.0"
namespace a

@enum([{value: "dry-cleaning", name: "DRY"}, {value: "wash"}])
string Service

set Tags { member: String }
"#,
        );
        let svc = ast.get_shape("a#Service").unwrap();
        assert_eq!(svc.shape_type, "enum");
        assert_eq!(svc.members.keys(), vec!["DRY", "wash"]);
        assert_eq!(
            svc.members
                .get("DRY")
                .and_then(|m| m.traits.get(traits::ENUM_VALUE))
                .and_then(NodeValue::as_string),
            Some("dry-cleaning")
        );
        let tags = ast.get_shape("a#Tags").unwrap();
        assert_eq!(tags.shape_type, "list");
        assert!(tags.has_trait("smithy.api#uniqueItems"));
    }

    #[test]
    fn test_set_rejected_in_v2() {
        let err = parse("x.smithy", "$version: \"2\"\nnamespace a\nset S { member: String }\n").unwrap_err();
        assert!(matches!(err, ParseError::Unsupported(_)));
    }

    #[test]
    fn test_syntax_error_location() {
        colored::control::set_override(false);
        let err = parse("bad.smithy", "namespace a\n\nstructure {\n").unwrap_err();
        let diag = err.diagnostic().unwrap();
        assert_eq!((diag.line, diag.column), (3, 11));
        assert!(err.to_string().starts_with("*** expected an identifier"));
        assert!(err.to_string().contains("bad.smithy:3:11"));
    }

    #[test]
    fn test_unterminated_string_is_lexical() {
        let err = parse("x.smithy", "namespace a\n@documentation(\"oops\nstring S\n").unwrap_err();
        assert!(matches!(err, ParseError::Lexical(_)));
    }

    #[test]
    fn test_service_and_metadata() {
        let ast = parse_ok(
            r#"$version: "2"
metadata owner = "team"
namespace a

service Svc {
    version: "2024-01-01"
    operations: [Ping]
    errors: [Oops]
}

operation Ping {}

@error("server")
structure Oops {}
"#,
        );
        assert_eq!(ast.metadata.get("owner").and_then(NodeValue::as_string), Some("team"));
        let (id, svc) = ast.service().unwrap();
        assert_eq!(id, "a#Svc");
        assert_eq!(svc.version.as_deref(), Some("2024-01-01"));
        assert_eq!(svc.operations[0].target, "a#Ping");
        assert_eq!(svc.errors[0].target, "a#Oops");
    }
}
