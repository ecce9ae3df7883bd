//! The built-in declaration scanner.
//!
//! Recursive descent over the token stream, producing [`Decl`] trees.
//! Only declarations matter: function bodies are brace-skipped, and
//! anything the scanner cannot classify is passed over at the next
//! statement boundary rather than failing the whole translation unit.

use thiserror::Error;

use super::lexer::{clean_doc, lex, TokKind, Token};
use super::{BaseDecl, Decl, DeclKind, FnSpecDecl, FunctionDeclKind, ParamDecl};
use crate::symbol::{Access, RecordTag, SourceLocation};

/// A failure the scanner cannot recover from.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("unbalanced braces starting at line {0}")]
    Unbalanced(u32),
    #[error("unexpected end of file in {0}")]
    UnexpectedEof(&'static str),
}

/// Scan a source text into top-level declaration records.
pub fn scan(source: &str, file: &str) -> Result<Vec<Decl>, ScanError> {
    let tokens = lex(source);
    let mut scanner = Scanner {
        tokens: &tokens,
        pos: 0,
        file,
    };
    scanner.scope(&Container::Namespace)
}

enum Container {
    Namespace,
    Record { tag: RecordTag, name: String },
}

impl Container {
    fn default_access(&self) -> Access {
        match self {
            Container::Namespace => Access::None,
            Container::Record {
                tag: RecordTag::Class,
                ..
            } => Access::Private,
            Container::Record { .. } => Access::Public,
        }
    }
}

/// Builtin type words that never act as a declarator name.
fn is_builtin_type_word(text: &str) -> bool {
    matches!(
        text,
        "void"
            | "bool"
            | "char"
            | "wchar_t"
            | "char8_t"
            | "char16_t"
            | "char32_t"
            | "short"
            | "int"
            | "long"
            | "signed"
            | "unsigned"
            | "float"
            | "double"
            | "auto"
            | "size_t"
            | "ptrdiff_t"
    )
}

struct Scanner<'a> {
    tokens: &'a [Token],
    pos: usize,
    file: &'a str,
}

impl<'a> Scanner<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self, ahead: usize) -> Option<TokKind> {
        self.tokens.get(self.pos + ahead).map(|t| t.kind)
    }

    fn bump(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokKind) -> bool {
        if self.peek_kind(0) == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn loc_here(&self) -> SourceLocation {
        match self.peek() {
            Some(token) => SourceLocation::new(self.file, token.line, token.column),
            None => SourceLocation::new(self.file, 0, 0),
        }
    }

    /// Consume a run of doc-comment tokens preceding a declaration.
    fn take_doc(&mut self) -> Option<String> {
        let mut lines: Vec<String> = Vec::new();
        while let Some(token) = self.peek() {
            match token.kind {
                TokKind::DocLine => {
                    lines.push(clean_doc(token));
                    self.pos += 1;
                }
                TokKind::DocBlock => {
                    lines.push(clean_doc(token));
                    self.pos += 1;
                }
                // File-level comments do not attach to declarations.
                TokKind::ModLine => {
                    self.pos += 1;
                    lines.clear();
                }
                _ => break,
            }
        }
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    /// Parse declarations until the closing brace of the current scope.
    fn scope(&mut self, container: &Container) -> Result<Vec<Decl>, ScanError> {
        let mut decls = Vec::new();
        let mut access = container.default_access();
        loop {
            while self.eat(TokKind::Semi) {}
            let doc = self.take_doc();
            let Some(token) = self.peek() else { break };
            match token.kind {
                TokKind::RBrace => break,
                TokKind::Public | TokKind::Protected | TokKind::Private
                    if self.peek_kind(1) == Some(TokKind::Colon) =>
                {
                    access = match token.kind {
                        TokKind::Public => Access::Public,
                        TokKind::Protected => Access::Protected,
                        _ => Access::Private,
                    };
                    self.pos += 2;
                }
                TokKind::Namespace => decls.extend(self.namespace(doc)?),
                TokKind::Template => {
                    if let Some(decl) = self.template_decl(doc, access, container)? {
                        decls.push(decl);
                    }
                }
                TokKind::Friend => decls.push(self.friend_decl(doc, access)?),
                TokKind::Class | TokKind::Struct | TokKind::Union => {
                    decls.push(self.record(doc, access, false)?);
                }
                TokKind::Enum => decls.push(self.enum_decl(doc, access)?),
                TokKind::Typedef => {
                    if let Some(decl) = self.typedef_decl(doc, access) {
                        decls.push(decl);
                    }
                }
                TokKind::Using => {
                    if let Some(decl) = self.using_decl(doc, access) {
                        decls.push(decl);
                    }
                }
                TokKind::Extern
                    if self.peek_kind(1) == Some(TokKind::Str)
                        && self.peek_kind(2) == Some(TokKind::LBrace) =>
                {
                    self.pos += 3;
                    decls.extend(self.scope(container)?);
                    if !self.eat(TokKind::RBrace) {
                        return Err(ScanError::UnexpectedEof("extern block"));
                    }
                }
                _ => {
                    if let Some(decl) = self.general_decl(doc, access, container)? {
                        decls.push(decl);
                    }
                }
            }
        }
        Ok(decls)
    }

    /// `namespace a::b { … }`, possibly anonymous.
    fn namespace(&mut self, doc: Option<String>) -> Result<Vec<Decl>, ScanError> {
        self.bump();
        let loc = self.loc_here();
        let mut names = Vec::new();
        while self.peek_kind(0) == Some(TokKind::Ident) {
            names.push(self.bump().map(|t| t.text.clone()).unwrap_or_default());
            if !self.eat(TokKind::ColonColon) {
                break;
            }
        }
        if !self.eat(TokKind::LBrace) {
            // Not a namespace definition we understand; resynchronize.
            self.skip_statement()?;
            return Ok(Vec::new());
        }
        let children = self.scope(&Container::Namespace)?;
        if !self.eat(TokKind::RBrace) {
            return Err(ScanError::UnexpectedEof("namespace"));
        }

        let anonymous = names.is_empty();
        let mut inner = children;
        let mut doc = doc;
        // Innermost name owns the children; wrap outward.
        for (depth, name) in names.iter().enumerate().rev() {
            let mut decl = Decl::new(DeclKind::Namespace, name.clone(), loc.clone());
            decl.children = inner;
            if depth == 0 {
                decl.comment = doc.take();
            }
            inner = vec![decl];
        }
        if anonymous {
            let mut decl = Decl::new(DeclKind::Namespace, "", loc);
            decl.internal_linkage = true;
            decl.comment = doc;
            decl.children = inner;
            Ok(vec![decl])
        } else {
            Ok(inner)
        }
    }

    /// A `template <…>` header followed by the declaration it introduces.
    fn template_decl(
        &mut self,
        doc: Option<String>,
        access: Access,
        container: &Container,
    ) -> Result<Option<Decl>, ScanError> {
        self.bump();
        let mut explicit_spec = false;
        if self.peek_kind(0) == Some(TokKind::Lt) {
            let header = self.collect_angle_group()?;
            explicit_spec = header.is_empty();
        }
        match self.peek_kind(0) {
            Some(TokKind::Class | TokKind::Struct | TokKind::Union) => {
                Ok(Some(self.record(doc, access, explicit_spec)?))
            }
            Some(TokKind::Friend) => Ok(Some(self.friend_decl(doc, access)?)),
            Some(TokKind::Using) => Ok(self.using_decl(doc, access)),
            Some(_) => self.general_decl(doc, access, container),
            None => Ok(None),
        }
    }

    /// `friend …;`, captured verbatim.
    fn friend_decl(&mut self, doc: Option<String>, access: Access) -> Result<Decl, ScanError> {
        self.bump();
        let loc = self.loc_here();
        let body = self.collect_until_statement_end()?;
        let target = join_tokens(&body);
        let name = body
            .iter()
            .rev()
            .find(|t| t.kind == TokKind::Ident)
            .map(|t| t.text.clone())
            .unwrap_or_else(|| target.clone());
        let mut decl = Decl::new(DeclKind::Friend { target }, name, loc);
        decl.access = access;
        decl.comment = doc;
        Ok(decl)
    }

    /// `class|struct|union name … ;` or `… { members };`
    fn record(
        &mut self,
        doc: Option<String>,
        access: Access,
        explicit_spec: bool,
    ) -> Result<Decl, ScanError> {
        let tag = match self.bump().map(|t| t.kind) {
            Some(TokKind::Class) => RecordTag::Class,
            Some(TokKind::Union) => RecordTag::Union,
            _ => RecordTag::Struct,
        };
        let loc = self.loc_here();
        let name = if self.peek_kind(0) == Some(TokKind::Ident) {
            self.bump().map(|t| t.text.clone()).unwrap_or_default()
        } else {
            String::new()
        };
        let spec_args = if self.peek_kind(0) == Some(TokKind::Lt) {
            let group = self.collect_angle_group()?;
            Some(join_tokens(&group))
        } else {
            None
        };
        self.eat(TokKind::Final);

        let kind = match spec_args {
            Some(args) if explicit_spec || !args.is_empty() => DeclKind::Specialization {
                tag,
                primary: name.clone(),
                args,
            },
            _ => DeclKind::Record {
                tag,
                bases: Vec::new(),
            },
        };
        let mut decl = Decl::new(kind, name.clone(), loc);
        decl.access = access;
        decl.comment = doc;

        if self.eat(TokKind::Semi) || self.peek().is_none() {
            decl.is_definition = false;
            return Ok(decl);
        }

        if self.eat(TokKind::Colon) {
            let mut bases = Vec::new();
            loop {
                let mut base_access = match tag {
                    RecordTag::Class => Access::Private,
                    _ => Access::Public,
                };
                let mut is_virtual = false;
                loop {
                    match self.peek_kind(0) {
                        Some(TokKind::Virtual) => {
                            is_virtual = true;
                            self.pos += 1;
                        }
                        Some(TokKind::Public) => {
                            base_access = Access::Public;
                            self.pos += 1;
                        }
                        Some(TokKind::Protected) => {
                            base_access = Access::Protected;
                            self.pos += 1;
                        }
                        Some(TokKind::Private) => {
                            base_access = Access::Private;
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                let ty_tokens =
                    self.collect_until(&[TokKind::Comma, TokKind::LBrace], "base clause")?;
                bases.push(BaseDecl {
                    ty: join_tokens(&ty_tokens),
                    access: base_access,
                    is_virtual,
                });
                if !self.eat(TokKind::Comma) {
                    break;
                }
            }
            if let DeclKind::Record {
                bases: ref mut slot,
                ..
            } = decl.kind
            {
                *slot = bases;
            }
        }

        if !self.eat(TokKind::LBrace) {
            // A declarator form we do not model; resynchronize.
            self.skip_statement()?;
            decl.is_definition = false;
            return Ok(decl);
        }
        let container = Container::Record { tag, name };
        decl.children = self.scope(&container)?;
        if !self.eat(TokKind::RBrace) {
            return Err(ScanError::UnexpectedEof("record body"));
        }
        // Any trailing declarator (`} x;`) is not part of the record.
        self.skip_statement()?;
        Ok(decl)
    }

    /// `enum [class] name [: underlying] { values };`
    fn enum_decl(&mut self, doc: Option<String>, access: Access) -> Result<Decl, ScanError> {
        self.bump();
        let scoped = self.eat(TokKind::Class) || self.eat(TokKind::Struct);
        let loc = self.loc_here();
        let name = if self.peek_kind(0) == Some(TokKind::Ident) {
            self.bump().map(|t| t.text.clone()).unwrap_or_default()
        } else {
            String::new()
        };
        let underlying = if self.eat(TokKind::Colon) {
            let tokens = self.collect_until(&[TokKind::LBrace, TokKind::Semi], "enum base")?;
            Some(join_tokens(&tokens))
        } else {
            None
        };
        let mut decl = Decl::new(DeclKind::Enum { scoped, underlying }, name, loc);
        decl.access = access;
        decl.comment = doc;

        if !self.eat(TokKind::LBrace) {
            self.eat(TokKind::Semi);
            decl.is_definition = false;
            return Ok(decl);
        }
        loop {
            let value_doc = self.take_doc();
            if self.peek_kind(0) != Some(TokKind::Ident) {
                break;
            }
            let value_loc = self.loc_here();
            let value_name = self.bump().map(|t| t.text.clone()).unwrap_or_default();
            let init = if self.eat(TokKind::Eq) {
                let tokens =
                    self.collect_until(&[TokKind::Comma, TokKind::RBrace], "enumerator")?;
                Some(join_tokens(&tokens))
            } else {
                None
            };
            let mut value = Decl::new(DeclKind::EnumValue { init }, value_name, value_loc);
            value.access = access;
            value.comment = value_doc;
            decl.children.push(value);
            if !self.eat(TokKind::Comma) {
                break;
            }
        }
        if !self.eat(TokKind::RBrace) {
            return Err(ScanError::UnexpectedEof("enum body"));
        }
        self.eat(TokKind::Semi);
        Ok(decl)
    }

    /// `typedef <type> name;`
    fn typedef_decl(&mut self, doc: Option<String>, access: Access) -> Option<Decl> {
        self.bump();
        let loc = self.loc_here();
        let body = self.collect_until_statement_end().ok()?;
        // The declarator name: inside `(*name)` for function pointers,
        // otherwise the last identifier.
        let name_index = body
            .windows(2)
            .position(|w| w[0].kind == TokKind::Star && w[1].kind == TokKind::Ident)
            .map(|i| i + 1)
            .or_else(|| body.iter().rposition(|t| t.kind == TokKind::Ident))?;
        let name = body[name_index].text.clone();
        let mut underlying: Vec<Token> = body.clone();
        underlying.remove(name_index);
        let mut decl = Decl::new(
            DeclKind::Typedef {
                underlying: join_tokens(&underlying),
            },
            name,
            loc,
        );
        decl.access = access;
        decl.comment = doc;
        Some(decl)
    }

    /// `using name = type;`. Other `using` forms are skipped.
    fn using_decl(&mut self, doc: Option<String>, access: Access) -> Option<Decl> {
        self.bump();
        if self.peek_kind(0) == Some(TokKind::Namespace) {
            let _ = self.skip_statement();
            return None;
        }
        let loc = self.loc_here();
        if self.peek_kind(0) != Some(TokKind::Ident) || self.peek_kind(1) != Some(TokKind::Eq) {
            let _ = self.skip_statement();
            return None;
        }
        let name = self.bump().map(|t| t.text.clone()).unwrap_or_default();
        self.bump();
        let body = self.collect_until_statement_end().ok()?;
        let mut decl = Decl::new(
            DeclKind::Typedef {
                underlying: join_tokens(&body),
            },
            name,
            loc,
        );
        decl.access = access;
        decl.comment = doc;
        Some(decl)
    }

    /// Functions, variables, and fields.
    fn general_decl(
        &mut self,
        doc: Option<String>,
        access: Access,
        container: &Container,
    ) -> Result<Option<Decl>, ScanError> {
        let loc = self.loc_here();
        let mut specs = FnSpecDecl::default();
        let mut is_static = false;
        let mut is_extern = false;
        loop {
            match self.peek_kind(0) {
                Some(TokKind::Static) => {
                    is_static = true;
                    self.pos += 1;
                }
                Some(TokKind::Inline | TokKind::Mutable) => self.pos += 1,
                Some(TokKind::Extern) => {
                    is_extern = true;
                    self.pos += 1;
                    if self.peek_kind(0) == Some(TokKind::Str) {
                        self.pos += 1;
                    }
                }
                Some(TokKind::Virtual) => {
                    specs.is_virtual = true;
                    self.pos += 1;
                }
                Some(TokKind::Explicit) => {
                    specs.is_explicit = true;
                    self.pos += 1;
                }
                Some(TokKind::Constexpr) => {
                    specs.is_constexpr = true;
                    self.pos += 1;
                }
                Some(TokKind::Consteval) => {
                    specs.is_consteval = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }

        let (body, saw_body) = self.collect_declaration()?;
        if body.is_empty() {
            return Ok(None);
        }

        let record_name = match container {
            Container::Record { name, .. } => Some(name.as_str()),
            Container::Namespace => None,
        };
        let mut decl = match analyze_declaration(&body, record_name, specs) {
            Analyzed::Function { name, kind } => {
                let mut decl = Decl::new(kind, name, loc);
                decl.is_definition = saw_body;
                if let DeclKind::Function { specs, .. } = &decl.kind {
                    if specs.is_defaulted {
                        decl.is_definition = true;
                    }
                }
                decl
            }
            Analyzed::Variable { name, ty, init } => {
                let kind = if record_name.is_some() {
                    DeclKind::Field { ty, init }
                } else {
                    DeclKind::Variable { ty, init }
                };
                let mut decl = Decl::new(kind, name, loc);
                decl.is_definition = !is_extern;
                decl
            }
            Analyzed::Opaque => return Ok(None),
        };
        decl.access = access;
        decl.comment = doc;
        decl.internal_linkage = is_static && record_name.is_none();
        Ok(Some(decl))
    }

    /// Collect one declaration's tokens, skipping a function body if one
    /// follows. Returns the tokens and whether a body was present.
    fn collect_declaration(&mut self) -> Result<(Vec<Token>, bool), ScanError> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut depth = 0i32;
        loop {
            let Some(token) = self.peek() else {
                return Ok((tokens, false));
            };
            match token.kind {
                TokKind::Semi if depth == 0 => {
                    self.pos += 1;
                    return Ok((tokens, false));
                }
                TokKind::LParen | TokKind::LBracket => {
                    depth += 1;
                    tokens.push(token.clone());
                    self.pos += 1;
                }
                TokKind::RParen | TokKind::RBracket => {
                    depth -= 1;
                    tokens.push(token.clone());
                    self.pos += 1;
                }
                TokKind::LBrace if depth == 0 => {
                    if declaration_is_function(&tokens) {
                        self.skip_braces()?;
                        // Definitions need no trailing semicolon.
                        self.eat(TokKind::Semi);
                        return Ok((tokens, true));
                    }
                    // Braced initializer: capture it as text.
                    let start = self.pos;
                    self.skip_braces()?;
                    tokens.extend(self.tokens[start..self.pos].iter().cloned());
                    self.eat(TokKind::Semi);
                    return Ok((tokens, false));
                }
                TokKind::RBrace if depth == 0 => {
                    // End of the enclosing scope; nothing more to collect.
                    return Ok((tokens, false));
                }
                _ => {
                    tokens.push(token.clone());
                    self.pos += 1;
                }
            }
        }
    }

    /// Skip a balanced `{ … }` group.
    fn skip_braces(&mut self) -> Result<(), ScanError> {
        let line = self.peek().map_or(0, |t| t.line);
        if !self.eat(TokKind::LBrace) {
            return Ok(());
        }
        let mut depth = 1i32;
        while depth > 0 {
            match self.bump().map(|t| t.kind) {
                Some(TokKind::LBrace) => depth += 1,
                Some(TokKind::RBrace) => depth -= 1,
                Some(_) => {}
                None => return Err(ScanError::Unbalanced(line)),
            }
        }
        Ok(())
    }

    /// Collect a balanced `< … >` group, returning the inner tokens.
    fn collect_angle_group(&mut self) -> Result<Vec<Token>, ScanError> {
        if !self.eat(TokKind::Lt) {
            return Ok(Vec::new());
        }
        let mut tokens = Vec::new();
        let mut depth = 1i32;
        loop {
            let Some(token) = self.bump() else {
                return Err(ScanError::UnexpectedEof("template argument list"));
            };
            match token.kind {
                TokKind::Lt => depth += 1,
                TokKind::Gt => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(tokens);
                    }
                }
                _ => {}
            }
            tokens.push(token.clone());
        }
    }

    /// Collect tokens until one of `stops` at bracket depth zero. The stop
    /// token is left unconsumed.
    fn collect_until(
        &mut self,
        stops: &[TokKind],
        what: &'static str,
    ) -> Result<Vec<Token>, ScanError> {
        let mut tokens = Vec::new();
        let mut paren = 0i32;
        let mut angle = 0i32;
        loop {
            let Some(token) = self.peek() else {
                return Err(ScanError::UnexpectedEof(what));
            };
            if paren == 0 && angle == 0 && stops.contains(&token.kind) {
                return Ok(tokens);
            }
            match token.kind {
                TokKind::LParen | TokKind::LBracket => paren += 1,
                TokKind::RParen | TokKind::RBracket => paren -= 1,
                TokKind::Lt => angle += 1,
                TokKind::Gt => angle = (angle - 1).max(0),
                _ => {}
            }
            tokens.push(token.clone());
            self.pos += 1;
        }
    }

    /// Collect tokens to the terminating semicolon, consuming it.
    fn collect_until_statement_end(&mut self) -> Result<Vec<Token>, ScanError> {
        let mut tokens = Vec::new();
        let mut depth = 0i32;
        loop {
            let Some(token) = self.peek() else {
                return Ok(tokens);
            };
            match token.kind {
                TokKind::Semi if depth == 0 => {
                    self.pos += 1;
                    return Ok(tokens);
                }
                TokKind::RBrace if depth == 0 => return Ok(tokens),
                TokKind::LParen | TokKind::LBracket | TokKind::LBrace => depth += 1,
                TokKind::RParen | TokKind::RBracket | TokKind::RBrace => depth -= 1,
                _ => {}
            }
            tokens.push(token.clone());
            self.pos += 1;
        }
    }

    /// Skip to the end of the current statement.
    fn skip_statement(&mut self) -> Result<(), ScanError> {
        let _ = self.collect_until_statement_end()?;
        Ok(())
    }
}

enum Analyzed {
    Function {
        name: String,
        kind: DeclKind,
    },
    Variable {
        name: String,
        ty: String,
        init: Option<String>,
    },
    Opaque,
}

/// Whether a collected declaration head is a function signature.
fn declaration_is_function(tokens: &[Token]) -> bool {
    find_param_open(tokens).is_some()
}

/// Index of the `(` opening the parameter list, if the declaration is a
/// function.
fn find_param_open(tokens: &[Token]) -> Option<usize> {
    // Operator names carry their own punctuation (and, for operator(),
    // their own parens); the parameter list starts after the name.
    if let Some(op) = tokens.iter().position(|t| t.kind == TokKind::Operator) {
        let mut index = op + 1;
        if tokens.get(index).map(|t| t.kind) == Some(TokKind::LParen)
            && tokens.get(index + 1).map(|t| t.kind) == Some(TokKind::RParen)
        {
            index += 2;
        } else {
            while index < tokens.len() && tokens[index].kind != TokKind::LParen {
                index += 1;
            }
        }
        return (index < tokens.len()).then_some(index);
    }

    let mut depth = 0i32;
    for (index, token) in tokens.iter().enumerate() {
        match token.kind {
            TokKind::LParen if depth == 0 => {
                let prev = index.checked_sub(1).map(|i| &tokens[i]);
                match prev {
                    // A declarator like `int (*fp)(char)` puts a builtin
                    // type word before the paren; that is not a name.
                    Some(tok) if tok.kind == TokKind::Ident && !is_builtin_type_word(&tok.text) => {
                        // `int x(3);` is an initializer, not a signature;
                        // parameters never start with a literal.
                        let next = tokens.get(index + 1).map(|t| t.kind);
                        if matches!(next, Some(TokKind::Number | TokKind::Str | TokKind::Char)) {
                            return None;
                        }
                        return Some(index);
                    }
                    _ => return None,
                }
            }
            TokKind::LParen | TokKind::LBracket => depth += 1,
            TokKind::RParen | TokKind::RBracket => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Walk backwards from the parameter list over a possibly qualified name
/// (`n::f`, `S::~S`), returning where the name starts.
fn name_chain_start(tokens: &[Token], open: usize) -> usize {
    let mut index = open;
    if index >= 1 && tokens[index - 1].kind == TokKind::Ident {
        index -= 1;
    }
    if index >= 1 && tokens[index - 1].kind == TokKind::Tilde {
        index -= 1;
    }
    while index >= 2
        && tokens[index - 1].kind == TokKind::ColonColon
        && tokens[index - 2].kind == TokKind::Ident
    {
        index -= 2;
    }
    index
}

fn analyze_declaration(
    tokens: &[Token],
    record_name: Option<&str>,
    mut specs: FnSpecDecl,
) -> Analyzed {
    if let Some(op_index) = tokens.iter().position(|t| t.kind == TokKind::Operator) {
        return analyze_operator(tokens, op_index, specs);
    }

    if let Some(open) = find_param_open(tokens) {
        let close = find_matching_paren(tokens, open);
        let params = parse_params(&tokens[open + 1..close.unwrap_or(tokens.len())]);
        let chain = name_chain_start(tokens, open);
        let name = join_tokens(&tokens[chain..open]);
        let mut return_type = join_tokens(&tokens[..chain]);
        if let Some(trailing) = parse_trailer(tokens, close, &mut specs) {
            return_type = trailing;
        }

        let last_segment = name.rsplit("::").next().unwrap_or(&name);
        let kind = if last_segment.starts_with('~') {
            FunctionDeclKind::Destructor
        } else if return_type.is_empty()
            && (record_name == Some(last_segment)
                || name
                    .rsplit("::")
                    .nth(1)
                    .is_some_and(|outer| outer == last_segment))
        {
            FunctionDeclKind::Constructor
        } else {
            FunctionDeclKind::Plain
        };
        let return_type = match kind {
            FunctionDeclKind::Constructor | FunctionDeclKind::Destructor => String::new(),
            _ => return_type,
        };
        return Analyzed::Function {
            name,
            kind: DeclKind::Function {
                params: match kind {
                    FunctionDeclKind::Destructor => Vec::new(),
                    _ => params,
                },
                return_type,
                specs,
                kind,
            },
        };
    }

    analyze_variable(tokens)
}

fn analyze_operator(tokens: &[Token], op_index: usize, mut specs: FnSpecDecl) -> Analyzed {
    let return_type = join_tokens(&tokens[..op_index]);
    // The operator name runs to the parameter list's `(`; for
    // `operator()`, the first `()` pair belongs to the name.
    let mut name = String::from("operator");
    let mut name_end = op_index + 1;
    if tokens.get(name_end).map(|t| t.kind) == Some(TokKind::LParen)
        && tokens.get(name_end + 1).map(|t| t.kind) == Some(TokKind::RParen)
    {
        name.push_str("()");
        name_end += 2;
    } else {
        let mut first = true;
        while name_end < tokens.len() && tokens[name_end].kind != TokKind::LParen {
            if first && tokens[name_end].kind == TokKind::Ident {
                // A conversion operator's target type reads as a word.
                name.push(' ');
            }
            name.push_str(&tokens[name_end].text);
            first = false;
            name_end += 1;
        }
    }
    let close = find_matching_paren(tokens, name_end);
    let params = match close {
        Some(close) if name_end < tokens.len() => parse_params(&tokens[name_end + 1..close]),
        _ => Vec::new(),
    };
    let trailing = parse_trailer(tokens, close, &mut specs);
    let kind = if return_type.is_empty() && trailing.is_none() {
        FunctionDeclKind::Conversion
    } else {
        FunctionDeclKind::Operator
    };
    Analyzed::Function {
        name,
        kind: DeclKind::Function {
            params,
            return_type: trailing.unwrap_or(return_type),
            specs,
            kind,
        },
    }
}

/// Parse qualifiers after the parameter list; returns a trailing return
/// type if one is spelled.
fn parse_trailer(
    tokens: &[Token],
    close: Option<usize>,
    specs: &mut FnSpecDecl,
) -> Option<String> {
    let mut index = close? + 1;
    let mut trailing = None;
    while index < tokens.len() {
        match tokens[index].kind {
            TokKind::Const => specs.is_const = true,
            TokKind::Amp | TokKind::AmpAmp => specs.is_ref_qualified = true,
            TokKind::Noexcept => specs.is_noexcept = true,
            TokKind::Override | TokKind::Final => {}
            TokKind::Arrow => {
                trailing = Some(join_tokens(&tokens[index + 1..]));
                break;
            }
            TokKind::Eq => match tokens.get(index + 1) {
                Some(next) if next.kind == TokKind::Default => specs.is_defaulted = true,
                Some(next) if next.kind == TokKind::Delete => specs.is_deleted = true,
                Some(next) if next.text == "0" => specs.is_pure = true,
                _ => {}
            },
            // A constructor-initializer list; nothing documentable past it.
            TokKind::Colon => break,
            _ => {}
        }
        index += 1;
    }
    trailing
}

fn find_matching_paren(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (index, token) in tokens.iter().enumerate().skip(open) {
        match token.kind {
            TokKind::LParen => depth += 1,
            TokKind::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

/// The declarator name inside a parameter or variable token run: the last
/// bracket-free identifier that is not a builtin type word, provided
/// nothing but an array suffix follows it.
fn declarator_name_index(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0i32;
    let mut candidate = None;
    for (index, token) in tokens.iter().enumerate() {
        match token.kind {
            TokKind::LParen | TokKind::LBracket | TokKind::Lt => depth += 1,
            TokKind::RParen | TokKind::RBracket => depth -= 1,
            TokKind::Gt => depth = (depth - 1).max(0),
            TokKind::Ident if depth == 0 && !is_builtin_type_word(&token.text) => {
                candidate = Some(index);
            }
            _ => {}
        }
    }
    let index = candidate?;
    if index == 0 || tokens[index - 1].kind == TokKind::ColonColon {
        return None;
    }
    let only_array_suffix = tokens[index + 1..].iter().all(|t| {
        matches!(
            t.kind,
            TokKind::LBracket | TokKind::RBracket | TokKind::Number | TokKind::Ident
        )
    });
    only_array_suffix.then_some(index)
}

fn parse_params(tokens: &[Token]) -> Vec<ParamDecl> {
    let mut params = Vec::new();
    for part in split_top_level(tokens) {
        if part.is_empty() {
            continue;
        }
        if part.len() == 1 && part[0].kind == TokKind::Ellipsis {
            params.push(ParamDecl {
                name: String::new(),
                ty: "...".to_owned(),
                default: None,
            });
            continue;
        }
        if part.len() == 1 && part[0].text == "void" {
            continue;
        }
        let (decl_part, default) = match split_at_top_level_eq(&part) {
            Some((head, tail)) => (head, Some(join_tokens(tail))),
            None => (&part[..], None),
        };
        let (name, ty) = match declarator_name_index(decl_part) {
            Some(index) => {
                let mut ty_tokens: Vec<Token> = decl_part.to_vec();
                let name = ty_tokens.remove(index).text;
                (name, join_tokens(&ty_tokens))
            }
            None => (String::new(), join_tokens(decl_part)),
        };
        params.push(ParamDecl { name, ty, default });
    }
    params
}

fn split_top_level(tokens: &[Token]) -> Vec<Vec<Token>> {
    let mut parts = Vec::new();
    let mut current = Vec::new();
    let mut paren = 0i32;
    let mut angle = 0i32;
    for token in tokens {
        match token.kind {
            TokKind::Comma if paren == 0 && angle == 0 => {
                parts.push(std::mem::take(&mut current));
                continue;
            }
            TokKind::LParen | TokKind::LBracket | TokKind::LBrace => paren += 1,
            TokKind::RParen | TokKind::RBracket | TokKind::RBrace => paren -= 1,
            TokKind::Lt => angle += 1,
            TokKind::Gt => angle = (angle - 1).max(0),
            _ => {}
        }
        current.push(token.clone());
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

fn split_at_top_level_eq(tokens: &[Token]) -> Option<(&[Token], &[Token])> {
    let mut paren = 0i32;
    let mut angle = 0i32;
    for (index, token) in tokens.iter().enumerate() {
        match token.kind {
            TokKind::Eq if paren == 0 && angle == 0 => {
                return Some((&tokens[..index], &tokens[index + 1..]));
            }
            TokKind::LParen | TokKind::LBracket | TokKind::LBrace => paren += 1,
            TokKind::RParen | TokKind::RBracket | TokKind::RBrace => paren -= 1,
            TokKind::Lt => angle += 1,
            TokKind::Gt => angle = (angle - 1).max(0),
            _ => {}
        }
    }
    None
}

fn analyze_variable(tokens: &[Token]) -> Analyzed {
    let (decl_part, init) = match split_at_top_level_eq(tokens) {
        Some((head, tail)) => (head, Some(join_tokens(tail))),
        None => {
            // Braced initializer captured inline: `int x{3}`.
            match tokens.iter().position(|t| t.kind == TokKind::LBrace) {
                Some(brace) => {
                    let init = join_tokens(&tokens[brace..]);
                    (&tokens[..brace], Some(init))
                }
                None => (tokens, None),
            }
        }
    };
    // Bitfield widths are dropped from the declarator.
    let decl_part = match decl_part.iter().position(|t| t.kind == TokKind::Colon) {
        Some(colon) if colon > 0 && decl_part[colon - 1].kind == TokKind::Ident => {
            &decl_part[..colon]
        }
        _ => decl_part,
    };
    let Some(index) = declarator_name_index(decl_part) else {
        return Analyzed::Opaque;
    };
    let mut ty_tokens: Vec<Token> = decl_part.to_vec();
    let name = ty_tokens.remove(index).text;
    Analyzed::Variable {
        name,
        ty: join_tokens(&ty_tokens),
        init,
    }
}

/// Reassemble token text with C++-ish spacing.
fn join_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut prev: Option<TokKind> = None;
    for token in tokens {
        let no_space_before = matches!(
            token.kind,
            TokKind::ColonColon
                | TokKind::Comma
                | TokKind::RParen
                | TokKind::RBracket
                | TokKind::Lt
                | TokKind::Gt
                | TokKind::Semi
                | TokKind::LBracket
                | TokKind::Star
                | TokKind::Amp
                | TokKind::AmpAmp
                | TokKind::LParen
        ) || prev.is_none();
        let no_space_after_prev = matches!(
            prev,
            Some(
                TokKind::ColonColon
                    | TokKind::Lt
                    | TokKind::LParen
                    | TokKind::LBracket
                    | TokKind::Tilde
            )
        );
        if !no_space_before && !no_space_after_prev {
            out.push(' ');
        }
        out.push_str(&token.text);
        prev = Some(token.kind);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_ok(source: &str) -> Vec<Decl> {
        scan(source, "test.hpp").expect("scan succeeds")
    }

    #[test]
    fn free_function_in_namespace() {
        let decls = scan_ok("namespace n { int f(int x); }");
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name, "n");
        assert!(matches!(decls[0].kind, DeclKind::Namespace));
        let f = &decls[0].children[0];
        assert_eq!(f.name, "f");
        let DeclKind::Function {
            params,
            return_type,
            ..
        } = &f.kind
        else {
            panic!("expected a function");
        };
        assert_eq!(return_type, "int");
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "x");
        assert_eq!(params[0].ty, "int");
        assert!(!f.is_definition);
    }

    #[test]
    fn nested_namespace_shorthand() {
        let decls = scan_ok("namespace a::b { void f(); }");
        assert_eq!(decls[0].name, "a");
        assert_eq!(decls[0].children[0].name, "b");
        assert_eq!(decls[0].children[0].children[0].name, "f");
    }

    #[test]
    fn struct_with_fields_and_methods() {
        let decls = scan_ok(
            "struct S {\n    int m;\n    void f() const;\nprivate:\n    int hidden;\n};",
        );
        let s = &decls[0];
        assert!(s.is_definition);
        assert_eq!(s.children.len(), 3);
        assert_eq!(s.children[0].name, "m");
        assert_eq!(s.children[0].access, Access::Public);
        assert!(matches!(s.children[0].kind, DeclKind::Field { .. }));
        let DeclKind::Function { specs, .. } = &s.children[1].kind else {
            panic!("expected a method");
        };
        assert!(specs.is_const);
        assert_eq!(s.children[2].access, Access::Private);
    }

    #[test]
    fn forward_declaration() {
        let decls = scan_ok("struct S;");
        assert!(!decls[0].is_definition);
        assert!(decls[0].children.is_empty());
    }

    #[test]
    fn class_bases_and_default_access() {
        let decls = scan_ok("class D : public B, virtual C { int x; };");
        let DeclKind::Record { bases, .. } = &decls[0].kind else {
            panic!("expected a record");
        };
        assert_eq!(bases.len(), 2);
        assert_eq!(bases[0].ty, "B");
        assert_eq!(bases[0].access, Access::Public);
        assert!(bases[1].is_virtual);
        assert_eq!(bases[1].access, Access::Private);
        assert_eq!(decls[0].children[0].access, Access::Private);
    }

    #[test]
    fn scoped_enum_with_values() {
        let decls = scan_ok(
            "/// Colors.\nenum class Color : unsigned {\n    /// Like blood.\n    Red = 1,\n    Green,\n};",
        );
        let e = &decls[0];
        assert_eq!(e.name, "Color");
        let DeclKind::Enum { scoped, underlying } = &e.kind else {
            panic!("expected an enum");
        };
        assert!(*scoped);
        assert_eq!(underlying.as_deref(), Some("unsigned"));
        assert_eq!(e.children.len(), 2);
        assert_eq!(e.children[0].name, "Red");
        let DeclKind::EnumValue { init } = &e.children[0].kind else {
            panic!("expected an enum value");
        };
        assert_eq!(init.as_deref(), Some("1"));
        assert!(e.children[0].comment.as_deref().unwrap().contains("blood"));
    }

    #[test]
    fn typedef_and_using_alias() {
        let decls = scan_ok("typedef unsigned long size_type;\nusing id_t = int;");
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].name, "size_type");
        let DeclKind::Typedef { underlying } = &decls[0].kind else {
            panic!("expected a typedef");
        };
        assert_eq!(underlying, "unsigned long");
        assert_eq!(decls[1].name, "id_t");
    }

    #[test]
    fn doc_comment_attaches_to_following_decl() {
        let decls = scan_ok("/// brief a\n///\n/// details\nvoid f();");
        assert_eq!(decls[0].name, "f");
        let comment = decls[0].comment.as_deref().unwrap();
        assert!(comment.contains("brief a"));
        assert!(comment.contains("details"));
    }

    #[test]
    fn function_bodies_are_skipped() {
        let decls = scan_ok("int f() {\n    if (true) { return 1; }\n    return 0;\n}\nint g();");
        assert_eq!(decls.len(), 2);
        assert!(decls[0].is_definition);
        assert!(!decls[1].is_definition);
    }

    #[test]
    fn constructor_destructor_and_operator() {
        let decls = scan_ok(
            "struct S {\n    S();\n    explicit S(int v);\n    ~S();\n    S& operator=(const S& rhs);\n    bool operator==(const S& rhs) const;\n};",
        );
        let kids = &decls[0].children;
        let kind_of = |i: usize| match &kids[i].kind {
            DeclKind::Function { kind, .. } => *kind,
            other => panic!("expected a function, got {other:?}"),
        };
        assert_eq!(kind_of(0), FunctionDeclKind::Constructor);
        assert_eq!(kind_of(1), FunctionDeclKind::Constructor);
        assert_eq!(kind_of(2), FunctionDeclKind::Destructor);
        assert_eq!(kids[2].name, "~S");
        assert_eq!(kind_of(3), FunctionDeclKind::Operator);
        assert_eq!(kids[3].name, "operator=");
        assert_eq!(kind_of(4), FunctionDeclKind::Operator);
        assert_eq!(kids[4].name, "operator==");
    }

    #[test]
    fn default_arguments_survive() {
        let decls = scan_ok("void f(int a, int b = 3, const char* tag = \"x\");");
        let DeclKind::Function { params, .. } = &decls[0].kind else {
            panic!("expected a function");
        };
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].default, None);
        assert_eq!(params[1].default.as_deref(), Some("3"));
        assert_eq!(params[2].default.as_deref(), Some("\"x\""));
        assert_eq!(params[2].ty, "const char*");
    }

    #[test]
    fn static_namespace_scope_is_internal() {
        let decls = scan_ok("static int counter;\nint shared;");
        assert!(decls[0].internal_linkage);
        assert!(!decls[1].internal_linkage);
    }

    #[test]
    fn anonymous_namespace_is_internal() {
        let decls = scan_ok("namespace { void f(); }");
        assert!(decls[0].internal_linkage);
        assert!(decls[0].name.is_empty());
    }

    #[test]
    fn friend_is_captured_verbatim() {
        let decls = scan_ok("struct S { friend class F; };");
        let DeclKind::Friend { target } = &decls[0].children[0].kind else {
            panic!("expected a friend");
        };
        assert_eq!(target, "class F");
        assert_eq!(decls[0].children[0].name, "F");
    }

    #[test]
    fn pure_defaulted_deleted() {
        let decls = scan_ok(
            "struct S {\n    virtual void a() = 0;\n    S(const S&) = delete;\n    S() = default;\n};",
        );
        let spec_of = |i: usize| match &decls[0].children[i].kind {
            DeclKind::Function { specs, .. } => *specs,
            other => panic!("expected a function, got {other:?}"),
        };
        assert!(spec_of(0).is_pure);
        assert!(spec_of(1).is_deleted);
        assert!(spec_of(2).is_defaulted);
        assert!(decls[0].children[2].is_definition);
    }

    #[test]
    fn template_record_and_specialization() {
        let decls =
            scan_ok("template <typename T> struct Box { T value; };\ntemplate <> struct Box<int>;");
        assert!(matches!(decls[0].kind, DeclKind::Record { .. }));
        assert_eq!(decls[0].children.len(), 1);
        let DeclKind::Specialization { primary, args, .. } = &decls[1].kind else {
            panic!("expected a specialization, got {:?}", decls[1].kind);
        };
        assert_eq!(primary, "Box");
        assert_eq!(args, "int");
    }

    #[test]
    fn extern_c_block_is_transparent() {
        let decls = scan_ok("extern \"C\" {\n    void c_api();\n}");
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name, "c_api");
    }

    #[test]
    fn variable_with_initializers() {
        let decls = scan_ok("int a = 3;\nint b{4};\nconst char* s = \"hi\";");
        let init_of = |i: usize| match &decls[i].kind {
            DeclKind::Variable { init, .. } => init.clone(),
            other => panic!("expected a variable, got {other:?}"),
        };
        assert_eq!(init_of(0).as_deref(), Some("3"));
        assert_eq!(init_of(1).as_deref(), Some("{ 4 }"));
        assert_eq!(init_of(2).as_deref(), Some("\"hi\""));
    }
}
