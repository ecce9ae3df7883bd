//! Structured documentation comments.
//!
//! A [`Javadoc`] is the parsed form of a `///` or `/** */` comment: an
//! ordered sequence of blocks, where inline text is a sequence of styled
//! spans. Each symbol exclusively owns its doc block; formatters receive
//! read-only views.

use super::id::SymbolId;

/// One styled run of inline text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Plain(String),
    Emphasis(String),
    Strong(String),
    Mono(String),
    /// A reference to another documented symbol, resolved late.
    SymbolRef {
        name: String,
        id: Option<SymbolId>,
    },
}

/// Inline text: an ordered run of spans.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Text(pub Vec<Span>);

impl Text {
    pub fn plain(text: impl Into<String>) -> Self {
        Self(vec![Span::Plain(text.into())])
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|span| match span {
            Span::Plain(s) | Span::Emphasis(s) | Span::Strong(s) | Span::Mono(s) => s.is_empty(),
            Span::SymbolRef { name, .. } => name.is_empty(),
        })
    }

    /// Flatten to unstyled text.
    pub fn to_plain(&self) -> String {
        let mut out = String::new();
        for span in &self.0 {
            match span {
                Span::Plain(s) | Span::Emphasis(s) | Span::Strong(s) | Span::Mono(s) => {
                    out.push_str(s);
                }
                Span::SymbolRef { name, .. } => out.push_str(name),
            }
        }
        out
    }
}

/// One documentation block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Brief(Text),
    Paragraph(Text),
    Param { name: String, text: Text },
    TParam { name: String, text: Text },
    Returns(Text),
    Throws { ty: String, text: Text },
    Pre(Text),
    Post(Text),
    Note(Text),
    Warning(Text),
    See(Text),
    Code(String),
}

/// A parsed documentation comment: an ordered sequence of blocks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Javadoc {
    pub blocks: Vec<Block>,
}

impl Javadoc {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The brief block, if any.
    pub fn brief(&self) -> Option<&Text> {
        self.blocks.iter().find_map(|block| match block {
            Block::Brief(text) => Some(text),
            _ => None,
        })
    }

    /// Append another comment's blocks after this one's.
    pub fn append(&mut self, other: Javadoc) {
        self.blocks.extend(other.blocks);
    }

    /// Parse cleaned comment text (comment decoration already stripped).
    ///
    /// The first paragraph becomes the brief unless an explicit `@brief` is
    /// present. Tag lines (`@param`, `@returns`, …) absorb their
    /// continuation lines until a blank line or the next tag. `@code` /
    /// `@endcode` fences capture verbatim.
    pub fn parse(text: &str) -> Self {
        Parser::new(text).run()
    }
}

struct Parser<'a> {
    lines: std::iter::Peekable<std::str::Lines<'a>>,
    doc: Javadoc,
    saw_brief: bool,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().peekable(),
            doc: Javadoc::default(),
            saw_brief: false,
        }
    }

    fn run(mut self) -> Javadoc {
        while let Some(line) = self.lines.next() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if tag(trimmed, "code").is_some() {
                self.code_block();
            } else if trimmed.starts_with('@') {
                self.tag_block(trimmed);
            } else {
                self.paragraph(trimmed);
            }
        }
        self.doc
    }

    /// Collect continuation lines until a blank line or the next tag.
    fn continuation(&mut self, first: &str) -> String {
        let mut text = first.trim().to_owned();
        while let Some(next) = self.lines.peek() {
            let next = next.trim();
            if next.is_empty() || next.starts_with('@') {
                break;
            }
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(next);
            self.lines.next();
        }
        text
    }

    fn paragraph(&mut self, first: &str) {
        let text = parse_text(&self.continuation(first));
        if self.saw_brief {
            self.doc.blocks.push(Block::Paragraph(text));
        } else {
            self.saw_brief = true;
            self.doc.blocks.push(Block::Brief(text));
        }
    }

    fn code_block(&mut self) {
        let mut code = String::new();
        for line in self.lines.by_ref() {
            if line.trim() == "@endcode" {
                break;
            }
            code.push_str(line);
            code.push('\n');
        }
        self.doc.blocks.push(Block::Code(code));
    }

    fn tag_block(&mut self, line: &str) {
        if let Some(rest) = tag(line, "brief") {
            let text = parse_text(&self.continuation(rest));
            self.saw_brief = true;
            self.doc.blocks.push(Block::Brief(text));
        } else if let Some(rest) = tag(line, "param") {
            let (name, rest) = split_word(rest);
            let text = parse_text(&self.continuation(rest));
            self.doc.blocks.push(Block::Param { name, text });
        } else if let Some(rest) = tag(line, "tparam") {
            let (name, rest) = split_word(rest);
            let text = parse_text(&self.continuation(rest));
            self.doc.blocks.push(Block::TParam { name, text });
        } else if let Some(rest) = tag(line, "returns").or_else(|| tag(line, "return")) {
            let text = parse_text(&self.continuation(rest));
            self.doc.blocks.push(Block::Returns(text));
        } else if let Some(rest) = tag(line, "throws").or_else(|| tag(line, "throw")) {
            let (ty, rest) = split_word(rest);
            let text = parse_text(&self.continuation(rest));
            self.doc.blocks.push(Block::Throws { ty, text });
        } else if let Some(rest) = tag(line, "pre") {
            let text = parse_text(&self.continuation(rest));
            self.doc.blocks.push(Block::Pre(text));
        } else if let Some(rest) = tag(line, "post") {
            let text = parse_text(&self.continuation(rest));
            self.doc.blocks.push(Block::Post(text));
        } else if let Some(rest) = tag(line, "note") {
            let text = parse_text(&self.continuation(rest));
            self.doc.blocks.push(Block::Note(text));
        } else if let Some(rest) = tag(line, "warning") {
            let text = parse_text(&self.continuation(rest));
            self.doc.blocks.push(Block::Warning(text));
        } else if let Some(rest) = tag(line, "see") {
            let text = parse_text(&self.continuation(rest));
            self.doc.blocks.push(Block::See(text));
        } else {
            // Unknown tag: keep the text, drop nothing.
            let text = parse_text(&self.continuation(line));
            self.doc.blocks.push(Block::Paragraph(text));
        }
    }
}

/// Match `@name` at the start of a line, returning the remainder.
fn tag<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let rest = line.strip_prefix('@')?.strip_prefix(name)?;
    if rest.is_empty() {
        Some("")
    } else if rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

fn split_word(text: &str) -> (String, &str) {
    let text = text.trim_start();
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word.to_owned(), rest.trim_start()),
        None => (text.to_owned(), ""),
    }
}

/// Parse inline styling: `` `mono` ``, `**strong**`, `*emphasis*`, and
/// `@ref name` symbol references.
fn parse_text(text: &str) -> Text {
    let mut spans = Vec::new();
    let mut plain = String::new();
    let mut rest = text;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("@ref ") {
            let (name, tail) = split_word(after);
            flush(&mut spans, &mut plain);
            spans.push(Span::SymbolRef { name, id: None });
            rest = tail;
        } else if let Some(after) = rest.strip_prefix('`') {
            if let Some(end) = after.find('`') {
                flush(&mut spans, &mut plain);
                spans.push(Span::Mono(after[..end].to_owned()));
                rest = &after[end + 1..];
            } else {
                plain.push('`');
                rest = after;
            }
        } else if let Some(after) = rest.strip_prefix("**") {
            if let Some(end) = after.find("**") {
                flush(&mut spans, &mut plain);
                spans.push(Span::Strong(after[..end].to_owned()));
                rest = &after[end + 2..];
            } else {
                plain.push_str("**");
                rest = after;
            }
        } else if let Some(after) = rest.strip_prefix('*') {
            if let Some(end) = after.find('*') {
                flush(&mut spans, &mut plain);
                spans.push(Span::Emphasis(after[..end].to_owned()));
                rest = &after[end + 1..];
            } else {
                plain.push('*');
                rest = after;
            }
        } else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                plain.push(c);
            }
            rest = chars.as_str();
        }
    }
    flush(&mut spans, &mut plain);
    Text(spans)
}

fn flush(spans: &mut Vec<Span>, plain: &mut String) {
    if !plain.is_empty() {
        spans.push(Span::Plain(std::mem::take(plain)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_paragraph_is_brief() {
        let doc = Javadoc::parse("Greet a user.\n\nLonger description\nacross lines.");
        assert_eq!(doc.brief().map(Text::to_plain).as_deref(), Some("Greet a user."));
        assert_eq!(doc.blocks.len(), 2);
        match &doc.blocks[1] {
            Block::Paragraph(text) => {
                assert_eq!(text.to_plain(), "Longer description across lines.");
            }
            other => panic!("unexpected block {other:?}"),
        }
    }

    #[test]
    fn explicit_brief_tag() {
        let doc = Javadoc::parse("@brief Does the thing.\nDetails here.");
        assert_eq!(
            doc.brief().map(Text::to_plain).as_deref(),
            Some("Does the thing. Details here.")
        );
    }

    #[test]
    fn param_and_returns() {
        let doc = Javadoc::parse(
            "Add two numbers.\n@param a the left operand\n@param b the right operand\n@returns the sum",
        );
        let params: Vec<_> = doc
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Param { name, text } => Some((name.as_str(), text.to_plain())),
                _ => None,
            })
            .collect();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0], ("a", "the left operand".to_owned()));
        assert!(doc
            .blocks
            .iter()
            .any(|b| matches!(b, Block::Returns(t) if t.to_plain() == "the sum")));
    }

    #[test]
    fn throws_carries_type() {
        let doc = Javadoc::parse("@throws std::bad_alloc when memory runs out");
        match &doc.blocks[0] {
            Block::Throws { ty, text } => {
                assert_eq!(ty, "std::bad_alloc");
                assert_eq!(text.to_plain(), "when memory runs out");
            }
            other => panic!("unexpected block {other:?}"),
        }
    }

    #[test]
    fn code_fence_is_verbatim() {
        let doc = Javadoc::parse("Example.\n@code\nint x = f();\n@endcode");
        match &doc.blocks[1] {
            Block::Code(code) => assert_eq!(code, "int x = f();\n"),
            other => panic!("unexpected block {other:?}"),
        }
    }

    #[test]
    fn inline_styles() {
        let text = parse_text("use `f()` with *care* and **force**, see @ref other");
        assert!(text.0.contains(&Span::Mono("f()".to_owned())));
        assert!(text.0.contains(&Span::Emphasis("care".to_owned())));
        assert!(text.0.contains(&Span::Strong("force".to_owned())));
        assert!(text
            .0
            .iter()
            .any(|s| matches!(s, Span::SymbolRef { name, .. } if name == "other")));
    }

    #[test]
    fn append_preserves_order() {
        let mut a = Javadoc::parse("brief a");
        let b = Javadoc::parse("brief b");
        a.append(b);
        assert_eq!(a.blocks.len(), 2);
        assert_eq!(a.brief().map(Text::to_plain).as_deref(), Some("brief a"));
    }

    #[test]
    fn empty_comment_is_empty() {
        assert!(Javadoc::parse("").is_empty());
        assert!(Javadoc::parse("  \n \n").is_empty());
    }
}
