//! Token stream for the header-subset scanner.

use logos::Logos;

/// Token kinds produced by the lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/")]
#[logos(skip r"#[^\n]*")]
pub enum TokKind {
    // Doc comments outrank the plain-comment skips.
    #[regex(r"///[^\n]*", priority = 10)]
    DocLine,
    #[regex(r"//![^\n]*", priority = 10)]
    ModLine,
    #[regex(r"/\*\*[^*]*\*+(?:[^/*][^*]*\*+)*/", priority = 10)]
    DocBlock,

    #[token("namespace")]
    Namespace,
    #[token("class")]
    Class,
    #[token("struct")]
    Struct,
    #[token("union")]
    Union,
    #[token("enum")]
    Enum,
    #[token("typedef")]
    Typedef,
    #[token("using")]
    Using,
    #[token("friend")]
    Friend,
    #[token("template")]
    Template,
    #[token("operator")]
    Operator,
    #[token("public")]
    Public,
    #[token("protected")]
    Protected,
    #[token("private")]
    Private,
    #[token("virtual")]
    Virtual,
    #[token("static")]
    Static,
    #[token("inline")]
    Inline,
    #[token("explicit")]
    Explicit,
    #[token("constexpr")]
    Constexpr,
    #[token("consteval")]
    Consteval,
    #[token("const")]
    Const,
    #[token("noexcept")]
    Noexcept,
    #[token("default")]
    Default,
    #[token("delete")]
    Delete,
    #[token("extern")]
    Extern,
    #[token("mutable")]
    Mutable,
    #[token("final")]
    Final,
    #[token("override")]
    Override,

    #[regex(r"[A-Za-z_]\w*")]
    Ident,
    #[regex(r"[0-9][0-9a-zA-Z_'.]*")]
    Number,
    #[regex(r#""(?:[^"\\]|\\.)*""#)]
    Str,
    #[regex(r"'(?:[^'\\]|\\.)*'")]
    Char,

    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token(",")]
    Comma,
    #[token("=")]
    Eq,
    #[token("*")]
    Star,
    #[token("&&")]
    AmpAmp,
    #[token("&")]
    Amp,
    #[token("~")]
    Tilde,
    #[token("...")]
    Ellipsis,
    #[token("->")]
    Arrow,
    // Remaining operator characters, kept for operator names, default
    // arguments, and initializers.
    #[regex(r"[+\-/%^|!?.]")]
    Punct,
}

/// One token with its text and position.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokKind,
    pub text: String,
    pub line: u32,
    pub column: u32,
}

/// Lex a source file into tokens. Characters the lexer does not know are
/// kept as punctuation so declaration text still round-trips.
pub fn lex(source: &str) -> Vec<Token> {
    let line_starts = line_starts(source);
    let mut tokens = Vec::new();
    let mut lexer = TokKind::lexer(source);
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let (line, column) = position(&line_starts, span.start);
        let text = source[span].to_owned();
        let kind = result.unwrap_or(TokKind::Punct);
        tokens.push(Token {
            kind,
            text,
            line,
            column,
        });
    }
    tokens
}

fn line_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (offset, byte) in source.bytes().enumerate() {
        if byte == b'\n' {
            starts.push(offset + 1);
        }
    }
    starts
}

fn position(line_starts: &[usize], offset: usize) -> (u32, u32) {
    let line = match line_starts.binary_search(&offset) {
        Ok(index) => index,
        Err(index) => index - 1,
    };
    let column = offset - line_starts[line];
    (line as u32 + 1, column as u32 + 1)
}

/// Strip comment decoration from a doc token's text.
pub fn clean_doc(token: &Token) -> String {
    match token.kind {
        TokKind::DocLine => {
            let rest = token.text.strip_prefix("///").unwrap_or(&token.text);
            rest.strip_prefix(' ').unwrap_or(rest).to_owned()
        }
        TokKind::ModLine => token
            .text
            .strip_prefix("//!")
            .unwrap_or(&token.text)
            .trim_start()
            .to_owned(),
        TokKind::DocBlock => {
            let inner = token
                .text
                .strip_prefix("/**")
                .and_then(|t| t.strip_suffix("*/"))
                .unwrap_or(&token.text);
            inner
                .lines()
                .map(|line| {
                    let line = line.trim_start();
                    line.strip_prefix('*')
                        .map(str::trim_start)
                        .unwrap_or(line)
                })
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_owned()
        }
        _ => String::new(),
    }
}
