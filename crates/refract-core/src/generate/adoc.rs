//! AsciiDoc generator.

use std::io::Write;

use super::Generator;
use crate::corpus::Corpus;
use crate::symbol::{
    Block, FunctionInfo, Javadoc, Kind, Span, Symbol, SymbolKind, Text,
};

/// Emits one AsciiDoc section per symbol.
pub struct AdocGenerator;

impl Generator for AdocGenerator {
    fn id(&self) -> &'static str {
        "adoc"
    }

    fn ext(&self) -> &'static str {
        "adoc"
    }

    fn write_symbol(
        &self,
        out: &mut dyn Write,
        symbol: &Symbol,
        corpus: &Corpus,
    ) -> std::io::Result<()> {
        let title = if symbol.id.is_global() {
            "Global namespace".to_owned()
        } else if symbol.name.is_empty() {
            format!("(anonymous {})", symbol.kind())
        } else {
            symbol.name.clone()
        };
        writeln!(out, "== {} {}", kind_label(symbol), title)?;
        writeln!(out)?;
        writeln!(out, "[[{}]]", symbol.id)?;

        let signature = signature(symbol);
        if !signature.is_empty() {
            writeln!(out, "[source,cpp]")?;
            writeln!(out, "----")?;
            writeln!(out, "{signature}")?;
            writeln!(out, "----")?;
        }
        writeln!(out)?;

        if let Some(doc) = &symbol.doc {
            write_doc(out, doc)?;
        }

        if symbol.has_members() && !symbol.members.is_empty() {
            writeln!(out, ".Members")?;
            for id in &symbol.members {
                let member = corpus.get(*id);
                let name = if member.name.is_empty() {
                    "(anonymous)".to_owned()
                } else {
                    member.name.clone()
                };
                writeln!(out, "* {} `{}` (<<{}>>)", kind_label(member), name, member.id)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

fn kind_label(symbol: &Symbol) -> &'static str {
    match symbol.kind() {
        Kind::Namespace => "Namespace",
        Kind::Record => match &symbol.kind {
            SymbolKind::Record(info) => match info.tag {
                crate::symbol::RecordTag::Class => "Class",
                crate::symbol::RecordTag::Struct => "Struct",
                crate::symbol::RecordTag::Union => "Union",
            },
            _ => "Record",
        },
        Kind::Function => "Function",
        Kind::Enum => "Enum",
        Kind::EnumValue => "Enumerator",
        Kind::Typedef => "Alias",
        Kind::Variable => "Variable",
        Kind::Field => "Field",
        Kind::Friend => "Friend",
        Kind::Specialization => "Specialization",
    }
}

/// Render a C++-ish signature line for the symbol.
pub(super) fn signature(symbol: &Symbol) -> String {
    match &symbol.kind {
        SymbolKind::Namespace => {
            if symbol.id.is_global() {
                String::new()
            } else {
                format!("namespace {}", symbol.name)
            }
        }
        SymbolKind::Record(info) => {
            let mut out = format!("{} {}", info.tag.as_str(), symbol.name);
            let mut first = true;
            for base in &info.bases {
                out.push_str(if first { " : " } else { ", " });
                first = false;
                if base.is_virtual {
                    out.push_str("virtual ");
                }
                out.push_str(base.access.as_str());
                out.push(' ');
                out.push_str(&base.ty.text);
            }
            out
        }
        SymbolKind::Function(info) => function_signature(&symbol.name, info),
        SymbolKind::Enum(info) => {
            let mut out = String::from("enum ");
            if info.scoped {
                out.push_str("class ");
            }
            out.push_str(&symbol.name);
            if let Some(underlying) = &info.underlying {
                out.push_str(" : ");
                out.push_str(&underlying.text);
            }
            out
        }
        SymbolKind::EnumValue(info) => match &info.init {
            Some(init) => format!("{} = {init}", symbol.name),
            None => symbol.name.clone(),
        },
        SymbolKind::Typedef(info) => {
            format!("using {} = {}", symbol.name, info.underlying.text)
        }
        SymbolKind::Variable(info) | SymbolKind::Field(info) => {
            let mut out = format!("{} {}", info.ty.text, symbol.name);
            if let Some(init) = &info.init {
                out.push_str(" = ");
                out.push_str(init);
            }
            out
        }
        SymbolKind::Friend(info) => format!("friend {}", info.target),
        SymbolKind::Specialization(info) => {
            format!("template <> {}<{}>", symbol.name, info.args)
        }
    }
}

fn function_signature(name: &str, info: &FunctionInfo) -> String {
    let mut out = String::new();
    if info.specs.is_virtual {
        out.push_str("virtual ");
    }
    if info.specs.is_constexpr {
        out.push_str("constexpr ");
    }
    if info.specs.is_consteval {
        out.push_str("consteval ");
    }
    if info.specs.is_explicit {
        out.push_str("explicit ");
    }
    if let Some(ret) = &info.return_type {
        out.push_str(&ret.text);
        out.push(' ');
    }
    out.push_str(name);
    out.push('(');
    let params: Vec<String> = info
        .params
        .iter()
        .map(|param| {
            let mut p = param.ty.text.clone();
            if !param.name.is_empty() {
                p.push(' ');
                p.push_str(&param.name);
            }
            if let Some(default) = &param.default {
                p.push_str(" = ");
                p.push_str(default);
            }
            p
        })
        .collect();
    out.push_str(&params.join(", "));
    out.push(')');
    if info.specs.is_const {
        out.push_str(" const");
    }
    if info.specs.is_noexcept {
        out.push_str(" noexcept");
    }
    if info.specs.is_pure {
        out.push_str(" = 0");
    }
    if info.specs.is_defaulted {
        out.push_str(" = default");
    }
    if info.specs.is_deleted {
        out.push_str(" = delete");
    }
    out
}

fn write_doc(out: &mut dyn Write, doc: &Javadoc) -> std::io::Result<()> {
    let mut wrote_param_header = false;
    for block in &doc.blocks {
        match block {
            Block::Brief(text) | Block::Paragraph(text) => {
                writeln!(out, "{}", render_text(text))?;
                writeln!(out)?;
            }
            Block::Param { name, text } | Block::TParam { name, text } => {
                if !wrote_param_header {
                    writeln!(out, ".Parameters")?;
                    wrote_param_header = true;
                }
                writeln!(out, "* `{name}`: {}", render_text(text))?;
            }
            Block::Returns(text) => {
                writeln!(out, ".Returns")?;
                writeln!(out, "{}", render_text(text))?;
                writeln!(out)?;
            }
            Block::Throws { ty, text } => {
                writeln!(out, ".Throws")?;
                writeln!(out, "* `{ty}`: {}", render_text(text))?;
            }
            Block::Pre(text) => {
                writeln!(out, "NOTE: Precondition: {}", render_text(text))?;
                writeln!(out)?;
            }
            Block::Post(text) => {
                writeln!(out, "NOTE: Postcondition: {}", render_text(text))?;
                writeln!(out)?;
            }
            Block::Note(text) => {
                writeln!(out, "NOTE: {}", render_text(text))?;
                writeln!(out)?;
            }
            Block::Warning(text) => {
                writeln!(out, "WARNING: {}", render_text(text))?;
                writeln!(out)?;
            }
            Block::See(text) => {
                writeln!(out, "See also: {}", render_text(text))?;
                writeln!(out)?;
            }
            Block::Code(code) => {
                writeln!(out, "[source,cpp]")?;
                writeln!(out, "----")?;
                write!(out, "{code}")?;
                writeln!(out, "----")?;
                writeln!(out)?;
            }
        }
    }
    Ok(())
}

fn render_text(text: &Text) -> String {
    let mut out = String::new();
    for span in &text.0 {
        match span {
            Span::Plain(s) => out.push_str(s),
            Span::Emphasis(s) => {
                out.push('_');
                out.push_str(s);
                out.push('_');
            }
            Span::Strong(s) => {
                out.push('*');
                out.push_str(s);
                out.push('*');
            }
            Span::Mono(s) => {
                out.push('`');
                out.push_str(s);
                out.push('`');
            }
            Span::SymbolRef { name, .. } => {
                out.push('`');
                out.push_str(name);
                out.push('`');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{FnSpecs, FunctionKind, Param, TypeRef};

    fn function(name: &str, info: FunctionInfo) -> Symbol {
        let mut symbol = Symbol::global_namespace();
        symbol.id = crate::symbol::SymbolId::from_usr(name);
        symbol.name = name.to_owned();
        symbol.kind = SymbolKind::Function(info);
        symbol
    }

    #[test]
    fn function_signature_renders() {
        let info = FunctionInfo {
            kind: FunctionKind::Plain,
            params: vec![Param {
                name: "x".to_owned(),
                ty: TypeRef::unresolved("int"),
                default: Some("3".to_owned()),
            }],
            return_type: Some(TypeRef::unresolved("int")),
            specs: FnSpecs {
                is_const: true,
                is_noexcept: true,
                ..FnSpecs::default()
            },
        };
        assert_eq!(
            signature(&function("f", info)),
            "int f(int x = 3) const noexcept"
        );
    }

    #[test]
    fn doc_blocks_render() {
        let doc = Javadoc::parse("Brief line.\n@param x the input\n@returns the result");
        let mut out = Vec::new();
        write_doc(&mut out, &doc).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Brief line."));
        assert!(text.contains("* `x`: the input"));
        assert!(text.contains(".Returns"));
    }

    #[test]
    fn styled_spans_render() {
        let text = Text(vec![
            Span::Plain("use ".to_owned()),
            Span::Mono("f()".to_owned()),
            Span::Plain(" with ".to_owned()),
            Span::Emphasis("care".to_owned()),
        ]);
        assert_eq!(render_text(&text), "use `f()` with _care_");
    }
}
