//! XML generator.

use std::io::Write;

use super::Generator;
use crate::corpus::Corpus;
use crate::symbol::{Block, Javadoc, Span, Symbol, SymbolKind, Text, TypeRef};

/// Emits one escaped element tree per symbol.
pub struct XmlGenerator;

impl Generator for XmlGenerator {
    fn id(&self) -> &'static str {
        "xml"
    }

    fn ext(&self) -> &'static str {
        "xml"
    }

    fn begin_stream(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        writeln!(out, "<refract>")
    }

    fn end_stream(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out, "</refract>")
    }

    fn write_symbol(
        &self,
        out: &mut dyn Write,
        symbol: &Symbol,
        _corpus: &Corpus,
    ) -> std::io::Result<()> {
        let tag = symbol.kind().as_str();
        write!(
            out,
            "<{tag} id=\"{}\" name=\"{}\" parent=\"{}\" access=\"{}\"",
            symbol.id,
            escape(&symbol.name),
            symbol.parent,
            symbol.access.as_str(),
        )?;
        writeln!(out, ">")?;

        if let Some(loc) = &symbol.loc {
            writeln!(
                out,
                "  <location file=\"{}\" line=\"{}\" column=\"{}\"/>",
                escape(&loc.file),
                loc.line,
                loc.column
            )?;
        }
        for loc in &symbol.redecls {
            writeln!(
                out,
                "  <redecl file=\"{}\" line=\"{}\" column=\"{}\"/>",
                escape(&loc.file),
                loc.line,
                loc.column
            )?;
        }

        self.write_payload(out, symbol)?;

        for member in &symbol.members {
            writeln!(out, "  <member id=\"{member}\"/>")?;
        }
        if let Some(doc) = &symbol.doc {
            write_doc(out, doc)?;
        }
        writeln!(out, "</{tag}>")
    }
}

impl XmlGenerator {
    fn write_payload(&self, out: &mut dyn Write, symbol: &Symbol) -> std::io::Result<()> {
        match &symbol.kind {
            SymbolKind::Namespace => Ok(()),
            SymbolKind::Record(info) => {
                writeln!(out, "  <tag>{}</tag>", info.tag.as_str())?;
                for base in &info.bases {
                    write!(
                        out,
                        "  <base access=\"{}\" virtual=\"{}\"",
                        base.access.as_str(),
                        base.is_virtual
                    )?;
                    write_type_attrs(out, &base.ty)?;
                    writeln!(out, "/>")?;
                }
                Ok(())
            }
            SymbolKind::Function(info) => {
                writeln!(out, "  <function-kind>{:?}</function-kind>", info.kind)?;
                if let Some(ret) = &info.return_type {
                    write!(out, "  <returns")?;
                    write_type_attrs(out, ret)?;
                    writeln!(out, "/>")?;
                }
                for param in &info.params {
                    write!(out, "  <param name=\"{}\"", escape(&param.name))?;
                    write_type_attrs(out, &param.ty)?;
                    if let Some(default) = &param.default {
                        write!(out, " default=\"{}\"", escape(default))?;
                    }
                    writeln!(out, "/>")?;
                }
                let specs = &info.specs;
                let flags: &[(&str, bool)] = &[
                    ("const", specs.is_const),
                    ("ref", specs.is_ref_qualified),
                    ("noexcept", specs.is_noexcept),
                    ("constexpr", specs.is_constexpr),
                    ("consteval", specs.is_consteval),
                    ("explicit", specs.is_explicit),
                    ("virtual", specs.is_virtual),
                    ("pure", specs.is_pure),
                    ("defaulted", specs.is_defaulted),
                    ("deleted", specs.is_deleted),
                ];
                for (name, on) in flags {
                    if *on {
                        writeln!(out, "  <spec>{name}</spec>")?;
                    }
                }
                Ok(())
            }
            SymbolKind::Enum(info) => {
                writeln!(out, "  <scoped>{}</scoped>", info.scoped)?;
                if let Some(underlying) = &info.underlying {
                    write!(out, "  <underlying")?;
                    write_type_attrs(out, underlying)?;
                    writeln!(out, "/>")?;
                }
                Ok(())
            }
            SymbolKind::EnumValue(info) => {
                if let Some(init) = &info.init {
                    writeln!(out, "  <value>{}</value>", escape(init))?;
                }
                Ok(())
            }
            SymbolKind::Typedef(info) => {
                write!(out, "  <aliased")?;
                write_type_attrs(out, &info.underlying)?;
                writeln!(out, "/>")
            }
            SymbolKind::Variable(info) | SymbolKind::Field(info) => {
                write!(out, "  <type")?;
                write_type_attrs(out, &info.ty)?;
                writeln!(out, "/>")?;
                if let Some(init) = &info.init {
                    writeln!(out, "  <init>{}</init>", escape(init))?;
                }
                Ok(())
            }
            SymbolKind::Friend(info) => {
                writeln!(out, "  <befriended>{}</befriended>", escape(&info.target))
            }
            SymbolKind::Specialization(info) => {
                if let Some(primary) = info.primary {
                    writeln!(out, "  <primary id=\"{primary}\"/>")?;
                }
                writeln!(out, "  <arguments>{}</arguments>", escape(&info.args))
            }
        }
    }
}

fn write_type_attrs(out: &mut dyn Write, ty: &TypeRef) -> std::io::Result<()> {
    write!(out, " type=\"{}\"", escape(&ty.text))?;
    if let Some(id) = ty.id {
        write!(out, " ref=\"{id}\"")?;
    }
    Ok(())
}

fn write_doc(out: &mut dyn Write, doc: &Javadoc) -> std::io::Result<()> {
    writeln!(out, "  <doc>")?;
    for block in &doc.blocks {
        match block {
            Block::Brief(text) => writeln!(out, "    <brief>{}</brief>", render_text(text))?,
            Block::Paragraph(text) => writeln!(out, "    <para>{}</para>", render_text(text))?,
            Block::Param { name, text } => writeln!(
                out,
                "    <param name=\"{}\">{}</param>",
                escape(name),
                render_text(text)
            )?,
            Block::TParam { name, text } => writeln!(
                out,
                "    <tparam name=\"{}\">{}</tparam>",
                escape(name),
                render_text(text)
            )?,
            Block::Returns(text) => {
                writeln!(out, "    <returns>{}</returns>", render_text(text))?;
            }
            Block::Throws { ty, text } => writeln!(
                out,
                "    <throws type=\"{}\">{}</throws>",
                escape(ty),
                render_text(text)
            )?,
            Block::Pre(text) => writeln!(out, "    <pre>{}</pre>", render_text(text))?,
            Block::Post(text) => writeln!(out, "    <post>{}</post>", render_text(text))?,
            Block::Note(text) => writeln!(out, "    <note>{}</note>", render_text(text))?,
            Block::Warning(text) => {
                writeln!(out, "    <warning>{}</warning>", render_text(text))?;
            }
            Block::See(text) => writeln!(out, "    <see>{}</see>", render_text(text))?,
            Block::Code(code) => writeln!(out, "    <code>{}</code>", escape(code))?,
        }
    }
    writeln!(out, "  </doc>")
}

fn render_text(text: &Text) -> String {
    let mut out = String::new();
    for span in &text.0 {
        match span {
            Span::Plain(s) => out.push_str(&escape(s)),
            Span::Emphasis(s) => {
                out.push_str("<em>");
                out.push_str(&escape(s));
                out.push_str("</em>");
            }
            Span::Strong(s) => {
                out.push_str("<strong>");
                out.push_str(&escape(s));
                out.push_str("</strong>");
            }
            Span::Mono(s) => {
                out.push_str("<mono>");
                out.push_str(&escape(s));
                out.push_str("</mono>");
            }
            Span::SymbolRef { name, id } => {
                out.push_str("<ref");
                if let Some(id) = id {
                    out.push_str(&format!(" id=\"{id}\""));
                }
                out.push('>');
                out.push_str(&escape(name));
                out.push_str("</ref>");
            }
        }
    }
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
