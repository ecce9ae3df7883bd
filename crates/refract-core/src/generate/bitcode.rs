//! The binary intermediate format.
//!
//! A framed, forward-compatible serialization of the symbol tree: a
//! 4-byte magic, a 2-byte little-endian version, then a stream of
//! records. Each record is `<record-kind varint><length varint><payload>`
//! with length-prefixed payload fields, so readers skip record kinds they
//! do not know instead of failing. Records for a symbol precede records
//! for its members.

use std::io::Write;

use super::Generator;
use crate::corpus::Corpus;
use crate::error::Error;
use crate::symbol::{
    Access, Base, Block, EnumInfo, EnumValueInfo, FnSpecs, FriendInfo, FunctionInfo,
    FunctionKind, Javadoc, Kind, Param, RecordInfo, RecordTag, SourceLocation, Span,
    SpecializationInfo, Symbol, SymbolId, SymbolKind, Text, TypeRef, TypedefInfo, VariableInfo,
};

pub const MAGIC: [u8; 4] = *b"RFRB";
pub const VERSION: u16 = 2;

/// Emits the framed binary serialization.
pub struct BitcodeGenerator;

impl Generator for BitcodeGenerator {
    fn id(&self) -> &'static str {
        "bitcode"
    }

    fn ext(&self) -> &'static str {
        "bc"
    }

    fn begin_stream(&self, out: &mut dyn Write) -> std::io::Result<()> {
        out.write_all(&MAGIC)?;
        out.write_all(&VERSION.to_le_bytes())
    }

    fn write_symbol(
        &self,
        out: &mut dyn Write,
        symbol: &Symbol,
        _corpus: &Corpus,
    ) -> std::io::Result<()> {
        let payload = encode_symbol(symbol);
        let mut record = Vec::with_capacity(payload.len() + 8);
        put_varint(&mut record, record_kind(symbol.kind()));
        put_varint(&mut record, payload.len() as u64);
        record.extend_from_slice(&payload);
        out.write_all(&record)
    }
}

fn record_kind(kind: Kind) -> u64 {
    match kind {
        Kind::Namespace => 1,
        Kind::Record => 2,
        Kind::Function => 3,
        Kind::Enum => 4,
        Kind::EnumValue => 5,
        Kind::Typedef => 6,
        Kind::Variable => 7,
        Kind::Field => 8,
        Kind::Friend => 9,
        Kind::Specialization => 10,
    }
}

// --- encoding ---------------------------------------------------------

fn put_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn put_str(out: &mut Vec<u8>, text: &str) {
    put_varint(out, text.len() as u64);
    out.extend_from_slice(text.as_bytes());
}

fn put_id(out: &mut Vec<u8>, id: SymbolId) {
    out.extend_from_slice(id.as_bytes());
}

fn put_loc(out: &mut Vec<u8>, loc: &SourceLocation) {
    put_str(out, &loc.file);
    put_varint(out, u64::from(loc.line));
    put_varint(out, u64::from(loc.column));
}

fn put_type(out: &mut Vec<u8>, ty: &TypeRef) {
    put_str(out, &ty.text);
    match ty.id {
        Some(id) => {
            out.push(1);
            put_id(out, id);
        }
        None => out.push(0),
    }
}

fn put_opt_str(out: &mut Vec<u8>, text: Option<&str>) {
    match text {
        Some(text) => {
            out.push(1);
            put_str(out, text);
        }
        None => out.push(0),
    }
}

fn put_text(out: &mut Vec<u8>, text: &Text) {
    put_varint(out, text.0.len() as u64);
    for span in &text.0 {
        match span {
            Span::Plain(s) => {
                out.push(0);
                put_str(out, s);
            }
            Span::Emphasis(s) => {
                out.push(1);
                put_str(out, s);
            }
            Span::Strong(s) => {
                out.push(2);
                put_str(out, s);
            }
            Span::Mono(s) => {
                out.push(3);
                put_str(out, s);
            }
            Span::SymbolRef { name, id } => {
                out.push(4);
                put_str(out, name);
                match id {
                    Some(id) => {
                        out.push(1);
                        put_id(out, *id);
                    }
                    None => out.push(0),
                }
            }
        }
    }
}

fn put_doc(out: &mut Vec<u8>, doc: &Javadoc) {
    put_varint(out, doc.blocks.len() as u64);
    for block in &doc.blocks {
        match block {
            Block::Brief(text) => {
                out.push(0);
                put_text(out, text);
            }
            Block::Paragraph(text) => {
                out.push(1);
                put_text(out, text);
            }
            Block::Param { name, text } => {
                out.push(2);
                put_str(out, name);
                put_text(out, text);
            }
            Block::TParam { name, text } => {
                out.push(3);
                put_str(out, name);
                put_text(out, text);
            }
            Block::Returns(text) => {
                out.push(4);
                put_text(out, text);
            }
            Block::Throws { ty, text } => {
                out.push(5);
                put_str(out, ty);
                put_text(out, text);
            }
            Block::Pre(text) => {
                out.push(6);
                put_text(out, text);
            }
            Block::Post(text) => {
                out.push(7);
                put_text(out, text);
            }
            Block::Note(text) => {
                out.push(8);
                put_text(out, text);
            }
            Block::Warning(text) => {
                out.push(9);
                put_text(out, text);
            }
            Block::See(text) => {
                out.push(10);
                put_text(out, text);
            }
            Block::Code(code) => {
                out.push(11);
                put_str(out, code);
            }
        }
    }
}

fn access_byte(access: Access) -> u8 {
    match access {
        Access::Public => 0,
        Access::Protected => 1,
        Access::Private => 2,
        Access::None => 3,
    }
}

fn spec_bits(specs: FnSpecs) -> u64 {
    let flags = [
        specs.is_const,
        specs.is_ref_qualified,
        specs.is_noexcept,
        specs.is_constexpr,
        specs.is_consteval,
        specs.is_explicit,
        specs.is_virtual,
        specs.is_pure,
        specs.is_defaulted,
        specs.is_deleted,
    ];
    flags
        .iter()
        .enumerate()
        .fold(0u64, |bits, (i, &on)| bits | (u64::from(on) << i))
}

fn encode_symbol(symbol: &Symbol) -> Vec<u8> {
    let mut out = Vec::new();
    put_id(&mut out, symbol.id);
    put_id(&mut out, symbol.parent);
    out.push(access_byte(symbol.access));
    put_str(&mut out, &symbol.name);
    match &symbol.loc {
        Some(loc) => {
            out.push(1);
            put_loc(&mut out, loc);
        }
        None => out.push(0),
    }
    put_varint(&mut out, symbol.redecls.len() as u64);
    for loc in &symbol.redecls {
        put_loc(&mut out, loc);
    }
    put_varint(&mut out, symbol.members.len() as u64);
    for member in &symbol.members {
        put_id(&mut out, *member);
    }
    match &symbol.doc {
        Some(doc) => {
            out.push(1);
            put_doc(&mut out, doc);
        }
        None => out.push(0),
    }
    match &symbol.kind {
        SymbolKind::Namespace => {}
        SymbolKind::Record(info) => {
            out.push(match info.tag {
                RecordTag::Class => 0,
                RecordTag::Struct => 1,
                RecordTag::Union => 2,
            });
            put_varint(&mut out, info.bases.len() as u64);
            for base in &info.bases {
                put_type(&mut out, &base.ty);
                out.push(access_byte(base.access));
                out.push(u8::from(base.is_virtual));
            }
        }
        SymbolKind::Function(info) => {
            out.push(match info.kind {
                FunctionKind::Plain => 0,
                FunctionKind::Constructor => 1,
                FunctionKind::Destructor => 2,
                FunctionKind::Operator => 3,
                FunctionKind::Conversion => 4,
            });
            put_varint(&mut out, spec_bits(info.specs));
            match &info.return_type {
                Some(ret) => {
                    out.push(1);
                    put_type(&mut out, ret);
                }
                None => out.push(0),
            }
            put_varint(&mut out, info.params.len() as u64);
            for param in &info.params {
                put_str(&mut out, &param.name);
                put_type(&mut out, &param.ty);
                put_opt_str(&mut out, param.default.as_deref());
            }
        }
        SymbolKind::Enum(info) => {
            out.push(u8::from(info.scoped));
            match &info.underlying {
                Some(underlying) => {
                    out.push(1);
                    put_type(&mut out, underlying);
                }
                None => out.push(0),
            }
        }
        SymbolKind::EnumValue(info) => {
            put_opt_str(&mut out, info.init.as_deref());
        }
        SymbolKind::Typedef(info) => {
            put_type(&mut out, &info.underlying);
        }
        SymbolKind::Variable(info) | SymbolKind::Field(info) => {
            put_type(&mut out, &info.ty);
            put_opt_str(&mut out, info.init.as_deref());
        }
        SymbolKind::Friend(info) => {
            put_str(&mut out, &info.target);
        }
        SymbolKind::Specialization(info) => {
            match info.primary {
                Some(primary) => {
                    out.push(1);
                    put_id(&mut out, primary);
                }
                None => out.push(0),
            }
            put_str(&mut out, &info.args);
        }
    }
    out
}

// --- decoding ---------------------------------------------------------

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, count: usize) -> Result<&'a [u8], Error> {
        if self.pos + count > self.bytes.len() {
            return Err(Error::new("truncated bitcode stream"));
        }
        let slice = &self.bytes[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    fn varint(&mut self) -> Result<u64, Error> {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.take(1)?[0];
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift > 63 {
                return Err(Error::new("malformed varint in bitcode stream"));
            }
        }
    }

    fn byte(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    fn str(&mut self) -> Result<String, Error> {
        let len = self.varint()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| Error::new("invalid UTF-8 in bitcode stream"))
    }

    fn opt_str(&mut self) -> Result<Option<String>, Error> {
        if self.byte()? == 0 {
            Ok(None)
        } else {
            Ok(Some(self.str()?))
        }
    }

    fn id(&mut self) -> Result<SymbolId, Error> {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(self.take(20)?);
        Ok(SymbolId::from_bytes(bytes))
    }

    fn loc(&mut self) -> Result<SourceLocation, Error> {
        let file = self.str()?;
        let line = self.varint()? as u32;
        let column = self.varint()? as u32;
        Ok(SourceLocation { file, line, column })
    }

    fn type_ref(&mut self) -> Result<TypeRef, Error> {
        let text = self.str()?;
        let mut ty = TypeRef::unresolved(&text);
        if self.byte()? != 0 {
            ty.id = Some(self.id()?);
        }
        Ok(ty)
    }

    fn text(&mut self) -> Result<Text, Error> {
        let count = self.varint()? as usize;
        let mut spans = Vec::with_capacity(count);
        for _ in 0..count {
            let style = self.byte()?;
            spans.push(match style {
                0 => Span::Plain(self.str()?),
                1 => Span::Emphasis(self.str()?),
                2 => Span::Strong(self.str()?),
                3 => Span::Mono(self.str()?),
                4 => {
                    let name = self.str()?;
                    let id = if self.byte()? != 0 {
                        Some(self.id()?)
                    } else {
                        None
                    };
                    Span::SymbolRef { name, id }
                }
                other => {
                    return Err(Error::new(format!("unknown span style {other}")));
                }
            });
        }
        Ok(Text(spans))
    }

    fn doc(&mut self) -> Result<Javadoc, Error> {
        let count = self.varint()? as usize;
        let mut blocks = Vec::with_capacity(count);
        for _ in 0..count {
            let kind = self.byte()?;
            blocks.push(match kind {
                0 => Block::Brief(self.text()?),
                1 => Block::Paragraph(self.text()?),
                2 => Block::Param {
                    name: self.str()?,
                    text: self.text()?,
                },
                3 => Block::TParam {
                    name: self.str()?,
                    text: self.text()?,
                },
                4 => Block::Returns(self.text()?),
                5 => Block::Throws {
                    ty: self.str()?,
                    text: self.text()?,
                },
                6 => Block::Pre(self.text()?),
                7 => Block::Post(self.text()?),
                8 => Block::Note(self.text()?),
                9 => Block::Warning(self.text()?),
                10 => Block::See(self.text()?),
                11 => Block::Code(self.str()?),
                other => {
                    return Err(Error::new(format!("unknown doc block kind {other}")));
                }
            });
        }
        Ok(Javadoc { blocks })
    }

    fn access(&mut self) -> Result<Access, Error> {
        Ok(match self.byte()? {
            0 => Access::Public,
            1 => Access::Protected,
            2 => Access::Private,
            _ => Access::None,
        })
    }
}

fn decode_specs(bits: u64) -> FnSpecs {
    FnSpecs {
        is_const: bits & (1 << 0) != 0,
        is_ref_qualified: bits & (1 << 1) != 0,
        is_noexcept: bits & (1 << 2) != 0,
        is_constexpr: bits & (1 << 3) != 0,
        is_consteval: bits & (1 << 4) != 0,
        is_explicit: bits & (1 << 5) != 0,
        is_virtual: bits & (1 << 6) != 0,
        is_pure: bits & (1 << 7) != 0,
        is_defaulted: bits & (1 << 8) != 0,
        is_deleted: bits & (1 << 9) != 0,
    }
}

fn decode_symbol(kind: u64, payload: &[u8]) -> Result<Symbol, Error> {
    let mut reader = Reader {
        bytes: payload,
        pos: 0,
    };
    let id = reader.id()?;
    let parent = reader.id()?;
    let access = reader.access()?;
    let name = reader.str()?;
    let loc = if reader.byte()? != 0 {
        Some(reader.loc()?)
    } else {
        None
    };
    let redecl_count = reader.varint()? as usize;
    let mut redecls = Vec::with_capacity(redecl_count);
    for _ in 0..redecl_count {
        redecls.push(reader.loc()?);
    }
    let member_count = reader.varint()? as usize;
    let mut members = Vec::with_capacity(member_count);
    for _ in 0..member_count {
        members.push(reader.id()?);
    }
    let doc = if reader.byte()? != 0 {
        Some(reader.doc()?)
    } else {
        None
    };

    let kind = match kind {
        1 => SymbolKind::Namespace,
        2 => {
            let tag = match reader.byte()? {
                0 => RecordTag::Class,
                2 => RecordTag::Union,
                _ => RecordTag::Struct,
            };
            let base_count = reader.varint()? as usize;
            let mut bases = Vec::with_capacity(base_count);
            for _ in 0..base_count {
                let ty = reader.type_ref()?;
                let access = reader.access()?;
                let is_virtual = reader.byte()? != 0;
                bases.push(Base {
                    ty,
                    access,
                    is_virtual,
                });
            }
            SymbolKind::Record(RecordInfo { tag, bases })
        }
        3 => {
            let fn_kind = match reader.byte()? {
                1 => FunctionKind::Constructor,
                2 => FunctionKind::Destructor,
                3 => FunctionKind::Operator,
                4 => FunctionKind::Conversion,
                _ => FunctionKind::Plain,
            };
            let specs = decode_specs(reader.varint()?);
            let return_type = if reader.byte()? != 0 {
                Some(reader.type_ref()?)
            } else {
                None
            };
            let param_count = reader.varint()? as usize;
            let mut params = Vec::with_capacity(param_count);
            for _ in 0..param_count {
                params.push(Param {
                    name: reader.str()?,
                    ty: reader.type_ref()?,
                    default: reader.opt_str()?,
                });
            }
            SymbolKind::Function(FunctionInfo {
                kind: fn_kind,
                params,
                return_type,
                specs,
            })
        }
        4 => {
            let scoped = reader.byte()? != 0;
            let underlying = if reader.byte()? != 0 {
                Some(reader.type_ref()?)
            } else {
                None
            };
            SymbolKind::Enum(EnumInfo { scoped, underlying })
        }
        5 => SymbolKind::EnumValue(EnumValueInfo {
            init: reader.opt_str()?,
        }),
        6 => SymbolKind::Typedef(TypedefInfo {
            underlying: reader.type_ref()?,
        }),
        7 => SymbolKind::Variable(VariableInfo {
            ty: reader.type_ref()?,
            init: reader.opt_str()?,
        }),
        8 => SymbolKind::Field(VariableInfo {
            ty: reader.type_ref()?,
            init: reader.opt_str()?,
        }),
        9 => SymbolKind::Friend(FriendInfo {
            target: reader.str()?,
        }),
        10 => {
            let primary = if reader.byte()? != 0 {
                Some(reader.id()?)
            } else {
                None
            };
            SymbolKind::Specialization(SpecializationInfo {
                primary,
                args: reader.str()?,
            })
        }
        other => {
            return Err(Error::new(format!("record kind {other} is not a symbol")));
        }
    };

    Ok(Symbol {
        id,
        name,
        parent,
        access,
        members,
        doc,
        loc,
        redecls,
        kind,
    })
}

/// Decode a framed stream back into symbols, in stream order.
///
/// Unknown record kinds are skipped, not failed: the format is
/// forward-compatible.
pub fn read_stream(bytes: &[u8]) -> Result<Vec<Symbol>, Error> {
    if bytes.len() < 6 || bytes[..4] != MAGIC {
        return Err(Error::new("not a refract bitcode stream"));
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version > VERSION {
        return Err(Error::new(format!(
            "bitcode version {version} is newer than supported {VERSION}"
        )));
    }
    let mut reader = Reader { bytes, pos: 6 };
    let mut symbols = Vec::new();
    while reader.pos < reader.bytes.len() {
        let kind = reader.varint()?;
        let length = reader.varint()? as usize;
        let payload = reader.take(length)?;
        if (1..=10).contains(&kind) {
            symbols.push(decode_symbol(kind, payload)?);
        }
        // Anything else is a record kind from the future; skipped.
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Javadoc;

    fn sample_function() -> Symbol {
        let mut symbol = Symbol::global_namespace();
        symbol.id = SymbolId::from_usr("n::f(int)");
        symbol.name = "f".to_owned();
        symbol.parent = SymbolId::from_usr("n");
        symbol.loc = Some(SourceLocation::new("a.cpp", 3, 5));
        symbol.doc = Some(Javadoc::parse("Briefly. \n@param x the input"));
        symbol.kind = SymbolKind::Function(FunctionInfo {
            kind: FunctionKind::Plain,
            params: vec![Param {
                name: "x".to_owned(),
                ty: TypeRef::unresolved("int"),
                default: Some("3".to_owned()),
            }],
            return_type: Some(TypeRef::unresolved("int")),
            specs: FnSpecs {
                is_noexcept: true,
                ..FnSpecs::default()
            },
        });
        symbol
    }

    fn encode_one(symbol: &Symbol) -> Vec<u8> {
        let corpus = Corpus::default();
        let mut out = Vec::new();
        BitcodeGenerator.begin_stream(&mut out).unwrap();
        BitcodeGenerator
            .write_symbol(&mut out, symbol, &corpus)
            .unwrap();
        out
    }

    #[test]
    fn varint_round_trip() {
        for value in [0u64, 1, 127, 128, 300, 1 << 20, u64::MAX] {
            let mut buf = Vec::new();
            put_varint(&mut buf, value);
            let mut reader = Reader {
                bytes: &buf,
                pos: 0,
            };
            assert_eq!(reader.varint().unwrap(), value);
        }
    }

    #[test]
    fn symbol_round_trips() {
        let symbol = sample_function();
        let stream = encode_one(&symbol);
        let decoded = read_stream(&stream).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].id, symbol.id);
        assert_eq!(decoded[0].name, symbol.name);
        assert_eq!(decoded[0].parent, symbol.parent);
        assert_eq!(decoded[0].loc, symbol.loc);
        assert_eq!(decoded[0].doc, symbol.doc);
        let SymbolKind::Function(info) = &decoded[0].kind else {
            panic!("expected a function");
        };
        assert!(info.specs.is_noexcept);
        assert_eq!(info.params[0].default.as_deref(), Some("3"));
        assert_eq!(info.params[0].ty.text, "int");
    }

    #[test]
    fn unknown_record_kinds_are_skipped() {
        let symbol = sample_function();
        let mut stream = encode_one(&symbol);
        // Append a record from the future: kind 99 with a 3-byte payload.
        put_varint(&mut stream, 99);
        put_varint(&mut stream, 3);
        stream.extend_from_slice(&[0xde, 0xad, 0x00]);
        // And another real record after it.
        let corpus = Corpus::default();
        BitcodeGenerator
            .write_symbol(&mut stream, &symbol, &corpus)
            .unwrap();

        let decoded = read_stream(&stream).unwrap();
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn bad_magic_is_rejected() {
        assert!(read_stream(b"NOPE\x02\x00").is_err());
        assert!(read_stream(b"RF").is_err());
    }

    #[test]
    fn newer_version_is_rejected() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&MAGIC);
        stream.extend_from_slice(&(VERSION + 1).to_le_bytes());
        assert!(read_stream(&stream).is_err());
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let symbol = sample_function();
        let stream = encode_one(&symbol);
        assert!(read_stream(&stream[..stream.len() - 2]).is_err());
    }
}
