//! The ABI-driven transcoder.
//!
//! Three walkers over the resolved type graph live here:
//!
//!  - binary → JSON value ([`ABI::decode_variant`]),
//!  - JSON value → binary ([`ABI::encode_variant`]), which accepts struct
//!    fields in any order since the value is already a tree,
//!  - JSON text → binary ([`ABI::json_to_binary`]), which streams tokens and
//!    therefore requires struct fields in declared order. This is the
//!    canonical encoding path.
//!
//! All walkers bound their recursion depth and optionally invoke a caller
//! supplied heartbeat between steps so that pathological inputs can be
//! interrupted from the outside.

use serde_json::json;
use snafu::{ensure, OptionExt, ResultExt};
use tracing::debug;

use crate::{
    ABISerializable, AntelopeType, AntelopeValue, ByteStream, JsonMap, JsonValue, config, json as json_mod,
};
use crate::json::{JsonToken, Tokenizer};
use crate::abi::error::*;
use crate::abi::graph::{FieldNode, QueryRef, StructNode, TypeId, TypeKind};

pub use crate::abi::graph::ABI;

type Result<T, E = ABIError> = core::result::Result<T, E>;

/// Callback invoked between transcoding steps; returning an error aborts the
/// operation with [`ABIError::Interrupted`].
pub type TranscodeHook<'a> = dyn FnMut() -> core::result::Result<(), String> + 'a;

struct TranscodeContext<'a, 'b> {
    depth: usize,
    hook: Option<&'a mut TranscodeHook<'b>>,
}

impl<'a, 'b> TranscodeContext<'a, 'b> {
    fn new(hook: Option<&'a mut TranscodeHook<'b>>) -> TranscodeContext<'a, 'b> {
        TranscodeContext { depth: 0, hook }
    }

    fn enter(&mut self) -> Result<()> {
        ensure!(self.depth < config::MAX_TRANSCODE_DEPTH, RecursionLimitReachedSnafu);
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn tick(&mut self) -> Result<()> {
        if let Some(hook) = self.hook.as_mut() {
            (hook)().map_err(|message| InterruptedSnafu { message }.build())?;
        }
        Ok(())
    }
}

fn push_varuint32(out: &mut Vec<u8>, n: u32) {
    let mut n = n;
    loop {
        if n >> 7 != 0 {
            out.push((0x80 | (n & 0x7f)) as u8);
            n >>= 7;
        }
        else {
            out.push(n as u8);
            break;
        }
    }
}

struct SizeInsertion {
    position: usize,
    count: u32,
}


impl ABI {
    fn is_extension(&self, id: TypeId) -> bool {
        matches!(self.node(id).kind, TypeKind::Extension(_))
    }

    // -----------------------------------------------------------------------------
    //     Decoding of binary data -> JSON
    // -----------------------------------------------------------------------------

    /// Decode a binary value of type `typename` into a JSON value.
    pub fn binary_to_variant(&self, typename: &str, bytes: &[u8]) -> Result<JsonValue> {
        let mut ds = ByteStream::from(bytes.to_owned());
        self.decode_variant(&mut ds, typename)
    }

    /// Decode a binary value of type `typename` into its canonical JSON
    /// string form.
    pub fn binary_to_json(&self, typename: &str, bytes: &[u8]) -> Result<String> {
        Ok(json_mod::to_string(&self.binary_to_variant(typename, bytes)?)?)
    }

    pub fn decode_variant(&self, ds: &mut ByteStream, typename: &str) -> Result<JsonValue> {
        self.decode_variant_with_hook(ds, typename, None)
    }

    pub fn decode_variant_with_hook(&self, ds: &mut ByteStream, typename: &str,
                                    hook: Option<&mut TranscodeHook>) -> Result<JsonValue> {
        let q = self.resolve_query(typename, 0)?;
        let mut ctx = TranscodeContext::new(hook);
        self.dec_query(&mut ctx, ds, &q, true)
    }

    fn dec_query(&self, ctx: &mut TranscodeContext, ds: &mut ByteStream,
                 q: &QueryRef, allow_ext: bool) -> Result<JsonValue> {
        ctx.enter()?;
        let result = match q {
            QueryRef::Node(id) => self.dec_node(ctx, ds, *id, allow_ext),
            QueryRef::Optional(inner) => {
                match self.dec_optional_flag(ds)? {
                    true => self.dec_query(ctx, ds, inner, allow_ext),
                    false => Ok(JsonValue::Null),
                }
            },
            QueryRef::Array(inner) => {
                let count = self.dec_array_count(ds)?;
                let mut items = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    ctx.tick()?;
                    items.push(self.dec_query(ctx, ds, inner, false)?);
                }
                Ok(JsonValue::Array(items))
            },
            QueryRef::Extension(inner) => self.dec_query(ctx, ds, inner, allow_ext),
        };
        ctx.leave();
        result
    }

    fn dec_node(&self, ctx: &mut TranscodeContext, ds: &mut ByteStream,
                id: TypeId, allow_ext: bool) -> Result<JsonValue> {
        ctx.enter()?;
        let node = self.node(id);
        debug!(type_ = %node.name, "decoding");
        let result = match &node.kind {
            TypeKind::Builtin(ty) => {
                let value = AntelopeValue::from_bin(*ty, ds)
                    .context(DeserializeSnafu { what: &node.name })?;
                Ok(value.to_variant())
            },
            TypeKind::Alias(target) => self.dec_node(ctx, ds, *target, allow_ext),
            TypeKind::Optional(inner) => {
                match self.dec_optional_flag(ds)? {
                    true => self.dec_node(ctx, ds, *inner, allow_ext),
                    false => Ok(JsonValue::Null),
                }
            },
            TypeKind::Array(inner) => {
                let count = self.dec_array_count(ds)?;
                let mut items = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    ctx.tick()?;
                    items.push(self.dec_node(ctx, ds, *inner, false)?);
                }
                Ok(JsonValue::Array(items))
            },
            TypeKind::Extension(inner) => self.dec_node(ctx, ds, *inner, allow_ext),
            TypeKind::Struct(s) => self.dec_struct(ctx, ds, &node.name, s, allow_ext),
            TypeKind::Variant(cases) => {
                let index = self.dec_array_count(ds)? as u32;
                let case = cases.get(index as usize)
                    .context(BadVariantIndexSnafu { index, variant: &node.name })?;
                Ok(json!([case.name, self.dec_node(ctx, ds, case.type_, allow_ext)?]))
            },
            _ => DecodeSnafu {
                message: format!("type `{}` is not resolved", node.name),
            }.fail(),
        };
        ctx.leave();
        result
    }

    fn dec_struct(&self, ctx: &mut TranscodeContext, ds: &mut ByteStream,
                  name: &str, s: &StructNode, allow_ext: bool) -> Result<JsonValue> {
        let nfields = s.fields.len();
        let mut result = JsonMap::new();
        for (i, field) in s.fields.iter().enumerate() {
            ctx.tick()?;
            if ds.leftover().is_empty() && allow_ext && self.is_extension(field.type_) {
                // absent trailing extension
                continue;
            }
            let last = i == nfields - 1;
            let value = self.dec_node(ctx, ds, field.type_, allow_ext && last)?;
            debug!(field = %field.name, %value, "decoded struct field");
            result.insert(field.name.clone(), value);
        }
        debug!(r#"fully decoded struct "{name}""#);
        Ok(JsonValue::Object(result))
    }

    fn dec_optional_flag(&self, ds: &mut ByteStream) -> Result<bool> {
        bool::from_bin(ds).context(DeserializeSnafu { what: "optional discriminant" })
    }

    fn dec_array_count(&self, ds: &mut ByteStream) -> Result<usize> {
        let n = ds.read_var_u32()
            .map_err(crate::SerializeError::from)
            .context(DeserializeSnafu { what: "count (as varuint32)" })?;
        Ok(n as usize)
    }

    // -----------------------------------------------------------------------------
    //     Encoding of JSON value -> binary (reorderable)
    // -----------------------------------------------------------------------------

    /// Encode a JSON value of type `typename` to its binary form.
    ///
    /// Since the input is a fully parsed tree, struct fields may appear in
    /// any order. Use [`ABI::json_to_binary`] for the canonical streaming
    /// path.
    pub fn variant_to_binary(&self, typename: &str, value: &JsonValue) -> Result<Vec<u8>> {
        let mut ds = ByteStream::new();
        self.encode_variant(&mut ds, typename, value)?;
        Ok(ds.into_bytes())
    }

    pub fn encode_variant(&self, ds: &mut ByteStream, typename: &str,
                          value: &JsonValue) -> Result<()> {
        self.encode_variant_with_hook(ds, typename, value, None)
    }

    pub fn encode_variant_with_hook(&self, ds: &mut ByteStream, typename: &str,
                                    value: &JsonValue, hook: Option<&mut TranscodeHook>)
                                    -> Result<()> {
        let q = self.resolve_query(typename, 0)?;
        let mut ctx = TranscodeContext::new(hook);
        self.enc_query(&mut ctx, ds, &q, value, true)
    }

    fn enc_query(&self, ctx: &mut TranscodeContext, ds: &mut ByteStream,
                 q: &QueryRef, value: &JsonValue, allow_ext: bool) -> Result<()> {
        ctx.enter()?;
        let result = match q {
            QueryRef::Node(id) => self.enc_node(ctx, ds, *id, value, allow_ext),
            QueryRef::Optional(inner) => {
                match value.is_null() {
                    true => { ds.write_byte(0); Ok(()) },
                    false => {
                        ds.write_byte(1);
                        self.enc_query(ctx, ds, inner, value, allow_ext)
                    },
                }
            },
            QueryRef::Array(inner) => {
                let items = value.as_array().context(EncodeSnafu {
                    message: format!("expected array, got: {value}"),
                })?;
                ds.write_var_u32(items.len() as u32);
                for v in items {
                    ctx.tick()?;
                    self.enc_query(ctx, ds, inner, v, false)?;
                }
                Ok(())
            },
            QueryRef::Extension(inner) => self.enc_query(ctx, ds, inner, value, allow_ext),
        };
        ctx.leave();
        result
    }

    fn enc_node(&self, ctx: &mut TranscodeContext, ds: &mut ByteStream,
                id: TypeId, value: &JsonValue, allow_ext: bool) -> Result<()> {
        ctx.enter()?;
        let node = self.node(id);
        debug!(type_ = %node.name, "encoding");
        let result = match &node.kind {
            TypeKind::Builtin(ty) => {
                let value = AntelopeValue::from_variant(*ty, value)
                    .context(ValueSnafu { typename: &node.name })?;
                value.to_bin(ds);
                Ok(())
            },
            TypeKind::Alias(target) => self.enc_node(ctx, ds, *target, value, allow_ext),
            TypeKind::Optional(inner) => {
                match value.is_null() {
                    true => { ds.write_byte(0); Ok(()) },
                    false => {
                        ds.write_byte(1);
                        self.enc_node(ctx, ds, *inner, value, allow_ext)
                    },
                }
            },
            TypeKind::Array(inner) => {
                let items = value.as_array().context(EncodeSnafu {
                    message: format!("expected array while processing `{}`, got: {value}", node.name),
                })?;
                ds.write_var_u32(items.len() as u32);
                for v in items {
                    ctx.tick()?;
                    self.enc_node(ctx, ds, *inner, v, false)?;
                }
                Ok(())
            },
            TypeKind::Extension(inner) => self.enc_node(ctx, ds, *inner, value, allow_ext),
            TypeKind::Struct(s) => self.enc_struct(ctx, ds, &node.name, s, value, allow_ext),
            TypeKind::Variant(cases) => self.enc_variant_value(ctx, ds, &node.name, cases, value, allow_ext),
            _ => EncodeSnafu {
                message: format!("type `{}` is not resolved", node.name),
            }.fail(),
        };
        ctx.leave();
        result
    }

    fn enc_struct(&self, ctx: &mut TranscodeContext, ds: &mut ByteStream, name: &str,
                  s: &StructNode, value: &JsonValue, allow_ext: bool) -> Result<()> {
        let obj = value.as_object().context(EncodeSnafu {
            message: format!("expected object while processing struct `{name}`, got: {value}"),
        })?;

        let nfields = s.fields.len();
        let mut skipped_extension = false;
        for (i, field) in s.fields.iter().enumerate() {
            ctx.tick()?;
            let last = i == nfields - 1;
            match obj.get(&field.name) {
                Some(v) => {
                    ensure!(!skipped_extension,
                            UnexpectedFieldSnafu { field: &field.name, strct: name });
                    self.enc_node(ctx, ds, field.type_, v, allow_ext && last)?;
                },
                None => {
                    ensure!(allow_ext && self.is_extension(field.type_),
                            ExpectedFieldSnafu { field: &field.name, strct: name });
                    skipped_extension = true;
                },
            }
        }
        Ok(())
    }

    fn enc_variant_value(&self, ctx: &mut TranscodeContext, ds: &mut ByteStream, name: &str,
                         cases: &[FieldNode], value: &JsonValue, allow_ext: bool) -> Result<()> {
        let parts = value.as_array()
            .filter(|a| a.len() == 2 && a[0].is_string())
            .context(EncodeSnafu { message: format!(
                r#"expected input to be an array of ["type", value] while processing variant `{name}`, got: {value}"#
            )})?;

        let case_name = parts[0].as_str().unwrap();  // safe unwrap
        let index = cases.iter().position(|c| c.name == case_name)
            .context(InvalidTypeForVariantSnafu { typename: case_name, variant: name })?;
        ds.write_var_u32(index as u32);
        self.enc_node(ctx, ds, cases[index].type_, &parts[1], allow_ext)
    }

    // -----------------------------------------------------------------------------
    //     Encoding of JSON text -> binary (strict, streaming)
    // -----------------------------------------------------------------------------

    /// Encode a JSON document of type `typename` to its binary form,
    /// streaming tokens.
    ///
    /// Struct fields must appear in their declared order; this is the
    /// canonical client encoding. Array lengths are not known up front so the
    /// var-uint32 size prefixes are spliced in by a final linearization pass
    /// over the recorded insertion points.
    pub fn json_to_binary(&self, typename: &str, json: &str) -> Result<Vec<u8>> {
        self.json_to_binary_with_hook(typename, json, None)
    }

    pub fn json_to_binary_with_hook(&self, typename: &str, json: &str,
                                    hook: Option<&mut TranscodeHook>) -> Result<Vec<u8>> {
        let q = self.resolve_query(typename, 0)?;
        let mut tokens = Tokenizer::new(json);
        let mut ds = ByteStream::new();
        let mut insertions: Vec<SizeInsertion> = vec![];
        let mut ctx = TranscodeContext::new(hook);

        self.tok_query(&mut ctx, &mut ds, &mut tokens, &mut insertions, &q, true)?;
        tokens.expect_end()?;

        // linearization pass: splice the array size prefixes in, positions
        // are ascending by construction
        let data = ds.into_bytes();
        let mut bin = Vec::with_capacity(data.len() + insertions.len() * 2);
        let mut pos = 0;
        for insertion in &insertions {
            bin.extend_from_slice(&data[pos..insertion.position]);
            push_varuint32(&mut bin, insertion.count);
            pos = insertion.position;
        }
        bin.extend_from_slice(&data[pos..]);
        Ok(bin)
    }

    fn tok_query(&self, ctx: &mut TranscodeContext, ds: &mut ByteStream, tokens: &mut Tokenizer,
                 insertions: &mut Vec<SizeInsertion>, q: &QueryRef, allow_ext: bool) -> Result<()> {
        ctx.enter()?;
        let result = match q {
            QueryRef::Node(id) => self.tok_node(ctx, ds, tokens, insertions, *id, allow_ext),
            QueryRef::Optional(inner) => {
                if matches!(tokens.peek()?, JsonToken::Null) {
                    tokens.next()?;
                    ds.write_byte(0);
                    Ok(())
                } else {
                    ds.write_byte(1);
                    self.tok_query(ctx, ds, tokens, insertions, inner, allow_ext)
                }
            },
            QueryRef::Array(inner) => {
                self.tok_array(ctx, ds, tokens, insertions, "array", |abi, ctx, ds, tokens, insertions| {
                    abi.tok_query(ctx, ds, tokens, insertions, inner, false)
                })
            },
            QueryRef::Extension(inner) => self.tok_query(ctx, ds, tokens, insertions, inner, allow_ext),
        };
        ctx.leave();
        result
    }

    fn tok_node(&self, ctx: &mut TranscodeContext, ds: &mut ByteStream, tokens: &mut Tokenizer,
                insertions: &mut Vec<SizeInsertion>, id: TypeId, allow_ext: bool) -> Result<()> {
        ctx.enter()?;
        let node = self.node(id);
        let result = match &node.kind {
            TypeKind::Builtin(ty) => {
                let token = tokens.next()?;
                let value = token_to_value(*ty, &node.name, token)?;
                value.to_bin(ds);
                Ok(())
            },
            TypeKind::Alias(target) => self.tok_node(ctx, ds, tokens, insertions, *target, allow_ext),
            TypeKind::Optional(inner) => {
                if matches!(tokens.peek()?, JsonToken::Null) {
                    tokens.next()?;
                    ds.write_byte(0);
                    Ok(())
                } else {
                    ds.write_byte(1);
                    self.tok_node(ctx, ds, tokens, insertions, *inner, allow_ext)
                }
            },
            TypeKind::Array(inner) => {
                let inner = *inner;
                self.tok_array(ctx, ds, tokens, insertions, &node.name, |abi, ctx, ds, tokens, insertions| {
                    abi.tok_node(ctx, ds, tokens, insertions, inner, false)
                })
            },
            TypeKind::Extension(inner) => self.tok_node(ctx, ds, tokens, insertions, *inner, allow_ext),
            TypeKind::Struct(s) => self.tok_struct(ctx, ds, tokens, insertions, &node.name, s, allow_ext),
            TypeKind::Variant(cases) => self.tok_variant(ctx, ds, tokens, insertions, &node.name, cases, allow_ext),
            _ => EncodeSnafu {
                message: format!("type `{}` is not resolved", node.name),
            }.fail(),
        };
        ctx.leave();
        result
    }

    fn tok_array<F>(&self, ctx: &mut TranscodeContext, ds: &mut ByteStream, tokens: &mut Tokenizer,
                    insertions: &mut Vec<SizeInsertion>, what: &str, mut encode_item: F) -> Result<()>
    where
        F: FnMut(&Self, &mut TranscodeContext, &mut ByteStream, &mut Tokenizer,
                 &mut Vec<SizeInsertion>) -> Result<()>,
    {
        ensure!(matches!(tokens.next()?, JsonToken::StartArray),
                EncodeSnafu { message: format!("expected array while processing `{what}`") });

        // the number of elements is not known yet, record where the
        // var-uint32 size has to be inserted
        let insertion_index = insertions.len();
        insertions.push(SizeInsertion { position: ds.pos(), count: 0 });

        let mut count = 0;
        loop {
            if matches!(tokens.peek()?, JsonToken::EndArray) {
                tokens.next()?;
                break;
            }
            ctx.tick()?;
            count += 1;
            encode_item(self, ctx, ds, tokens, insertions)?;
        }
        insertions[insertion_index].count = count;
        Ok(())
    }

    fn tok_struct(&self, ctx: &mut TranscodeContext, ds: &mut ByteStream, tokens: &mut Tokenizer,
                  insertions: &mut Vec<SizeInsertion>, name: &str, s: &StructNode,
                  allow_ext: bool) -> Result<()> {
        ensure!(matches!(tokens.next()?, JsonToken::StartObject),
                EncodeSnafu { message: format!("expected object while processing struct `{name}`") });

        let nfields = s.fields.len();
        let mut cursor = 0;
        loop {
            ctx.tick()?;
            match tokens.next()? {
                JsonToken::EndObject => {
                    if cursor < nfields {
                        // only a trailing run of extension fields may be
                        // left out (they are contiguous by construction)
                        let field = &s.fields[cursor];
                        ensure!(allow_ext && self.is_extension(field.type_),
                                ExpectedFieldSnafu { field: &field.name, strct: name });
                    }
                    return Ok(());
                },
                JsonToken::Key(key) => {
                    ensure!(cursor < nfields,
                            UnexpectedFieldSnafu { field: key.as_ref(), strct: name });
                    let field = &s.fields[cursor];
                    ensure!(key == field.name,
                            ExpectedFieldSnafu { field: &field.name, strct: name });
                    let last = cursor == nfields - 1;
                    self.tok_node(ctx, ds, tokens, insertions, field.type_, allow_ext && last)?;
                    cursor += 1;
                },
                _ => return EncodeSnafu {
                    message: format!("expected key or end of object in struct `{name}`"),
                }.fail(),
            }
        }
    }

    fn tok_variant(&self, ctx: &mut TranscodeContext, ds: &mut ByteStream, tokens: &mut Tokenizer,
                   insertions: &mut Vec<SizeInsertion>, name: &str, cases: &[FieldNode],
                   allow_ext: bool) -> Result<()> {
        let expected_variant = || EncodeSnafu { message: format!(
            r#"expected ["type", value] array while processing variant `{name}`"#,
        )};

        ensure!(matches!(tokens.next()?, JsonToken::StartArray), expected_variant());

        let case_name = match tokens.next()? {
            JsonToken::Str(s) => s,
            _ => return expected_variant().fail(),
        };
        let index = cases.iter().position(|c| c.name == case_name)
            .context(InvalidTypeForVariantSnafu { typename: case_name.as_ref(), variant: name })?;
        ds.write_var_u32(index as u32);
        self.tok_node(ctx, ds, tokens, insertions, cases[index].type_, allow_ext)?;

        ensure!(matches!(tokens.next()?, JsonToken::EndArray), expected_variant());
        Ok(())
    }
}

fn token_to_value(ty: AntelopeType, typename: &str, token: JsonToken) -> Result<AntelopeValue> {
    match token {
        JsonToken::Bool(b) => AntelopeValue::from_variant(ty, &json!(b))
            .context(ValueSnafu { typename }),
        JsonToken::Number(text) => AntelopeValue::from_str(ty, text)
            .context(ValueSnafu { typename }),
        JsonToken::Str(text) => AntelopeValue::from_str(ty, &text)
            .context(ValueSnafu { typename }),
        _ => EncodeSnafu {
            message: format!("expected value of type `{typename}`"),
        }.fail(),
    }
}
