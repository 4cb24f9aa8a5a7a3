//! Binary encode/decode for cache entries.
//!
//! All integers are little-endian. Strings are length-prefixed with a
//! `u32` length; arrays with a `u64` element count. No compression, no
//! alignment padding, no self-describing schema.

use std::io::{Read, Write};

use indexmap::IndexMap;

use simobj_core::{CoordClass, Selector, Value};
use simobj_frame::{Matrix3, Offset, TransformOp, TransformStack};

use crate::entry::CacheEntry;
use crate::error::CacheError;
use crate::{FORMAT_VERSION, MAGIC};

/// Upper bound on speculative pre-allocation from an untrusted length.
const MAX_PREALLOC: usize = 1 << 16;

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), CacheError> {
    w.write_all(&[v])?;
    Ok(())
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), CacheError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), CacheError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian f64.
pub fn write_f64_le(w: &mut dyn Write, v: f64) -> Result<(), CacheError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a length-prefixed UTF-8 string (u32 length + bytes).
pub fn write_length_prefixed_str(w: &mut dyn Write, s: &str) -> Result<(), CacheError> {
    write_u32_le(w, s.len() as u32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a single byte.
pub fn read_u8(r: &mut dyn Read) -> Result<u8, CacheError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, CacheError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut dyn Read) -> Result<u64, CacheError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a little-endian f64.
pub fn read_f64_le(r: &mut dyn Read) -> Result<f64, CacheError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

/// Read a length-prefixed UTF-8 string.
pub fn read_length_prefixed_str(r: &mut dyn Read) -> Result<String, CacheError> {
    let len = read_u32_le(r)? as usize;
    let mut buf = Vec::with_capacity(len.min(MAX_PREALLOC));
    Read::take(&mut *r, len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(CacheError::Malformed {
            detail: format!("truncated string: got {} of {len} bytes", buf.len()),
        });
    }
    String::from_utf8(buf).map_err(|e| CacheError::Malformed {
        detail: format!("invalid UTF-8 string: {e}"),
    })
}

fn read_count(r: &mut dyn Read, what: &str) -> Result<usize, CacheError> {
    let n = read_u64_le(r)?;
    usize::try_from(n).map_err(|_| CacheError::Malformed {
        detail: format!("{what} count {n} exceeds address space"),
    })
}

// ── Values ──────────────────────────────────────────────────────

/// Encode a value: unit, rank, dimensions, then elements.
pub fn encode_value(w: &mut dyn Write, value: &Value) -> Result<(), CacheError> {
    write_length_prefixed_str(w, value.unit().name())?;
    write_u32_le(w, value.shape().len() as u32)?;
    for &d in value.shape() {
        write_u64_le(w, d as u64)?;
    }
    for &x in value.data() {
        write_f64_le(w, x)?;
    }
    Ok(())
}

/// Decode a value written by [`encode_value`].
pub fn decode_value(r: &mut dyn Read) -> Result<Value, CacheError> {
    let unit = read_length_prefixed_str(r)?;
    let rank = read_u32_le(r)? as usize;
    let mut shape = Vec::with_capacity(rank.min(MAX_PREALLOC));
    for _ in 0..rank {
        shape.push(read_count(r, "dimension")?);
    }
    let len = shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| CacheError::Malformed {
            detail: format!("shape {shape:?} overflows"),
        })?;
    let mut data = Vec::with_capacity(len.min(MAX_PREALLOC));
    for _ in 0..len {
        data.push(read_f64_le(r)?);
    }
    Value::new(data, &shape, unit).map_err(|e| CacheError::Malformed {
        detail: e.to_string(),
    })
}

// ── Selectors ───────────────────────────────────────────────────

/// Encode a selector as its tag followed by its payload.
pub fn encode_selector(w: &mut dyn Write, selector: &Selector) -> Result<(), CacheError> {
    write_u8(w, selector.tag())?;
    match selector {
        Selector::None => {}
        Selector::Range { start, end } => {
            write_u64_le(w, *start as u64)?;
            write_u64_le(w, *end as u64)?;
        }
        Selector::BoolArray(mask) => {
            write_u64_le(w, mask.len() as u64)?;
            let bytes: Vec<u8> = mask.iter().map(|&b| u8::from(b)).collect();
            w.write_all(&bytes)?;
        }
        Selector::IndexSet(idx) => {
            write_u64_le(w, idx.len() as u64)?;
            for &i in idx {
                write_u64_le(w, i as u64)?;
            }
        }
    }
    Ok(())
}

/// Decode a selector written by [`encode_selector`].
pub fn decode_selector(r: &mut dyn Read) -> Result<Selector, CacheError> {
    match read_u8(r)? {
        0 => Ok(Selector::None),
        1 => {
            let start = read_count(r, "range start")?;
            let end = read_count(r, "range end")?;
            if end < start {
                return Err(CacheError::Malformed {
                    detail: format!("range end {end} before start {start}"),
                });
            }
            Ok(Selector::Range { start, end })
        }
        2 => {
            let len = read_count(r, "mask")?;
            let mut mask = Vec::with_capacity(len.min(MAX_PREALLOC));
            for _ in 0..len {
                mask.push(match read_u8(r)? {
                    0 => false,
                    1 => true,
                    flag => {
                        return Err(CacheError::Malformed {
                            detail: format!("invalid mask flag: {flag}"),
                        })
                    }
                });
            }
            Ok(Selector::BoolArray(mask))
        }
        3 => {
            let len = read_count(r, "index")?;
            let mut idx = Vec::with_capacity(len.min(MAX_PREALLOC));
            for _ in 0..len {
                idx.push(read_count(r, "index")?);
            }
            Ok(Selector::IndexSet(idx))
        }
        tag => Err(CacheError::Malformed {
            detail: format!("unknown selector tag {tag}"),
        }),
    }
}

// ── Transforms ──────────────────────────────────────────────────

/// Encode one transform operation.
pub fn encode_op(w: &mut dyn Write, op: &TransformOp) -> Result<(), CacheError> {
    write_u8(w, op.tag())?;
    match op {
        TransformOp::Translate { class, offset } => {
            write_u8(w, class.tag())?;
            for &x in &offset.vector {
                write_f64_le(w, x)?;
            }
            write_length_prefixed_str(w, offset.unit.name())?;
        }
        TransformOp::Rotate { matrix } => {
            for &x in matrix.iter().flatten() {
                write_f64_le(w, x)?;
            }
        }
    }
    Ok(())
}

/// Decode one transform operation.
pub fn decode_op(r: &mut dyn Read) -> Result<TransformOp, CacheError> {
    match read_u8(r)? {
        0 => {
            let tag = read_u8(r)?;
            let class = CoordClass::from_tag(tag).ok_or_else(|| CacheError::Malformed {
                detail: format!("unknown coordinate class tag {tag}"),
            })?;
            let vector = [read_f64_le(r)?, read_f64_le(r)?, read_f64_le(r)?];
            let unit = read_length_prefixed_str(r)?;
            Ok(TransformOp::Translate {
                class,
                offset: Offset::new(vector, unit),
            })
        }
        1 => {
            let mut matrix: Matrix3 = [[0.0; 3]; 3];
            for x in matrix.iter_mut().flatten() {
                *x = read_f64_le(r)?;
            }
            Ok(TransformOp::Rotate { matrix })
        }
        tag => Err(CacheError::Malformed {
            detail: format!("unknown transform tag {tag}"),
        }),
    }
}

// ── Entry encode/decode ─────────────────────────────────────────

/// Encode a complete cache entry, header first.
pub fn encode_entry(w: &mut dyn Write, entry: &CacheEntry) -> Result<(), CacheError> {
    w.write_all(&MAGIC)?;
    write_u8(w, FORMAT_VERSION)?;
    write_length_prefixed_str(w, &entry.fingerprint)?;
    write_u64_le(w, entry.config_hash)?;

    write_u32_le(w, entry.fields.len() as u32)?;
    for (name, value) in &entry.fields {
        write_length_prefixed_str(w, name)?;
        encode_value(w, value)?;
    }

    write_u32_le(w, entry.selectors.len() as u32)?;
    for (keytype, selector) in &entry.selectors {
        write_length_prefixed_str(w, keytype)?;
        encode_selector(w, selector)?;
    }

    write_u32_le(w, entry.transforms.len() as u32)?;
    for op in entry.transforms.ops() {
        encode_op(w, op)?;
    }
    Ok(())
}

/// Decode and validate a cache entry.
pub fn decode_entry(r: &mut dyn Read) -> Result<CacheEntry, CacheError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(CacheError::InvalidMagic);
    }
    let version = read_u8(r)?;
    if version != FORMAT_VERSION {
        return Err(CacheError::UnsupportedVersion { found: version });
    }

    let fingerprint = read_length_prefixed_str(r)?;
    let config_hash = read_u64_le(r)?;

    let n_fields = read_u32_le(r)? as usize;
    let mut fields = IndexMap::with_capacity(n_fields.min(MAX_PREALLOC));
    for _ in 0..n_fields {
        let name = read_length_prefixed_str(r)?;
        fields.insert(name, decode_value(r)?);
    }

    let n_selectors = read_u32_le(r)? as usize;
    let mut selectors = IndexMap::with_capacity(n_selectors.min(MAX_PREALLOC));
    for _ in 0..n_selectors {
        let keytype = read_length_prefixed_str(r)?;
        selectors.insert(keytype, decode_selector(r)?);
    }

    let n_ops = read_u32_le(r)? as usize;
    let mut ops = Vec::with_capacity(n_ops.min(MAX_PREALLOC));
    for _ in 0..n_ops {
        ops.push(decode_op(r)?);
    }

    Ok(CacheEntry {
        fingerprint,
        config_hash,
        fields,
        selectors,
        transforms: TransformStack::from_ops(ops),
    })
}
