//! ECDSA signature codec between ASN.1 DER and raw `R || S`
//!
//! The DER form is `SEQUENCE { INTEGER r, INTEGER s }`:
//! `0x30 <len> 0x02 <rlen> R 0x02 <slen> S`. The raw form is two big-endian
//! integers, each left-padded with zeros to the curve coordinate length.
//!
//! Decoding treats its input as untrusted: every length is checked against
//! the remaining buffer before it is used.

use crate::error::{Error, Result};

const SEQUENCE_TAG: u8 = 0x30;
const INTEGER_TAG: u8 = 0x02;

/// Longest length-of-length accepted in a long-form DER length
const MAX_LENGTH_OCTETS: usize = 4;

/// Convert a DER-encoded signature into `2 * coord_len` raw bytes
pub fn to_raw(der: &[u8], coord_len: usize) -> Result<Vec<u8>> {
    let mut reader = DerReader::new(der);

    reader.expect_tag(SEQUENCE_TAG)?;
    let sequence_len = reader.read_length()?;
    if sequence_len != reader.remaining() {
        return Err(Error::MalformedSignature(format!(
            "sequence length {} does not match the {} remaining bytes",
            sequence_len,
            reader.remaining()
        )));
    }

    let mut raw = vec![0u8; 2 * coord_len];
    let (r_out, s_out) = raw.split_at_mut(coord_len);
    reader.read_integer_into(r_out)?;
    reader.read_integer_into(s_out)?;

    if reader.remaining() != 0 {
        return Err(Error::MalformedSignature(format!(
            "{} trailing bytes after the signature integers",
            reader.remaining()
        )));
    }

    Ok(raw)
}

/// Convert a raw `R || S` signature into DER
pub fn to_der(raw: &[u8], coord_len: usize) -> Result<Vec<u8>> {
    if coord_len == 0 || raw.len() != 2 * coord_len {
        return Err(Error::MalformedSignature(format!(
            "raw signature must be {} bytes, got {}",
            2 * coord_len,
            raw.len()
        )));
    }

    let (r, s) = raw.split_at(coord_len);
    let mut content = Vec::with_capacity(raw.len() + 6);
    write_integer(&mut content, r);
    write_integer(&mut content, s);

    let mut der = Vec::with_capacity(content.len() + 4);
    der.push(SEQUENCE_TAG);
    write_length(&mut der, content.len());
    der.extend_from_slice(&content);
    Ok(der)
}

fn write_integer(out: &mut Vec<u8>, value: &[u8]) {
    // Minimal encoding: drop leading zeros but keep at least one byte.
    let first_nonzero = value.iter().position(|&b| b != 0);
    let magnitude = match first_nonzero {
        Some(i) => &value[i..],
        None => &[0u8][..],
    };
    let needs_sign_byte = magnitude[0] & 0x80 != 0;

    out.push(INTEGER_TAG);
    write_length(out, magnitude.len() + usize::from(needs_sign_byte));
    if needs_sign_byte {
        out.push(0x00);
    }
    out.extend_from_slice(magnitude);
}

fn write_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }

    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    let significant = &bytes[skip..];
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
}

struct DerReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> DerReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn read_byte(&mut self) -> Result<u8> {
        let byte = *self.buf.get(self.pos).ok_or_else(|| {
            Error::MalformedSignature("unexpected end of signature".to_string())
        })?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::MalformedSignature(format!(
                "field length {} exceeds the {} remaining bytes",
                len,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn expect_tag(&mut self, tag: u8) -> Result<()> {
        let actual = self.read_byte()?;
        if actual != tag {
            return Err(Error::MalformedSignature(format!(
                "expected tag 0x{:02x}, found 0x{:02x}",
                tag, actual
            )));
        }
        Ok(())
    }

    fn read_length(&mut self) -> Result<usize> {
        let first = self.read_byte()?;
        if first & 0x80 == 0 {
            return Ok(first as usize);
        }

        let octets = (first & 0x7f) as usize;
        if octets == 0 || octets > MAX_LENGTH_OCTETS {
            return Err(Error::MalformedSignature(format!(
                "unsupported length-of-length {}",
                octets
            )));
        }

        let mut len = 0usize;
        for &b in self.read_slice(octets)? {
            len = (len << 8) | b as usize;
        }
        Ok(len)
    }

    /// Reads one INTEGER and right-aligns it into `out`
    fn read_integer_into(&mut self, out: &mut [u8]) -> Result<()> {
        self.expect_tag(INTEGER_TAG)?;
        let len = self.read_length()?;
        if len == 0 {
            return Err(Error::MalformedSignature(
                "empty signature integer".to_string(),
            ));
        }
        if len > out.len() + 1 {
            return Err(Error::MalformedSignature(format!(
                "signature integer of {} bytes exceeds the {}-byte coordinate",
                len,
                out.len()
            )));
        }

        let mut value = self.read_slice(len)?;
        if value[0] & 0x80 != 0 {
            return Err(Error::MalformedSignature(
                "signature integer is negative".to_string(),
            ));
        }
        if value.len() > 1 && value[0] == 0 {
            if value[1] & 0x80 == 0 {
                return Err(Error::MalformedSignature(
                    "signature integer has a non-minimal encoding".to_string(),
                ));
            }
            value = &value[1..];
        }
        if value.len() > out.len() {
            return Err(Error::MalformedSignature(format!(
                "signature integer of {} bytes exceeds the {}-byte coordinate",
                len,
                out.len()
            )));
        }

        let offset = out.len() - value.len();
        out[offset..].copy_from_slice(value);
        Ok(())
    }
}
