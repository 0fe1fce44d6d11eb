//! Length-prefixed byte layout shared by every proof encoding.
//!
//! Integers are big endian. Optional fields are a presence byte followed, when
//! present, by a u32 length and the bytes.

use crate::error::ProofError;

pub(crate) fn put_u16(out: &mut Vec<u8>, value: usize) {
    out.extend_from_slice(&(value as u16).to_be_bytes());
}

pub(crate) fn put_nodes(out: &mut Vec<u8>, nodes: &[Vec<u8>]) {
    put_u16(out, nodes.len());
    for node in nodes {
        put_u16(out, node.len());
        out.extend_from_slice(node);
    }
}

pub(crate) fn put_optional(out: &mut Vec<u8>, bytes: Option<&[u8]>) {
    match bytes {
        Some(bytes) => {
            out.push(1);
            out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
            out.extend_from_slice(bytes);
        }
        None => out.push(0),
    }
}

/// Cursor over an encoded proof.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8], ProofError> {
        if self.data.len() < len {
            return Err(ProofError::Encoding("unexpected end of input"));
        }
        let (head, tail) = self.data.split_at(len);
        self.data = tail;
        Ok(head)
    }

    pub(crate) fn array<const N: usize>(&mut self) -> Result<[u8; N], ProofError> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.take(N)?);
        Ok(array)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, ProofError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<usize, ProofError> {
        Ok(u16::from_be_bytes(self.array()?) as usize)
    }

    pub(crate) fn u32(&mut self) -> Result<usize, ProofError> {
        Ok(u32::from_be_bytes(self.array()?) as usize)
    }

    pub(crate) fn u64(&mut self) -> Result<u64, ProofError> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    pub(crate) fn nodes(&mut self) -> Result<Vec<Vec<u8>>, ProofError> {
        let count = self.u16()?;
        (0..count)
            .map(|_| {
                let len = self.u16()?;
                Ok(self.take(len)?.to_vec())
            })
            .collect()
    }

    pub(crate) fn optional(&mut self) -> Result<Option<Vec<u8>>, ProofError> {
        match self.u8()? {
            0 => Ok(None),
            1 => {
                let len = self.u32()?;
                Ok(Some(self.take(len)?.to_vec()))
            }
            _ => Err(ProofError::Encoding("invalid presence flag")),
        }
    }

    pub(crate) fn finish(self) -> Result<(), ProofError> {
        if self.data.is_empty() {
            Ok(())
        } else {
            Err(ProofError::Encoding("trailing bytes"))
        }
    }
}
