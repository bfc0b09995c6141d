use std::io;

use bytes::{Buf, BufMut, Bytes};

use super::VarInt;

pub trait Codec {
    fn encode<B: BufMut>(&self, buffer: &mut B) -> io::Result<()>;
    fn decode<B: Buf>(bytes: &mut B) -> io::Result<Self>
    where
        Self: Sized;
}

impl<T: Codec> Codec for Vec<T> {
    fn encode<B: BufMut>(&self, buffer: &mut B) -> io::Result<()> {
        VarInt(self.len()).encode(buffer)?;
        for element in self {
            element.encode(buffer)?;
        }

        Ok(())
    }

    fn decode<B: Buf>(bytes: &mut B) -> io::Result<Self>
    where
        Self: Sized,
    {
        let mut list = ListDecoder::new(bytes)?;
        let mut items = Vec::new();
        while let Some(item) = list.next_item()? {
            items.push(item);
        }

        Ok(items)
    }
}

/// Decodes a length-prefixed list one element at a time.
///
/// [`next_item`](ListDecoder::next_item) returns `Ok(None)` once the end of the list is reached,
/// any other failure is reported as an error.
pub struct ListDecoder<'a, B> {
    bytes: &'a mut B,
    remaining: usize,
}

impl<'a, B: Buf> ListDecoder<'a, B> {
    /// Reads the list header.
    pub fn new(bytes: &'a mut B) -> io::Result<Self> {
        let remaining = *VarInt::decode(&mut *bytes)?;

        Ok(Self { bytes, remaining })
    }

    pub fn next_item<T: Codec>(&mut self) -> io::Result<Option<T>> {
        if self.remaining == 0 {
            return Ok(None);
        }

        let item = T::decode(&mut *self.bytes)?;
        self.remaining -= 1;

        Ok(Some(item))
    }
}

/// Writes borrowed elements with the same encoding as a `Vec<T>`.
pub fn encode_borrowed_list<T: Codec, B: BufMut>(items: &[&T], buffer: &mut B) -> io::Result<()> {
    VarInt(items.len()).encode(buffer)?;
    for item in items {
        item.encode(buffer)?;
    }

    Ok(())
}

/// Writes a list whose elements are already encoded.
pub fn encode_raw_list<B: BufMut>(items: &[Bytes], buffer: &mut B) -> io::Result<()> {
    VarInt(items.len()).encode(buffer)?;
    for item in items {
        buffer.put_slice(item);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::payload::Hash;

    #[test]
    fn list_decoder_stops_at_end_of_list() {
        let hashes = vec![Hash::new([1; 32]), Hash::new([2; 32])];
        let mut buffer = Vec::new();
        hashes.encode(&mut buffer).unwrap();

        let mut bytes = &buffer[..];
        let mut list = ListDecoder::new(&mut bytes).unwrap();
        assert_eq!(list.next_item::<Hash>().unwrap(), Some(hashes[0]));
        assert_eq!(list.next_item::<Hash>().unwrap(), Some(hashes[1]));
        assert_eq!(list.next_item::<Hash>().unwrap(), None);
    }

    #[test]
    fn list_decoder_reports_truncation() {
        // Announces two hashes, carries one and a half.
        let mut buffer = vec![0x02];
        buffer.extend_from_slice(&[7u8; 48]);

        let mut bytes = &buffer[..];
        let mut list = ListDecoder::new(&mut bytes).unwrap();
        assert!(list.next_item::<Hash>().unwrap().is_some());
        assert!(list.next_item::<Hash>().is_err());
    }

    #[test]
    fn raw_list_matches_encoded_list() {
        let hashes = vec![Hash::new([3; 32]), Hash::new([4; 32])];
        let raw: Vec<Bytes> = hashes
            .iter()
            .map(|h| Bytes::copy_from_slice(h.as_bytes()))
            .collect();

        let mut expected = Vec::new();
        hashes.encode(&mut expected).unwrap();
        let mut actual = Vec::new();
        encode_raw_list(&raw, &mut actual).unwrap();

        assert_eq!(actual, expected);
    }
}
