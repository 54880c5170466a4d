//! Byte streams a handler reads from or writes to.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use alloc::vec::Vec;

/// A readable and/or writable byte source.
///
/// `peek` must not move the read position, so format sniffing leaves the
/// stream untouched for the decoder that follows.
pub trait ImageStream {
    /// Closed streams support neither direction.
    fn is_open(&self) -> bool {
        true
    }

    fn is_readable(&self) -> bool;

    fn is_writable(&self) -> bool;

    /// Up to `len` bytes from the current position, without consuming them.
    fn peek(&mut self, len: usize) -> io::Result<Vec<u8>>;

    /// Everything from the current position to the end.
    fn read_all(&mut self) -> io::Result<Vec<u8>>;

    /// Write all of `data` in one operation.
    fn write_all_bytes(&mut self, data: &[u8]) -> io::Result<()>;
}

fn read_only() -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, "stream is not writable")
}

fn peek_slice(data: &[u8], pos: u64, len: usize) -> Vec<u8> {
    let start = usize::try_from(pos).unwrap_or(usize::MAX).min(data.len());
    let end = start.saturating_add(len).min(data.len());
    data[start..end].to_vec()
}

impl ImageStream for Cursor<Vec<u8>> {
    fn is_readable(&self) -> bool {
        true
    }

    fn is_writable(&self) -> bool {
        true
    }

    fn peek(&mut self, len: usize) -> io::Result<Vec<u8>> {
        Ok(peek_slice(self.get_ref(), self.position(), len))
    }

    fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        self.read_to_end(&mut data)?;
        Ok(data)
    }

    fn write_all_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        self.write_all(data)
    }
}

impl ImageStream for Cursor<&[u8]> {
    fn is_readable(&self) -> bool {
        true
    }

    fn is_writable(&self) -> bool {
        false
    }

    fn peek(&mut self, len: usize) -> io::Result<Vec<u8>> {
        Ok(peek_slice(self.get_ref(), self.position(), len))
    }

    fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        self.read_to_end(&mut data)?;
        Ok(data)
    }

    fn write_all_bytes(&mut self, _data: &[u8]) -> io::Result<()> {
        Err(read_only())
    }
}

/// Files are assumed open for both directions; the OS reports misuse.
impl ImageStream for File {
    fn is_readable(&self) -> bool {
        true
    }

    fn is_writable(&self) -> bool {
        true
    }

    fn peek(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let start = self.stream_position()?;
        let mut data = Vec::with_capacity(len);
        let result = Read::by_ref(self).take(len as u64).read_to_end(&mut data);
        self.seek(SeekFrom::Start(start))?;
        result?;
        Ok(data)
    }

    fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        self.read_to_end(&mut data)?;
        Ok(data)
    }

    fn write_all_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        self.write_all(data)?;
        self.flush()
    }
}

impl<S: ImageStream + ?Sized> ImageStream for &mut S {
    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn is_readable(&self) -> bool {
        (**self).is_readable()
    }

    fn is_writable(&self) -> bool {
        (**self).is_writable()
    }

    fn peek(&mut self, len: usize) -> io::Result<Vec<u8>> {
        (**self).peek(len)
    }

    fn read_all(&mut self) -> io::Result<Vec<u8>> {
        (**self).read_all()
    }

    fn write_all_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write_all_bytes(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_does_not_consume() {
        let mut stream = Cursor::new(b"0123456789".to_vec());
        assert_eq!(stream.peek(4).unwrap(), b"0123");
        assert_eq!(stream.peek(100).unwrap(), b"0123456789");
        assert_eq!(stream.read_all().unwrap(), b"0123456789");
        assert!(stream.peek(4).unwrap().is_empty());
    }

    #[test]
    fn borrowed_cursor_is_read_only() {
        let data = [1u8, 2, 3];
        let mut stream = Cursor::new(&data[..]);
        assert!(!stream.is_writable());
        let err = stream.write_all_bytes(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(stream.read_all().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn owned_cursor_collects_writes() {
        let mut stream = Cursor::new(Vec::new());
        stream.write_all_bytes(b"abc").unwrap();
        assert_eq!(stream.into_inner(), b"abc");
    }

    #[test]
    fn file_peek_restores_position() {
        let path = std::env::temp_dir().join(format!("avif-imageio-peek-{}", std::process::id()));
        std::fs::write(&path, b"ftypavif").unwrap();
        let mut file = File::open(&path).unwrap();
        assert_eq!(file.peek(4).unwrap(), b"ftyp");
        assert_eq!(file.read_all().unwrap(), b"ftypavif");
        std::fs::remove_file(&path).unwrap();
    }
}
