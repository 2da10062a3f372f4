use std::{
    fmt,
    io::{Error as IoError, Read, Write},
    sync::{Arc, Mutex},
};

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::{Error, Result, State};

/// One part of a `multipart/form-data` body.
pub struct Field<T> {
    /// Bytes of the body read so far.
    pub length: usize,
    /// Position of the part in the body.
    pub index: usize,
    /// Raw field name, e.g. `docs[]`.
    pub name: String,
    /// Client filename, set for file parts, may be empty.
    pub filename: Option<String>,
    /// Declared content type of the part.
    pub content_type: Option<mime::Mime>,
    /// Headers other than `Content-Disposition` and `Content-Type`.
    pub headers: Option<http::HeaderMap>,
    /// Leftover of a chunk partially consumed by `Read`.
    pending: Bytes,
    state: Option<Arc<Mutex<State<T>>>>,
}

impl<T> Field<T> {
    /// Creates an empty field.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            index: 0,
            length: 0,
            name: String::new(),
            filename: None,
            content_type: None,
            headers: None,
            pending: Bytes::new(),
            state: None,
        }
    }

    /// Gets mutable headers.
    pub fn headers_mut(&mut self) -> &mut Option<http::HeaderMap> {
        &mut self.headers
    }

    /// Gets mutable state.
    pub fn state_mut(&mut self) -> &mut Option<Arc<Mutex<State<T>>>> {
        &mut self.state
    }

    /// Gets the status of state.
    pub fn consumed(&self) -> bool {
        self.state.is_none()
    }

    /// Checks if the field is a file part.
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }
}

impl<T> Field<T>
where
    T: Read,
{
    /// Reads field data to bytes.
    pub fn bytes(&mut self) -> Result<Bytes> {
        let mut bytes = BytesMut::new();
        while let Some(buf) = self.next() {
            bytes.extend_from_slice(&buf?);
        }
        Ok(bytes.freeze())
    }

    /// Reads field data to a string, invalid UTF-8 is replaced.
    pub fn text(&mut self) -> Result<String> {
        self.bytes().map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    /// Copys bytes to a writer.
    pub fn copy_to<W>(&mut self, writer: &mut W) -> Result<u64>
    where
        W: Write,
    {
        let mut n = 0;
        while let Some(buf) = self.next() {
            let b = buf?;
            writer.write_all(&b)?;
            n += b.len();
        }
        writer.flush()?;
        Ok(n as u64)
    }

    /// Ignores current field data, pass it.
    pub fn ignore(&mut self) -> Result<()> {
        while let Some(buf) = self.next() {
            drop(buf?);
        }
        Ok(())
    }
}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("index", &self.index)
            .field("length", &self.length)
            .field("headers", &self.headers)
            .field("consumed", &self.state.is_none())
            .finish()
    }
}

impl<T> Read for Field<T>
where
    T: Read,
{
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        if self.pending.is_empty() {
            match self.next() {
                None => return Ok(0),
                Some(Ok(b)) => self.pending = b,
                Some(Err(Error::Stream(e))) => return Err(e),
                Some(Err(e)) => return Err(IoError::other(e)),
            }
        }

        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending.split_to(n));
        Ok(n)
    }
}

/// Reads payload data from part, then yields them
impl<T> Iterator for Field<T>
where
    T: Read,
{
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        trace!("polling {} {}", self.index, self.state.is_some());

        let state = self.state.clone()?;
        let mut state = match state.try_lock() {
            Ok(state) => state,
            Err(e) => return Some(Err(Error::TryLockError(e.to_string()))),
        };

        // the form has moved on to another part
        if !state.is_current(self.index) {
            drop(self.state.take());
            return None;
        }

        match state.next_chunk() {
            Err(e) => {
                drop(self.state.take());
                Some(Err(e))
            }
            Ok(None) => {
                trace!("polled {}", self.index);
                drop(self.state.take());
                None
            }
            Ok(Some(buf)) => {
                let l = buf.len();

                // file size is checked by the uploader
                if !self.is_file() {
                    if let Some(max) = state.limits.checked_field_size(self.length + l) {
                        drop(self.state.take());
                        return Some(Err(Error::FieldTooLarge(max)));
                    }
                }

                self.length += l;
                trace!("polled bytes {}/{}", l, self.length);
                Some(Ok(buf))
            }
        }
    }
}
