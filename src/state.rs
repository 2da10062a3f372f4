use std::{fmt, io::Read};

use bytes::{Buf, Bytes, BytesMut};
use memchr::memmem;
use tracing::trace;

use crate::{
    utils::{CRLF, CRLFS, DASHES},
    Error, Limits, Result,
};

#[derive(Debug, PartialEq)]
pub(crate) enum Flag {
    /// Looking for the first delimiter.
    Preamble,
    /// Right after a delimiter, `\r\n` or `--` decides what follows.
    Delimited,
    /// Reading the headers of a part.
    Header,
    /// Reading the body of a part.
    Body,
    Eof,
}

/// IO State
pub struct State<T> {
    io: T,
    eof: bool,
    flag: Flag,
    length: u64,
    total: usize,
    buffer: BytesMut,
    delimiter: Bytes,
    pub(crate) files: usize,
    pub(crate) fields: usize,
    pub(crate) limits: Limits,
}

impl<T> State<T> {
    /// Creates new State.
    pub fn new(boundary: &[u8], io: T, limits: Limits) -> Self {
        // `\r\n--boundary`
        let mut delimiter = BytesMut::with_capacity(4 + boundary.len());
        delimiter.extend_from_slice(&CRLF);
        delimiter.extend_from_slice(&DASHES);
        delimiter.extend_from_slice(boundary);

        // placeholder `\r\n`, lets the first boundary match `\r\n--boundary`
        let mut buffer = BytesMut::with_capacity(limits.buffer_size);
        buffer.extend_from_slice(&CRLF);

        Self {
            io,
            eof: false,
            flag: Flag::Preamble,
            length: 0,
            total: 0,
            buffer,
            delimiter: delimiter.freeze(),
            files: 0,
            fields: 0,
            limits,
        }
    }

    /// Gets the index of the next field.
    pub fn index(&mut self) -> usize {
        let index = self.total;
        self.total += 1;
        index
    }

    /// Checks if `index` is the part currently being read.
    pub(crate) fn is_current(&self, index: usize) -> bool {
        self.total == index + 1 && self.flag == Flag::Body
    }

    /// Gets the length of the form-data.
    pub fn len(&self) -> u64 {
        self.length
    }

    /// Checks if nothing was read.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Gets EOF.
    pub fn eof(&self) -> bool {
        self.flag == Flag::Eof
    }

    /// Counts the fields.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Gets the boundary.
    pub fn boundary(&self) -> &[u8] {
        &self.delimiter[4..]
    }
}

impl<T> State<T>
where
    T: Read,
{
    /// Reads the next chunk of the payload into buffer, returns 0 on EOF.
    fn fill(&mut self) -> Result<usize> {
        if self.eof {
            return Ok(0);
        }

        let offset = self.buffer.len();
        self.buffer.resize(offset + self.limits.buffer_size, 0);

        let n = match self.io.read(&mut self.buffer[offset..]) {
            Ok(n) => n,
            Err(e) => {
                self.buffer.truncate(offset);
                return Err(e.into());
            }
        };
        self.buffer.truncate(offset + n);

        let l = n as u64;
        if let Some(max) = self.limits.checked_stream_size(self.length + l) {
            return Err(Error::PayloadTooLarge(max));
        }
        self.length += l;

        if n == 0 {
            trace!("polled total bytes: {}", self.length);
            self.eof = true;
        } else {
            trace!("polled bytes {}/{}/{}", n, self.buffer.len(), self.length);
        }

        Ok(n)
    }

    /// Yields the raw header block of the next part, skips the unread body
    /// of the current part first.
    pub(crate) fn next_part(&mut self) -> Result<Option<Bytes>> {
        loop {
            match self.flag {
                Flag::Eof => return Ok(None),
                Flag::Body => {
                    trace!("skipping the rest of part {}", self.total);
                    while self.next_chunk()?.is_some() {}
                }
                Flag::Preamble => {
                    if let Some(n) = memmem::find(&self.buffer, &self.delimiter) {
                        self.buffer.advance(n + self.delimiter.len());
                        self.flag = Flag::Delimited;
                        continue;
                    }

                    // keeps a tail which could be the start of the delimiter
                    let keep = self.delimiter.len() - 1;
                    if self.buffer.len() > keep {
                        self.buffer.advance(self.buffer.len() - keep);
                    }

                    if self.fill()? == 0 {
                        // Empty Request Body
                        if self.length == 0 {
                            self.buffer.clear();
                            self.flag = Flag::Eof;
                            return Ok(None);
                        }
                        return Err(Error::InvalidBoundary);
                    }
                }
                Flag::Delimited => {
                    if self.buffer.len() < 2 {
                        if self.fill()? == 0 {
                            return Err(Error::UnexpectedEof);
                        }
                        continue;
                    }

                    if self.buffer[..2] == DASHES {
                        trace!("close delimiter, {} parts", self.total);
                        self.buffer.clear();
                        self.flag = Flag::Eof;
                        return Ok(None);
                    }

                    if self.buffer[..2] == CRLF {
                        self.buffer.advance(2);
                        self.flag = Flag::Header;
                        continue;
                    }

                    // transport padding
                    if self.buffer[0] == b' ' || self.buffer[0] == b'\t' {
                        self.buffer.advance(1);
                        continue;
                    }

                    return Err(Error::InvalidBoundary);
                }
                Flag::Header => {
                    // part without headers
                    if self.buffer.len() >= 2 && self.buffer[..2] == CRLF {
                        self.flag = Flag::Body;
                        return Ok(Some(self.buffer.split_to(2).freeze()));
                    }

                    if let Some(n) = memmem::find(&self.buffer, &CRLFS) {
                        self.flag = Flag::Body;
                        return Ok(Some(self.buffer.split_to(n + CRLFS.len()).freeze()));
                    }

                    if self.buffer.len() > self.limits.buffer_size {
                        return Err(Error::InvalidHeader);
                    }

                    if self.fill()? == 0 {
                        return Err(Error::UnexpectedEof);
                    }
                }
            }
        }
    }

    /// Yields the next chunk of the current part's body, `None` at its end.
    pub(crate) fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        loop {
            if self.flag != Flag::Body {
                return Ok(None);
            }

            if let Some(n) = memmem::find(&self.buffer, &self.delimiter) {
                if n > 0 {
                    return Ok(Some(self.split_chunk(n)));
                }
                self.buffer.advance(self.delimiter.len());
                self.flag = Flag::Delimited;
                return Ok(None);
            }

            // a chunk never ends inside a delimiter
            let safe = self.buffer.len().saturating_sub(self.delimiter.len() - 1);
            if safe > 0 {
                return Ok(Some(self.split_chunk(safe)));
            }

            if self.fill()? == 0 {
                return Err(Error::UnexpectedEof);
            }
        }
    }

    fn split_chunk(&mut self, n: usize) -> Bytes {
        let n = n.min(self.limits.buffer_size);
        trace!("part decoded from buffer, {} bytes", n);
        self.buffer.split_to(n).freeze()
    }
}

impl<T> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("eof", &self.eof)
            .field("flag", &self.flag)
            .field("total", &self.total)
            .field("length", &self.length)
            .field("boundary", &String::from_utf8_lossy(self.boundary()))
            .finish()
    }
}
