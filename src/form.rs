use std::{
    io::Read,
    sync::{Arc, Mutex},
};

use http::{
    header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    HeaderValue,
};
use tracing::trace;

use crate::{
    utils::{parse_content_disposition, parse_content_type, parse_part_headers},
    Error, Field, Limits, Result, State,
};

/// Reads `multipart/form-data` parts from a body.
#[derive(Debug)]
pub struct FormData<T> {
    state: Arc<Mutex<State<T>>>,
}

impl<T> FormData<T> {
    /// Creates new FormData with default limits.
    pub fn new<B: AsRef<[u8]>>(t: T, b: B) -> Self {
        Self::with_limits(t, b, Limits::default())
    }

    /// Creates new FormData with limits.
    pub fn with_limits<B: AsRef<[u8]>>(t: T, b: B, limits: Limits) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::new(b.as_ref(), t, limits))),
        }
    }

    /// Gets the state.
    pub fn state(&self) -> Arc<Mutex<State<T>>> {
        self.state.clone()
    }
}

/// Reads form-data from request payload body, then yields `Field`
impl<T> Iterator for FormData<T>
where
    T: Read,
{
    type Item = Result<Field<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut state = match self.state.try_lock() {
            Ok(state) => state,
            Err(e) => return Some(Err(Error::TryLockError(e.to_string()))),
        };

        let buf = match state.next_part() {
            Ok(Some(buf)) => buf,
            Ok(None) => {
                trace!("parse eof");
                return None;
            }
            Err(e) => return Some(Err(e)),
        };

        trace!("parse part");

        // too many parts
        if let Some(max) = state.limits.checked_parts(state.total() + 1) {
            return Some(Err(Error::PartsTooMany(max)));
        }

        // invalid part header
        let Ok(mut headers) = parse_part_headers(&buf) else {
            return Some(Err(Error::InvalidHeader));
        };

        // invalid content disposition
        let Some((name, filename)) = headers
            .remove(CONTENT_DISPOSITION)
            .as_ref()
            .map(HeaderValue::as_bytes)
            .map(parse_content_disposition)
            .and_then(Result::ok)
        else {
            return Some(Err(Error::InvalidContentDisposition));
        };

        // field name is too long
        if let Some(max) = state.limits.checked_field_name_size(name.len()) {
            return Some(Err(Error::FieldNameTooLong(max)));
        }

        if filename.is_some() {
            // files too many
            if let Some(max) = state.limits.checked_files(state.files + 1) {
                return Some(Err(Error::FilesTooMany(max)));
            }
            state.files += 1;
        } else {
            // fields too many
            if let Some(max) = state.limits.checked_fields(state.fields + 1) {
                return Some(Err(Error::FieldsTooMany(max)));
            }
            state.fields += 1;
        }

        // yields `Field`
        let mut field = Field::empty();

        field.name = name;
        field.filename = filename;
        field.index = state.index();
        field.content_type = parse_content_type(headers.remove(CONTENT_TYPE).as_ref());
        field.state_mut().replace(self.state());

        if !headers.is_empty() {
            field.headers_mut().replace(headers);
        }

        Some(Ok(field))
    }
}
