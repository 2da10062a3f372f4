use std::{
    collections::HashSet,
    fs,
    io::{self, ErrorKind, Read, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Serialize, Serializer};
use tracing::{trace, warn};

use crate::{
    tree::{FileTree, Node},
    utils::basename,
    Field, Limits, Result,
};

/// Upload status, serialized as PHP's `UPLOAD_ERR_*` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ErrorCode {
    /// The file was stored.
    #[default]
    Ok = 0,
    /// The file exceeds [`Limits::file_size`].
    IniSize = 1,
    /// No file was sent with the part.
    NoFile = 4,
    /// The temporary file could not be created.
    NoTmpDir = 6,
    /// Writing the temporary file failed.
    CantWrite = 7,
    /// Rejected by a validation step.
    Extension = 8,
}

impl ErrorCode {
    /// PHP's numeric value.
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Checks if the upload succeeded.
    #[must_use]
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// Uploaded file descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Upload {
    /// Client filename, without directories.
    pub name: String,
    /// Declared content type.
    pub mime: String,
    /// Bytes written to the temporary file.
    pub size: u64,
    /// Upload status.
    pub error: ErrorCode,
    /// Temporary file holding the content.
    #[serde(rename = "tmpName", serialize_with = "serialize_tmp_name")]
    pub tmp_name: Option<PathBuf>,
}

fn serialize_tmp_name<S: Serializer>(path: &Option<PathBuf>, serializer: S) -> Result<S::Ok, S::Error> {
    match path {
        Some(path) => path.serialize(serializer),
        None => serializer.serialize_str(""),
    }
}

impl Upload {
    /// Describes a file part, nothing is stored yet.
    pub fn new<T>(field: &Field<T>) -> Self {
        Self {
            name: basename(field.filename.as_deref().unwrap_or_default()).to_owned(),
            mime: field
                .content_type
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            size: 0,
            error: ErrorCode::Ok,
            tmp_name: None,
        }
    }

    /// Gets the temporary file, if the content was stored.
    pub fn tmp_path(&self) -> Option<&Path> {
        self.tmp_name.as_deref()
    }

    /// Copies the rest of a file part into `writer`.
    ///
    /// [`Upload::size`] counts the bytes the writer accepted. A file over
    /// [`Limits::file_size`] is marked `IniSize`, a failing writer
    /// `CantWrite`. Either way the part is read to its end.
    ///
    /// # Errors
    ///
    /// Only when the body itself cannot be read.
    pub fn write_from<T, W>(&mut self, field: &mut Field<T>, writer: &mut W, limits: &Limits) -> Result<()>
    where
        T: Read,
        W: Write,
    {
        while let Some(buf) = field.next() {
            let buf = buf?;
            if !self.error.is_ok() {
                continue;
            }

            if let Some(max) = limits.checked_file_size(self.size as usize + buf.len()) {
                warn!("file `{}` is too large, limit to `{}`", self.name, max);
                self.error = ErrorCode::IniSize;
            } else if let Err(e) = write_counted(writer, &buf, &mut self.size) {
                warn!("cannot write file `{}`: {}", self.name, e);
                self.error = ErrorCode::CantWrite;
            }
        }

        if self.error.is_ok() {
            if let Err(e) = writer.flush() {
                warn!("cannot flush file `{}`: {}", self.name, e);
                self.error = ErrorCode::CantWrite;
            }
        }

        Ok(())
    }
}

/// `write_all` which keeps count of partial writes.
fn write_counted<W: Write>(writer: &mut W, mut buf: &[u8], size: &mut u64) -> io::Result<()> {
    while !buf.is_empty() {
        match writer.write(buf) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => {
                *size += n as u64;
                buf = &buf[n..];
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Copies file parts into uniquely named temporary files.
#[derive(Debug, Clone)]
pub struct Uploader {
    dir: Option<PathBuf>,
    prefix: String,
}

impl Default for Uploader {
    fn default() -> Self {
        Self {
            dir: None,
            prefix: Self::DEFAULT_PREFIX.to_owned(),
        }
    }
}

impl Uploader {
    /// Temporary file name prefix, defaults to `upload`.
    pub const DEFAULT_PREFIX: &'static str = "upload";

    /// Creates an uploader writing to the system temporary directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory of the temporary files.
    #[must_use]
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir.replace(dir.into());
        self
    }

    /// Prefix of the temporary file names.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Materializes a file part.
    ///
    /// Failures of the upload itself are recorded in [`Upload::error`], the
    /// rest of the part is skipped so the following parts still parse.
    ///
    /// # Errors
    ///
    /// Only when the body itself cannot be read.
    pub fn upload<T: Read>(&self, field: &mut Field<T>, limits: &Limits) -> Result<Upload> {
        let mut upload = Upload::new(field);

        if field.filename.as_deref().map_or(true, str::is_empty) {
            trace!("no file sent for `{}`", field.name);
            upload.error = ErrorCode::NoFile;
            field.ignore()?;
            return Ok(upload);
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix(&self.prefix);
        let created = match &self.dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        let mut file = match created {
            Ok(file) => file,
            Err(e) => {
                warn!("cannot create temporary file for `{}`: {}", field.name, e);
                upload.error = ErrorCode::NoTmpDir;
                field.ignore()?;
                return Ok(upload);
            }
        };

        upload.write_from(field, &mut file, limits)?;

        // failed uploads drop their temporary file right away
        if !upload.error.is_ok() {
            return Ok(upload);
        }

        match file.into_temp_path().keep() {
            Ok(path) => {
                trace!("stored `{}` at {}, {} bytes", upload.name, path.display(), upload.size);
                upload.tmp_name.replace(path);
            }
            Err(e) => {
                warn!("cannot keep temporary file for `{}`: {}", upload.name, e);
                upload.error = ErrorCode::CantWrite;
            }
        }

        Ok(upload)
    }
}

/// Uploaded files of one request.
///
/// Owns the temporary files, they are removed by [`Uploads::release`] or
/// when the collection is dropped.
#[derive(Debug, Default)]
pub struct Uploads {
    tree: FileTree,
    list: Vec<Arc<Upload>>,
    received: usize,
    released: bool,
}

impl Uploads {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of an upload's temporary file.
    pub fn track(&mut self, upload: Upload) -> Arc<Upload> {
        let upload = Arc::new(upload);
        self.received += 1;
        self.list.push(upload.clone());
        upload
    }

    /// Mounts tracked uploads under a field name.
    pub fn push(&mut self, name: &str, files: Vec<Arc<Upload>>, limits: &Limits) -> Result<()> {
        self.tree.push(name, files, limits)
    }

    /// Removes the temporary files of uploads which did not make it into the
    /// tree, e.g. later files of a bare key or too deep names.
    pub fn prune(&mut self) {
        let mut reachable = HashSet::with_capacity(self.list.len());
        collect(&self.tree, &mut reachable);

        let (kept, dropped): (Vec<_>, Vec<_>) = self
            .list
            .drain(..)
            .partition(|upload| reachable.contains(&Arc::as_ptr(upload)));
        self.list = kept;

        for upload in dropped {
            trace!("`{}` is not reachable", upload.name);
            remove(&upload);
        }
    }

    /// Gets the file tree.
    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    /// Iterates all uploads.
    pub fn iter(&self) -> impl Iterator<Item = &Upload> {
        self.list.iter().map(Arc::as_ref)
    }

    /// Counts the uploads.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Checks if there are no uploads.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Counts the file parts handed to [`Uploads::track`], also those
    /// pruned later on.
    pub fn received(&self) -> usize {
        self.received
    }

    /// Checks if the temporary files were removed.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Encodes the file tree as JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        self.tree.to_json()
    }

    /// Removes all temporary files, later calls do nothing.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        for upload in &self.list {
            remove(upload);
        }
    }
}

impl Serialize for Uploads {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.tree.serialize(serializer)
    }
}

impl Drop for Uploads {
    fn drop(&mut self) {
        self.release();
    }
}

fn collect(tree: &FileTree, reachable: &mut HashSet<*const Upload>) {
    for (_, node) in tree {
        match node {
            Node::Value(upload) => {
                reachable.insert(Arc::as_ptr(upload));
            }
            Node::List(uploads) => reachable.extend(uploads.iter().map(Arc::as_ptr)),
            Node::Branch(tree) => collect(tree, reachable),
        }
    }
}

fn remove(upload: &Upload) {
    let Some(path) = upload.tmp_path() else {
        return;
    };

    match fs::remove_file(path) {
        Ok(()) => trace!("removed {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("cannot remove {}: {}", path.display(), e),
    }
}
