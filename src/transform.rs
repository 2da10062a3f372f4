use std::{hash::Hash, path::PathBuf};

use bytes::Bytes;
use http::{header::CONTENT_TYPE, HeaderMap, Method, Request};
use indexmap::IndexMap;
use tracing::debug;

use crate::{
    utils::parse_boundary, Content, DataTree, FormData, Limits, Result, Uploader, Uploads,
};

/// Result of [`Transformer::transform`].
#[derive(Debug, Default)]
pub struct Transformed {
    /// Body to forward: the raw body for streams, the encoded data tree for
    /// forms, nothing for `HEAD` and `OPTIONS`.
    pub body: Option<Bytes>,
    /// Whether `body` holds an encoded data tree.
    pub parsed: bool,
    /// Encoded file tree, present when a multipart body had file parts,
    /// `{}` when all of them were dropped.
    pub uploads: Option<Bytes>,
    /// Uploaded files of a multipart body.
    pub files: Option<Uploads>,
}

impl Transformed {
    /// Removes the temporary files of the uploads.
    pub fn release(&mut self) {
        if let Some(files) = self.files.as_mut() {
            files.release();
        }
    }
}

/// Turns request bodies into PHP-style data and file trees.
#[derive(Debug, Clone, Default)]
pub struct Transformer {
    limits: Limits,
    uploader: Uploader,
}

impl Transformer {
    /// Creates new Transformer.
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            uploader: Uploader::new(),
        }
    }

    /// Directory of the upload temporary files.
    #[must_use]
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.uploader = self.uploader.dir(dir);
        self
    }

    /// Prefix of the upload temporary file names.
    #[must_use]
    pub fn temp_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.uploader = self.uploader.prefix(prefix);
        self
    }

    /// Gets the limits.
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Transforms a request.
    pub fn transform_request(&self, req: Request<Bytes>) -> Result<Transformed> {
        let (parts, body) = req.into_parts();
        self.transform(&parts.method, &parts.headers, body)
    }

    /// Transforms a body according to the method and the `Content-Type`.
    ///
    /// # Errors
    ///
    /// Conflicting keys or a body which does not decode as its content type.
    /// Uploads stored before the failure are released.
    pub fn transform(&self, method: &Method, headers: &HeaderMap, body: Bytes) -> Result<Transformed> {
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let content = Content::classify(method, content_type);

        debug!("{} {:?} body, {} bytes", method, content, body.len());

        match content {
            Content::None => Ok(Transformed::default()),
            Content::Stream => Ok(Transformed {
                body: Some(body),
                ..Transformed::default()
            }),
            Content::UrlEncoded => {
                let data = self.url_encoded(&body)?;
                Ok(Transformed {
                    body: Some(data.to_json()?.into()),
                    parsed: true,
                    ..Transformed::default()
                })
            }
            Content::Multipart => {
                let (data, files) = self.multipart(content_type, &body)?;
                // file parts were sent, even if none of them made it into the tree
                let uploads = if files.received() == 0 {
                    None
                } else {
                    Some(files.to_json()?.into())
                };
                Ok(Transformed {
                    body: Some(data.to_json()?.into()),
                    parsed: true,
                    uploads,
                    files: Some(files),
                })
            }
        }
    }

    /// Builds the data tree of an `application/x-www-form-urlencoded` body.
    pub fn url_encoded(&self, body: &[u8]) -> Result<DataTree> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)?;

        let mut data = DataTree::new();
        for (name, values) in group(pairs) {
            data.push(&name, values, &self.limits)?;
        }

        Ok(data)
    }

    /// Builds the data tree and the uploads of a `multipart/form-data` body.
    ///
    /// File parts are stored as they are read, a failure later in the body
    /// releases them again.
    pub fn multipart(&self, content_type: &str, body: &[u8]) -> Result<(DataTree, Uploads)> {
        let boundary = parse_boundary(content_type)?;
        let mut form = FormData::with_limits(body, boundary, self.limits.clone());

        let mut uploads = Uploads::new();
        let mut fields = Vec::new();
        let mut files = Vec::new();

        while let Some(field) = form.next() {
            let mut field = field?;

            if field.is_file() {
                let upload = self.uploader.upload(&mut field, &self.limits)?;
                files.push((field.name, uploads.track(upload)));
            } else {
                let value = field.text()?;
                fields.push((field.name, value));
            }
        }

        let mut data = DataTree::new();
        for (name, values) in group(fields) {
            data.push(&name, values, &self.limits)?;
        }

        for (name, list) in group(files) {
            uploads.push(&name, list, &self.limits)?;
        }
        uploads.prune();

        Ok((data, uploads))
    }
}

/// Groups repeated names, in order of their first occurrence.
fn group<K: Hash + Eq, V>(pairs: Vec<(K, V)>) -> IndexMap<K, Vec<V>> {
    let mut groups = IndexMap::<K, Vec<V>>::new();
    for (k, v) in pairs {
        groups.entry(k).or_default().push(v);
    }
    groups
}
