use http::Method;

const URL_ENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART: &str = "multipart/form-data";

/// How a request body is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Content {
    /// No body is processed, `HEAD` and `OPTIONS`.
    None,
    /// Body is passed through as is.
    Stream,
    /// `multipart/form-data`
    Multipart,
    /// `application/x-www-form-urlencoded`
    UrlEncoded,
}

impl Content {
    /// Classifies a request by its method and raw `Content-Type` header.
    ///
    /// ```
    /// use form_tree::Content;
    /// use http::Method;
    ///
    /// assert_eq!(Content::classify(&Method::HEAD, "multipart/form-data"), Content::None);
    /// assert_eq!(
    ///     Content::classify(&Method::POST, "Multipart/Form-Data; boundary=demo"),
    ///     Content::Multipart,
    /// );
    /// assert_eq!(Content::classify(&Method::POST, "application/json"), Content::Stream);
    /// ```
    #[must_use]
    pub fn classify(method: &Method, content_type: &str) -> Self {
        if *method == Method::HEAD || *method == Method::OPTIONS {
            return Self::None;
        }

        let content_type = content_type.to_ascii_lowercase();
        if content_type.contains(URL_ENCODED) {
            Self::UrlEncoded
        } else if content_type.contains(MULTIPART) {
            Self::Multipart
        } else {
            Self::Stream
        }
    }

    /// Checks if the body is decoded into trees.
    #[must_use]
    pub fn is_form(self) -> bool {
        matches!(self, Self::Multipart | Self::UrlEncoded)
    }
}
