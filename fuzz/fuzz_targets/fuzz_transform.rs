#![no_main]
use libfuzzer_sys::fuzz_target;

use bytes::Bytes;
use form_tree::{Limits, Transformer};
use http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, Method};

const CONTENT_TYPES: [&str; 2] = [
    "multipart/form-data; boundary=BOUNDARY",
    "application/x-www-form-urlencoded",
];

fuzz_target!(|data: &[u8]| {
    let Some((first, body)) = data.split_first() else {
        return;
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(CONTENT_TYPES[usize::from(*first) % CONTENT_TYPES.len()]),
    );

    let transformer = Transformer::new(Limits::default());
    if let Ok(mut transformed) = transformer.transform(&Method::POST, &headers, Bytes::copy_from_slice(body)) {
        transformed.release();
    }
});
