//!
//! ```
//! RUST_LOG=trace cargo test --test form-data -- --nocapture
//! ```

use anyhow::Result;

use form_tree::*;

mod lib;

use lib::{multipart, tracing_init, Limited, Part};

const BOUNDARY: &str = "----WebKitFormBoundaryWLHCs9qmcJJoyjKR";

#[test]
fn many() -> Result<()> {
    tracing_init();

    let body = multipart(
        BOUNDARY,
        &[
            Part::Text("_method", "put"),
            Part::Text("profile[blog]", ""),
            Part::Text("profile[public_email]", ""),
            Part::Text("profile[interests]", ""),
            Part::Text("profile[bio]", "hello\r\n\r\n\"quote\""),
            Part::File("media", "", "application/octet-stream", b""),
            Part::Text("commit", "Save"),
        ],
    );
    let mut form = FormData::new(Limited::random(&body[..]), BOUNDARY);

    while let Some(field) = form.next() {
        let mut field = field?;
        assert!(!field.consumed());
        assert_eq!(field.length, 0);

        let buffer = field.bytes()?;

        match field.index {
            0 => {
                assert_eq!(field.name, "_method");
                assert_eq!(field.filename, None);
                assert_eq!(field.content_type, None);
                assert_eq!(field.length, 3);
                assert_eq!(buffer, "put");
            }
            1 => {
                assert_eq!(field.name, "profile[blog]");
                assert_eq!(field.filename, None);
                assert_eq!(field.content_type, None);
                assert_eq!(field.length, 0);
                assert_eq!(buffer, "");
            }
            2 => {
                assert_eq!(field.name, "profile[public_email]");
                assert_eq!(field.length, 0);
            }
            3 => {
                assert_eq!(field.name, "profile[interests]");
                assert_eq!(field.length, 0);
            }
            4 => {
                assert_eq!(field.name, "profile[bio]");
                assert_eq!(field.filename, None);
                assert_eq!(field.content_type, None);
                assert_eq!(field.length, 16);
                assert_eq!(buffer, "hello\r\n\r\n\"quote\"");
            }
            5 => {
                assert_eq!(field.name, "media");
                assert_eq!(field.filename, Some(String::new()));
                assert_eq!(field.content_type, Some(mime::APPLICATION_OCTET_STREAM));
                assert_eq!(field.length, 0);
                assert_eq!(buffer, "");
            }
            6 => {
                assert_eq!(field.name, "commit");
                assert_eq!(field.filename, None);
                assert_eq!(field.content_type, None);
                assert_eq!(field.length, 4);
                assert_eq!(buffer, "Save");
            }
            _ => unreachable!(),
        }

        assert_eq!(field.length, buffer.len());
        assert!(field.consumed());

        tracing::info!("{:#?}", field);
    }

    let state = form.state();
    let state = state
        .try_lock()
        .map_err(|e| Error::TryLockError(e.to_string()))?;

    assert!(state.eof());
    assert_eq!(state.total(), 7);

    Ok(())
}

#[test]
fn filename_with_space() -> Result<()> {
    tracing_init();

    let body = multipart(
        "------------------------d74496d66958873e",
        &[
            Part::Text("person", "anonymous"),
            Part::File("secret", "foo bar.txt", "text/plain", b"contents of the file"),
        ],
    );
    let mut form = FormData::new(
        Limited::random_with(&body[..], 256),
        "------------------------d74496d66958873e",
    );

    while let Some(field) = form.next() {
        let mut field = field?;
        let buffer = field.bytes()?;

        match field.index {
            0 => {
                assert_eq!(field.name, "person");
                assert_eq!(field.content_type, None);
                assert_eq!(field.length, 9);
                assert_eq!(buffer, "anonymous");
            }
            1 => {
                assert_eq!(field.name, "secret");
                assert_eq!(field.filename, Some("foo bar.txt".to_string()));
                assert_eq!(field.content_type, Some(mime::TEXT_PLAIN));
                assert_eq!(field.length, 20);
                assert_eq!(buffer, "contents of the file");
            }
            _ => unreachable!(),
        }
    }

    let state = form.state();
    let state = state
        .try_lock()
        .map_err(|e| Error::TryLockError(e.to_string()))?;

    assert!(state.eof());
    assert_eq!(state.total(), 2);

    Ok(())
}

#[test]
fn empty() -> Result<()> {
    let mut form = FormData::new(Limited::random(&b""[..]), "AaB03x");

    assert!(form.next().is_none());

    let state = form.state();
    let state = state
        .try_lock()
        .map_err(|e| Error::TryLockError(e.to_string()))?;

    assert!(state.eof());
    assert_eq!(state.total(), 0);
    assert_eq!(state.len(), 0);

    Ok(())
}

#[test]
fn preamble_and_epilogue() -> Result<()> {
    let mut body = b"This is the preamble.\r\n".to_vec();
    body.extend(multipart("AaB03x", &[Part::Text("field1", "Joe owes =E2=82=AC100.")]));
    body.extend_from_slice(b"This is the epilogue.\r\n");

    let mut form = FormData::new(Limited::random_with(&body[..], 16), "AaB03x");

    let mut field = form.next().expect("one field")?;
    assert_eq!(field.name, "field1");
    assert_eq!(field.text()?, "Joe owes =E2=82=AC100.");
    assert!(form.next().is_none());

    Ok(())
}

#[test]
fn read_and_skip() -> Result<()> {
    let body = multipart(
        BOUNDARY,
        &[
            Part::File("upload_file", "font.py", "text/x-python", b"print('font')\n"),
            Part::Text("expire", "on"),
            Part::Text("expireDays", "2"),
        ],
    );
    let mut form = FormData::new(Limited::random_with(&body[..], 8), BOUNDARY);

    // body of the file is never read
    let mut file = form.next().expect("file")?;
    assert_eq!(file.filename.as_deref(), Some("font.py"));
    assert_eq!(file.content_type, Some("text/x-python".parse::<mime::Mime>()?));

    let mut expire = form.next().expect("expire")?;
    let mut value = String::new();
    std::io::Read::read_to_string(&mut expire, &mut value)?;
    assert_eq!(expire.name, "expire");
    assert_eq!(value, "on");

    // the form moved on, the file yields nothing
    assert_eq!(file.bytes()?, "");
    assert!(file.consumed());

    let mut days = form.next().expect("expireDays")?;
    assert_eq!(days.text()?, "2");
    assert!(form.next().is_none());

    Ok(())
}

#[test]
fn quoted_names() -> Result<()> {
    let body = b"--B\r\n\
        Content-Disposition: form-data; filename=\"a;b.txt\"; name=\"semi;colon\"\r\n\
        \r\n\
        x\r\n\
        --B\r\n\
        Content-Disposition: form-data; name=\"say[\\\"hi\\\"]\"\r\n\
        \r\n\
        y\r\n\
        --B--";

    let mut form = FormData::new(&body[..], "B");

    let mut field = form.next().expect("first field")?;
    assert_eq!(field.name, "semi;colon");
    assert_eq!(field.filename.as_deref(), Some("a;b.txt"));
    assert_eq!(field.text()?, "x");

    let mut field = form.next().expect("second field")?;
    assert_eq!(field.name, "say[\"hi\"]");
    assert_eq!(field.text()?, "y");

    assert!(form.next().is_none());

    Ok(())
}

#[test]
fn missing_boundary() {
    let mut form = FormData::new(&b"name=value"[..], "B");

    assert!(matches!(form.next(), Some(Err(Error::InvalidBoundary))));
}

#[test]
fn truncated() -> Result<()> {
    let body = b"--B\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nvalue";
    let mut form = FormData::new(Limited::random_with(&body[..], 4), "B");

    let mut field = form.next().expect("field")?;
    assert!(matches!(field.bytes(), Err(Error::UnexpectedEof)));

    let body = b"--B\r\nContent-Disposition: form-data; name=\"a\"\r\n";
    let mut form = FormData::new(&body[..], "B");
    assert!(matches!(form.next(), Some(Err(Error::UnexpectedEof))));

    Ok(())
}

#[test]
fn invalid_content_disposition() {
    let body = b"--B\r\nContent-Disposition: attachment; name=\"a\"\r\n\r\nvalue\r\n--B--";
    let mut form = FormData::new(&body[..], "B");

    assert!(matches!(form.next(), Some(Err(Error::InvalidContentDisposition))));
}

#[test]
fn limits() -> Result<()> {
    let body = multipart("B", &[Part::Text("a", "1"), Part::Text("b", "2")]);

    let mut form = FormData::with_limits(&body[..], "B", Limits::default().parts(1));
    form.next().expect("first part")?.ignore()?;
    assert!(matches!(form.next(), Some(Err(Error::PartsTooMany(1)))));

    let mut form = FormData::with_limits(&body[..], "B", Limits::default().fields(1));
    form.next().expect("first field")?.ignore()?;
    assert!(matches!(form.next(), Some(Err(Error::FieldsTooMany(1)))));

    let mut form = FormData::with_limits(&body[..], "B", Limits::default().field_name_size(0));
    assert!(matches!(form.next(), Some(Err(Error::FieldNameTooLong(0)))));

    let body = multipart("B", &[Part::Text("a", "toolong")]);
    let mut form = FormData::with_limits(
        Limited::random_with(&body[..], 4),
        "B",
        Limits::default().field_size(4),
    );
    let mut field = form.next().expect("field")?;
    assert!(matches!(field.bytes(), Err(Error::FieldTooLarge(4))));

    let mut form = FormData::with_limits(&body[..], "B", Limits::default().stream_size(8));
    assert!(matches!(form.next(), Some(Err(Error::PayloadTooLarge(8)))));

    Ok(())
}

#[test]
fn copy_to_writer() -> Result<()> {
    let body = multipart(
        "B",
        &[Part::File("file", "lorem.txt", "text/plain", b"Lorem ipsum dolor sit amet")],
    );
    let mut form = FormData::new(Limited::random_with(&body[..], 8), "B");

    let mut field = form.next().expect("file")?;
    let mut out = Vec::new();
    let n = field.copy_to(&mut out)?;

    assert_eq!(n, 26);
    assert_eq!(out, b"Lorem ipsum dolor sit amet");
    assert!(field.consumed());
    assert!(form.next().is_none());

    Ok(())
}
