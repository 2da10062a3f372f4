use form_tree::parse_key;

#[test]
fn bare() {
    assert_eq!(parse_key("full_name"), ["full_name"]);
    assert_eq!(parse_key(""), [""]);
}

#[test]
fn nested() {
    assert_eq!(parse_key("meta[author]"), ["meta", "author"]);
    assert_eq!(parse_key("a[b][c]"), ["a", "b", "c"]);
    assert_eq!(parse_key("a[b]c"), ["a", "b", "c"]);
}

#[test]
fn append() {
    assert_eq!(parse_key("tags[]"), ["tags", ""]);
    assert_eq!(parse_key("a[][b]"), ["a", "", "b"]);
    assert_eq!(parse_key("a[b][]"), ["a", "b", ""]);
}

#[test]
fn spaces() {
    assert_eq!(parse_key("full name"), ["fullname"]);
    assert_eq!(parse_key(" a [ b ] [ ] "), ["a", "b", ""]);
}

#[test]
fn malformed() {
    assert_eq!(parse_key("a[b"), ["a", "b"]);
    assert_eq!(parse_key("a]b"), ["a", "b"]);
    assert_eq!(parse_key("a[[b]]"), ["a", "b"]);
    assert_eq!(parse_key("a[]]"), ["a", ""]);
    assert_eq!(parse_key("[a]"), ["", "a"]);
    assert_eq!(parse_key("]"), [""]);
}

#[test]
fn unicode() {
    assert_eq!(parse_key("名前[姓]"), ["名前", "姓"]);
}
