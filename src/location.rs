use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters which RFC 3986 disallows within a URI fragment, and which are
/// therefore percent-encoded when a location segment is appended.
const FRAGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Root location of a document rooted at `base`: the base URI followed by an
/// empty fragment pointer.
pub fn root(base: &str) -> String {
    format!("{base}#")
}

/// Extend `parent` with an object property segment. The property name is
/// escaped per RFC 6901 (`~` => `~0`, `/` => `~1`) and then percent-encoded
/// for fragment safety.
pub fn push_prop(parent: &str, name: &str) -> String {
    let escaped = name.replace('~', "~0").replace('/', "~1");
    format!("{parent}/{}", utf8_percent_encode(&escaped, FRAGMENT))
}

/// Extend `parent` with an array item segment.
pub fn push_item(parent: &str, index: usize) -> String {
    format!("{parent}/{index}")
}

/// Split a location into its base URI and fragment pointer.
pub fn split(location: &str) -> (&str, &str) {
    match location.find('#') {
        Some(at) => (&location[..at], &location[at + 1..]),
        None => (location, ""),
    }
}
