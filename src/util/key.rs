//! Mapping between logical keys and the physical keys sent to the object store.

pub const SEPARATOR: char = '/';

/// Joins the configured prefix and a logical key into a physical key.
///
/// Empty and `.` segments are dropped, so the result never carries a double
/// separator. A leading separator on the prefix and a trailing separator on
/// the key survive. `..` only pops segments contributed by the key, so the
/// result always stays below the prefix.
pub fn join(prefix: &str, key: &str) -> String {
    let mut segments = Vec::new();
    for segment in prefix.split(SEPARATOR) {
        push_segment(&mut segments, segment, 0);
    }

    let floor = segments.len();
    for segment in key.split(SEPARATOR) {
        push_segment(&mut segments, segment, floor);
    }

    let rooted = if prefix.is_empty() {
        key.starts_with(SEPARATOR)
    } else {
        prefix.starts_with(SEPARATOR)
    };

    let mut joined = segments.join("/");
    if rooted {
        joined.insert(0, SEPARATOR);
    }
    if key.ends_with(SEPARATOR) && segments.len() > floor {
        joined.push(SEPARATOR);
    }

    joined
}

fn push_segment<'a>(segments: &mut Vec<&'a str>, segment: &'a str, floor: usize) {
    match segment {
        "" | "." => {}
        ".." => {
            if segments.len() > floor {
                segments.pop();
            }
        }
        _ => segments.push(segment),
    }
}

/// Listing prefix for a query below the configured prefix.
///
/// An empty query, or one ending in a separator, names a directory-like
/// namespace and always ends in a separator so `certs` never matches
/// `certs-old/...`. Any other query is a raw string prefix.
pub fn namespace(prefix: &str, query: &str) -> String {
    let mut namespace = join(prefix, query);
    let directory = query.is_empty() || query.ends_with(SEPARATOR);
    if directory && !namespace.is_empty() && !namespace.ends_with(SEPARATOR) {
        namespace.push(SEPARATOR);
    }

    namespace
}

/// Strips the configured prefix from a physical key.
pub fn strip<'a>(prefix: &str, physical: &'a str) -> &'a str {
    let root = namespace(prefix, "");
    physical.strip_prefix(root.as_str()).unwrap_or(physical)
}

/// Whether a logical key names anything below the prefix once `.`, `..` and
/// empty segments are resolved. `""`, `"."`, `"a/.."` and `"/"` do not.
pub fn is_valid(key: &str) -> bool {
    !join("", key).trim_matches(SEPARATOR).is_empty()
}

/// Whether `physical` is a direct child of `namespace`: no separator is left
/// after the namespace other than a trailing one. The namespace itself and
/// keys outside it are not children.
pub fn is_direct_child(namespace: &str, physical: &str) -> bool {
    let Some(rest) = physical.strip_prefix(namespace) else {
        return false;
    };

    let rest = rest.strip_prefix(SEPARATOR).unwrap_or(rest);
    let rest = rest.strip_suffix(SEPARATOR).unwrap_or(rest);

    !rest.is_empty() && !rest.contains(SEPARATOR)
}
