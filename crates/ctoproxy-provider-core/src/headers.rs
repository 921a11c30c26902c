/// Ordered header list. Names compare case-insensitively; the first
/// spelling inserted is the one sent.
pub type Headers = Vec<(String, String)>;

fn position(headers: &Headers, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|(key, _)| key.eq_ignore_ascii_case(name))
}

/// Inserts or replaces `name`.
pub fn header_set(headers: &mut Headers, name: impl Into<String>, value: impl Into<String>) {
    let name = name.into();
    let value = value.into();
    match position(headers, &name) {
        Some(index) => headers[index].1 = value,
        None => headers.push((name, value)),
    }
}

/// Inserts `name` only when it is not present yet.
pub fn header_set_default(headers: &mut Headers, name: &str, value: &str) {
    if position(headers, name).is_none() {
        headers.push((name.to_string(), value.to_string()));
    }
}

/// Applies `extra` on top of `headers`, replacing same-named entries.
pub fn header_merge(headers: &mut Headers, extra: &[(&str, &str)]) {
    for (name, value) in extra {
        header_set(headers, *name, *value);
    }
}

pub fn header_get<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    position(headers, name).map(|index| headers[index].1.as_str())
}
