//! Cookie jar.
//!
//! Insertion-ordered, last write wins. The backend sees cookies in the order a
//! browser would have accumulated them, so a map with arbitrary order won't do.

/// Ordered name/value cookie store for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    entries: Vec<(String, String)>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a cookie. An existing cookie keeps its position and takes the new value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Absorbs one `Set-Cookie` header value. Attributes are ignored; returns
    /// the cookie name when the header was usable.
    pub fn absorb_set_cookie(&mut self, header: &str) -> Option<String> {
        let (name, value) = parse_set_cookie(header)?;
        self.set(name.clone(), value);
        Some(name)
    }

    /// `Cookie` header with every cookie, in jar order.
    pub fn header(&self) -> String {
        render(self.iter())
    }

    /// `Cookie` header restricted to `names`, in jar order.
    pub fn header_for(&self, names: &[&str]) -> String {
        render(self.iter().filter(|(n, _)| names.contains(n)))
    }
}

fn render<'a>(cookies: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    cookies
        .filter(|(_, v)| !v.is_empty())
        .map(|(n, v)| format!("{n}={v}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Name and raw value of a `Set-Cookie` header.
pub fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let pair = header.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().trim_matches('"').to_string()))
}
