use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{DnsSecError, Result};

const MAX_LABEL_LEN: usize = 63;
const MAX_NAME_LEN: usize = 255;

/// A domain name as a sequence of raw labels, leftmost label first.
///
/// The root name has no labels. Comparison, equality and hashing ignore
/// ASCII case, and `Ord` is the DNSSEC canonical name order: labels are
/// compared from the rightmost one, bytewise after lowercasing, and a name
/// that runs out of labels sorts first.
#[derive(Clone, Default)]
pub struct Name {
    labels: Vec<Vec<u8>>,
}

impl Name {
    pub fn root() -> Self {
        Self { labels: Vec::new() }
    }

    pub fn from_labels(labels: Vec<Vec<u8>>) -> Result<Self> {
        for label in &labels {
            if label.is_empty() || label.len() > MAX_LABEL_LEN {
                return Err(DnsSecError::InvalidName(format!(
                    "label length {} out of range",
                    label.len()
                )));
            }
        }
        let name = Self { labels };
        if name.wire_len() > MAX_NAME_LEN {
            return Err(DnsSecError::InvalidName(format!(
                "name too long ({} octets)",
                name.wire_len()
            )));
        }
        Ok(name)
    }

    pub fn labels(&self) -> &[Vec<u8>] {
        &self.labels
    }

    pub fn first_label(&self) -> Option<&[u8]> {
        self.labels.first().map(Vec::as_slice)
    }

    /// Number of labels, root excluded
    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }

    /// Label count as recorded in an RRSIG: root and a leading `*` excluded
    pub fn label_count(&self) -> u8 {
        let count = if self.is_wildcard() {
            self.labels.len() - 1
        } else {
            self.labels.len()
        };
        count as u8
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn is_wildcard(&self) -> bool {
        self.first_label() == Some(b"*".as_slice())
    }

    /// The name with its leftmost label removed, `None` for the root
    pub fn parent(&self) -> Option<Name> {
        if self.is_root() {
            None
        } else {
            Some(self.strip_left(1))
        }
    }

    /// Remove `n` labels from the left; stripping past the root yields the root
    pub fn strip_left(&self, n: usize) -> Name {
        let start = n.min(self.labels.len());
        Name {
            labels: self.labels[start..].to_vec(),
        }
    }

    /// The rightmost `n` labels of this name
    pub fn suffix(&self, n: usize) -> Name {
        let n = n.min(self.labels.len());
        self.strip_left(self.labels.len() - n)
    }

    /// `*.<self>`
    pub fn wildcard_of(&self) -> Result<Name> {
        self.prepend_label(b"*")
    }

    pub fn prepend_label(&self, label: &[u8]) -> Result<Name> {
        let mut labels = Vec::with_capacity(self.labels.len() + 1);
        labels.push(label.to_vec());
        labels.extend(self.labels.iter().cloned());
        Name::from_labels(labels)
    }

    /// Append `suffix` after the labels of this name
    pub fn concat(&self, suffix: &Name) -> Result<Name> {
        let mut labels = self.labels.clone();
        labels.extend(suffix.labels.iter().cloned());
        Name::from_labels(labels)
    }

    /// True when `self` equals `other` or lies below it
    pub fn is_subdomain_of(&self, other: &Name) -> bool {
        other.labels.len() <= self.labels.len()
            && self.common_suffix_len(other) == other.labels.len()
    }

    /// Number of rightmost labels the two names share
    pub fn common_suffix_len(&self, other: &Name) -> usize {
        self.labels
            .iter()
            .rev()
            .zip(other.labels.iter().rev())
            .take_while(|(a, b)| a.eq_ignore_ascii_case(b))
            .count()
    }

    pub fn to_lowercase(&self) -> Name {
        Name {
            labels: self
                .labels
                .iter()
                .map(|l| l.to_ascii_lowercase())
                .collect(),
        }
    }

    /// Uncompressed wire form with every label lowercased
    pub fn to_canonical_wire(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.wire_len());
        for label in &self.labels {
            buf.push(label.len() as u8);
            buf.extend(label.iter().map(u8::to_ascii_lowercase));
        }
        buf.push(0);
        buf
    }

    pub fn wire_len(&self) -> usize {
        self.labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.labels.len() == other.labels.len()
            && self
                .labels
                .iter()
                .zip(other.labels.iter())
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.labels.len().hash(state);
        for label in &self.labels {
            for b in label {
                state.write_u8(b.to_ascii_lowercase());
            }
            state.write_u8(0xff);
        }
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.labels.iter().rev().zip(other.labels.iter().rev()) {
            let ord = a
                .iter()
                .map(u8::to_ascii_lowercase)
                .cmp(b.iter().map(u8::to_ascii_lowercase));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.labels.len().cmp(&other.labels.len())
    }
}

impl FromStr for Name {
    type Err = DnsSecError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s == "." {
            return Ok(Name::root());
        }

        let mut labels = Vec::new();
        let mut current = Vec::new();
        let mut chars = s.bytes().peekable();
        while let Some(c) = chars.next() {
            match c {
                b'\\' => {
                    let mut digits = Vec::new();
                    while digits.len() < 3 {
                        match chars.peek() {
                            Some(d) if d.is_ascii_digit() => {
                                digits.push(*d);
                                chars.next();
                            }
                            _ => break,
                        }
                    }
                    if digits.is_empty() {
                        let escaped = chars
                            .next()
                            .ok_or_else(|| DnsSecError::InvalidName(s.to_string()))?;
                        current.push(escaped);
                    } else {
                        let value: u16 = std::str::from_utf8(&digits)
                            .ok()
                            .and_then(|d| d.parse().ok())
                            .filter(|v| digits.len() == 3 && *v <= 255)
                            .ok_or_else(|| DnsSecError::InvalidName(s.to_string()))?;
                        current.push(value as u8);
                    }
                }
                b'.' => {
                    if current.is_empty() {
                        return Err(DnsSecError::InvalidName(s.to_string()));
                    }
                    labels.push(std::mem::take(&mut current));
                }
                other => current.push(other),
            }
        }
        if !current.is_empty() {
            labels.push(current);
        }

        Name::from_labels(labels)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, ".");
        }
        for label in &self.labels {
            for &b in label {
                match b {
                    b'.' | b'\\' | b'(' | b')' | b';' | b'"' => write!(f, "\\{}", b as char)?,
                    0x21..=0x7e => write!(f, "{}", b as char)?,
                    _ => write!(f, "\\{:03}", b)?,
                }
            }
            write!(f, ".")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(name("www.Example.com").to_string(), "www.Example.com.");
        assert_eq!(name("www.example.com.").num_labels(), 3);
        assert!(name(".").is_root());
        assert_eq!(Name::root().to_string(), ".");
        assert_eq!(name("a\\.b.example").num_labels(), 2);
        assert_eq!(name("\\065.example").first_label(), Some(b"A".as_slice()));
        assert!("a..example".parse::<Name>().is_err());
    }

    #[test]
    fn test_case_insensitive_equality() {
        assert_eq!(name("WWW.EXAMPLE.COM"), name("www.example.com"));
        assert_ne!(name("www.example.com"), name("example.com"));
    }

    #[test]
    fn test_canonical_order_rfc4034() {
        // RFC 4034 section 6.1 example, already in canonical order
        let ordered = [
            "example",
            "a.example",
            "yljkjljk.a.example",
            "Z.a.example",
            "zABC.a.EXAMPLE",
            "z.example",
            "\\001.z.example",
            "*.z.example",
            "\\200.z.example",
        ];
        let names: Vec<Name> = ordered.iter().map(|s| name(s)).collect();
        let mut shuffled = names.clone();
        shuffled.reverse();
        shuffled.sort();
        assert_eq!(shuffled, names);
    }

    #[test]
    fn test_label_count_excludes_wildcard() {
        assert_eq!(name("*.example.com").label_count(), 2);
        assert_eq!(name("a.example.com").label_count(), 3);
        assert_eq!(Name::root().label_count(), 0);
    }

    #[test]
    fn test_parent_and_suffix() {
        let n = name("a.b.example");
        assert_eq!(n.parent().unwrap(), name("b.example"));
        assert_eq!(n.suffix(1), name("example"));
        assert_eq!(n.strip_left(5), Name::root());
        assert!(Name::root().parent().is_none());
    }

    #[test]
    fn test_subdomain() {
        assert!(name("a.b.example").is_subdomain_of(&name("example")));
        assert!(name("example").is_subdomain_of(&name("example")));
        assert!(!name("example").is_subdomain_of(&name("a.example")));
        assert!(!name("aexample").is_subdomain_of(&name("example")));
        assert!(name("example").is_subdomain_of(&Name::root()));
    }

    #[test]
    fn test_canonical_wire_is_lowercase() {
        assert_eq!(
            name("A.Example").to_canonical_wire(),
            vec![1, b'a', 7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0]
        );
    }

    #[test]
    fn test_wildcard() {
        let w = name("example").wildcard_of().unwrap();
        assert!(w.is_wildcard());
        assert_eq!(w.to_string(), "*.example.");
    }

    #[test]
    fn test_label_too_long() {
        let long = "a".repeat(64);
        assert!(format!("{}.example", long).parse::<Name>().is_err());
    }
}
