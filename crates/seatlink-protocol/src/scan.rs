//! Byte-level substring search over the unframed receive text.
//!
//! The module's output is not guaranteed to be UTF-8 (a garbled baud rate
//! or a half-received multibyte character is enough), so every scan works on
//! bytes.

/// Position of the first occurrence of `needle` in `haystack`.
///
/// An empty needle matches at position zero.
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

/// Iterator over the start positions of every occurrence of `needle`.
///
/// Occurrences may overlap.
pub fn find_all<'a>(haystack: &'a [u8], needle: &'a [u8]) -> impl Iterator<Item = usize> + 'a {
    let mut from = 0;
    std::iter::from_fn(move || {
        if needle.is_empty() || from > haystack.len() {
            return None;
        }
        let at = from + find(&haystack[from..], needle)?;
        from = at + 1;
        Some(at)
    })
}
