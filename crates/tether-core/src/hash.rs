use xxhash_rust::xxh64::xxh64;

/// Raw 64-bit hash of `parts`, NUL-separated so `["ab", "c"]` and
/// `["a", "bc"]` differ.
pub fn hash_parts(parts: &[&str]) -> u64 {
    let capacity = parts.iter().map(|p| p.len() + 1).sum();
    let mut input = String::with_capacity(capacity);
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            input.push('\0');
        }
        input.push_str(part);
    }
    xxh64(input.as_bytes(), 0)
}
