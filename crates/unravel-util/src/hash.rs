/// Compute the BLAKE3 digest of a transform input or output, hex-encoded.
#[must_use]
pub fn content_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Whether a transform left its input byte-identical.
#[must_use]
pub fn same_content(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && blake3::hash(a) == blake3::hash(b)
}
