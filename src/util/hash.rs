//! Module content digests.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Accumulates `(path, content)` pairs into one digest.
///
/// Each file contributes `path\0sha256(content)\n`, so the digest depends
/// on the order files are added; callers add them sorted by path.
#[derive(Default)]
pub struct ContentDigester {
    hasher: Sha256,
    files: usize,
}

impl ContentDigester {
    pub fn new() -> Self {
        ContentDigester::default()
    }

    pub fn add_file(&mut self, path: &str, content: &[u8]) {
        self.hasher.update(path.as_bytes());
        self.hasher.update([0u8]);
        self.hasher.update(sha256_hex(content).as_bytes());
        self.hasher.update([b'\n']);
        self.files += 1;
    }

    /// Number of files added so far.
    pub fn len(&self) -> usize {
        self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files == 0
    }

    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_of(files: &[(&str, &str)]) -> String {
        let mut digester = ContentDigester::new();
        for (path, content) in files {
            digester.add_file(path, content.as_bytes());
        }
        digester.finish()
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_digest_depends_on_paths_and_contents() {
        let base = digest_of(&[("a.proto", "syntax = \"proto3\";")]);
        assert_eq!(base, digest_of(&[("a.proto", "syntax = \"proto3\";")]));
        assert_ne!(base, digest_of(&[("b.proto", "syntax = \"proto3\";")]));
        assert_ne!(base, digest_of(&[("a.proto", "syntax = \"proto2\";")]));
    }

    #[test]
    fn test_path_boundary_is_unambiguous() {
        assert_ne!(
            digest_of(&[("ab", "c"), ("d", "")]),
            digest_of(&[("a", "bc"), ("d", "")])
        );
    }
}
