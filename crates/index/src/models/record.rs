/// A source package as published in a snapshot's source index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRecord {
    pub package: String,
    pub version: String,
    /// Digest of the upstream (`orig.tar`) tarball.
    pub hash_source: String,
}

/// A binary package as published in a snapshot's binary index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryRecord {
    pub package: String,
    pub version: String,
    /// Digest of the `.deb` file.
    pub hash_binary: String,
}
