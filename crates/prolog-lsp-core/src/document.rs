//! Document abstraction for the analysis pipeline.
//!
//! Documents hold the latest editor-side text for each open file. The
//! pipeline reads a document's content when an analysis starts and its
//! `revision` when the analysis finishes, so a result computed from
//! outdated text can be recognized and discarded.

/// An open document: the latest content the editor sent us.
#[derive(Debug, Clone)]
pub struct Document {
    /// The document's uri or path.
    uri: String,
    /// The document content.
    content: String,
    /// Version number reported by the editor (LSP), if any.
    version: Option<i32>,
    /// Monotonic counter bumped on every content update. Unlike
    /// `version` it is always present and never controlled by the
    /// client.
    revision: u64,
}

impl Document {
    /// Create a new document with the given uri and content.
    pub fn new(uri: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            content: content.into(),
            version: None,
            revision: 0,
        }
    }

    /// Create a new document with an editor version number.
    pub fn with_version(uri: impl Into<String>, content: impl Into<String>, version: i32) -> Self {
        Self {
            version: Some(version),
            ..Self::new(uri, content)
        }
    }

    /// Get the document's uri.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Get the document's content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Get the editor version, if set.
    pub fn version(&self) -> Option<i32> {
        self.version
    }

    /// Get the current revision.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replace the content, bumping the revision.
    pub fn set_content(&mut self, content: impl Into<String>, version: Option<i32>) {
        self.content = content.into();
        self.version = version;
        self.revision += 1;
    }
}

/// In-memory store of the currently open documents.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: std::collections::HashMap<String, Document>,
}

impl DocumentStore {
    /// Create a new empty document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a document, replacing any previous entry for the uri.
    pub fn open(&mut self, uri: impl Into<String>, content: impl Into<String>, version: i32) {
        let uri = uri.into();
        self.documents
            .insert(uri.clone(), Document::with_version(uri, content, version));
    }

    /// Update a document's content. Unknown uris are ignored.
    pub fn change(&mut self, uri: &str, content: impl Into<String>, version: i32) {
        if let Some(doc) = self.documents.get_mut(uri) {
            doc.set_content(content, Some(version));
        }
    }

    /// Close a document (remove from store).
    pub fn close(&mut self, uri: &str) {
        self.documents.remove(uri);
    }

    /// Get a document by uri.
    pub fn get(&self, uri: &str) -> Option<&Document> {
        self.documents.get(uri)
    }

    /// All open document uris.
    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(|s| s.as_str())
    }

    /// Check if a document is open.
    pub fn contains(&self, uri: &str) -> bool {
        self.documents.contains_key(uri)
    }

    /// Number of open documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
