/// Redis key-construction helpers for the document store.
#[derive(Debug, Clone)]
pub struct KeyContext<'a> {
    pub prefix: &'a str,
}

impl<'a> KeyContext<'a> {
    pub fn new(prefix: &'a str) -> Self {
        Self { prefix }
    }

    /// Key holding one JSON document.
    /// Format: prefix:doc:collection_path:document_id
    pub fn document(&self, collection: &str, document_id: &str) -> String {
        format!("{}:doc:{}:{}", self.prefix, collection, document_id)
    }

    /// Set of document ids currently stored in a collection.
    pub fn index(&self, collection: &str) -> String {
        format!("{}:idx:{}", self.prefix, collection)
    }

    /// Pub/sub channel carrying the path of every collection that changed.
    pub fn changes_channel(&self) -> String {
        format!("{}:changes", self.prefix)
    }
}
