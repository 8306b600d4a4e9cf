use jobboard_core::{Document, Filter, Projection, Result};

/// Replace a reference field with a projected document from another
/// collection, matched on `_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub field: String,
    pub collection: String,
    pub projection: Projection,
}

#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub projection: Projection,
    pub skip: u64,
    pub limit: Option<u64>,
    pub expand: Option<Expansion>,
}

/// Document store used by the listing core. Records come back in the
/// store's natural order; `count` and `find` are independent reads.
#[async_trait::async_trait]
pub trait Storage: Send + Sync + 'static {
    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64>;
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        opts: FindOptions,
    ) -> Result<Vec<Document>>;
    async fn get(&self, collection: &str, id: &str, projection: &Projection) -> Result<Document>;
    async fn insert(&self, collection: &str, doc: Document) -> Result<Document>;

    // Collection names with their record counts (for admin/health output)
    fn collection_sizes(&self) -> std::collections::BTreeMap<String, usize> {
        Default::default()
    }
}
