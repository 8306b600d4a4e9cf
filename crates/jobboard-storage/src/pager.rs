//! Bounded, paginated listing over a [`Storage`] collection.
//!
//! Each listing issues two independent reads, a count and then one window of
//! records. They are not a transactional pair: a write landing between them
//! can make `total` and `data` disagree slightly, and no cursor is kept
//! between requests.

use crate::traits::{Expansion, FindOptions, Storage};
use jobboard_core::{
    translate, Document, Envelope, Filter, PageWindow, Pagination, PaginationStyle, Projection,
    RawPagination, RawQuery, Result,
};
use tracing::debug;

/// What to return for each listed record.
#[derive(Debug, Clone, Default)]
pub struct Shape {
    pub projection: Projection,
    pub expand: Option<Expansion>,
}

pub struct Pager<'a> {
    store: &'a dyn Storage,
    collection: &'a str,
    style: PaginationStyle,
}

impl<'a> Pager<'a> {
    pub fn new(store: &'a dyn Storage, collection: &'a str, style: PaginationStyle) -> Self {
        Self {
            store,
            collection,
            style,
        }
    }

    pub fn style(&self) -> PaginationStyle {
        self.style
    }

    /// Count the filter's matches and derive the window for this request.
    pub async fn resolve_window(
        &self,
        filter: &Filter,
        raw: &RawPagination,
    ) -> Result<PageWindow> {
        let pagination = Pagination::from_raw(self.style, raw);
        let total = self.store.count(self.collection, filter).await?;
        let window = PageWindow::new(pagination, total);
        debug!(
            collection = self.collection,
            style = %self.style,
            skip = window.skip,
            limit = window.limit,
            total,
            "resolved page window"
        );
        Ok(window)
    }

    pub async fn fetch_page(
        &self,
        filter: &Filter,
        window: &PageWindow,
        shape: &Shape,
    ) -> Result<Envelope<Document>> {
        let data = if window.skip >= window.total {
            Vec::new()
        } else {
            self.store
                .find(
                    self.collection,
                    filter,
                    FindOptions {
                        projection: shape.projection.clone(),
                        skip: window.skip,
                        limit: Some(window.limit),
                        expand: shape.expand.clone(),
                    },
                )
                .await?
        };
        Ok(Envelope::assemble(window, data))
    }

    /// Translate raw query parameters and return one page of results.
    pub async fn list(&self, raw: &RawQuery, shape: &Shape) -> Result<Envelope<Document>> {
        let (filter, pagination) = translate(raw);
        let window = self.resolve_window(&filter, &pagination).await?;
        self.fetch_page(&filter, &window, shape).await
    }
}
