//! Collection (playlist) seam.

use std::future::Future;
use std::pin::Pin;

use crate::error::PublishError;
use crate::types::CollectionSpec;

/// Remote named collections that uploaded items are grouped into.
///
/// `vidup-api` implements this on top of the playlist endpoints. Using a
/// trait keeps the publish flow testable with mocks.
pub trait CollectionClient: Send + Sync {
    /// Returns the id of the collection titled `spec.title`, creating it
    /// when none exists.
    fn find_or_create<'a>(
        &'a self,
        spec: &'a CollectionSpec,
    ) -> Pin<Box<dyn Future<Output = Result<String, PublishError>> + Send + 'a>>;

    /// Adds an uploaded item to a collection.
    fn attach_item<'a>(
        &'a self,
        collection_id: &'a str,
        item_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), PublishError>> + Send + 'a>>;
}
