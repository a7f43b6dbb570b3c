//! TagRegistry - tag id to metadata, frozen after construction

use std::collections::hash_map::{Entry, HashMap};

use contracts::{TagId, TagMetadata};

use crate::error::DispatcherError;

/// Read-only metadata table consulted on every published reading
///
/// Built once before dispatch starts and shared behind an `Arc`; there is
/// no way to mutate it afterwards, so concurrent lookups need no locking.
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    tags: HashMap<TagId, TagMetadata>,
}

impl TagRegistry {
    /// # Errors
    /// `DuplicateTag` if two entries share a tag id.
    pub fn from_tags<I>(tags: I) -> Result<Self, DispatcherError>
    where
        I: IntoIterator<Item = TagMetadata>,
    {
        let mut map = HashMap::new();
        for tag in tags {
            match map.entry(tag.tag_id.clone()) {
                Entry::Occupied(_) => {
                    return Err(DispatcherError::DuplicateTag {
                        tag_id: tag.tag_id.to_string(),
                    })
                }
                Entry::Vacant(slot) => {
                    slot.insert(tag);
                }
            }
        }
        Ok(Self { tags: map })
    }

    /// # Errors
    /// `TagNotFound` when `tag_id` was never registered.
    pub fn lookup(&self, tag_id: &str) -> Result<&TagMetadata, DispatcherError> {
        self.tags
            .get(tag_id)
            .ok_or_else(|| DispatcherError::tag_not_found(tag_id))
    }

    pub fn contains(&self, tag_id: &str) -> bool {
        self.tags.contains_key(tag_id)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagMetadata> {
        self.tags.values()
    }
}
