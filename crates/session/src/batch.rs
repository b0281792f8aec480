//! Ordered batch with a current-item cursor.

use std::sync::Arc;

use pixbatch_model::asset::{AssetId, ImageAsset, ModelError};

/// Where to move the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Next,
    Previous,
    To(usize),
}

/// Batch items in load order, one of which is on screen.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    items: Vec<Arc<ImageAsset>>,
    current: usize,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append items, preserving order. Ids must be unique.
    pub fn extend(
        &mut self,
        assets: impl IntoIterator<Item = Arc<ImageAsset>>,
    ) -> Result<(), ModelError> {
        for asset in assets {
            if self.contains(asset.id()) {
                return Err(ModelError::DuplicateId {
                    id: asset.id().to_string(),
                });
            }
            self.items.push(asset);
        }
        Ok(())
    }

    /// Remove an item. The cursor stays on the same item when possible,
    /// otherwise on its successor (or the new last item).
    pub fn remove(&mut self, id: &AssetId) -> Option<Arc<ImageAsset>> {
        let index = self.items.iter().position(|a| a.id() == id)?;
        let removed = self.items.remove(index);
        if index < self.current {
            self.current -= 1;
        }
        self.current = self.current.min(self.items.len().saturating_sub(1));
        Some(removed)
    }

    pub fn clear(&mut self) -> Vec<Arc<ImageAsset>> {
        self.current = 0;
        std::mem::take(&mut self.items)
    }

    /// Move the cursor. Returns false when it did not move.
    pub fn navigate(&mut self, to: Navigation) -> bool {
        let target = match to {
            Navigation::Next => self.current + 1,
            Navigation::Previous => match self.current.checked_sub(1) {
                Some(index) => index,
                None => return false,
            },
            Navigation::To(index) => index,
        };
        if target >= self.items.len() || target == self.current {
            return false;
        }
        self.current = target;
        true
    }

    pub fn current(&self) -> Option<&Arc<ImageAsset>> {
        self.items.get(self.current)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn items(&self) -> &[Arc<ImageAsset>] {
        &self.items
    }

    pub fn find(&self, id: &AssetId) -> Option<&Arc<ImageAsset>> {
        self.items.iter().find(|a| a.id() == id)
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.find(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixbatch_model::asset::PixelSource;

    fn asset(id: &str) -> Arc<ImageAsset> {
        Arc::new(
            ImageAsset::new(
                AssetId::from(id),
                format!("{id}.png"),
                PixelSource::Encoded(Arc::from(Vec::<u8>::new())),
                4,
                4,
            )
            .unwrap(),
        )
    }

    fn batch(ids: &[&str]) -> Batch {
        let mut batch = Batch::new();
        batch.extend(ids.iter().map(|id| asset(id))).unwrap();
        batch
    }

    #[test]
    fn test_navigation_stays_in_bounds() {
        let mut b = batch(&["a", "b", "c"]);
        assert!(!b.navigate(Navigation::Previous));
        assert!(b.navigate(Navigation::Next));
        assert!(b.navigate(Navigation::To(2)));
        assert!(!b.navigate(Navigation::Next));
        assert!(!b.navigate(Navigation::To(9)));
        assert_eq!(b.current().unwrap().id().as_str(), "c");
    }

    #[test]
    fn test_remove_keeps_cursor_on_item() {
        let mut b = batch(&["a", "b", "c"]);
        b.navigate(Navigation::To(2));
        b.remove(&AssetId::from("a"));
        assert_eq!(b.current().unwrap().id().as_str(), "c");

        b.remove(&AssetId::from("c"));
        assert_eq!(b.current().unwrap().id().as_str(), "b");

        b.remove(&AssetId::from("b"));
        assert!(b.current().is_none());
        assert_eq!(b.current_index(), 0);
    }

    #[test]
    fn test_rejects_duplicates() {
        let mut b = batch(&["a"]);
        assert!(b.extend([asset("a")]).is_err());
        assert_eq!(b.len(), 1);
    }
}
