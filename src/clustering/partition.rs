use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SelectionError};

/// Items grouped by cluster label. Labels only group; they carry no order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterPartition<K> {
    groups: BTreeMap<usize, Vec<K>>,
}

impl<K> Default for ClusterPartition<K> {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
        }
    }
}

impl<K> ClusterPartition<K> {
    #[must_use]
    pub fn from_groups(groups: BTreeMap<usize, Vec<K>>) -> Self {
        Self { groups }
    }

    /// Group `items[i]` under `labels[i]`, keeping item order inside each group.
    ///
    /// # Errors
    /// [`SelectionError::Clustering`] when the label count differs from the item count.
    pub fn from_labels(items: &[K], labels: &[usize]) -> Result<Self>
    where
        K: Clone,
    {
        if items.len() != labels.len() {
            return Err(SelectionError::Clustering(format!(
                "backend returned {} labels for {} items",
                labels.len(),
                items.len()
            )));
        }
        let mut groups: BTreeMap<usize, Vec<K>> = BTreeMap::new();
        for (item, &label) in items.iter().zip(labels) {
            groups.entry(label).or_default().push(item.clone());
        }
        Ok(Self { groups })
    }

    #[must_use]
    pub fn cluster_count(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn item_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn members(&self, label: usize) -> Option<&[K]> {
        self.groups.get(&label).map(Vec::as_slice)
    }

    pub(crate) fn members_mut(&mut self, label: usize) -> Option<&mut Vec<K>> {
        self.groups.get_mut(&label)
    }

    /// Labels sorted by current size, largest first; equal sizes keep ascending label order.
    #[must_use]
    pub fn labels_by_size_desc(&self) -> Vec<usize> {
        let mut labels: Vec<usize> = self.groups.keys().copied().collect();
        labels.sort_by(|a, b| self.groups[b].len().cmp(&self.groups[a].len()));
        labels
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[K])> {
        self.groups
            .iter()
            .map(|(&label, members)| (label, members.as_slice()))
    }

    #[must_use]
    pub fn into_groups(self) -> BTreeMap<usize, Vec<K>> {
        self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_follow_labels() {
        let partition =
            ClusterPartition::from_labels(&["a", "b", "c", "d"], &[4, 1, 4, 1]).unwrap();
        assert_eq!(partition.cluster_count(), 2);
        assert_eq!(partition.members(4), Some(&["a", "c"][..]));
        assert_eq!(partition.members(1), Some(&["b", "d"][..]));
        assert_eq!(partition.item_count(), 4);
    }

    #[test]
    fn label_count_mismatch_is_an_error() {
        let error = ClusterPartition::from_labels(&["a", "b"], &[0]).unwrap_err();
        assert!(matches!(error, SelectionError::Clustering(_)));
    }

    #[test]
    fn size_order_breaks_ties_by_label() {
        let partition = ClusterPartition::from_groups(BTreeMap::from([
            (0, vec![1]),
            (3, vec![2, 3]),
            (5, vec![4, 5]),
            (7, vec![6, 7, 8]),
        ]));
        assert_eq!(partition.labels_by_size_desc(), vec![7, 3, 5, 0]);
    }

    #[test]
    fn serializes_as_label_to_members() {
        let partition = ClusterPartition::from_labels(&[10_u32, 20], &[0, 1]).unwrap();
        let json = serde_json::to_value(&partition).unwrap();
        assert_eq!(json, serde_json::json!({"0": [10], "1": [20]}));
    }
}
