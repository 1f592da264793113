//! Round-robin sampling over a cluster partition.

use rand::{Rng, RngCore};

use crate::clustering::ClusterPartition;
use crate::matrix::ItemId;

/// Result of a sampling pass: the order plus the partition it drained.
#[derive(Debug, Clone)]
pub struct SampleOutcome<K> {
    pub order: Vec<K>,
    pub exhausted: ClusterPartition<K>,
}

/// Draw items one at a time from clusters visited largest-first.
///
/// The visiting order is fixed when sampling starts (size descending, ties by
/// ascending label). Step `i` visits cluster `i % C`; a non-empty cluster gives
/// up one uniformly random member, an empty one makes the step a no-op.
///
/// With `nb_items = Some(n)` exactly `min(n, total)` steps run, so the order can
/// come out shorter than `n` when clusters are uneven. With `None` the steps
/// continue until every cluster is empty and every item is returned once.
///
/// The partition is taken by value and handed back drained.
pub fn sample_round_robin<K: ItemId>(
    mut partition: ClusterPartition<K>,
    nb_items: Option<usize>,
    rng: &mut dyn RngCore,
) -> SampleOutcome<K> {
    let total = partition.item_count();
    let visiting = partition.labels_by_size_desc();
    let mut order = Vec::with_capacity(total);

    if visiting.is_empty() {
        return SampleOutcome {
            order,
            exhausted: partition,
        };
    }

    let steps = nb_items.map(|n| n.min(total));
    let mut step = 0_usize;
    loop {
        match steps {
            Some(limit) if step >= limit => break,
            None if order.len() == total => break,
            _ => {}
        }

        let label = visiting[step % visiting.len()];
        if let Some(members) = partition.members_mut(label) {
            if !members.is_empty() {
                let pick = rng.random_range(0..members.len());
                order.push(members.remove(pick));
            }
        }
        step += 1;
    }

    tracing::debug!(
        steps = step,
        sampled = order.len(),
        cluster_count = visiting.len(),
        "round-robin sampling finished"
    );

    SampleOutcome {
        order,
        exhausted: partition,
    }
}
