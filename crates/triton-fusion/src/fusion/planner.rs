//! The single-pass clustering sweep.
//!
//! Nodes are visited once in topological order. Each supported node either
//! joins the partitions it consumes from, founds a new one, or is skipped;
//! each unsupported node poisons the partitions it touches so later merges
//! cannot route a path out of and back into the same cluster.

use std::collections::{BTreeMap, HashMap};

use crate::config::TritonFusionConfig;
use crate::graph::{ArgId, GraphViewer, Node};

use super::Partition;

/// Runs the sweep and returns the finalized partitions in ascending
/// birth-id order. Read-only: host graph mutation happens in a separate
/// phase so a failure there cannot leave a half-planned sweep behind.
pub(crate) fn plan_partitions(
    viewer: &GraphViewer<'_>,
    config: &TritonFusionConfig,
    compatible_providers: &[String],
) -> Vec<Partition> {
    let graph = viewer.graph();
    let mut next_id = 0u64;
    // Live partitions keyed by birth id; BTreeMap keeps classification and
    // merge-target selection deterministic.
    let mut partitions: BTreeMap<u64, Partition> = BTreeMap::new();
    let mut partitions_to_fuse: BTreeMap<u64, Partition> = BTreeMap::new();
    // Remaining unvisited consumers per live value, used to retire poison
    // entries once a value can no longer be consumed.
    let mut active_outputs: HashMap<ArgId, usize> = HashMap::new();

    for &node_id in viewer.nodes_in_topological_order() {
        let Some(node) = graph.node(node_id) else {
            continue;
        };

        let is_supported =
            assigned_to_compatible_provider(node, compatible_providers) && config.is_supported(node);

        // Classify every live partition against this node. Consuming a
        // partition output counts the visit against its ref count whether
        // or not the node is admitted.
        let mut merge_candidates: Vec<u64> = Vec::new();
        for (&id, partition) in partitions.iter_mut() {
            let mut connect_to_output = false;
            let mut connect_to_dependency = false;
            for input in &node.inputs {
                if partition.outputs.contains(input) {
                    partition.output_ref_count -= 1;
                    connect_to_output = true;
                }
                if partition.dependencies.contains(input) {
                    connect_to_dependency = true;
                }
            }
            if is_supported && connect_to_output && !connect_to_dependency {
                merge_candidates.push(id);
            } else if connect_to_output || connect_to_dependency {
                // Not admitted: everything this node produces is now a
                // forbidden entry point for the partition.
                for &output in &node.outputs {
                    partition.dependencies.insert(output);
                }
            }
        }

        if let Some((&dst_id, rest)) = merge_candidates.split_first() {
            // Candidates are ascending by construction; the oldest live
            // partition absorbs the others, youngest first.
            let mut dst = partitions
                .remove(&dst_id)
                .expect("merge candidate must be live");
            for src_id in rest.iter().rev() {
                let src = partitions
                    .remove(src_id)
                    .expect("merge candidate must be live");
                dst.merge_from(src);
            }
            dst.nodes.push(node_id);
            dst.outputs.extend(node.outputs.iter().copied());
            dst.output_ref_count += viewer.output_consumer_count(node_id);
            partitions.insert(dst_id, dst);
        } else if is_supported {
            partitions.insert(
                next_id,
                Partition::singleton(
                    node_id,
                    node.outputs.iter().copied(),
                    viewer.output_consumer_count(node_id),
                ),
            );
            next_id += 1;
        }

        // Seal partitions with no unvisited consumers left. This runs after
        // admission so a partition whose last consumer is this node seals
        // in the same step that admits it.
        let sealed: Vec<u64> = partitions
            .iter()
            .filter(|(_, partition)| partition.output_ref_count == 0)
            .map(|(&id, _)| id)
            .collect();
        for id in sealed {
            let mut partition = partitions
                .remove(&id)
                .expect("sealed id was collected above");
            if partition.is_valid(graph, config) {
                partition.outputs.clear();
                partition.dependencies.clear();
                partitions_to_fuse.insert(id, partition);
            }
        }

        // Retire fully consumed values. Once nothing can consume a value
        // anymore, the taint it carried is unobservable; topological order
        // guarantees no future node reads it.
        for input in &node.inputs {
            if let Some(count) = active_outputs.get_mut(input) {
                *count -= 1;
                if *count == 0 {
                    active_outputs.remove(input);
                    for partition in partitions.values_mut() {
                        partition.dependencies.remove(input);
                    }
                }
            }
        }
        for edge in viewer.output_edges(node_id) {
            *active_outputs.entry(edge.arg).or_insert(0) += 1;
        }
    }

    partitions_to_fuse.into_values().collect()
}

fn assigned_to_compatible_provider(node: &Node, compatible: &[String]) -> bool {
    if compatible.is_empty() {
        return true;
    }
    node.execution_provider
        .as_deref()
        .is_some_and(|provider| compatible.iter().any(|c| c == provider))
}
