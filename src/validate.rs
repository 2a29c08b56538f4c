use log::warn;
use thiserror::Error;

use crate::builder::Bvh;
use crate::geometry::Real;

/// A single structural or volume violation found in a hierarchy.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("root node was referenced {count} times")]
    RootReferenced { count: usize },

    #[error("node {index} was referenced {count} times")]
    NodeReferenceCount { index: u32, count: usize },

    #[error("leaf {index} was referenced {count} times")]
    LeafReferenceCount { index: u32, count: usize },

    #[error(
        "node {parent} volume {parent_volume} is smaller than child node {child} volume {child_volume}"
    )]
    VolumeInversion {
        parent: u32,
        child: u32,
        parent_volume: f64,
        child_volume: f64,
    },
}

/// Every violation the validator found. With `errors_fatal` the scan stops
/// at the first one, so `errors` then holds exactly one entry.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("hierarchy validation failed with {} error(s)", errors.len())]
pub struct ValidationFailure {
    pub errors: Vec<ValidationError>,
}

/// Checks a hierarchy and logs every violation. Purely advisory: the
/// hierarchy is never touched.
pub fn check_bvh<S: Real>(bvh: &Bvh<S>, errors_fatal: bool) -> bool {
    match validate(bvh, errors_fatal) {
        Ok(()) => true,
        Err(failure) => {
            for error in &failure.errors {
                warn!("{error}");
            }
            false
        }
    }
}

/// Checks that every node except the root is referenced exactly once, every
/// leaf is referenced exactly once, and that volumes never grow downward.
///
/// The volume check only runs when the reference counts are clean; broken
/// links would make it chase garbage.
pub fn validate<S: Real>(bvh: &Bvh<S>, errors_fatal: bool) -> Result<(), ValidationFailure> {
    let mut errors = Vec::new();

    check_references(bvh, errors_fatal, &mut errors);
    if errors.is_empty() {
        check_volumes(bvh, errors_fatal, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailure { errors })
    }
}

fn check_references<S: Real>(
    bvh: &Bvh<S>,
    errors_fatal: bool,
    errors: &mut Vec<ValidationError>,
) {
    if bvh.node_count() == 0 {
        return;
    }

    let mut node_counts = vec![0usize; bvh.node_count()];
    let mut leaf_counts = vec![0usize; bvh.primitive_count()];

    for node in bvh.nodes() {
        for (child, is_leaf) in [
            (node.left, node.left_is_leaf()),
            (node.right, node.right_is_leaf()),
        ] {
            if is_leaf {
                leaf_counts[child as usize] += 1;
            } else {
                node_counts[child as usize] += 1;
            }
        }
    }

    if node_counts[0] > 0 {
        errors.push(ValidationError::RootReferenced {
            count: node_counts[0],
        });
        if errors_fatal {
            return;
        }
    }

    for (index, &count) in node_counts.iter().enumerate().skip(1) {
        if count != 1 {
            errors.push(ValidationError::NodeReferenceCount {
                index: index as u32,
                count,
            });
            if errors_fatal {
                return;
            }
        }
    }

    for (index, &count) in leaf_counts.iter().enumerate() {
        if count != 1 {
            errors.push(ValidationError::LeafReferenceCount {
                index: index as u32,
                count,
            });
            if errors_fatal {
                return;
            }
        }
    }
}

fn check_volumes<S: Real>(bvh: &Bvh<S>, errors_fatal: bool, errors: &mut Vec<ValidationError>) {
    if bvh.node_count() == 0 {
        return;
    }

    let mut stack = vec![0u32];
    while let Some(index) = stack.pop() {
        let node = &bvh[index as usize];
        let parent_volume = node.bounds.volume();

        for (child, is_leaf) in [
            (node.left, node.left_is_leaf()),
            (node.right, node.right_is_leaf()),
        ] {
            if is_leaf {
                continue;
            }

            let child_volume = bvh[child as usize].bounds.volume();
            if child_volume > parent_volume {
                errors.push(ValidationError::VolumeInversion {
                    parent: index,
                    child,
                    parent_volume: parent_volume.to_f64().unwrap_or(f64::NAN),
                    child_volume: child_volume.to_f64().unwrap_or(f64::NAN),
                });
                if errors_fatal {
                    return;
                }
            }
            stack.push(child);
        }
    }
}
