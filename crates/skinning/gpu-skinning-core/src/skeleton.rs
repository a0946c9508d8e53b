//! Bone arena and skeleton validation.
//!
//! Bones are plain records indexed by position; parent/children are stored
//! as indices so the baker can run against any pose-sampling collaborator,
//! decoupled from a live transform graph.

use glam::Mat4;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single bone in the arena.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    /// Maps a mesh-space vertex into this bone's local space at rest.
    pub bindpose: Mat4,
    /// `None` only for the single root bone.
    pub parent: Option<usize>,
    /// Ordered child indices.
    pub children: Vec<usize>,
}

impl Bone {
    pub fn new(name: impl Into<String>, bindpose: Mat4, parent: Option<usize>) -> Self {
        Self {
            name: name.into(),
            bindpose,
            parent,
            children: Vec::new(),
        }
    }
}

/// Errors raised while validating a bone set.
#[derive(Debug, Error)]
pub enum SkeletonError {
    #[error("skeleton has no bones")]
    Empty,
    #[error("skeleton must have exactly one root bone (found {0})")]
    RootCount(usize),
    #[error("bone {bone} refers to out-of-range parent {parent}")]
    ParentOutOfRange { bone: usize, parent: usize },
    #[error("bone {bone} refers to out-of-range child {child}")]
    ChildOutOfRange { bone: usize, child: usize },
    #[error("bone {0} is not reachable from the root (cycle or orphan)")]
    Unreachable(usize),
}

/// Immutable tree of bones. Indices are stable for the skeleton's lifetime.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Skeleton {
    bones: Vec<Bone>,
    root: usize,
}

impl Skeleton {
    /// Build a skeleton from an arena of bones, validating that they form a
    /// single tree rooted at exactly one bone.
    pub fn new(bones: Vec<Bone>) -> Result<Self, SkeletonError> {
        if bones.is_empty() {
            return Err(SkeletonError::Empty);
        }
        let roots: Vec<usize> = bones
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.parent.is_none().then_some(i))
            .collect();
        if roots.len() != 1 {
            return Err(SkeletonError::RootCount(roots.len()));
        }
        let root = roots[0];

        for (i, bone) in bones.iter().enumerate() {
            if let Some(p) = bone.parent {
                if p >= bones.len() {
                    return Err(SkeletonError::ParentOutOfRange { bone: i, parent: p });
                }
            }
            for &c in &bone.children {
                if c >= bones.len() {
                    return Err(SkeletonError::ChildOutOfRange { bone: i, child: c });
                }
            }
        }

        // Every bone must reach the root by walking parents, without revisits.
        for start in 0..bones.len() {
            let mut cur = start;
            let mut steps = 0usize;
            while let Some(p) = bones[cur].parent {
                cur = p;
                steps += 1;
                if steps > bones.len() {
                    return Err(SkeletonError::Unreachable(start));
                }
            }
            if cur != root {
                return Err(SkeletonError::Unreachable(start));
            }
        }

        Ok(Self { bones, root })
    }

    #[inline]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[inline]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Index of the designated root bone.
    #[inline]
    pub fn root_index(&self) -> usize {
        self.root
    }

    #[inline]
    pub fn bone(&self, index: usize) -> &Bone {
        &self.bones[index]
    }
}
