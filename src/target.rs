//! Touched-element geometry lookup
//!
//! The tracker asks a [`TargetLookup`] for the frame of the element under a
//! lifted tap. [`RegionTree`] is a plain in-memory hierarchy of frames for
//! hosts that mirror their view tree, and for replaying recorded sessions.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};

/// Resolves the frame of the deepest interactive element containing a point
pub trait TargetLookup: Send {
    fn target_frame(&self, point: &Point) -> Option<Rect>;
}

impl<F> TargetLookup for F
where
    F: Fn(&Point) -> Option<Rect> + Send,
{
    fn target_frame(&self, point: &Point) -> Option<Rect> {
        self(point)
    }
}

/// A node of a frame hierarchy, in surface coordinates
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RegionTree {
    pub frame: Rect,
    #[serde(default)]
    pub children: Vec<RegionTree>,
}

impl RegionTree {
    pub fn leaf(frame: Rect) -> Self {
        Self {
            frame,
            children: Vec::new(),
        }
    }

    pub fn with_children(frame: Rect, children: Vec<RegionTree>) -> Self {
        Self { frame, children }
    }

    /// Descend through the first child containing `point` at each level.
    ///
    /// A leaf containing the point yields its own frame. When no child on the
    /// way down contains the point, the root frame is returned.
    pub fn deepest_frame(&self, point: &Point) -> Rect {
        let mut node = self;
        loop {
            if node.children.is_empty() {
                if node.frame.contains(point) {
                    return node.frame;
                }
                return self.frame;
            }

            match node.children.iter().find(|child| child.frame.contains(point)) {
                Some(child) => node = child,
                None => return self.frame,
            }
        }
    }
}

impl TargetLookup for RegionTree {
    fn target_frame(&self, point: &Point) -> Option<Rect> {
        Some(self.deepest_frame(point))
    }
}
