//! Circular dependency detection.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};
use crate::reference::Reference;

pub(crate) const MAX_DEPTH: usize = 1024;

// References currently being built on this thread, outermost first
thread_local! {
    static RESOLUTION_STACK: RefCell<Vec<Reference>> = const { RefCell::new(Vec::new()) };
}

/// Marks a reference as under construction on the current thread.
///
/// Entering a reference that is already on the stack fails with the cycle
/// path instead of recursing into a build lock held by this same thread.
pub(crate) struct ResolutionFrame {
    // Stack length before this frame was pushed
    depth: usize,
}

impl ResolutionFrame {
    pub(crate) fn enter(reference: &Reference) -> DiResult<Self> {
        RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();

            if let Some(start) = stack.iter().position(|r| r == reference) {
                let mut path = stack[start..].to_vec();
                path.push(reference.clone());
                return Err(DiError::Circular(path));
            }

            if stack.len() >= MAX_DEPTH {
                return Err(DiError::DepthExceeded(MAX_DEPTH));
            }

            let depth = stack.len();
            stack.push(reference.clone());
            Ok(ResolutionFrame { depth })
        })
    }
}

impl Drop for ResolutionFrame {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            // Also discards frames above this one, whatever order they drop in
            stack.borrow_mut().truncate(self.depth);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reentering_reports_cycle_from_first_occurrence() {
        let root = Reference::from("root");
        let a = Reference::from("a");
        let b = Reference::from("b");

        let _root = ResolutionFrame::enter(&root).unwrap();
        let _a = ResolutionFrame::enter(&a).unwrap();
        let _b = ResolutionFrame::enter(&b).unwrap();

        match ResolutionFrame::enter(&a) {
            Err(DiError::Circular(path)) => {
                let names: Vec<_> = path.iter().map(ToString::to_string).collect();
                assert_eq!(names, ["a", "b", "a"]);
            }
            _ => panic!("expected a cycle"),
        }
    }

    #[test]
    fn frames_pop_on_drop() {
        let a = Reference::from("a");
        {
            let _frame = ResolutionFrame::enter(&a).unwrap();
        }
        assert!(ResolutionFrame::enter(&a).is_ok());
    }

    #[test]
    fn depth_is_bounded() {
        let frames: Vec<_> = (0..MAX_DEPTH)
            .map(|i| ResolutionFrame::enter(&Reference::new(i)).unwrap())
            .collect();
        assert!(matches!(
            ResolutionFrame::enter(&Reference::from("one-more")),
            Err(DiError::DepthExceeded(MAX_DEPTH))
        ));
        frames.into_iter().rev().for_each(drop);
        assert!(ResolutionFrame::enter(&Reference::new(0usize)).is_ok());
    }

    #[test]
    fn frames_dropped_out_of_order_leave_a_clean_stack() {
        let frames: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|name| ResolutionFrame::enter(&Reference::from(name)).unwrap())
            .collect();
        drop(frames);

        RESOLUTION_STACK.with(|stack| assert!(stack.borrow().is_empty()));
        assert!(ResolutionFrame::enter(&Reference::from("a")).is_ok());
    }
}
