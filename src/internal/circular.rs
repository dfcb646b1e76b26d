//! Thread-local resolution path.
//!
//! Cycles are tolerated through pending placeholders, so nothing here aborts a
//! resolution. The path only annotates the warning raised when a cyclic consumer reads a
//! placeholder before it settled.

use std::cell::RefCell;

// Thread-local resolution state
thread_local! {
    static RESOLUTION_TLS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Guard for one entry of the thread-local resolution path
pub(crate) struct ResolutionFrame {
    depth: usize,
}

impl ResolutionFrame {
    /// Pushes `label` (usually `Scope::Token`) for the lifetime of the guard.
    pub(crate) fn enter(label: String) -> Self {
        let depth = RESOLUTION_TLS.with(|tls| {
            let mut stack = tls.borrow_mut();
            stack.push(label);
            stack.len()
        });
        Self { depth }
    }
}

impl Drop for ResolutionFrame {
    fn drop(&mut self) {
        RESOLUTION_TLS.with(|tls| {
            // Truncate rather than pop so an unwinding binding cannot leave stale frames
            tls.borrow_mut().truncate(self.depth - 1);
        });
    }
}

/// Snapshot of the labels currently being resolved on this thread, outermost first.
pub(crate) fn resolution_path() -> Vec<String> {
    RESOLUTION_TLS.with(|tls| tls.borrow().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_nest_and_unwind() {
        assert!(resolution_path().is_empty());
        {
            let _a = ResolutionFrame::enter("App::Logger".into());
            {
                let _b = ResolutionFrame::enter("App::Config".into());
                assert_eq!(resolution_path(), vec!["App::Logger", "App::Config"]);
            }
            assert_eq!(resolution_path(), vec!["App::Logger"]);
        }
        assert!(resolution_path().is_empty());
    }

    #[test]
    fn panicking_binding_leaves_no_frames() {
        let result = std::panic::catch_unwind(|| {
            let _frame = ResolutionFrame::enter("App::Broken".into());
            panic!("binding failed");
        });
        assert!(result.is_err());
        assert!(resolution_path().is_empty());
    }
}
