//! Execution context handed to providers.
//!
//! A [`Context`] is an immutable chain of string-keyed values plus an
//! optional deadline and a [`CancellationToken`]. Deriving a context never
//! mutates its parent; cancellation flows from parents to children only.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::value::Value;

/// Cooperative cancellation flag with parent chaining.
///
/// # Examples
///
/// ```rust
/// use ref_di::CancellationToken;
///
/// let parent = CancellationToken::new();
/// let child = parent.child_token();
///
/// parent.cancel();
/// assert!(child.is_cancelled());
/// ```
#[derive(Clone, Debug)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

#[derive(Debug)]
struct TokenInner {
    cancelled: AtomicBool,
    parent: Option<CancellationToken>,
    created_at: Instant,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::with_parent(None)
    }

    /// Token cancelled whenever `self` is.
    pub fn child_token(&self) -> Self {
        Self::with_parent(Some(self.clone()))
    }

    fn with_parent(parent: Option<CancellationToken>) -> Self {
        CancellationToken {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                parent,
                created_at: Instant::now(),
            }),
        }
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
            || self
                .inner
                .parent
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
    }

    pub fn throw_if_cancelled(&self) -> Result<(), CancellationError> {
        if self.is_cancelled() {
            Err(CancellationError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.inner.created_at.elapsed()
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CancellationError {
    #[error("operation was cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Cancelable carrier of request-scoped values.
///
/// # Examples
///
/// ```rust
/// use ref_di::{Context, Value};
///
/// let root = Context::background();
/// let ctx = root.with_value("request.id", Value::new(17u64));
///
/// assert_eq!(ctx.value("request.id").and_then(|v| v.get::<u64>()), Some(17));
/// assert!(root.value("request.id").is_none());
///
/// let child = ctx.child();
/// ctx.cancel();
/// assert!(child.is_cancelled());
/// ```
#[derive(Clone, Debug)]
pub struct Context {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    parent: Option<Context>,
    entry: Option<(String, Value)>,
    deadline: Option<Instant>,
    token: CancellationToken,
}

impl Context {
    /// Empty root context that is never cancelled unless asked to.
    pub fn background() -> Self {
        Context {
            inner: Arc::new(ContextInner {
                parent: None,
                entry: None,
                deadline: None,
                token: CancellationToken::new(),
            }),
        }
    }

    fn derive(&self, entry: Option<(String, Value)>, deadline: Option<Instant>, token: CancellationToken) -> Self {
        Context {
            inner: Arc::new(ContextInner {
                parent: Some(self.clone()),
                entry,
                deadline,
                token,
            }),
        }
    }

    /// Derived context carrying one more value; shares this context's
    /// cancellation.
    pub fn with_value(&self, key: impl Into<String>, value: Value) -> Self {
        self.derive(
            Some((key.into(), value)),
            self.inner.deadline,
            self.inner.token.clone(),
        )
    }

    /// Nearest value stored under `key`.
    pub fn value(&self, key: &str) -> Option<Value> {
        let mut current = Some(self);
        while let Some(ctx) = current {
            if let Some((k, v)) = &ctx.inner.entry {
                if k == key {
                    return Some(v.clone());
                }
            }
            current = ctx.inner.parent.as_ref();
        }
        None
    }

    /// Derived context with its own cancellation scope.
    pub fn child(&self) -> Self {
        self.derive(None, self.inner.deadline, self.inner.token.child_token())
    }

    /// Child context expiring at `deadline` (or the parent's, if earlier).
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.inner.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        self.derive(None, Some(deadline), self.inner.token.child_token())
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.inner.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.err().is_some()
    }

    /// Why the context is done, if it is.
    pub fn err(&self) -> Option<CancellationError> {
        if self.inner.token.is_cancelled() {
            Some(CancellationError::Cancelled)
        } else if self.inner.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(CancellationError::DeadlineExceeded)
        } else {
            None
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.inner.token
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
