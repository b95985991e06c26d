//! Deferred release of scoped resources

use std::ops::{Deref, DerefMut};

type ExitAction<'a, T> = Box<dyn FnOnce(T) + 'a>;

/// Owns a value together with a release action that runs when the guard goes
/// out of scope, on every exit path including early returns and unwinding.
///
/// The action runs at most once per guard. [`ScopeExit::cancel`] suppresses it,
/// [`ScopeExit::rearm`] installs a replacement.
pub struct ScopeExit<'a, T> {
    value: Option<T>,
    on_exit: Option<ExitAction<'a, T>>,
}

impl<'a, T> ScopeExit<'a, T> {
    pub fn new(value: T, on_exit: impl FnOnce(T) + 'a) -> Self {
        Self { value: Some(value), on_exit: Some(Box::new(on_exit)) }
    }

    /// Suppresses the pending release action. Returns `true` if an action was pending.
    pub fn cancel(&mut self) -> bool {
        self.on_exit.take().is_some()
    }

    /// Replaces the release action, arming the guard again if it was cancelled.
    pub fn rearm(&mut self, on_exit: impl FnOnce(T) + 'a) {
        self.on_exit = Some(Box::new(on_exit));
    }

    pub fn is_armed(&self) -> bool {
        self.on_exit.is_some()
    }

    /// Disarms the guard and hands the value back to the caller, who becomes
    /// responsible for releasing it.
    pub fn into_inner(mut self) -> T {
        self.on_exit = None;
        self.value.take().expect("the value is present until the guard is consumed")
    }
}

impl<T> Deref for ScopeExit<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value.as_ref().expect("the value is present until the guard is consumed")
    }
}

impl<T> DerefMut for ScopeExit<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.value.as_mut().expect("the value is present until the guard is consumed")
    }
}

impl<T> Drop for ScopeExit<'_, T> {
    fn drop(&mut self) {
        if let (Some(value), Some(on_exit)) = (self.value.take(), self.on_exit.take()) {
            on_exit(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_release_runs_once_on_scope_exit() {
        let released = RefCell::new(vec![]);
        {
            let guard = ScopeExit::new(7, |v| released.borrow_mut().push(v));
            assert!(guard.is_armed());
            assert_eq!(*guard, 7);
        }
        assert_eq!(*released.borrow(), vec![7]);
    }

    #[test]
    fn test_release_runs_on_early_return() {
        let released = RefCell::new(0);
        let attempt = || -> Result<(), &'static str> {
            let _guard = ScopeExit::new((), |_| *released.borrow_mut() += 1);
            Err::<(), _>("failed halfway")?;
            Ok(())
        };
        assert!(attempt().is_err());
        assert_eq!(*released.borrow(), 1);
    }

    #[test]
    fn test_cancel_suppresses_release() {
        let released = RefCell::new(0);
        {
            let mut guard = ScopeExit::new((), |_| *released.borrow_mut() += 1);
            assert!(guard.cancel());
            assert!(!guard.cancel());
            assert!(!guard.is_armed());
        }
        assert_eq!(*released.borrow(), 0);
    }

    #[test]
    fn test_rearm_replaces_release() {
        let released = RefCell::new(vec![]);
        {
            let mut guard = ScopeExit::new(String::from("old"), |v| released.borrow_mut().push(format!("first {v}")));
            guard.cancel();
            *guard = String::from("new");
            guard.rearm(|v| released.borrow_mut().push(format!("second {v}")));
        }
        assert_eq!(*released.borrow(), vec![String::from("second new")]);
    }

    #[test]
    fn test_into_inner_disarms() {
        let released = RefCell::new(0);
        let guard = ScopeExit::new(vec![1, 2, 3], |_| *released.borrow_mut() += 1);
        let value = guard.into_inner();
        assert_eq!(value, vec![1, 2, 3]);
        assert_eq!(*released.borrow(), 0);
    }
}
