//! Composition of named "around" steps.
//!
//! A chain is resolved from an ordered list of wrapper names and executed as a
//! right fold: the first name is the outermost wrapper, the last one wraps the
//! innermost call directly.
//!
//! ```
//! use worker_tools::core::wrapper::{Next, Wrapper, WrapperRegistry};
//! use worker_tools::WorkerResult;
//!
//! struct Push(&'static str);
//!
//! impl Wrapper<Vec<String>> for Push {
//!     fn name(&self) -> &str {
//!         self.0
//!     }
//!
//!     fn around(&self, steps: &mut Vec<String>, next: Next<'_, Vec<String>>) -> WorkerResult<()> {
//!         steps.push(format!("before {}", self.0));
//!         next.run(steps)?;
//!         steps.push(format!("after {}", self.0));
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = WrapperRegistry::new();
//! registry.register(Push("a"));
//! registry.register(Push("b"));
//!
//! let mut steps = Vec::new();
//! registry
//!     .chain(&["a", "b"])?
//!     .run(&mut steps, |steps| {
//!         steps.push("run".to_string());
//!         Ok(())
//!     })?;
//!
//! assert_eq!(steps, ["before a", "before b", "run", "after b", "after a"]);
//! # Ok::<(), worker_tools::WorkerError>(())
//! ```

use log::debug;

use crate::error::{WorkerError, WorkerResult};

/// A named middleware step running code around the rest of the chain.
pub trait Wrapper<C, T = ()> {
    /// Name under which the wrapper is registered.
    fn name(&self) -> &str;

    /// Runs the wrapper. Calling `next.run(ctx)` executes the remainder of the
    /// chain, innermost call included; not calling it short-circuits them.
    fn around(&self, ctx: &mut C, next: Next<'_, C, T>) -> WorkerResult<T>;
}

/// Continuation handed to a wrapper.
///
/// `run` takes `self` by value, so the remainder of a chain can be executed at
/// most once per wrapper invocation.
pub struct Next<'a, C, T = ()> {
    rest: &'a [&'a dyn Wrapper<C, T>],
    innermost: &'a mut dyn FnMut(&mut C) -> WorkerResult<T>,
}

impl<C, T> Next<'_, C, T> {
    pub fn run(self, ctx: &mut C) -> WorkerResult<T> {
        match self.rest.split_first() {
            Some((wrapper, rest)) => {
                debug!("Entering wrapper {}", wrapper.name());
                wrapper.around(
                    ctx,
                    Next {
                        rest,
                        innermost: self.innermost,
                    },
                )
            }
            None => (self.innermost)(ctx),
        }
    }
}

/// Wrappers resolved from their names, outermost first.
pub struct WrapperChain<'r, C, T = ()> {
    wrappers: Vec<&'r dyn Wrapper<C, T>>,
}

impl<'r, C, T> WrapperChain<'r, C, T> {
    /// Resolves every name through `lookup`.
    ///
    /// Resolution happens before anything runs; an unknown name fails with
    /// `WorkerError::MissingWrapper`.
    pub fn resolve<S, F>(names: &[S], mut lookup: F) -> WorkerResult<Self>
    where
        S: AsRef<str>,
        F: FnMut(&str) -> Option<&'r dyn Wrapper<C, T>>,
    {
        let wrappers = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                lookup(name).ok_or_else(|| WorkerError::MissingWrapper(name.to_string()))
            })
            .collect::<WorkerResult<Vec<_>>>()?;

        Ok(Self { wrappers })
    }

    pub fn names(&self) -> Vec<&str> {
        self.wrappers.iter().map(|wrapper| wrapper.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.wrappers.is_empty()
    }

    /// Runs the chain around `innermost`.
    pub fn run<F>(&self, ctx: &mut C, mut innermost: F) -> WorkerResult<T>
    where
        F: FnMut(&mut C) -> WorkerResult<T>,
    {
        Next {
            rest: &self.wrappers,
            innermost: &mut innermost,
        }
        .run(ctx)
    }
}

/// Resolves `names` and runs the resulting chain around `innermost`.
pub fn compose<'r, C, T, S, L, F>(
    names: &[S],
    lookup: L,
    ctx: &mut C,
    innermost: F,
) -> WorkerResult<T>
where
    S: AsRef<str>,
    L: FnMut(&str) -> Option<&'r dyn Wrapper<C, T>>,
    F: FnMut(&mut C) -> WorkerResult<T>,
    C: 'r,
    T: 'r,
{
    WrapperChain::resolve(names, lookup)?.run(ctx, innermost)
}

/// Wrapper definitions available to a job, looked up by name.
pub struct WrapperRegistry<C, T = ()> {
    entries: Vec<Box<dyn Wrapper<C, T>>>,
}

impl<C, T> Default for WrapperRegistry<C, T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<C, T> WrapperRegistry<C, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a wrapper definition. A later definition with the same name
    /// replaces the earlier one.
    pub fn register(&mut self, wrapper: impl Wrapper<C, T> + 'static) {
        self.register_boxed(Box::new(wrapper));
    }

    pub fn register_boxed(&mut self, wrapper: Box<dyn Wrapper<C, T>>) {
        self.entries.retain(|entry| entry.name() != wrapper.name());
        self.entries.push(wrapper);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Wrapper<C, T>> {
        self.entries
            .iter()
            .find(|entry| entry.name() == name)
            .map(|entry| entry.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn chain<S: AsRef<str>>(&self, names: &[S]) -> WorkerResult<WrapperChain<'_, C, T>> {
        WrapperChain::resolve(names, |name| self.get(name))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{WorkerError, WorkerResult};

    use super::{Next, Wrapper, WrapperChain, WrapperRegistry, compose};

    struct Recording(&'static str);

    impl Wrapper<Vec<String>> for Recording {
        fn name(&self) -> &str {
            self.0
        }

        fn around(&self, steps: &mut Vec<String>, next: Next<'_, Vec<String>>) -> WorkerResult<()> {
            steps.push(self.0.to_string());
            next.run(steps)?;
            steps.push(self.0.to_string());
            Ok(())
        }
    }

    struct ShortCircuit;

    impl Wrapper<Vec<String>> for ShortCircuit {
        fn name(&self) -> &str {
            "skip"
        }

        fn around(&self, steps: &mut Vec<String>, _next: Next<'_, Vec<String>>) -> WorkerResult<()> {
            steps.push("skip".to_string());
            Ok(())
        }
    }

    struct Rescue;

    impl Wrapper<Vec<String>> for Rescue {
        fn name(&self) -> &str {
            "rescue"
        }

        fn around(&self, steps: &mut Vec<String>, next: Next<'_, Vec<String>>) -> WorkerResult<()> {
            if let Err(error) = next.run(steps) {
                steps.push(format!("rescued {error}"));
            }
            Ok(())
        }
    }

    fn registry() -> WrapperRegistry<Vec<String>> {
        let mut registry = WrapperRegistry::new();
        registry.register(Recording("a"));
        registry.register(Recording("b"));
        registry.register(ShortCircuit);
        registry.register(Rescue);
        registry
    }

    fn innermost(steps: &mut Vec<String>) -> WorkerResult<()> {
        steps.push("run".to_string());
        Ok(())
    }

    #[test]
    fn first_listed_wrapper_is_outermost() -> WorkerResult<()> {
        let registry = registry();
        let mut steps = Vec::new();

        registry.chain(&["a", "b"])?.run(&mut steps, innermost)?;

        assert_eq!(steps, ["a", "b", "run", "b", "a"]);
        Ok(())
    }

    #[test]
    fn empty_chain_runs_innermost_only() -> WorkerResult<()> {
        let registry = registry();
        let mut steps = Vec::new();

        let chain = registry.chain::<&str>(&[])?;
        assert!(chain.is_empty());
        chain.run(&mut steps, innermost)?;

        assert_eq!(steps, ["run"]);
        Ok(())
    }

    #[test]
    fn wrapper_not_calling_next_short_circuits_the_rest() -> WorkerResult<()> {
        let registry = registry();
        let mut steps = Vec::new();

        registry.chain(&["a", "skip", "b"])?.run(&mut steps, innermost)?;

        assert_eq!(steps, ["a", "skip", "a"]);
        Ok(())
    }

    #[test]
    fn wrapper_can_handle_errors_of_the_inner_chain() -> WorkerResult<()> {
        let registry = registry();
        let mut steps = Vec::new();

        registry.chain(&["rescue", "a"])?.run(&mut steps, |steps| {
            steps.push("run".to_string());
            Err(WorkerError::Run("boom".to_string()))
        })?;

        assert_eq!(steps, ["a", "run", "rescued boom"]);
        Ok(())
    }

    #[test]
    fn unknown_wrapper_fails_before_running_anything() {
        let registry = registry();
        let mut steps: Vec<String> = Vec::new();

        let result = compose(
            &["a", "foo"],
            |name| registry.get(name),
            &mut steps,
            innermost,
        );

        match result {
            Err(WorkerError::MissingWrapper(name)) => assert_eq!(name, "foo"),
            other => panic!("expected MissingWrapper, got {other:?}"),
        }
        assert!(steps.is_empty());
    }

    #[test]
    fn later_registration_replaces_earlier_one() {
        let mut registry = registry();
        registry.register(Recording("a"));

        let chain = WrapperChain::resolve(&["a", "b"], |name| registry.get(name)).unwrap();
        assert_eq!(chain.names(), ["a", "b"]);
        assert!(registry.contains("rescue"));
        assert!(!registry.contains("foo"));
    }
}
