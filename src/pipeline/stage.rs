//! Stage contract.
//!
//! A stage receives a context and an explicit continuation to the rest of
//! the pipeline. Stages that keep the context type are [`Behavior`]s; a
//! stage that turns one context type into another is a [`StageConnector`].
//! Pipelines are plain ordered lists of stages.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::types::Result;

/// Continuation to the remainder of a pipeline.
#[async_trait]
pub trait Next<C: Send + 'static>: Send + Sync {
    async fn run(&self, context: C) -> Result<()>;
}

/// Adapts an async closure into a continuation.
pub struct NextFn<F>(pub F);

impl<F> fmt::Debug for NextFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NextFn")
    }
}

#[async_trait]
impl<C, F, Fut> Next<C> for NextFn<F>
where
    C: Send + 'static,
    F: Fn(C) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn run(&self, context: C) -> Result<()> {
        (self.0)(context).await
    }
}

/// Stage that passes the same context type along.
#[async_trait]
pub trait Behavior<C: Send + 'static>: Send + Sync {
    async fn invoke(&self, context: C, next: &dyn Next<C>) -> Result<()>;
}

/// Stage that converts `In` contexts into zero or more `Out` contexts.
#[async_trait]
pub trait StageConnector<In: Send + 'static, Out: Send + 'static>: Send + Sync {
    async fn invoke(&self, context: In, next: &dyn Next<Out>) -> Result<()>;
}

/// Ordered list of behaviors sharing one context type.
pub struct BehaviorChain<C: Send + 'static> {
    behaviors: Vec<Arc<dyn Behavior<C>>>,
}

impl<C: Send + 'static> fmt::Debug for BehaviorChain<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorChain")
            .field("len", &self.behaviors.len())
            .finish()
    }
}

impl<C: Send + 'static> Default for BehaviorChain<C> {
    fn default() -> Self {
        Self {
            behaviors: Vec::new(),
        }
    }
}

impl<C: Send + 'static> BehaviorChain<C> {
    pub fn new(behaviors: Vec<Arc<dyn Behavior<C>>>) -> Self {
        Self { behaviors }
    }

    pub fn push(&mut self, behavior: Arc<dyn Behavior<C>>) {
        self.behaviors.push(behavior);
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    /// Run the chain in order, ending in `terminal`.
    pub async fn invoke(&self, context: C, terminal: &dyn Next<C>) -> Result<()> {
        Remaining {
            behaviors: &self.behaviors,
            terminal,
        }
        .run(context)
        .await
    }
}

/// The part of a chain not yet entered.
struct Remaining<'a, C: Send + 'static> {
    behaviors: &'a [Arc<dyn Behavior<C>>],
    terminal: &'a dyn Next<C>,
}

#[async_trait]
impl<'a, C: Send + 'static> Next<C> for Remaining<'a, C> {
    async fn run(&self, context: C) -> Result<()> {
        match self.behaviors.split_first() {
            Some((behavior, rest)) => {
                let next = Remaining {
                    behaviors: rest,
                    terminal: self.terminal,
                };
                behavior.invoke(context, &next).await
            }
            None => self.terminal.run(context).await,
        }
    }
}
