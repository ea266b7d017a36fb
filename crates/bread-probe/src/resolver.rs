//! Resolution of semantic targets to concrete elements.
//!
//! [`Resolver::resolve`] walks a target's strategy chain in order, giving
//! each strategy a short bounded wait. The first strategy that locates
//! enough elements wins. Exhaustion is a value ([`Resolution::NotFound`]),
//! never an error.

use crate::driver::PageDriver;
use crate::locator::{Selector, SemanticTarget, Strategy, StrategyTable};
use crate::result::ProbeResult;
use crate::wait::{poll_until, Observation, WaitOptions};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element(s) located for a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedHandle {
    /// Target that was resolved
    pub target: SemanticTarget,
    /// Strategy that won
    pub strategy: Strategy,
    /// Number of matching elements when resolved
    pub count: usize,
}

impl ResolvedHandle {
    /// Selector to act on
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.strategy.selector
    }

    /// Whether all values go into one comma-joined field
    #[must_use]
    pub const fn is_joined(&self) -> bool {
        self.strategy.kind.is_joined()
    }
}

/// One strategy that did not resolve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    /// Strategy tried
    pub strategy: Strategy,
    /// What was seen instead (match count or lookup error)
    pub observed: String,
}

/// Outcome of resolving a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// A strategy located the element(s)
    Found(ResolvedHandle),
    /// Every strategy was exhausted
    NotFound {
        /// Target that could not be resolved
        target: SemanticTarget,
        /// Attempts in the order they were made
        attempts: Vec<Attempt>,
    },
}

impl Resolution {
    /// Handle if found
    #[must_use]
    pub const fn handle(&self) -> Option<&ResolvedHandle> {
        match self {
            Self::Found(handle) => Some(handle),
            Self::NotFound { .. } => None,
        }
    }

    /// Consume into the handle if found
    #[must_use]
    pub fn into_handle(self) -> Option<ResolvedHandle> {
        match self {
            Self::Found(handle) => Some(handle),
            Self::NotFound { .. } => None,
        }
    }

    /// Whether a strategy won
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(handle) => write!(
                f,
                "{} via {} ({} match{})",
                handle.target,
                handle.strategy,
                handle.count,
                if handle.count == 1 { "" } else { "es" }
            ),
            Self::NotFound { target, attempts } => {
                write!(f, "{target} not found after {} strategies", attempts.len())?;
                for attempt in attempts {
                    write!(f, "; {} -> {}", attempt.strategy.selector, attempt.observed)?;
                }
                Ok(())
            }
        }
    }
}

/// What counts as a match while resolving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    /// Anywhere in the DOM; enough to act on
    InDom,
    /// Laid out on screen; what an observer may report as shown
    Rendered,
}

/// Walks strategy chains against one page
#[derive(Debug)]
pub struct Resolver<'a, D: PageDriver + ?Sized> {
    driver: &'a D,
    table: &'a StrategyTable,
    attempt: WaitOptions,
}

impl<'a, D: PageDriver + ?Sized> Resolver<'a, D> {
    /// Create a resolver; `attempt` bounds each strategy
    #[must_use]
    pub const fn new(driver: &'a D, table: &'a StrategyTable, attempt: WaitOptions) -> Self {
        Self {
            driver,
            table,
            attempt,
        }
    }

    /// Strategy table in use
    #[must_use]
    pub const fn table(&self) -> &'a StrategyTable {
        self.table
    }

    /// Resolve `target`, requiring at least `required` elements.
    ///
    /// A `Joined` strategy needs exactly one element whatever `required` is.
    pub async fn resolve(&self, target: SemanticTarget, required: usize) -> Resolution {
        self.resolve_by(target, required, Presence::InDom).await
    }

    /// Like [`Self::resolve`], counting only rendered elements
    pub async fn resolve_visible(&self, target: SemanticTarget, required: usize) -> Resolution {
        self.resolve_by(target, required, Presence::Rendered).await
    }

    async fn matches(&self, selector: &Selector, presence: Presence) -> ProbeResult<usize> {
        match presence {
            Presence::InDom => self.driver.count(selector).await,
            Presence::Rendered => self.driver.visible_count(selector).await,
        }
    }

    async fn resolve_by(&self, target: SemanticTarget, required: usize, presence: Presence) -> Resolution {
        let required = required.max(1);
        let mut attempts = Vec::new();

        for strategy in self.table.strategies(target) {
            let joined = strategy.kind.is_joined();
            let selector = &strategy.selector;
            let polled = poll_until(&self.attempt, format!("{target} via {strategy}"), || async move {
                let count = self.matches(selector, presence).await?;
                let enough = if joined { count == 1 } else { count >= required };
                Ok(if enough {
                    Observation::Satisfied(count)
                } else {
                    Observation::Unsatisfied(format!("{count} found"))
                })
            })
            .await;

            if let Some(count) = polled.value {
                tracing::debug!(%target, %strategy, count, "resolved");
                return Resolution::Found(ResolvedHandle {
                    target,
                    strategy: strategy.clone(),
                    count,
                });
            }
            tracing::debug!(%target, %strategy, observed = %polled.observed, "strategy exhausted");
            attempts.push(Attempt {
                strategy: strategy.clone(),
                observed: polled.observed,
            });
        }

        Resolution::NotFound { target, attempts }
    }

    /// Rendered match count of the first strategy that currently shows
    /// anything, without waiting. Lookup errors count as no match.
    pub async fn count_now(&self, target: SemanticTarget) -> usize {
        for strategy in self.table.strategies(target) {
            match self.driver.visible_count(&strategy.selector).await {
                Ok(0) => {}
                Ok(count) => return count,
                Err(e) => tracing::debug!(%target, %strategy, error = %e, "count failed"),
            }
        }
        0
    }

    /// Selectors of a target's chain, in order
    #[must_use]
    pub fn selectors(&self, target: SemanticTarget) -> Vec<Selector> {
        self.table
            .strategies(target)
            .iter()
            .map(|s| s.selector.clone())
            .collect()
    }
}
