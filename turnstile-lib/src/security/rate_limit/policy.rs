//! Static per-category quota table.

use std::time::Duration;

use super::Category;
use crate::config::RateLimitConfig;
use crate::error::{Result, TurnstileError};

const MINUTE: u64 = 60;

/// Quota applied to one category: `max_requests` per fixed `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub max_requests: u32,
    pub window: Duration,
}

impl Policy {
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self { max_requests, window }
    }

    const fn minutes(max_requests: u32, minutes: u64) -> Self {
        Self::new(max_requests, Duration::from_secs(minutes.saturating_mul(MINUTE)))
    }

    /// Built-in policy for a category.
    ///
    /// Authentication and payment get far tighter budgets than read-heavy
    /// content endpoints.
    pub const fn default_for(category: Category) -> Self {
        match category {
            Category::General => Self::minutes(100, 15),
            Category::Auth => Self::minutes(5, 15),
            Category::Payment => Self::minutes(3, 60),
            Category::Admin => Self::minutes(50, 15),
            Category::Upload => Self::minutes(10, 60),
            Category::ContentAccess => Self::minutes(200, 60),
            Category::CommentCreation => Self::minutes(20, 60),
        }
    }

    fn validate(&self, category: Category) -> Result<()> {
        if self.max_requests == 0 {
            return Err(TurnstileError::Config(format!(
                "policy for category '{category}' must allow at least one request"
            )));
        }
        if self.window.is_zero() {
            return Err(TurnstileError::Config(format!(
                "policy for category '{category}' must have a non-zero window"
            )));
        }
        Ok(())
    }
}

/// Total lookup from [`Category`] to [`Policy`].
///
/// Built once at startup and shared read-only; every category always has a
/// policy, so lookups cannot fail at request time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    general: Policy,
    auth: Policy,
    payment: Policy,
    admin: Policy,
    upload: Policy,
    content_access: Policy,
    comment_creation: Policy,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            general: Policy::default_for(Category::General),
            auth: Policy::default_for(Category::Auth),
            payment: Policy::default_for(Category::Payment),
            admin: Policy::default_for(Category::Admin),
            upload: Policy::default_for(Category::Upload),
            content_access: Policy::default_for(Category::ContentAccess),
            comment_creation: Policy::default_for(Category::CommentCreation),
        }
    }
}

impl PolicyTable {
    /// Build the table from the defaults plus the configured overrides.
    ///
    /// Fails on any policy with a zero request budget or zero window.
    pub fn from_config(config: &RateLimitConfig) -> Result<Self> {
        let mut table = Self::default();
        for (category, over) in &config.policies {
            let base = table.get(*category);
            let policy = Policy {
                max_requests: over.max_requests.unwrap_or(base.max_requests),
                window: over.window_secs.map(Duration::from_secs).unwrap_or(base.window),
            };
            table.set(*category, policy)?;
        }
        Ok(table)
    }

    /// Replace the policy of one category.
    pub fn set(&mut self, category: Category, policy: Policy) -> Result<()> {
        policy.validate(category)?;
        *self.slot_mut(category) = policy;
        Ok(())
    }

    /// Builder-style variant of [`PolicyTable::set`].
    pub fn with(mut self, category: Category, policy: Policy) -> Result<Self> {
        self.set(category, policy)?;
        Ok(self)
    }

    pub fn get(&self, category: Category) -> Policy {
        match category {
            Category::General => self.general,
            Category::Auth => self.auth,
            Category::Payment => self.payment,
            Category::Admin => self.admin,
            Category::Upload => self.upload,
            Category::ContentAccess => self.content_access,
            Category::CommentCreation => self.comment_creation,
        }
    }

    /// Iterate over every `(category, policy)` pair in table order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, Policy)> + '_ {
        Category::ALL.iter().map(move |c| (*c, self.get(*c)))
    }

    fn slot_mut(&mut self, category: Category) -> &mut Policy {
        match category {
            Category::General => &mut self.general,
            Category::Auth => &mut self.auth,
            Category::Payment => &mut self.payment,
            Category::Admin => &mut self.admin,
            Category::Upload => &mut self.upload,
            Category::ContentAccess => &mut self.content_access,
            Category::CommentCreation => &mut self.comment_creation,
        }
    }
}
