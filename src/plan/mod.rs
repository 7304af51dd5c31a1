//! Per-session randomisation of condition blocks and theme order.
//!
//! The plan is drawn once when the session is created and never redrawn.
//! Everything after that is a lookup: `SessionPlan::trial(i)` always returns
//! the same parameters for the same index.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    error::PlanError,
    models::{Condition, ConditionOrder, TrialParams},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionPlan {
    condition_order: ConditionOrder,
    /// One entry per main trial (trial `i` uses `conditions[i - 1]`).
    conditions: Vec<Condition>,
    /// Slot 0 is the practice theme; slots `1..` are the shuffled pool.
    themes: Vec<String>,
}

impl SessionPlan {
    pub fn condition_order(&self) -> ConditionOrder {
        self.condition_order
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn themes(&self) -> &[String] {
        &self.themes
    }

    pub fn main_trial_count(&self) -> usize {
        self.conditions.len()
    }

    /// Theme and condition of trial `index`; `None` past the last trial.
    pub fn trial(&self, index: usize) -> Option<TrialParams> {
        let theme = self.themes.get(index)?.clone();
        let condition = if index == 0 {
            Condition::Practice
        } else {
            *self.conditions.get(index - 1)?
        };
        Some(TrialParams {
            index,
            theme,
            condition,
        })
    }
}

/// Draws a session plan.
///
/// A fair coin decides which condition's block of `block_len` trials comes
/// first; the two blocks together must cover every pool theme. The pool is
/// shuffled with Fisher-Yates and the practice theme is put in front.
pub fn plan<R: Rng>(
    rng: &mut R,
    practice_theme: &str,
    theme_pool: &[String],
    condition_a: Condition,
    condition_b: Condition,
    block_len: usize,
) -> Result<SessionPlan, PlanError> {
    if theme_pool.is_empty() {
        return Err(PlanError::EmptyThemePool);
    }
    if block_len == 0 || block_len * 2 != theme_pool.len() {
        return Err(PlanError::UnevenBlocks {
            len: theme_pool.len(),
            block_len,
        });
    }
    if condition_a == condition_b {
        return Err(PlanError::SameCondition(condition_a.as_str().to_string()));
    }

    let (first, second) = if rng.gen_bool(0.5) {
        (condition_a, condition_b)
    } else {
        (condition_b, condition_a)
    };

    let mut conditions = Vec::with_capacity(block_len * 2);
    conditions.extend(std::iter::repeat(first).take(block_len));
    conditions.extend(std::iter::repeat(second).take(block_len));

    let mut shuffled = theme_pool.to_vec();
    fisher_yates(rng, &mut shuffled);

    let mut themes = Vec::with_capacity(shuffled.len() + 1);
    themes.push(practice_theme.to_string());
    themes.extend(shuffled);

    Ok(SessionPlan {
        condition_order: ConditionOrder::led_by(first),
        conditions,
        themes,
    })
}

/// Unbiased in-place shuffle: walk from the last index down, swapping each
/// slot with a uniformly chosen index at or before it.
pub fn fisher_yates<T, R: Rng>(rng: &mut R, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}
