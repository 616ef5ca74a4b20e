//! Table-driven rule evaluator.
//!
//! Maps encoded rule payloads to fixed outcomes. Conversion from the
//! legacy payload version is a pass-through of the encoded bytes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{Address, AuthError, RuleDataV1, RuleDataV2};
use crate::ports::RuleEvaluator;

/// In-memory [`RuleEvaluator`] implementation with fixed outcomes per
/// rule payload. Unknown payloads evaluate to false.
#[derive(Default)]
pub struct StaticRuleEvaluator {
    outcomes: RwLock<HashMap<Vec<u8>, bool>>,
    failing: AtomicBool,
}

impl StaticRuleEvaluator {
    /// Create an evaluator with no configured outcomes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the outcome for one encoded rule payload.
    pub fn set_outcome(&self, encoded: Vec<u8>, result: bool) {
        self.outcomes.write().insert(encoded, result);
    }

    /// Make every evaluation fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl RuleEvaluator for StaticRuleEvaluator {
    fn convert_v1_to_v2(&self, rule: &RuleDataV1) -> Result<RuleDataV2, AuthError> {
        Ok(RuleDataV2 {
            encoded: rule.encoded.clone(),
        })
    }

    async fn evaluate(&self, _wallets: &[Address], rule: &RuleDataV2) -> Result<bool, AuthError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuthError::DownstreamNetworkError(
                "rule evaluation failed".into(),
            ));
        }
        Ok(self
            .outcomes
            .read()
            .get(&rule.encoded)
            .copied()
            .unwrap_or(false))
    }
}
