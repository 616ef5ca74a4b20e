//! # Entitlement Fetch and Evaluation
//!
//! Retrieves entitlement records through the entitlement-manager cache
//! and evaluates them against the wallet set. Ownership is checked
//! before the ban list: the owner keeps access even when banned.

use tracing::{debug, warn};

use crate::domain::{
    address_hex, deserialize_wallets, Address, AuthArgs, AuthError, AuthKind, Decision,
    EntitlementData, EntitlementReason, EntitlementRecord, EVERYONE, ZERO_ADDRESS,
};

use super::ChainAuthService;

impl ChainAuthService {
    /// Space entitlement decision, cached with the wallet-stamped key.
    pub(crate) async fn entitled_to_space(&self, args: &AuthArgs) -> Result<Decision, AuthError> {
        if args.kind != AuthKind::Space {
            return Err(AuthError::Internal(format!(
                "wrong auth kind for space entitlement: {args}"
            )));
        }
        let (decision, hit) = self
            .entitlement_cache
            .execute_using_cache(&args.cache_key(), || self.entitled_to_space_uncached(args))
            .await?;
        self.metrics.record(
            &self.metrics.entitled_to_space_cache_hit,
            &self.metrics.entitled_to_space_cache_miss,
            hit,
        );
        Ok(decision)
    }

    /// Channel entitlement decision, cached with the wallet-stamped key.
    pub(crate) async fn entitled_to_channel(&self, args: &AuthArgs) -> Result<Decision, AuthError> {
        if args.kind != AuthKind::Channel {
            return Err(AuthError::Internal(format!(
                "wrong auth kind for channel entitlement: {args}"
            )));
        }
        let (decision, hit) = self
            .entitlement_cache
            .execute_using_cache(&args.cache_key(), || self.entitled_to_channel_uncached(args))
            .await?;
        self.metrics.record(
            &self.metrics.entitled_to_channel_cache_hit,
            &self.metrics.entitled_to_channel_cache_miss,
            hit,
        );
        Ok(decision)
    }

    async fn entitled_to_space_uncached(&self, args: &AuthArgs) -> Result<Decision, AuthError> {
        debug!(args = %args, "evaluating space entitlements");
        let (data, hit) = self
            .entitlement_manager_cache
            .execute_using_cache(&args.cache_key(), || async {
                self.fetch_space_entitlements(args).await
            })
            .await
            .map_err(|err| err.with_context("failed to get space entitlements"))?;
        self.metrics.record(
            &self.metrics.entitlement_manager_cache_hit,
            &self.metrics.entitlement_manager_cache_miss,
            hit,
        );

        let allowed = self
            .evaluate_with_entitlements(args, data.owner, &data.records)
            .await
            .map_err(|err| err.with_context("failed to evaluate space entitlements"))?;
        Ok(Decision {
            allowed,
            reason: EntitlementReason::SpaceEntitlements,
        })
    }

    async fn entitled_to_channel_uncached(&self, args: &AuthArgs) -> Result<Decision, AuthError> {
        debug!(args = %args, "evaluating channel entitlements");
        let (data, hit) = self
            .entitlement_manager_cache
            .execute_using_cache(&args.cache_key(), || async {
                self.fetch_channel_entitlements(args).await
            })
            .await
            .map_err(|err| err.with_context("failed to get channel entitlements"))?;
        self.metrics.record(
            &self.metrics.entitlement_manager_cache_hit,
            &self.metrics.entitlement_manager_cache_miss,
            hit,
        );

        let allowed = self
            .evaluate_with_entitlements(args, data.owner, &data.records)
            .await
            .map_err(|err| {
                err.with_context(&format!(
                    "failed to evaluate channel entitlements for channel {}",
                    args.channel_id
                ))
            })?;
        Ok(Decision {
            allowed,
            reason: EntitlementReason::ChannelEntitlements,
        })
    }

    async fn fetch_space_entitlements(&self, args: &AuthArgs) -> Result<EntitlementData, AuthError> {
        let (records, owner) = self
            .space_contract
            .space_entitlements_for_permission(args.space_id, args.permission)
            .await
            .map_err(|err| {
                err.with_context(&format!(
                    "space entitlement fetch failed for space {}",
                    args.space_id
                ))
            })?;
        debug!(args = %args, records = records.len(), "fetched space entitlements");
        Ok(entitlement_data(owner, records))
    }

    async fn fetch_channel_entitlements(
        &self,
        args: &AuthArgs,
    ) -> Result<EntitlementData, AuthError> {
        let (records, owner) = self
            .space_contract
            .channel_entitlements_for_permission(args.space_id, args.channel_id, args.permission)
            .await
            .map_err(|err| {
                err.with_context(&format!(
                    "channel entitlement fetch failed for channel {}",
                    args.channel_id
                ))
            })?;
        debug!(args = %args, records = records.len(), "fetched channel entitlements");
        Ok(entitlement_data(owner, records))
    }

    /// Evaluate a permission considering ownership, bans, and the
    /// entitlement records, in that order.
    pub(crate) async fn evaluate_with_entitlements(
        &self,
        args: &AuthArgs,
        owner: Address,
        records: &[EntitlementRecord],
    ) -> Result<bool, AuthError> {
        let wallets = deserialize_wallets(&args.linked_wallets);

        // The space owner has su over all space operations.
        if wallets.iter().any(|wallet| *wallet == owner) {
            debug!(
                space_id = %args.space_id,
                owner = %address_hex(&owner),
                principal = %address_hex(&args.principal),
                "owner is entitled to space"
            );
            return Ok(true);
        }

        let banned = self
            .space_contract
            .is_banned(args.space_id, &wallets)
            .await
            .map_err(|err| {
                err.with_context(&format!(
                    "ban check failed for space {} principal {}",
                    args.space_id,
                    address_hex(&args.principal)
                ))
            })?;
        if banned {
            warn!(
                principal = %address_hex(&args.principal),
                space_id = %args.space_id,
                linked_wallets = %args.linked_wallets,
                "evaluating entitlements for a user who is banned from the space"
            );
            return Ok(false);
        }

        self.evaluate_entitlement_data(&wallets, records, args).await
    }

    /// Evaluate records in order; the first one that grants wins. The
    /// rule evaluator handles rule entitlements; user entitlements are
    /// matched in the loop.
    async fn evaluate_entitlement_data(
        &self,
        wallets: &[Address],
        records: &[EntitlementRecord],
        args: &AuthArgs,
    ) -> Result<bool, AuthError> {
        for record in records {
            match record {
                EntitlementRecord::RuleV1(rule) => {
                    let rule = self.rule_evaluator.convert_v1_to_v2(rule)?;
                    if self.rule_evaluator.evaluate(wallets, &rule).await? {
                        debug!(space_id = %args.space_id, "rule entitlement is true");
                        return Ok(true);
                    }
                }
                EntitlementRecord::RuleV2(rule) => {
                    if self.rule_evaluator.evaluate(wallets, rule).await? {
                        debug!(space_id = %args.space_id, "rule entitlement v2 is true");
                        return Ok(true);
                    }
                }
                EntitlementRecord::UserList(users) => {
                    for user in users {
                        if *user == EVERYONE {
                            debug!(
                                space_id = %args.space_id,
                                "user entitlement: everyone is entitled"
                            );
                            return Ok(true);
                        }
                        if wallets.contains(user) {
                            debug!(
                                space_id = %args.space_id,
                                wallet = %address_hex(user),
                                "user entitlement: wallet is entitled"
                            );
                            return Ok(true);
                        }
                    }
                }
                EntitlementRecord::Unrecognized { module_type } => {
                    warn!(module_type, "skipping unrecognized entitlement record");
                }
            }
        }
        Ok(false)
    }
}

/// Stamp the cacheability marker: a zero owner with no records is a
/// not-found read and only lives for the negative TTL.
fn entitlement_data(owner: Address, records: Vec<EntitlementRecord>) -> EntitlementData {
    let cacheable = owner != ZERO_ADDRESS || !records.is_empty();
    EntitlementData {
        cacheable,
        owner,
        records,
    }
}
