//! # Decision Pipeline
//!
//! The staged evaluation behind `is_entitled`: enabled check, linked
//! wallet resolution, the parallel membership fan-out, and the hand-off
//! into entitlement evaluation. The whole pipeline runs under the
//! contract-call timeout; membership probes race and the first fresh
//! member cancels the rest.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::cache::TtlCache;
use crate::domain::{
    address_hex, Address, AuthArgs, AuthError, AuthKind, Decision, EntitlementReason,
    MembershipStatus, Permission, StreamId, WalletSet,
};
use crate::metrics::AuthMetrics;
use crate::ports::SpaceContract;

use super::ChainAuthService;

/// Aggregated outcome of the membership fan-out.
enum MembershipOutcome {
    /// No linked wallet is a member.
    NotMember,
    /// Members exist but every membership has lapsed.
    Expired,
    /// At least one wallet is a fresh member.
    Member,
}

impl ChainAuthService {
    /// Evaluate a decision without the outer cache. Runs the staged
    /// pipeline under the configured contract-call budget.
    pub(crate) async fn check_entitlement(&self, args: &AuthArgs) -> Result<Decision, AuthError> {
        match timeout(
            self.config.contract_calls_timeout,
            self.check_entitlement_inner(args),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AuthError::DownstreamNetworkError(format!(
                "contract calls timed out after {:?} for {args}",
                self.config.contract_calls_timeout
            ))),
        }
    }

    async fn check_entitlement_inner(&self, args: &AuthArgs) -> Result<Decision, AuthError> {
        let (enabled, reason) = self.stream_enabled(args).await?;
        if !enabled {
            return Ok(Decision::denied(reason));
        }

        let wallets = self.linked_wallets(args).await?;

        if args.kind == AuthKind::IsWalletLinked {
            if wallets.contains(&args.wallet_address) {
                return Ok(Decision::allowed(EntitlementReason::None));
            }
            return Ok(Decision::denied(EntitlementReason::WalletNotLinked));
        }

        if wallets.len() > self.config.linked_wallets_limit {
            warn!(
                principal = %address_hex(&args.principal),
                wallets = wallets.len(),
                limit = self.config.linked_wallets_limit,
                "too many wallets linked to the root key"
            );
            return Err(AuthError::ResourceExhausted {
                wallets: wallets.len(),
                limit: self.config.linked_wallets_limit,
            });
        }

        let args = args.with_linked_wallets(&wallets.wallets);

        match self.resolve_membership(&args, &wallets).await? {
            MembershipOutcome::NotMember => Ok(Decision::denied(EntitlementReason::Membership)),
            MembershipOutcome::Expired => {
                debug!(
                    principal = %address_hex(&args.principal),
                    space_id = %args.space_id,
                    "membership expired"
                );
                Ok(Decision::denied(EntitlementReason::MembershipExpired))
            }
            MembershipOutcome::Member => match args.kind {
                // Membership was the question, and it just passed.
                AuthKind::IsSpaceMember => Ok(Decision::allowed(EntitlementReason::None)),
                AuthKind::Space => self.entitled_to_space(&args).await,
                AuthKind::Channel => self.entitled_to_channel(&args).await,
                _ => Err(AuthError::Internal(format!(
                    "unknown auth kind in entitlement step: {args}"
                ))),
            },
        }
    }

    /// Kind-dependent enabled check. Wallet-link requests have no stream
    /// scope and always pass.
    async fn stream_enabled(
        &self,
        args: &AuthArgs,
    ) -> Result<(bool, EntitlementReason), AuthError> {
        match args.kind {
            AuthKind::Space | AuthKind::IsSpaceMember => self.space_enabled(args.space_id).await,
            AuthKind::Channel => self.channel_enabled(args.space_id, args.channel_id).await,
            AuthKind::IsWalletLinked => Ok((true, EntitlementReason::None)),
            _ => Err(AuthError::Internal(format!(
                "unknown auth kind in enabled check: {args}"
            ))),
        }
    }

    async fn space_enabled(
        &self,
        space_id: StreamId,
    ) -> Result<(bool, EntitlementReason), AuthError> {
        let key = AuthArgs::for_enabled_space(space_id).cache_key();
        let (decision, hit) = self
            .entitlement_cache
            .execute_using_cache(&key, || async {
                // The contract exposes the inverse.
                let disabled = self.space_contract.is_space_disabled(space_id).await?;
                Ok(Decision {
                    allowed: !disabled,
                    reason: EntitlementReason::SpaceDisabled,
                })
            })
            .await?;
        self.metrics.record(
            &self.metrics.space_enabled_cache_hit,
            &self.metrics.space_enabled_cache_miss,
            hit,
        );
        Ok((decision.allowed, decision.reason))
    }

    async fn channel_enabled(
        &self,
        space_id: StreamId,
        channel_id: StreamId,
    ) -> Result<(bool, EntitlementReason), AuthError> {
        let key = AuthArgs::for_enabled_channel(space_id, channel_id).cache_key();
        let (decision, hit) = self
            .entitlement_cache
            .execute_using_cache(&key, || async {
                let disabled = self
                    .space_contract
                    .is_channel_disabled(space_id, channel_id)
                    .await?;
                Ok(Decision {
                    allowed: !disabled,
                    reason: EntitlementReason::ChannelDisabled,
                })
            })
            .await?;
        self.metrics.record(
            &self.metrics.channel_enabled_cache_hit,
            &self.metrics.channel_enabled_cache_miss,
            hit,
        );
        Ok((decision.allowed, decision.reason))
    }

    /// Resolve the principal's wallet set through the linked-wallet
    /// cache.
    ///
    /// Joins, key solicitations, user scrubs, and wallet-link checks must
    /// observe wallets linked moments ago, so those requests bust the
    /// entry before looking it up. Everything else tolerates staleness up
    /// to the TTL.
    async fn linked_wallets(&self, args: &AuthArgs) -> Result<WalletSet, AuthError> {
        let Some(wallet_link) = &self.wallet_link else {
            warn!(
                principal = %address_hex(&args.principal),
                "wallet link contract not available, returning root key only"
            );
            return Ok(WalletSet::with_principal(args.principal, Vec::new()));
        };

        let key = AuthArgs::for_linked_wallets(args.principal).cache_key();
        if args.permission == Permission::Read
            || matches!(args.kind, AuthKind::IsSpaceMember | AuthKind::IsWalletLinked)
        {
            self.linked_wallet_cache.bust(&key);
            self.metrics
                .linked_wallet_cache_bust
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }

        let principal = args.principal;
        let (wallets, hit) = self
            .linked_wallet_cache
            .execute_using_cache(&key, || async move {
                let linked = wallet_link.linked_wallets(principal).await.map_err(|err| {
                    error!(
                        principal = %address_hex(&principal),
                        error = %err,
                        "failed to get linked wallets"
                    );
                    err.with_context("failed to get linked wallets")
                })?;
                Ok(WalletSet::with_principal(principal, linked))
            })
            .await?;
        self.metrics.record(
            &self.metrics.linked_wallet_cache_hit,
            &self.metrics.linked_wallet_cache_miss,
            hit,
        );
        Ok(wallets)
    }

    /// Probe every wallet's membership concurrently.
    ///
    /// The first fresh member wins the race and aborts the remaining
    /// probes. Probe errors are only consulted when no member was found
    /// at all: after a win, stragglers can only fail with cancellation
    /// noise, which is indistinguishable from a genuine timeout by
    /// inspection.
    async fn resolve_membership(
        &self,
        args: &AuthArgs,
        wallets: &WalletSet,
    ) -> Result<MembershipOutcome, AuthError> {
        let (result_tx, mut result_rx) = mpsc::channel(wallets.len());
        let (error_tx, mut error_rx) = mpsc::channel(wallets.len());

        let mut probes = Vec::with_capacity(wallets.len());
        for wallet in &wallets.wallets {
            let wallet = *wallet;
            let space_id = args.space_id;
            let cache = Arc::clone(&self.membership_cache);
            let contract = Arc::clone(&self.space_contract);
            let metrics = Arc::clone(&self.metrics);
            let result_tx = result_tx.clone();
            let error_tx = error_tx.clone();
            probes.push(tokio::spawn(async move {
                match probe_membership(&cache, &contract, &metrics, space_id, wallet).await {
                    Ok(status) => {
                        let _ = result_tx.send(status).await;
                    }
                    Err(err) => {
                        debug!(
                            wallet = %address_hex(&wallet),
                            space_id = %space_id,
                            error = %err,
                            "membership probe failed (early termination?)"
                        );
                        let _ = error_tx.send(err).await;
                    }
                }
            }));
        }
        drop(result_tx);
        drop(error_tx);

        let mut is_member = false;
        let mut is_expired = true;
        while let Some(status) = result_rx.recv().await {
            if status.is_member {
                is_member = true;
                if !status.is_expired {
                    is_expired = false;
                    for probe in &probes {
                        probe.abort();
                    }
                    break;
                }
            }
        }

        if !is_member {
            let mut failures: Vec<AuthError> = Vec::new();
            while let Some(err) = error_rx.recv().await {
                failures.push(err);
            }
            if !failures.is_empty() {
                let joined = failures
                    .iter()
                    .map(|err| err.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                error!(
                    principal = %address_hex(&args.principal),
                    space_id = %args.space_id,
                    wallets = %args.linked_wallets,
                    errors = %joined,
                    "user membership could not be evaluated"
                );
                return Err(AuthError::CannotCheckEntitlements(format!(
                    "error(s) evaluating space membership for principal {} permission {} space {}: {joined}",
                    address_hex(&args.principal),
                    args.permission,
                    args.space_id
                )));
            }
            debug!(
                principal = %address_hex(&args.principal),
                space_id = %args.space_id,
                wallets = %args.linked_wallets,
                "user is not a member of the space"
            );
            return Ok(MembershipOutcome::NotMember);
        }

        if is_expired {
            return Ok(MembershipOutcome::Expired);
        }
        Ok(MembershipOutcome::Member)
    }
}

/// Membership status for one (space, wallet) pair, through the
/// membership cache.
pub(crate) async fn probe_membership(
    cache: &TtlCache<MembershipStatus>,
    contract: &Arc<dyn SpaceContract>,
    metrics: &AuthMetrics,
    space_id: StreamId,
    wallet: Address,
) -> Result<MembershipStatus, AuthError> {
    let key = AuthArgs::for_is_space_member(space_id, wallet).cache_key();
    let (status, hit) = cache
        .execute_using_cache(&key, || async {
            contract.membership_status(space_id, wallet).await
        })
        .await?;
    metrics.record(
        &metrics.membership_cache_hit,
        &metrics.membership_cache_miss,
        hit,
    );
    Ok(status)
}
