//! In-memory space contract.
//!
//! Holds spaces, channels, entitlements, memberships, and bans in plain
//! maps. Per-wallet latency and failure injection make the membership
//! fan-out testable; per-method call counters make short-circuits
//! observable.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{
    Address, AuthError, EntitlementRecord, MembershipStatus, Permission, StreamId, ZERO_ADDRESS,
};
use crate::ports::SpaceContract;

#[derive(Default)]
struct ChannelFixture {
    disabled: bool,
    entitlements: HashMap<Permission, Vec<EntitlementRecord>>,
}

struct SpaceFixture {
    owner: Address,
    disabled: bool,
    channels: HashMap<StreamId, ChannelFixture>,
    entitlements: HashMap<Permission, Vec<EntitlementRecord>>,
    members: HashMap<Address, MembershipStatus>,
    banned: HashSet<Address>,
}

impl SpaceFixture {
    fn new(owner: Address) -> Self {
        Self {
            owner,
            disabled: false,
            channels: HashMap::new(),
            entitlements: HashMap::new(),
            members: HashMap::new(),
            banned: HashSet::new(),
        }
    }
}

/// Per-method call counters.
#[derive(Debug, Default)]
#[allow(missing_docs)]
pub struct ContractCalls {
    pub is_space_disabled: AtomicU64,
    pub is_channel_disabled: AtomicU64,
    pub space_entitlements: AtomicU64,
    pub channel_entitlements: AtomicU64,
    pub is_banned: AtomicU64,
    pub membership_status: AtomicU64,
}

/// In-memory [`SpaceContract`] implementation.
#[derive(Default)]
pub struct InMemorySpaceContract {
    spaces: RwLock<HashMap<StreamId, SpaceFixture>>,
    membership_delays: RwLock<HashMap<(StreamId, Address), Duration>>,
    membership_failures: RwLock<HashSet<(StreamId, Address)>>,
    calls: ContractCalls,
}

impl InMemorySpaceContract {
    /// Create an empty contract.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a space with its owner.
    pub fn add_space(&self, space_id: StreamId, owner: Address) {
        self.spaces.write().insert(space_id, SpaceFixture::new(owner));
    }

    /// Mark a space disabled.
    pub fn disable_space(&self, space_id: StreamId) {
        if let Some(space) = self.spaces.write().get_mut(&space_id) {
            space.disabled = true;
        }
    }

    /// Register a channel inside a space.
    pub fn add_channel(&self, space_id: StreamId, channel_id: StreamId) {
        if let Some(space) = self.spaces.write().get_mut(&space_id) {
            space.channels.insert(channel_id, ChannelFixture::default());
        }
    }

    /// Mark a channel disabled.
    pub fn disable_channel(&self, space_id: StreamId, channel_id: StreamId) {
        if let Some(space) = self.spaces.write().get_mut(&space_id) {
            if let Some(channel) = space.channels.get_mut(&channel_id) {
                channel.disabled = true;
            }
        }
    }

    /// Attach entitlement records to (space, permission).
    pub fn set_space_entitlements(
        &self,
        space_id: StreamId,
        permission: Permission,
        records: Vec<EntitlementRecord>,
    ) {
        if let Some(space) = self.spaces.write().get_mut(&space_id) {
            space.entitlements.insert(permission, records);
        }
    }

    /// Attach entitlement records to (space, channel, permission).
    pub fn set_channel_entitlements(
        &self,
        space_id: StreamId,
        channel_id: StreamId,
        permission: Permission,
        records: Vec<EntitlementRecord>,
    ) {
        if let Some(space) = self.spaces.write().get_mut(&space_id) {
            if let Some(channel) = space.channels.get_mut(&channel_id) {
                channel.entitlements.insert(permission, records);
            }
        }
    }

    /// Record a wallet's membership status in a space.
    pub fn set_membership(&self, space_id: StreamId, wallet: Address, status: MembershipStatus) {
        if let Some(space) = self.spaces.write().get_mut(&space_id) {
            space.members.insert(wallet, status);
        }
    }

    /// Ban a wallet from a space.
    pub fn ban(&self, space_id: StreamId, wallet: Address) {
        if let Some(space) = self.spaces.write().get_mut(&space_id) {
            space.banned.insert(wallet);
        }
    }

    /// Delay membership probes for one (space, wallet) pair.
    pub fn delay_membership(&self, space_id: StreamId, wallet: Address, delay: Duration) {
        self.membership_delays.write().insert((space_id, wallet), delay);
    }

    /// Fail membership probes for one (space, wallet) pair.
    pub fn fail_membership(&self, space_id: StreamId, wallet: Address) {
        self.membership_failures.write().insert((space_id, wallet));
    }

    /// Per-method call counters.
    pub fn calls(&self) -> &ContractCalls {
        &self.calls
    }

    fn with_space<T>(
        &self,
        space_id: StreamId,
        f: impl FnOnce(&SpaceFixture) -> T,
    ) -> Result<T, AuthError> {
        let spaces = self.spaces.read();
        match spaces.get(&space_id) {
            Some(space) => Ok(f(space)),
            None => Err(AuthError::DownstreamNetworkError(format!(
                "space not found: {space_id}"
            ))),
        }
    }
}

#[async_trait]
impl SpaceContract for InMemorySpaceContract {
    async fn is_space_disabled(&self, space_id: StreamId) -> Result<bool, AuthError> {
        self.calls.is_space_disabled.fetch_add(1, Ordering::Relaxed);
        self.with_space(space_id, |space| space.disabled)
    }

    async fn is_channel_disabled(
        &self,
        space_id: StreamId,
        channel_id: StreamId,
    ) -> Result<bool, AuthError> {
        self.calls.is_channel_disabled.fetch_add(1, Ordering::Relaxed);
        self.with_space(space_id, |space| {
            space
                .channels
                .get(&channel_id)
                .map(|channel| channel.disabled)
        })?
        .ok_or_else(|| {
            AuthError::DownstreamNetworkError(format!("channel not found: {channel_id}"))
        })
    }

    async fn space_entitlements_for_permission(
        &self,
        space_id: StreamId,
        permission: Permission,
    ) -> Result<(Vec<EntitlementRecord>, Address), AuthError> {
        self.calls.space_entitlements.fetch_add(1, Ordering::Relaxed);
        let spaces = self.spaces.read();
        match spaces.get(&space_id) {
            Some(space) => Ok((
                space.entitlements.get(&permission).cloned().unwrap_or_default(),
                space.owner,
            )),
            // Unknown spaces read back as empty data, like a zeroed
            // contract slot.
            None => Ok((Vec::new(), ZERO_ADDRESS)),
        }
    }

    async fn channel_entitlements_for_permission(
        &self,
        space_id: StreamId,
        channel_id: StreamId,
        permission: Permission,
    ) -> Result<(Vec<EntitlementRecord>, Address), AuthError> {
        self.calls.channel_entitlements.fetch_add(1, Ordering::Relaxed);
        let spaces = self.spaces.read();
        match spaces.get(&space_id) {
            Some(space) => {
                let records = space
                    .channels
                    .get(&channel_id)
                    .and_then(|channel| channel.entitlements.get(&permission))
                    .cloned()
                    .unwrap_or_default();
                Ok((records, space.owner))
            }
            None => Ok((Vec::new(), ZERO_ADDRESS)),
        }
    }

    async fn is_banned(&self, space_id: StreamId, wallets: &[Address]) -> Result<bool, AuthError> {
        self.calls.is_banned.fetch_add(1, Ordering::Relaxed);
        self.with_space(space_id, |space| {
            wallets.iter().any(|wallet| space.banned.contains(wallet))
        })
    }

    async fn membership_status(
        &self,
        space_id: StreamId,
        wallet: Address,
    ) -> Result<MembershipStatus, AuthError> {
        self.calls.membership_status.fetch_add(1, Ordering::Relaxed);

        let delay = self.membership_delays.read().get(&(space_id, wallet)).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.membership_failures.read().contains(&(space_id, wallet)) {
            return Err(AuthError::DownstreamNetworkError(format!(
                "membership rpc failed for {}",
                crate::domain::address_hex(&wallet)
            )));
        }

        self.with_space(space_id, |space| {
            space
                .members
                .get(&wallet)
                .copied()
                .unwrap_or_else(MembershipStatus::non_member)
        })
    }
}
