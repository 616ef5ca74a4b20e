//! # Core Domain Entities
//!
//! Identifiers, request arguments, and decision outcomes for the
//! authorization oracle.
//!
//! Every cacheable computation in this crate is keyed by an [`AuthArgs`]
//! value rendered through [`AuthArgs::cache_key`]. Constructors exist per
//! request kind so that a key contains exactly the fields that can change
//! the answer for that kind, and nothing else.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 20-byte Ethereum-style account address.
pub type Address = [u8; 20];

/// A 32-byte hash (transaction hashes, log topics).
pub type Hash = [u8; 32];

/// The all-zero address. Used as the "unset" value in cache keys and as
/// the not-found owner marker.
pub const ZERO_ADDRESS: Address = [0u8; 20];

/// Render an address as `0x`-prefixed lowercase hex.
pub fn address_hex(addr: &Address) -> String {
    format!("0x{}", hex::encode(addr))
}

/// An opaque 32-byte stream identifier.
///
/// Spaces and the channels inside them are both streams; a channel-scoped
/// request carries the space id and the channel id side by side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamId(pub [u8; 32]);

impl StreamId {
    /// Construct from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw byte view.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A permission a principal may hold on a space or channel.
///
/// The pipeline treats permissions as opaque, with one exception: `Read`
/// requests bust the linked-wallet cache before resolving, because reads
/// are issued by flows (joins, key solicitations, scrubs) that must see
/// freshly linked wallets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// No permission. The zero value for enabled-check and wallet keys.
    #[default]
    Undefined,
    /// Read messages and stream state.
    Read,
    /// Post messages.
    Write,
    /// Invite other principals.
    Invite,
    /// Join the space.
    JoinSpace,
    /// Redact messages of others.
    Redact,
    /// Ban and unban members.
    ModifyBanning,
    /// Pin and unpin messages.
    PinMessage,
    /// Add and remove channels.
    AddRemoveChannels,
    /// Change space settings.
    ModifySpaceSettings,
}

impl Permission {
    /// Stable name used in cache keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Undefined => "Undefined",
            Permission::Read => "Read",
            Permission::Write => "Write",
            Permission::Invite => "Invite",
            Permission::JoinSpace => "JoinSpace",
            Permission::Redact => "Redact",
            Permission::ModifyBanning => "ModifyBanning",
            Permission::PinMessage => "PinMessage",
            Permission::AddRemoveChannels => "AddRemoveChannels",
            Permission::ModifySpaceSettings => "ModifySpaceSettings",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of an authorization request. Partitions both the code paths
/// and the cache namespaces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthKind {
    /// Entitlement to a permission on a space.
    #[default]
    Space = 0,
    /// Entitlement to a permission on a channel within a space.
    Channel = 1,
    /// Internal key kind: is the space enabled.
    SpaceEnabled = 2,
    /// Internal key kind: is the channel enabled.
    ChannelEnabled = 3,
    /// Is the principal (or any linked wallet) a member of the space.
    IsSpaceMember = 4,
    /// Is a specific wallet linked to the principal.
    IsWalletLinked = 5,
}

/// Arguments of a single authorization request.
///
/// Also the cache-key carrier: fields irrelevant to a given kind are left
/// at their zero values so that semantically equal requests render equal
/// keys.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthArgs {
    /// Request kind.
    pub kind: AuthKind,
    /// Space scope. Zero for pure wallet-link requests.
    pub space_id: StreamId,
    /// Channel scope. Zero unless the kind is channel-flavored.
    pub channel_id: StreamId,
    /// The principal's root-key address.
    pub principal: Address,
    /// Requested permission. `Undefined` for membership and link checks.
    pub permission: Permission,
    /// Canonical serialization of the resolved wallet set. Empty until
    /// [`AuthArgs::with_linked_wallets`] stamps it in.
    pub linked_wallets: String,
    /// Candidate wallet for `IsWalletLinked` requests.
    pub wallet_address: Address,
}

impl AuthArgs {
    /// Arguments for a space entitlement check.
    pub fn for_space(space_id: StreamId, principal: Address, permission: Permission) -> Self {
        Self {
            kind: AuthKind::Space,
            space_id,
            principal,
            permission,
            ..Self::default()
        }
    }

    /// Arguments for a channel entitlement check.
    pub fn for_channel(
        space_id: StreamId,
        channel_id: StreamId,
        principal: Address,
        permission: Permission,
    ) -> Self {
        Self {
            kind: AuthKind::Channel,
            space_id,
            channel_id,
            principal,
            permission,
            ..Self::default()
        }
    }

    /// Arguments for a space membership check.
    pub fn for_is_space_member(space_id: StreamId, principal: Address) -> Self {
        Self {
            kind: AuthKind::IsSpaceMember,
            space_id,
            principal,
            ..Self::default()
        }
    }

    /// Arguments for a wallet-link check.
    pub fn for_is_wallet_linked(principal: Address, wallet_address: Address) -> Self {
        Self {
            kind: AuthKind::IsWalletLinked,
            principal,
            wallet_address,
            ..Self::default()
        }
    }

    /// Key arguments for the cached space-enabled check.
    pub fn for_enabled_space(space_id: StreamId) -> Self {
        Self {
            kind: AuthKind::SpaceEnabled,
            space_id,
            ..Self::default()
        }
    }

    /// Key arguments for the cached channel-enabled check.
    pub fn for_enabled_channel(space_id: StreamId, channel_id: StreamId) -> Self {
        Self {
            kind: AuthKind::ChannelEnabled,
            space_id,
            channel_id,
            ..Self::default()
        }
    }

    /// Key arguments for the linked-wallet cache.
    ///
    /// Linked wallets span spaces and channels, so the key carries the
    /// principal only; every other field stays zeroed.
    pub fn for_linked_wallets(principal: Address) -> Self {
        Self {
            principal,
            ..Self::default()
        }
    }

    /// A copy of these arguments carrying the canonical serialization of
    /// the resolved wallet set.
    pub fn with_linked_wallets(&self, wallets: &[Address]) -> Self {
        let mut args = self.clone();
        args.linked_wallets = serialize_wallets(wallets);
        args
    }

    /// The cache key for these arguments. Includes every field; unused
    /// fields are zero for a given kind by construction.
    pub fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AuthArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AuthArgs{{kind: {}, spaceId: {}, channelId: {}, principal: {}, permission: {}, linkedWallets: {}, walletAddress: {}}}",
            self.kind as u8,
            self.space_id,
            self.channel_id,
            address_hex(&self.principal),
            self.permission,
            self.linked_wallets,
            address_hex(&self.wallet_address),
        )
    }
}

/// Serialize a wallet set into its canonical cache-key form: lowercase
/// `0x`-hex addresses joined by commas, in resolver order.
pub fn serialize_wallets(wallets: &[Address]) -> String {
    wallets
        .iter()
        .map(address_hex)
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse a canonical wallet serialization back into addresses. Entries
/// that do not parse as 20-byte hex are dropped.
pub fn deserialize_wallets(serialized: &str) -> Vec<Address> {
    serialized
        .split(',')
        .filter_map(|entry| {
            let raw = hex::decode(entry.trim_start_matches("0x")).ok()?;
            let bytes: Address = raw.try_into().ok()?;
            Some(bytes)
        })
        .collect()
}

/// The principal plus every wallet linked to it on-chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSet {
    /// Addresses in resolver order. The principal is always present.
    pub wallets: Vec<Address>,
}

impl WalletSet {
    /// Build a wallet set, prepending the principal when the resolver did
    /// not include it.
    pub fn with_principal(principal: Address, linked: Vec<Address>) -> Self {
        let mut wallets = linked;
        if !wallets.contains(&principal) {
            wallets.insert(0, principal);
        }
        Self { wallets }
    }

    /// Whether the set contains the given address.
    pub fn contains(&self, addr: &Address) -> bool {
        self.wallets.contains(addr)
    }

    /// Number of wallets in the set.
    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }
}

/// On-chain membership record for a (space, wallet) pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipStatus {
    /// The wallet has joined the space.
    pub is_member: bool,
    /// The membership exists but has lapsed.
    pub is_expired: bool,
    /// Unix timestamp when the membership expires. Zero when unset.
    pub expires_at: u64,
}

impl MembershipStatus {
    /// A current, unexpired membership.
    pub fn fresh(expires_at: u64) -> Self {
        Self {
            is_member: true,
            is_expired: false,
            expires_at,
        }
    }

    /// A lapsed membership.
    pub fn expired(expired_at: u64) -> Self {
        Self {
            is_member: true,
            is_expired: true,
            expires_at: expired_at,
        }
    }

    /// No membership at all.
    pub fn non_member() -> Self {
        Self::default()
    }
}

/// Why a decision came out the way it did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntitlementReason {
    /// No specific reason; the request passed (or short-circuited on
    /// ownership).
    #[default]
    None,
    /// The space is disabled on-chain.
    SpaceDisabled,
    /// The channel is disabled on-chain.
    ChannelDisabled,
    /// Decided by the space's entitlement records.
    SpaceEntitlements,
    /// Decided by the channel's entitlement records.
    ChannelEntitlements,
    /// No linked wallet is a member of the space.
    Membership,
    /// Every member wallet's membership has lapsed.
    MembershipExpired,
    /// The queried wallet is not linked to the principal.
    WalletNotLinked,
}

impl fmt::Display for EntitlementReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntitlementReason::None => "NONE",
            EntitlementReason::SpaceDisabled => "SPACE_DISABLED",
            EntitlementReason::ChannelDisabled => "CHANNEL_DISABLED",
            EntitlementReason::SpaceEntitlements => "SPACE_ENTITLEMENTS",
            EntitlementReason::ChannelEntitlements => "CHANNEL_ENTITLEMENTS",
            EntitlementReason::Membership => "MEMBERSHIP",
            EntitlementReason::MembershipExpired => "MEMBERSHIP_EXPIRED",
            EntitlementReason::WalletNotLinked => "WALLET_NOT_LINKED",
        };
        f.write_str(name)
    }
}

/// Outcome of an authorization decision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the principal is entitled.
    pub allowed: bool,
    /// Informational reason code; meaningful mostly for denials.
    pub reason: EntitlementReason,
}

impl Decision {
    /// An allowed decision.
    pub fn allowed(reason: EntitlementReason) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    /// A denied decision.
    pub fn denied(reason: EntitlementReason) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        let mut a = [0u8; 20];
        a[19] = n;
        a
    }

    #[test]
    fn test_wallet_serialization_round_trip() {
        let wallets = vec![addr(1), addr(2), addr(3)];
        let serialized = serialize_wallets(&wallets);
        assert_eq!(
            serialized,
            "0x0000000000000000000000000000000000000001,\
             0x0000000000000000000000000000000000000002,\
             0x0000000000000000000000000000000000000003"
        );
        assert_eq!(deserialize_wallets(&serialized), wallets);
    }

    #[test]
    fn test_deserialize_drops_garbage_entries() {
        let parsed = deserialize_wallets("0xzz,0x0000000000000000000000000000000000000005");
        assert_eq!(parsed, vec![addr(5)]);
    }

    #[test]
    fn test_wallet_set_always_contains_principal() {
        let set = WalletSet::with_principal(addr(1), vec![addr(2), addr(3)]);
        assert_eq!(set.wallets, vec![addr(1), addr(2), addr(3)]);

        let set = WalletSet::with_principal(addr(1), vec![addr(2), addr(1)]);
        assert_eq!(set.wallets, vec![addr(2), addr(1)]);
    }

    #[test]
    fn test_equal_requests_render_equal_keys() {
        let space = StreamId([7u8; 32]);
        let a = AuthArgs::for_space(space, addr(1), Permission::Write);
        let b = AuthArgs::for_space(space, addr(1), Permission::Write);
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_keys_differ_across_kinds_and_fields() {
        let space = StreamId([7u8; 32]);
        let channel = StreamId([8u8; 32]);
        let keys = [
            AuthArgs::for_space(space, addr(1), Permission::Write).cache_key(),
            AuthArgs::for_space(space, addr(1), Permission::Read).cache_key(),
            AuthArgs::for_channel(space, channel, addr(1), Permission::Write).cache_key(),
            AuthArgs::for_is_space_member(space, addr(1)).cache_key(),
            AuthArgs::for_is_wallet_linked(addr(1), addr(2)).cache_key(),
            AuthArgs::for_enabled_space(space).cache_key(),
            AuthArgs::for_enabled_channel(space, channel).cache_key(),
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in keys.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_linked_wallet_key_carries_principal_only() {
        let args = AuthArgs::for_linked_wallets(addr(9));
        let key = args.cache_key();
        assert!(key.contains(&address_hex(&addr(9))));
        assert_eq!(args.space_id, StreamId::default());
        assert_eq!(args.permission, Permission::Undefined);
    }

    #[test]
    fn test_with_linked_wallets_changes_key() {
        let space = StreamId([7u8; 32]);
        let base = AuthArgs::for_space(space, addr(1), Permission::Write);
        let stamped = base.with_linked_wallets(&[addr(1), addr(2)]);
        assert_ne!(base.cache_key(), stamped.cache_key());
    }
}
