//! # Authorization Flow Scenarios
//!
//! End-to-end decision and receipt flows exercised through the public
//! [`ChainAuthApi`](chain_auth::ChainAuthApi) surface:
//!
//! 1. **Owner path**: linked owner wallet short-circuits record
//!    evaluation, repeat decisions come from the cache
//! 2. **Disabled scopes**: space/channel disablement stops the pipeline
//!    before any further contract call
//! 3. **Allowlists**: the everyone sentinel and explicit user lists
//! 4. **Limits**: the linked-wallet fan-out cap
//! 5. **The membership race**: first fresh member wins, stragglers and
//!    their errors are discarded
//! 6. **Receipts**: byte-exact match passes, any mutation is denied
