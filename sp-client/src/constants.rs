/// BIP352 purpose level of the derivation path.
pub const PURPOSE: u32 = 352;
/// Branch under the account holding the scan key.
pub const SCAN_BRANCH: u32 = 1;
/// Branch under the account holding the spend key.
pub const SPEND_BRANCH: u32 = 0;
pub const DEFAULT_ACCOUNT: u32 = 0;
