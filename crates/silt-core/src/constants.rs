//! Protocol and service constants shared across crates.

/// Minimum length of an address string.
pub const MIN_ADDRESS_LEN: usize = 3;

/// Maximum length of an address string.
pub const MAX_ADDRESS_LEN: usize = 64;

/// Maximum length of a currency id.
pub const MAX_CURRENCY_LEN: usize = 10;

/// Hard cap on items returned by a single store scan, regardless of the
/// requested limit.
pub const MAX_PAGE_SIZE: u64 = 50;

/// Default items-per-page when a request does not specify a limit.
pub const DEFAULT_ITEMS_LIMIT: u64 = 10;

/// Capacity of the digester's inbound block queue. Enqueueing onto a full
/// queue blocks the producer; blocks are never dropped.
pub const DIGEST_QUEUE_CAPACITY: usize = 100;

/// Delay between digestion retry attempts, in milliseconds.
pub const DIGEST_RETRY_DELAY_MS: u64 = 1_000;

/// Per-channel timeout when distributing a signed envelope, in seconds.
pub const SEND_CHANNEL_TIMEOUT_SECS: u64 = 5;

/// Cache lifetime for point lookups, in seconds.
pub const EXPIRE_POINT_SECS: u64 = 2;

/// Cache lifetime for a partial page (the growing tail of a list), in seconds.
pub const EXPIRE_PARTIAL_PAGE_SECS: u64 = 3;

/// Cache lifetime for a full historical page, in seconds. A page behind a
/// fixed offset cursor can never change, so it is effectively immutable.
pub const EXPIRE_FULL_PAGE_SECS: u64 = 30 * 60 * 60;
