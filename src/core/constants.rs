// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "bidcache";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "bidcache.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "BIDCACHE_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "BIDCACHE_HOST";

/// Environment variable for cache listener port
pub const ENV_PORT: &str = "BIDCACHE_PORT";

/// Environment variable for admin listener port
pub const ENV_ADMIN_PORT: &str = "BIDCACHE_ADMIN_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "BIDCACHE_LOG";

/// Environment variable for the write-authorization secret
pub const ENV_API_KEY: &str = "BIDCACHE_API_KEY";

/// Environment variable for allowing caller-chosen keys
pub const ENV_ALLOW_KEYS: &str = "BIDCACHE_ALLOW_KEYS";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default bind host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default cache listener port
pub const DEFAULT_PORT: u16 = 2424;

/// Default admin listener port (metrics scrape)
pub const DEFAULT_ADMIN_PORT: u16 = 2525;

/// Default backend-call deadline for reads, in milliseconds
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 2_000;

/// Default backend-call deadline for writes, in milliseconds
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 5_000;

// =============================================================================
// Request Limits
// =============================================================================

/// Maximum number of elements accepted in one put envelope
pub const DEFAULT_MAX_NUM_VALUES: usize = 10;

/// Maximum serialized payload size in bytes
pub const DEFAULT_MAX_SIZE_BYTES: usize = 10_240;

/// Default cap on requested TTLs, in seconds (0 = unbounded)
pub const DEFAULT_MAX_TTL_SECONDS: u64 = 0;

/// Environment variable for the element count limit
pub const ENV_MAX_NUM_VALUES: &str = "BIDCACHE_MAX_NUM_VALUES";

/// Environment variable for the payload size limit
pub const ENV_MAX_SIZE_BYTES: &str = "BIDCACHE_MAX_SIZE_BYTES";

/// Environment variable for the TTL cap
pub const ENV_MAX_TTL_SECONDS: &str = "BIDCACHE_MAX_TTL_SECONDS";

// =============================================================================
// Rate Limiting
// =============================================================================

/// Environment variable for rate limiter enabled
pub const ENV_RATE_LIMIT_ENABLED: &str = "BIDCACHE_RATE_LIMIT_ENABLED";

/// Environment variable for the refill rate (puts per second)
pub const ENV_RATE_LIMIT_NUM_REQUESTS: &str = "BIDCACHE_RATE_LIMIT_NUM_REQUESTS";

/// Default refill rate in puts per second
pub const DEFAULT_RATE_LIMIT_NUM_REQUESTS: u64 = 100;

// =============================================================================
// Backends
// =============================================================================

/// Environment variable for backend type
pub const ENV_BACKEND_TYPE: &str = "BIDCACHE_BACKEND_TYPE";

/// Environment variable for the Redis connection URL
pub const ENV_REDIS_URL: &str = "BIDCACHE_REDIS_URL";

/// Default entry bound for the in-memory backend
pub const DEFAULT_MEMORY_MAX_ENTRIES: usize = 65_536;

/// Default Redis connection URL
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";

/// Default Redis pool size
pub const DEFAULT_REDIS_POOL_SIZE: usize = 32;

/// Default memcached host
pub const DEFAULT_MEMCACHE_HOST: &str = "127.0.0.1:11211";

/// Default Aerospike namespace
pub const DEFAULT_AEROSPIKE_NAMESPACE: &str = "test";

/// Default Aerospike set name
pub const DEFAULT_AEROSPIKE_SET: &str = "cache";

/// Bin name holding the framed record in Aerospike
pub const AEROSPIKE_BIN_NAME: &str = "value";

/// Default Cassandra keyspace
pub const DEFAULT_CASSANDRA_KEYSPACE: &str = "cache";

/// Default Cassandra table
pub const DEFAULT_CASSANDRA_TABLE: &str = "records";

/// Default Ignite REST scheme
pub const DEFAULT_IGNITE_SCHEME: &str = "http";

/// Default Ignite REST port
pub const DEFAULT_IGNITE_PORT: u16 = 8080;

/// Default Ignite cache name
pub const DEFAULT_IGNITE_CACHE_NAME: &str = "bidcache";

/// Attempts for transient driver errors (initial call + one retry)
pub const DRIVER_RETRY_MAX_ATTEMPTS: u32 = 2;

/// Base backoff delay between driver retries, in milliseconds
pub const DRIVER_RETRY_BASE_DELAY_MS: u64 = 50;

// =============================================================================
// Metrics
// =============================================================================

/// Environment variable for metrics sink type
pub const ENV_METRICS_TYPE: &str = "BIDCACHE_METRICS_TYPE";

/// Default scrape path served on the admin listener
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

/// Default statsd/influx agent host
pub const DEFAULT_STATSD_HOST: &str = "127.0.0.1";

/// Default statsd/influx agent port
pub const DEFAULT_STATSD_PORT: u16 = 8125;

/// Default prefix for pushed metric keys
pub const DEFAULT_STATSD_PREFIX: &str = "bidcache";

// =============================================================================
// Write Authorization
// =============================================================================

/// Header carrying the write-authorization secret
pub const WRITE_SECRET_HEADER: &str = "x-api-key";

/// Query parameter carrying the write-authorization secret
pub const WRITE_SECRET_QUERY_PARAM: &str = "api_key";
