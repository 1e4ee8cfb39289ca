//! 轮询调度：间隔校验、首次轮询计算、外部轮询属性与扫描请求器

pub mod external;
pub mod requester;
pub mod util;

pub use external::{
    ExternalPollingConfigurationSource, PollingProperties, DEFAULT_POLLING_PROPERTIES_FILE,
    POLLING_INTERVAL_PROPERTY, TIME_OF_DAY_PROPERTY,
};
pub use requester::{RuntimeClock, ScanRequests, SimpleScanRequester};
pub use util::{
    first_poll_time, format_iso_duration, is_invalid_interval, parse_iso_duration,
    parse_time_of_day, validate_interval,
};
