//! Outbound fetching: the HTTP boundary, relay routes and the relay racer.

pub mod racer;
pub mod relay;
pub mod transport;

pub use racer::{FetchRacer, RaceConfig};
pub use relay::{PayloadMode, RelayRoute};
pub use transport::{get_json_within, get_text_within, HttpTransport, ReqwestTransport};
