mod clock;
mod config;
mod events;
mod grants;
mod requests;
mod tickets;

pub use clock::{Clock, SystemClock};
pub use config::{ConfigCache, ConfigSource};
pub use events::EventSink;
pub use grants::{GrantStore, NamespaceDirectory};
pub use requests::RequestStore;
pub use tickets::TicketGateway;
