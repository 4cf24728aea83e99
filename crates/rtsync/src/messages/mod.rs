//! Strongly-typed views of the rtnetlink messages this engine handles.

mod addr;
mod link;
mod route;

pub use addr::AddressMessage;
pub use link::LinkMessage;
pub use route::RouteMessage;
