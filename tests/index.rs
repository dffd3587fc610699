#[path = "util/mod.rs"]
#[macro_use]
mod util;

mod datagram;
mod lifecycle;
mod lines;
mod subsystem;
