//! Wire protocol shared by the lightpost agent and aggregator: the
//! STX/LEN/ETX frame codec and the textual metric payload it carries.

pub mod frame;
pub mod metrics;
