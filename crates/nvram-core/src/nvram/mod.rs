//! Register Access Engine
//!
//! Turns logical reads and writes of the 256 byte register file into the
//! vendor specific port sequences, buffering writes in a write-back cache.

mod cache;
pub mod detect;
mod error;
mod port;
mod session;
mod sim;

pub use cache::RegisterCache;
pub use detect::detect_hardware;
pub use error::NvramError;
pub use port::{DevPort, PortIo, DEV_PORT};
pub use session::{
    Nvram, RegisterFile, BANK_SELECT, DS1685_EXT_ADDRESS, DS1685_EXT_DATA, EXT_DATA, EXT_INDEX,
    REGISTER_A, RTC_DATA, RTC_INDEX, SENTINEL, VIA823X_DATA, VIA823X_INDEX,
};
pub use sim::{SimulatedChipset, SimulatedLayout};
