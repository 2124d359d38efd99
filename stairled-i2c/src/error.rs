use stairled_types::ChipAddress;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("i2c bus error talking to {chip}: {source}")]
    Bus {
        chip: ChipAddress,
        #[source]
        source: i2cdev::linux::LinuxI2CError,
    },
    #[error("no chip open for address {0}")]
    ChipNotOpen(ChipAddress),
    #[error("{source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}
