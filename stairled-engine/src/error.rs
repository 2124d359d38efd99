use stairled_types::Step;

pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds of §7, one variant per kind named there.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid configuration for {field}: {reason}")]
    ConfigInvalid { field: String, reason: String },
    #[error("i2c error on chip {chip}: {source}")]
    BusIo {
        chip: stairled_types::ChipAddress,
        #[source]
        source: stairled_i2c::Error,
    },
    #[error("unknown step {step}")]
    UnknownStep { step: Step },
    #[error("engine is already running an animation")]
    Busy,
    #[error("no animation named {name:?}")]
    NotFound { name: String },
    #[error("unrecoverable: {cause}")]
    Fatal { cause: String },
}
