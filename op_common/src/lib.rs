mod amount;
mod secret;

pub use amount::{
    minor_units_from_decimal,
    split_minor_amount,
    Amount,
    AmountConversionError,
    MinorUnits,
};
pub use secret::Secret;
