pub mod builder;
mod common;

pub use builder::{QrBuilder, QrCode};
pub use common::bitstream::BitStream;
pub use common::codec::{total_bits, Mode, Segment};
pub use common::error::{QRError, QRResult};
pub use common::mask::MaskPattern;
pub use common::metadata::{ECLevel, Version};
