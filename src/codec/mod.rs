pub mod binary;
pub mod json;
pub mod packet;

pub use binary::BinaryCodec;
pub use json::JsonCodec;
pub use packet::{BoxPacket, PacketElement, PacketValues};

use crate::data::BoxData;
use crate::utils::error::BoxError;

/// Serialises box storage into an owned buffer.
pub trait PacketBuilder {
    fn build(&mut self, data: &BoxData) -> Result<(), BoxError>;

    /// Output of the last successful `build`.
    fn bytes(&self) -> &[u8];
}

/// Restores box storage from serialised bytes.
pub trait PacketParser {
    /// Overwrites type, device, shape, data and info of `target`. The opaque
    /// slot is left alone.
    fn parse_into(&self, bytes: &[u8], target: &mut BoxData) -> Result<(), BoxError>;

    fn parse(&self, bytes: &[u8]) -> Result<BoxData, BoxError> {
        let mut data = BoxData::new();
        self.parse_into(bytes, &mut data)?;
        Ok(data)
    }
}
