use log::debug;

use crate::data::BoxData;
use crate::utils::error::BoxError;

use super::packet::BoxPacket;
use super::{PacketBuilder, PacketParser};

/// Compact native-endian packets via bincode.
#[derive(Debug, Default)]
pub struct BinaryCodec {
    buffer: Vec<u8>,
}

impl BinaryCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

impl PacketBuilder for BinaryCodec {
    fn build(&mut self, data: &BoxData) -> Result<(), BoxError> {
        let packet = BoxPacket::from_data(data)?;
        self.buffer.clear();
        bincode::serialize_into(&mut self.buffer, &packet)?;
        debug!(
            "Encoded {} {:?} into {} bytes",
            data.element_type(),
            data.dims(),
            self.buffer.len()
        );
        Ok(())
    }

    fn bytes(&self) -> &[u8] {
        &self.buffer
    }
}

impl PacketParser for BinaryCodec {
    fn parse_into(&self, bytes: &[u8], target: &mut BoxData) -> Result<(), BoxError> {
        let packet: BoxPacket = bincode::deserialize(bytes)?;
        packet.apply_to(target)
    }
}
