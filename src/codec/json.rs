use log::debug;

use crate::data::BoxData;
use crate::utils::error::{BoxError, CodecError};

use super::packet::BoxPacket;
use super::{PacketBuilder, PacketParser};

/// Human readable packets via serde_json. NaN and infinities are refused
/// since JSON has no spelling for them.
#[derive(Debug, Default)]
pub struct JsonCodec {
    text: String,
    pretty: bool,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self {
            text: String::new(),
            pretty: true,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn parse_str(&self, text: &str) -> Result<BoxData, BoxError> {
        self.parse(text.as_bytes())
    }
}

impl PacketBuilder for JsonCodec {
    fn build(&mut self, data: &BoxData) -> Result<(), BoxError> {
        let packet = BoxPacket::from_data(data)?;
        if packet.values.has_non_finite() {
            return Err(CodecError::Malformed(
                "JSON cannot represent non-finite floats".to_string(),
            )
            .into());
        }

        self.text = if self.pretty {
            serde_json::to_string_pretty(&packet)?
        } else {
            serde_json::to_string(&packet)?
        };
        debug!("Encoded {:?} into {} JSON bytes", data.dims(), self.text.len());
        Ok(())
    }

    fn bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }
}

impl PacketParser for JsonCodec {
    fn parse_into(&self, bytes: &[u8], target: &mut BoxData) -> Result<(), BoxError> {
        let packet: BoxPacket = serde_json::from_slice(bytes)?;
        packet.apply_to(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ErrorKind;

    #[test]
    fn text_is_readable() {
        let data = BoxData::from_values(&[2], &[1.25f64, -3.5]).unwrap();
        let mut codec = JsonCodec::new();
        codec.build(&data).unwrap();
        assert!(codec.text().contains("\"F64\":[1.25,-3.5]"), "{}", codec.text());

        let decoded = codec.parse_str(codec.text()).unwrap();
        assert_eq!(decoded.to_vec::<f64>().unwrap(), vec![1.25, -3.5]);
    }

    #[test]
    fn wide_integers_are_exact() {
        let data = BoxData::from_values(&[2], &[u64::MAX, 1]).unwrap();
        let mut codec = JsonCodec::pretty();
        codec.build(&data).unwrap();
        let decoded = codec.parse(codec.bytes()).unwrap();
        assert_eq!(decoded.to_vec::<u64>().unwrap(), vec![u64::MAX, 1]);
    }

    #[test]
    fn non_finite_values_are_refused() {
        let data = BoxData::from_values(&[1], &[f32::NAN]).unwrap();
        let err = JsonCodec::new().build(&data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Codec);
    }

    #[test]
    fn garbage_is_a_codec_error() {
        let err = JsonCodec::new().parse(b"{\"element_type\":").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Codec);
    }
}
