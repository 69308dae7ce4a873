use serde::{Deserialize, Serialize};

use crate::data::{BoxData, dims};
use crate::element::{DeviceExt, DeviceTag, EXT_SIZE, Element, ElementType};
use crate::memory::{HostAccess, allocator_for};
use crate::utils::error::{BoxError, CodecError};

/// Data values carried by a packet, one variant per element type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PacketValues {
    None,
    Bool(Vec<bool>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Element types that map onto a `PacketValues` variant.
pub trait PacketElement: Element + Sized {
    fn wrap(values: Vec<Self>) -> PacketValues;
    fn unwrap(values: &PacketValues) -> Option<&[Self]>;
}

macro_rules! impl_packet_element {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl PacketElement for $t {
                fn wrap(values: Vec<Self>) -> PacketValues {
                    PacketValues::$variant(values)
                }

                fn unwrap(values: &PacketValues) -> Option<&[Self]> {
                    match values {
                        PacketValues::$variant(v) => Some(v.as_slice()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_packet_element! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

impl PacketValues {
    pub fn element_type(&self) -> ElementType {
        match self {
            PacketValues::None => ElementType::None,
            PacketValues::Bool(_) => ElementType::Bool,
            PacketValues::I8(_) => ElementType::I8,
            PacketValues::I16(_) => ElementType::I16,
            PacketValues::I32(_) => ElementType::I32,
            PacketValues::I64(_) => ElementType::I64,
            PacketValues::U8(_) => ElementType::U8,
            PacketValues::U16(_) => ElementType::U16,
            PacketValues::U32(_) => ElementType::U32,
            PacketValues::U64(_) => ElementType::U64,
            PacketValues::F32(_) => ElementType::F32,
            PacketValues::F64(_) => ElementType::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PacketValues::None => 0,
            PacketValues::Bool(v) => v.len(),
            PacketValues::I8(v) => v.len(),
            PacketValues::I16(v) => v.len(),
            PacketValues::I32(v) => v.len(),
            PacketValues::I64(v) => v.len(),
            PacketValues::U8(v) => v.len(),
            PacketValues::U16(v) => v.len(),
            PacketValues::U32(v) => v.len(),
            PacketValues::U64(v) => v.len(),
            PacketValues::F32(v) => v.len(),
            PacketValues::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_non_finite(&self) -> bool {
        match self {
            PacketValues::F32(v) => v.iter().any(|x| !x.is_finite()),
            PacketValues::F64(v) => v.iter().any(|x| !x.is_finite()),
            _ => false,
        }
    }
}

fn malformed(message: String) -> BoxError {
    BoxError::Codec(CodecError::Malformed(message))
}

fn read_values<T: Element>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(T::TYPE.byte_width())
        .map(T::read_ne)
        .collect()
}

fn write_values<T: Element>(values: &[T], bytes: &mut [u8]) {
    for (chunk, &value) in bytes.chunks_exact_mut(T::TYPE.byte_width()).zip(values) {
        value.write_ne(chunk);
    }
}

/// Self-describing snapshot of box storage: the wire schema shared by every codec.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoxPacket {
    pub element_type: u16,
    pub device: u16,
    pub ext: [u64; EXT_SIZE],
    pub dims: Vec<u32>,
    pub values: PacketValues,
    pub info: Vec<u8>,
}

impl BoxPacket {
    pub fn from_data(data: &BoxData) -> Result<Self, BoxError> {
        let bytes = data.as_bytes()?;
        let values = for_element_type!(
            data.element_type(),
            T => T::wrap(read_values::<T>(bytes)),
            none => PacketValues::None
        );

        Ok(Self {
            element_type: data.element_type().code(),
            device: data.device().code(),
            ext: data.ext().0,
            dims: data.dims().to_vec(),
            values,
            info: data.info().to_vec(),
        })
    }

    /// Writes the packet into `target`, reusing its buffers where they fit.
    pub fn apply_to(&self, target: &mut BoxData) -> Result<(), BoxError> {
        let element_type = ElementType::from_code(self.element_type)
            .map_err(|e| malformed(e.to_string()))?;
        let device = DeviceTag::from_code(self.device).map_err(|e| malformed(e.to_string()))?;

        if self.values.element_type() != element_type && !self.values.is_empty() {
            return Err(malformed(format!(
                "{} values in a {} packet",
                self.values.element_type(),
                element_type
            )));
        }

        let count = dims::num_elements(&self.dims)
            .ok_or_else(|| malformed(format!("Shape {:?} overflows", self.dims)))?;
        if count as usize != self.values.len() {
            return Err(malformed(format!(
                "Shape {:?} needs {} values, packet has {}",
                self.dims,
                count,
                self.values.len()
            )));
        }

        if device == DeviceTag::None {
            if !self.dims.is_empty() {
                return Err(malformed("Shaped packet without a device".to_string()));
            }
            // Storage that was never placed on a device carries no data
            target.detach_storage();
        } else {
            if !self.dims.is_empty()
                && allocator_for(device)?.host_access() != HostAccess::Direct
            {
                return Err(BoxError::Unsupported(format!(
                    "Cannot decode into host-inaccessible {} memory",
                    device
                )));
            }
            target.resize(element_type, device, DeviceExt(self.ext), &self.dims)?;
            let dst = target.as_bytes_mut()?;
            for_element_type!(element_type, T => {
                if let Some(values) = T::unwrap(&self.values) {
                    write_values(values, dst);
                }
            }, none => {});
        }

        target.checked_assign_info(&self.info);
        Ok(())
    }

    pub fn to_data(&self) -> Result<BoxData, BoxError> {
        let mut data = BoxData::new();
        self.apply_to(&mut data)?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ErrorKind;

    #[test]
    fn snapshot_carries_everything() {
        let mut data = BoxData::from_values(&[2, 2], &[1u16, 2, 3, 4]).unwrap();
        data.checked_assign_info(b"tag");
        let packet = BoxPacket::from_data(&data).unwrap();

        assert_eq!(packet.element_type, 0x0410);
        assert_eq!(packet.device, DeviceTag::Cpu.code());
        assert_eq!(packet.dims, vec![2, 2]);
        assert_eq!(packet.values, PacketValues::U16(vec![1, 2, 3, 4]));
        assert_eq!(packet.info, b"tag".to_vec());

        let restored = packet.to_data().unwrap();
        assert_eq!(restored.to_vec::<u16>().unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(restored.info(), b"tag");
    }

    #[test]
    fn inconsistent_packets_are_rejected() {
        let mut packet =
            BoxPacket::from_data(&BoxData::from_values(&[3], &[1i32, 2, 3]).unwrap()).unwrap();
        packet.dims = vec![4];
        assert_eq!(packet.to_data().unwrap_err().kind(), ErrorKind::Codec);

        packet.dims = vec![3];
        packet.values = PacketValues::F32(vec![1.0, 2.0, 3.0]);
        assert_eq!(packet.to_data().unwrap_err().kind(), ErrorKind::Codec);

        packet.element_type = 0x0777;
        assert_eq!(packet.to_data().unwrap_err().kind(), ErrorKind::Codec);
    }

    #[test]
    fn empty_info_clears_target() {
        let packet =
            BoxPacket::from_data(&BoxData::from_values(&[1], &[true]).unwrap()).unwrap();
        let mut target = BoxData::new();
        target.checked_assign_info(b"old");
        packet.apply_to(&mut target).unwrap();
        assert_eq!(target.info_size(), 0);
        assert_eq!(target.to_vec::<bool>().unwrap(), vec![true]);
    }

    #[test]
    fn empty_packet_detaches_storage() {
        let mut source = BoxData::new();
        source.checked_assign_info(b"only info");
        let packet = BoxPacket::from_data(&source).unwrap();
        assert_eq!(packet.device, DeviceTag::None.code());

        let mut target = BoxData::from_values(&[1, 2, 3], &[1i32, 2, 3, 4, 5, 6]).unwrap();
        target.set_opaque(7u64);
        packet.apply_to(&mut target).unwrap();

        assert_eq!(target.element_type(), ElementType::None);
        assert_eq!(target.device(), DeviceTag::None);
        assert_eq!(target.ext(), DeviceExt::ZERO);
        assert_eq!(target.rank(), 0);
        assert!(!target.exists_data());
        assert_eq!(target.info(), b"only info");
        assert_eq!(target.get_opaque::<u64>(), 7);
    }

    #[test]
    fn non_finite_detection() {
        assert!(PacketValues::F64(vec![1.0, f64::INFINITY]).has_non_finite());
        assert!(!PacketValues::I32(vec![1]).has_non_finite());
    }
}
