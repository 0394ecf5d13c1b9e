use crate::{ByteReader, ByteWriter, SerdeError};

/// A type that can be written to / read from the replication wire format.
pub trait Serde: Sized {
    fn ser(&self, writer: &mut ByteWriter);
    fn de(reader: &mut ByteReader) -> Result<Self, SerdeError>;
}

impl Serde for u8 {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_u8(*self);
    }
    fn de(reader: &mut ByteReader) -> Result<Self, SerdeError> {
        reader.read_u8()
    }
}

impl Serde for u16 {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_u16(*self);
    }
    fn de(reader: &mut ByteReader) -> Result<Self, SerdeError> {
        reader.read_u16()
    }
}

impl Serde for u32 {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_u32(*self);
    }
    fn de(reader: &mut ByteReader) -> Result<Self, SerdeError> {
        reader.read_u32()
    }
}

impl Serde for u64 {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_u64(*self);
    }
    fn de(reader: &mut ByteReader) -> Result<Self, SerdeError> {
        reader.read_u64()
    }
}

impl Serde for f32 {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_f32(*self);
    }
    fn de(reader: &mut ByteReader) -> Result<Self, SerdeError> {
        reader.read_f32()
    }
}

impl Serde for bool {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_bool(*self);
    }
    fn de(reader: &mut ByteReader) -> Result<Self, SerdeError> {
        reader.read_bool()
    }
}

impl Serde for String {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_string(self);
    }
    fn de(reader: &mut ByteReader) -> Result<Self, SerdeError> {
        reader.read_string()
    }
}

impl<T: Serde> Serde for Option<T> {
    fn ser(&self, writer: &mut ByteWriter) {
        match self {
            Some(value) => {
                writer.write_u8(1);
                value.ser(writer);
            }
            None => writer.write_u8(0),
        }
    }
    fn de(reader: &mut ByteReader) -> Result<Self, SerdeError> {
        match reader.read_u8()? {
            0 => Ok(None),
            1 => Ok(Some(T::de(reader)?)),
            tag => Err(SerdeError::UnknownTag {
                tag,
                type_name: "Option",
            }),
        }
    }
}

impl<T: Serde> Serde for Vec<T> {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_u32(self.len() as u32);
        for item in self {
            item.ser(writer);
        }
    }
    fn de(reader: &mut ByteReader) -> Result<Self, SerdeError> {
        let length = reader.read_u32()? as usize;
        let mut items = Vec::with_capacity(length.min(1024));
        for _ in 0..length {
            items.push(T::de(reader)?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T: Serde + PartialEq + std::fmt::Debug>(value: T) {
        let mut writer = ByteWriter::new();
        value.ser(&mut writer);
        let bytes = writer.to_bytes();
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(T::de(&mut reader).unwrap(), value);
        assert!(reader.is_empty());
    }

    #[test]
    fn option_and_vec_round_trip() {
        round_trip(Some("hello".to_string()));
        round_trip::<Option<u32>>(None);
        round_trip(vec![1u16, 2, 3]);
    }

    #[test]
    fn option_rejects_unknown_tag() {
        let mut reader = ByteReader::new(&[7]);
        assert_eq!(
            Option::<u8>::de(&mut reader),
            Err(SerdeError::UnknownTag {
                tag: 7,
                type_name: "Option"
            })
        );
    }
}
