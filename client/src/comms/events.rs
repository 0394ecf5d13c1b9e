use commune_serde::{ByteReader, ByteWriter, Serde, SerdeError};
use commune_shared::{Quaternion, Vector3};

/// A decoded peer payload. Each inbound room message carries exactly one.
#[derive(Debug, Clone, PartialEq)]
pub enum CommsEvent {
    /// Pose update, anchored to the session's coordinate root.
    Position {
        position: Vector3,
        rotation: Quaternion,
    },
    /// The peer announces which profile version it is currently publishing;
    /// consumers fetch the record out of band if theirs is older.
    ProfileVersion { version: u64 },
    /// Free-form chat line.
    Chat { message: String, timestamp: u64 },
}

const TAG_POSITION: u8 = 1;
const TAG_PROFILE_VERSION: u8 = 2;
const TAG_CHAT: u8 = 3;

impl Serde for CommsEvent {
    fn ser(&self, writer: &mut ByteWriter) {
        match self {
            CommsEvent::Position { position, rotation } => {
                writer.write_u8(TAG_POSITION);
                position.ser(writer);
                rotation.ser(writer);
            }
            CommsEvent::ProfileVersion { version } => {
                writer.write_u8(TAG_PROFILE_VERSION);
                writer.write_u64(*version);
            }
            CommsEvent::Chat { message, timestamp } => {
                writer.write_u8(TAG_CHAT);
                writer.write_string(message);
                writer.write_u64(*timestamp);
            }
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeError> {
        match reader.read_u8()? {
            TAG_POSITION => Ok(CommsEvent::Position {
                position: Vector3::de(reader)?,
                rotation: Quaternion::de(reader)?,
            }),
            TAG_PROFILE_VERSION => Ok(CommsEvent::ProfileVersion {
                version: reader.read_u64()?,
            }),
            TAG_CHAT => Ok(CommsEvent::Chat {
                message: reader.read_string()?,
                timestamp: reader.read_u64()?,
            }),
            tag => Err(SerdeError::UnknownTag {
                tag,
                type_name: "CommsEvent",
            }),
        }
    }
}

impl CommsEvent {
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.ser(&mut writer);
        writer.to_bytes()
    }

    pub fn decode(payload: &[u8]) -> Result<Self, SerdeError> {
        let mut reader = ByteReader::new(payload);
        Self::de(&mut reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_round_trips() {
        let event = CommsEvent::Position {
            position: Vector3::new(1.0, 2.0, 3.0),
            rotation: Quaternion::IDENTITY,
        };
        assert_eq!(CommsEvent::decode(&event.encode()), Ok(event));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert_eq!(
            CommsEvent::decode(&[0xEE]),
            Err(SerdeError::UnknownTag {
                tag: 0xEE,
                type_name: "CommsEvent"
            })
        );
    }
}
