use commune_serde::{ByteReader, ByteWriter, Serde, SerdeError};
use commune_shared::{Color3, EntityId, Quaternion, Vector3};

/// The scene-graph anchor every replicated avatar pose hangs off. Owned by
/// the external scene runtime; this layer only references it.
pub const GLOBAL_COORDINATE_ROOT: EntityId = EntityId::new(5, 0);

pub const DEFAULT_SKIN_COLOR: Color3 = Color3 {
    r: 0.8,
    g: 0.6,
    b: 0.4,
};
pub const DEFAULT_EYES_COLOR: Color3 = Color3 {
    r: 0.2,
    g: 0.5,
    b: 0.8,
};
pub const DEFAULT_HAIR_COLOR: Color3 = Color3 {
    r: 0.3,
    g: 0.2,
    b: 0.1,
};

/// Who a replicated player entity is.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerIdentity {
    pub address: String,
    pub is_guest: bool,
}

impl Serde for PlayerIdentity {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_string(&self.address);
        writer.write_bool(self.is_guest);
    }
    fn de(reader: &mut ByteReader) -> Result<Self, SerdeError> {
        Ok(Self {
            address: reader.read_string()?,
            is_guest: reader.read_bool()?,
        })
    }
}

/// Base avatar appearance: display name, body shape, and the color set.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarBase {
    pub name: String,
    pub body_shape_urn: String,
    pub skin_color: Color3,
    pub eyes_color: Color3,
    pub hair_color: Color3,
}

impl Serde for AvatarBase {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_string(&self.name);
        writer.write_string(&self.body_shape_urn);
        self.skin_color.ser(writer);
        self.eyes_color.ser(writer);
        self.hair_color.ser(writer);
    }
    fn de(reader: &mut ByteReader) -> Result<Self, SerdeError> {
        Ok(Self {
            name: reader.read_string()?,
            body_shape_urn: reader.read_string()?,
            skin_color: Color3::de(reader)?,
            eyes_color: Color3::de(reader)?,
            hair_color: Color3::de(reader)?,
        })
    }
}

/// A replicated avatar pose, expressed relative to `parent`.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarTransform {
    pub position: Vector3,
    pub rotation: Quaternion,
    pub scale: Vector3,
    pub parent: EntityId,
}

impl AvatarTransform {
    /// A pose at `position`/`rotation` with unit scale under the global
    /// coordinate root.
    pub fn anchored(position: Vector3, rotation: Quaternion) -> Self {
        Self {
            position,
            rotation,
            scale: Vector3::ONE,
            parent: GLOBAL_COORDINATE_ROOT,
        }
    }
}

impl Serde for AvatarTransform {
    fn ser(&self, writer: &mut ByteWriter) {
        self.position.ser(writer);
        self.rotation.ser(writer);
        self.scale.ser(writer);
        self.parent.ser(writer);
    }
    fn de(reader: &mut ByteReader) -> Result<Self, SerdeError> {
        Ok(Self {
            position: Vector3::de(reader)?,
            rotation: Quaternion::de(reader)?,
            scale: Vector3::de(reader)?,
            parent: EntityId::de(reader)?,
        })
    }
}
