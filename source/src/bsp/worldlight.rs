use glam::Vec3;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::{
    consts::{LumpType, MAX_MAP_WORLDLIGHTS},
    decode_records, BspError, BspResult, Lump,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
pub enum EmitType {
    /// 90 degree spotlight
    Surface = 0,
    /// simple point light source
    Point = 1,
    /// spotlight with penumbra
    Spotlight = 2,
    /// directional light with no falloff (surface must trace to SKY texture)
    Skylight = 3,
    /// linear falloff, non-lambertian
    QuakeLight = 4,
    /// spherical light source with no falloff (surface must trace to SKY texture)
    SkyAmbient = 5,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Color32 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Baked light source (`dworldlight_t`), lump version 1 layout.
///
/// Version 0 lacks `shadow_cast_offset`; those records are widened on load.
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BSPWorldLight {
    pub origin: Vec3,
    pub intensity: Vec3,
    /// for surfaces and spotlights
    pub normal: Vec3,
    pub shadow_cast_offset: Vec3,
    pub cluster: i32,
    pub emit_type: i32,
    pub style: i32,
    /// start of penumbra for emit_spotlight
    pub stopdot: f32,
    /// end of penumbra for emit_spotlight
    pub stopdot2: f32,
    pub exponent: f32,
    /// cutoff distance
    pub radius: f32,
    // falloff for emit_spotlight + emit_point:
    // 1 / (constant_attn + linear_attn * dist + quadratic_attn * dist^2)
    pub constant_attn: f32,
    pub linear_attn: f32,
    pub quadratic_attn: f32,
    pub flags: i32,
    pub tex_info: i32,
    /// entity that this light it relative to
    pub owner: i32,
}

#[repr(C, packed)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct BSPWorldLightV0 {
    origin: Vec3,
    intensity: Vec3,
    normal: Vec3,
    cluster: i32,
    emit_type: i32,
    style: i32,
    stopdot: f32,
    stopdot2: f32,
    exponent: f32,
    radius: f32,
    constant_attn: f32,
    linear_attn: f32,
    quadratic_attn: f32,
    flags: i32,
    tex_info: i32,
    owner: i32,
}

impl From<BSPWorldLightV0> for BSPWorldLight {
    fn from(v: BSPWorldLightV0) -> Self {
        Self {
            origin: v.origin,
            intensity: v.intensity,
            normal: v.normal,
            shadow_cast_offset: Vec3::ZERO,
            cluster: v.cluster,
            emit_type: v.emit_type,
            style: v.style,
            stopdot: v.stopdot,
            stopdot2: v.stopdot2,
            exponent: v.exponent,
            radius: v.radius,
            constant_attn: v.constant_attn,
            linear_attn: v.linear_attn,
            quadratic_attn: v.quadratic_attn,
            flags: v.flags,
            tex_info: v.tex_info,
            owner: v.owner,
        }
    }
}

impl BSPWorldLight {
    pub fn decode_versioned(lump: LumpType, version: i32, bytes: &[u8]) -> BspResult<Box<[Self]>> {
        match version {
            0 => {
                let lights: Box<[BSPWorldLightV0]> = decode_records(lump, bytes, Self::max())?;
                Ok(lights.iter().map(|&l| l.into()).collect())
            }
            1 => decode_records(lump, bytes, Self::max()),
            _ => Err(BspError::UnsupportedLumpVersion { lump, version }),
        }
    }

    pub fn emit_type(&self) -> Option<EmitType> {
        EmitType::from_i32(self.emit_type)
    }

    pub fn position(&self) -> Vec3 {
        self.origin
    }

    /// Brightest channel of the stored intensity.
    pub fn brightness(&self) -> f32 {
        self.intensity.max_element()
    }

    /// Intensity split into a colour normalised to its brightest channel, and that channel's
    /// value (clamped to a byte) in alpha.
    pub fn color32(&self) -> Color32 {
        let max = self.brightness();
        if !(max > 0.0) {
            return Color32::default();
        }
        let rgb = (self.intensity / max * 255.0).round();
        Color32 {
            r: rgb.x as u8,
            g: rgb.y as u8,
            b: rgb.z as u8,
            a: max.clamp(0.0, 255.0).round() as u8,
        }
    }
}

impl Lump for BSPWorldLight {
    fn max() -> usize {
        MAX_MAP_WORLDLIGHTS
    }
    fn lump_type() -> LumpType {
        LumpType::WorldLights
    }
}

#[cfg(test)]
mod tests {
    use glam::vec3;

    use super::*;

    fn v0_record(origin: Vec3, emit_type: i32) -> Vec<u8> {
        let light = BSPWorldLightV0 {
            origin,
            intensity: vec3(100.0, 50.0, 0.0),
            emit_type,
            ..<BSPWorldLightV0 as bytemuck::Zeroable>::zeroed()
        };
        bytemuck::bytes_of(&light).to_vec()
    }

    #[test]
    fn record_sizes() {
        assert_eq!(std::mem::size_of::<BSPWorldLightV0>(), 88);
        assert_eq!(std::mem::size_of::<BSPWorldLight>(), 100);
    }

    #[test]
    fn layout_follows_version() {
        let mut bytes = v0_record(vec3(1.0, 2.0, 3.0), 1);
        bytes.extend(v0_record(vec3(4.0, 5.0, 6.0), 2));

        let lights = BSPWorldLight::decode_versioned(LumpType::WorldLights, 0, &bytes).unwrap();
        assert_eq!(lights.len(), 2);
        assert_eq!(lights[1].position(), vec3(4.0, 5.0, 6.0));
        assert_eq!(lights[0].emit_type(), Some(EmitType::Point));
        assert_eq!(lights[1].emit_type(), Some(EmitType::Spotlight));

        // 176 bytes is not a whole number of 100 byte records
        assert!(matches!(
            BSPWorldLight::decode_versioned(LumpType::WorldLights, 1, &bytes),
            Err(BspError::LumpSizeMismatch { record_size: 100, .. })
        ));
        assert!(BSPWorldLight::decode_versioned(LumpType::WorldLights, 2, &bytes).is_err());
    }

    #[test]
    fn color32_normalises_to_brightest_channel() {
        let light = BSPWorldLight {
            intensity: vec3(100.0, 50.0, 0.0),
            ..<BSPWorldLight as bytemuck::Zeroable>::zeroed()
        };
        assert_eq!(light.brightness(), 100.0);
        assert_eq!(
            light.color32(),
            Color32 {
                r: 255,
                g: 128,
                b: 0,
                a: 100
            }
        );
        let dark: BSPWorldLight = bytemuck::Zeroable::zeroed();
        assert_eq!(dark.color32(), Color32::default());
    }
}
