use std::f32::consts::PI;

use common::scene::{LightKind, LightRequest};
use glam::{vec3, Vec3};
use thiserror::Error;

use crate::bsp::entities::Entity;

/// Brightness of a `_light` value that only gives a colour.
pub const DEFAULT_BRIGHTNESS: f32 = 200.0;
pub const DEFAULT_CONE: f32 = 45.0;
pub const DEFAULT_INNER_CONE: f32 = 30.0;

#[derive(Debug, Error, PartialEq)]
pub enum LightError {
    #[error("entity is not a light ({0:?})")]
    NotALight(Option<String>),
    #[error("missing {0} key")]
    MissingKey(&'static str),
    #[error("bad {key} value {value:?}")]
    BadValue { key: &'static str, value: String },
}

/// Turns a light's luminous power into the watts the scene's lights are given in.
pub trait LightPowerPolicy {
    fn point_watts(&self, lumens: f32, color: Vec3) -> f32;
    /// `cone` is the full cone angle in degrees
    fn spot_watts(&self, lumens: f32, color: Vec3, cone: f32) -> f32;
}

/// Photometric conversion: 683 lm/W at the colour's Rec. 709 luminance, over the
/// solid angle the light covers.
#[derive(Debug, Clone, Copy)]
pub struct PhotometricPolicy {
    /// Luminous efficacy, lm/W
    pub efficacy: f32,
}

impl Default for PhotometricPolicy {
    fn default() -> Self {
        Self { efficacy: 683.0 }
    }
}

impl PhotometricPolicy {
    fn luminance(color: Vec3) -> f32 {
        color.dot(vec3(0.2126, 0.7152, 0.0722))
    }

    /// Watts for a given luminous intensity (candela).
    fn watts(&self, candela: f32, color: Vec3) -> f32 {
        let luminance = Self::luminance(color);
        if !(luminance > 0.0) {
            return 0.0;
        }
        candela * 4.0 * PI / (self.efficacy * luminance)
    }
}

impl LightPowerPolicy for PhotometricPolicy {
    fn point_watts(&self, lumens: f32, color: Vec3) -> f32 {
        self.watts(lumens, color)
    }

    fn spot_watts(&self, lumens: f32, color: Vec3, cone: f32) -> f32 {
        let solid_angle = 2.0 * PI * (1.0 - (cone.to_radians() / 2.0).cos());
        if !(solid_angle > 0.0) {
            return 0.0;
        }
        self.watts(lumens / solid_angle, color)
    }
}

/// Whitespace separated floats, as used by entity vector keys.
pub fn parse_vector(key: &'static str, value: &str) -> Result<Vec<f32>, LightError> {
    value
        .split_whitespace()
        .map(|part| {
            part.parse::<f32>().map_err(|_| LightError::BadValue {
                key,
                value: value.to_owned(),
            })
        })
        .collect()
}

fn parse_vec3(key: &'static str, value: &str) -> Result<Vec3, LightError> {
    match parse_vector(key, value)?[..] {
        [x, y, z, ..] => Ok(vec3(x, y, z)),
        _ => Err(LightError::BadValue {
            key,
            value: value.to_owned(),
        }),
    }
}

fn parse_float(key: &'static str, value: Option<&str>, default: f32) -> Result<f32, LightError> {
    match value {
        Some(value) => value.trim().parse().map_err(|_| LightError::BadValue {
            key,
            value: value.to_owned(),
        }),
        None => Ok(default),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightColor {
    /// Brightest channel normalised to 1
    pub color: Vec3,
    pub lumens: f32,
}

/// Colour and luminous power from `_light` and `_lightHDR`.
///
/// An HDR value whose first component is positive replaces `_light` entirely.
pub fn resolve_light_color(
    light: Option<&str>,
    light_hdr: Option<&str>,
    scale: f32,
) -> Result<LightColor, LightError> {
    let ldr = parse_vector("_light", light.ok_or(LightError::MissingKey("_light"))?)?;
    let hdr = match light_hdr {
        Some(hdr) => parse_vector("_lightHDR", hdr)?,
        None => Vec::new(),
    };

    let (key, values) = if hdr.first().is_some_and(|&first| first > 0.0) {
        ("_lightHDR", hdr)
    } else {
        ("_light", ldr)
    };
    let (rgb, brightness) = match values[..] {
        [r, g, b] => (vec3(r, g, b), DEFAULT_BRIGHTNESS),
        [r, g, b, brightness, ..] => (vec3(r, g, b), brightness),
        _ => {
            return Err(LightError::BadValue {
                key,
                value: format!("{values:?}"),
            })
        }
    };

    let color_max = rgb.max_element();
    if !(color_max > 0.0) {
        return Ok(LightColor {
            color: Vec3::ZERO,
            lumens: 0.0,
        });
    }

    Ok(LightColor {
        color: rgb / color_max,
        lumens: brightness * color_max / 255.0 * (1.0 / scale),
    })
}

/// Entity `angles` (pitch yaw roll, degrees) to an XYZ euler rotation in radians.
pub fn convert_rotation(angles: Vec3) -> Vec3 {
    vec3(angles.z, angles.x, angles.y) * (PI / 180.0)
}

/// Build the light described by a `light` or `light_spot` entity.
pub fn resolve_light(
    entity: &Entity,
    name: String,
    scale: f32,
    policy: &dyn LightPowerPolicy,
) -> Result<LightRequest, LightError> {
    let kind = match entity.classname() {
        Some("light") => LightKind::Point,
        Some("light_spot") => LightKind::Spot,
        other => return Err(LightError::NotALight(other.map(str::to_owned))),
    };

    let origin = parse_vec3(
        "origin",
        entity.get("origin").ok_or(LightError::MissingKey("origin"))?,
    )?;
    let LightColor { color, lumens } =
        resolve_light_color(entity.get("_light"), entity.get("_lightHDR"), scale)?;

    let mut light = LightRequest {
        name,
        collection: entity.classname().map(str::to_owned),
        kind,
        location: origin * scale,
        rotation: Vec3::ZERO,
        watts: 0.0,
        color,
        cone: 0.0,
        inner_cone: 0.0,
    };

    match kind {
        LightKind::Point => {
            light.watts = policy.point_watts(lumens, color);
        }
        LightKind::Spot => {
            let angles = match entity.get("angles") {
                Some(angles) => parse_vec3("angles", angles)?,
                None => Vec3::ZERO,
            };
            light.rotation = convert_rotation(angles);
            light.cone = parse_float("_cone", entity.get("_cone"), DEFAULT_CONE)?;
            light.inner_cone =
                parse_float("_inner_cone", entity.get("_inner_cone"), DEFAULT_INNER_CONE)?;
            light.watts = policy.spot_watts(lumens, color, light.cone);
        }
    }

    Ok(light)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCALE: f32 = 0.0133;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-3 * b.abs().max(1.0)
    }

    #[test]
    fn hdr_overrides_ldr() {
        let color =
            resolve_light_color(Some("255 128 0 200"), Some("10 20 40 100"), SCALE).unwrap();
        assert_eq!(color.color, vec3(0.25, 0.5, 1.0));
        assert!(close(color.lumens, 100.0 * 40.0 / 255.0 / SCALE));

        // -1 is the "no HDR value" marker
        let color =
            resolve_light_color(Some("255 128 0 200"), Some("-1 -1 -1 1"), SCALE).unwrap();
        assert_eq!(color.color, vec3(1.0, 128.0 / 255.0, 0.0));
        assert!(close(color.lumens, 200.0 / SCALE));
    }

    #[test]
    fn light_color_edge_cases() {
        let rgb_only = resolve_light_color(Some("255 255 255"), None, 1.0).unwrap();
        assert_eq!(rgb_only.lumens, DEFAULT_BRIGHTNESS);

        let black = resolve_light_color(Some("0 0 0 500"), None, 1.0).unwrap();
        assert_eq!(black.color, Vec3::ZERO);
        assert_eq!(black.lumens, 0.0);

        assert_eq!(
            resolve_light_color(None, None, 1.0),
            Err(LightError::MissingKey("_light"))
        );
        assert!(matches!(
            resolve_light_color(Some("255 x 0 1"), None, 1.0),
            Err(LightError::BadValue { key: "_light", .. })
        ));
        assert!(resolve_light_color(Some("255 0"), None, 1.0).is_err());
    }

    #[test]
    fn photometric_watts() {
        let policy = PhotometricPolicy::default();
        let white = Vec3::ONE;

        assert!(close(policy.point_watts(683.0, white), 4.0 * PI));
        assert_eq!(policy.point_watts(1000.0, Vec3::ZERO), 0.0);

        // a 180 degree cone covers half the sphere
        assert!(close(policy.spot_watts(683.0, white, 180.0), 2.0));
        assert_eq!(policy.spot_watts(683.0, white, 0.0), 0.0);
    }

    #[test]
    fn rotation_is_roll_pitch_yaw() {
        let rotation = convert_rotation(vec3(90.0, 180.0, 45.0));
        assert!(rotation.abs_diff_eq(vec3(PI / 4.0, PI / 2.0, PI), 1e-6));
    }

    #[test]
    fn spot_light_from_entity() {
        let entity = Entity::from_pairs([
            ("classname", "light_spot"),
            ("origin", "100 0 -50"),
            ("angles", "-90 0 0"),
            ("_light", "255 255 255 400"),
            ("_lightHDR", "-1 -1 -1 1"),
            ("_cone", "60"),
        ]);
        let policy = PhotometricPolicy::default();
        let light = resolve_light(&entity, "SPOT_lamp".to_owned(), SCALE, &policy).unwrap();

        assert_eq!(light.kind, LightKind::Spot);
        assert_eq!(light.collection.as_deref(), Some("light_spot"));
        assert!(light.location.abs_diff_eq(vec3(1.33, 0.0, -0.665), 1e-5));
        assert!(light.rotation.abs_diff_eq(vec3(0.0, -PI / 2.0, 0.0), 1e-6));
        assert_eq!(light.cone, 60.0);
        assert_eq!(light.inner_cone, DEFAULT_INNER_CONE);
        assert!(close(light.watts, policy.spot_watts(400.0 / SCALE, Vec3::ONE, 60.0)));
    }

    #[test]
    fn point_light_and_non_lights() {
        let policy = PhotometricPolicy::default();
        let light = Entity::from_pairs([("classname", "light"), ("origin", "0 0 0"), ("_light", "255 0 0 100")]);
        let light = resolve_light(&light, "POINT_1".to_owned(), 1.0, &policy).unwrap();
        assert_eq!(light.kind, LightKind::Point);
        assert_eq!(light.rotation, Vec3::ZERO);
        assert_eq!(light.color, vec3(1.0, 0.0, 0.0));

        let door = Entity::from_pairs([("classname", "func_door")]);
        assert!(matches!(
            resolve_light(&door, String::new(), 1.0, &policy),
            Err(LightError::NotALight(Some(_)))
        ));

        let no_origin = Entity::from_pairs([("classname", "light"), ("_light", "1 1 1 1")]);
        assert_eq!(
            resolve_light(&no_origin, String::new(), 1.0, &policy),
            Err(LightError::MissingKey("origin"))
        );
    }
}
