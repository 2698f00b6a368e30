//! Configuration RPC dispatcher
//!
//! Field names map to typed accessor pairs through a table built once on
//! first use. A `set` resolves in two tiers: the field's direct setter if it
//! has one, otherwise an atomic pipeline reconfiguration with that single
//! field. The second tier reinitializes the sensor and is much slower, so it
//! is only taken for names without a direct setter.

use super::response::{Response, Status};
use crate::camera::{Camera, CameraError, FrameSize, GainCeiling, ReconfigureRequest};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::{debug, info, warn};

type Getter = fn(&Camera) -> String;
type Setter = fn(&Camera, i32) -> Result<(), CameraError>;

struct Field {
    get: Getter,
    set: Option<Setter>,
}

fn invalid(field: &str, value: i32) -> CameraError {
    CameraError::InvalidValue {
        field: field.to_string(),
        value,
    }
}

fn flag(field: &str, value: i32) -> Result<bool, CameraError> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(invalid(field, value)),
    }
}

macro_rules! int_field {
    ($name:literal, $get:ident, $set:ident) => {
        (
            $name,
            Field {
                get: |c| c.$get().to_string(),
                set: Some(|c, v| c.$set(v)),
            },
        )
    };
}

macro_rules! bool_field {
    ($name:literal, $get:ident, $set:ident) => {
        (
            $name,
            Field {
                get: |c| i32::from(c.$get()).to_string(),
                set: Some(|c, v| c.$set(flag($name, v)?)),
            },
        )
    };
}

macro_rules! read_only {
    ($name:literal, $get:expr) => {
        ($name, Field { get: $get, set: None })
    };
}

fn set_frame_size(camera: &Camera, value: i32) -> Result<(), CameraError> {
    let size = FrameSize::from_index(value).ok_or_else(|| invalid("frame_size", value))?;
    camera.set_frame_size(size)
}

static FIELDS: Lazy<HashMap<&'static str, Field>> = Lazy::new(|| {
    HashMap::from([
        int_field!("contrast", contrast, set_contrast),
        int_field!("brightness", brightness, set_brightness),
        int_field!("saturation", saturation, set_saturation),
        int_field!("sharpness", sharpness, set_sharpness),
        int_field!("denoise", denoise, set_denoise),
        int_field!("quality", quality, set_quality),
        int_field!("agc_gain", agc_gain, set_agc_gain),
        int_field!("aec_value", aec_value, set_aec_value),
        int_field!("special_effect", special_effect, set_special_effect),
        int_field!("wb_mode", wb_mode, set_wb_mode),
        int_field!("ae_level", ae_level, set_ae_level),
        bool_field!("colorbar", colorbar, set_colorbar),
        bool_field!("whitebal", whitebal, set_whitebal),
        bool_field!("gain_ctrl", gain_ctrl, set_gain_ctrl),
        bool_field!("exposure_ctrl", exposure_ctrl, set_exposure_ctrl),
        bool_field!("hmirror", hmirror, set_hmirror),
        bool_field!("vflip", vflip, set_vflip),
        bool_field!("aec2", aec2, set_aec2),
        bool_field!("awb_gain", awb_gain, set_awb_gain),
        bool_field!("dcw", dcw, set_dcw),
        bool_field!("bpc", bpc, set_bpc),
        bool_field!("wpc", wpc, set_wpc),
        bool_field!("raw_gma", raw_gma, set_raw_gma),
        bool_field!("lenc", lenc, set_lenc),
        (
            "gainceiling",
            Field {
                get: |c| c.gainceiling().index().to_string(),
                set: Some(|c, v| {
                    let ceiling =
                        GainCeiling::from_index(v).ok_or_else(|| invalid("gainceiling", v))?;
                    c.set_gainceiling(ceiling)
                }),
            },
        ),
        (
            "frame_size",
            Field {
                get: |c| c.frame_size().index().to_string(),
                set: Some(set_frame_size),
            },
        ),
        (
            "framesize",
            Field {
                get: |c| c.frame_size().index().to_string(),
                set: Some(set_frame_size),
            },
        ),
        // Settable through reconfiguration only
        read_only!("pixel_format", |c| c.pixel_format().index().to_string()),
        read_only!("grab_mode", |c| c.grab_mode().index().to_string()),
        read_only!("fb_count", |c| c.fb_count().to_string()),
        read_only!("pixel_width", |c| c.pixel_width().to_string()),
        read_only!("pixel_height", |c| c.pixel_height().to_string()),
        read_only!("max_frame_size", |c| c.max_frame_size().index().to_string()),
        read_only!("sensor_name", |c| c.sensor_name()),
        read_only!("supports_jpeg", |c| i32::from(c.supports_jpeg()).to_string()),
        read_only!("address", |c| c.address().to_string()),
    ])
});

/// Every field name `/get_<name>` answers for
pub fn field_names() -> impl Iterator<Item = &'static str> {
    FIELDS.keys().copied()
}

/// True when `name` has a direct single-field setter
pub fn has_direct_setter(name: &str) -> bool {
    FIELDS.get(name).is_some_and(|f| f.set.is_some())
}

/// Handles `/set_<field>?value=<raw>`.
///
/// Any parse failure, unknown field or rejected value yields `404`; the
/// device keeps its last valid configuration.
pub fn dispatch_set(camera: &Camera, field: &str, raw: Option<&str>) -> Response {
    let Some(value) = raw.and_then(|v| v.trim().parse::<i32>().ok()) else {
        warn!(field, value = ?raw, "Rejected set: value is not an integer");
        return Response::not_found();
    };

    info!(field, value, "Setting {} to {}", field, value);

    let result = match FIELDS.get(field).and_then(|f| f.set) {
        Some(setter) => setter(camera, value),
        None => {
            debug!(field, "No direct setter, reconfiguring pipeline");
            ReconfigureRequest::new()
                .with_field(field, value)
                .and_then(|request| camera.reconfigure(&request))
        }
    };

    match result {
        Ok(()) => Response::empty(Status::Ok),
        Err(e) => {
            warn!(field, value, error = %e, "Set failed");
            Response::not_found()
        }
    }
}

/// Handles `/get_<field>`; the value is returned as plain text
pub fn dispatch_get(camera: &Camera, field: &str) -> Response {
    match FIELDS.get(field) {
        Some(f) => {
            let value = (f.get)(camera);
            debug!(field, value = %value, "Get");
            Response::text(value)
        }
        None => {
            warn!(field, "Rejected get: unknown field");
            Response::not_found()
        }
    }
}
