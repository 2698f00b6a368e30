//! Sensor tunables and the adapter-side settings shadow

use std::fmt;

/// A single sensor tunable that the driver can change in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Contrast,
    Brightness,
    Saturation,
    Sharpness,
    Denoise,
    GainCeiling,
    Quality,
    Colorbar,
    Whitebal,
    GainCtrl,
    ExposureCtrl,
    Hmirror,
    Vflip,
    Aec2,
    AwbGain,
    AgcGain,
    AecValue,
    SpecialEffect,
    WbMode,
    AeLevel,
    Dcw,
    Bpc,
    Wpc,
    RawGma,
    Lenc,
}

impl Control {
    pub const COUNT: usize = 25;

    pub const ALL: [Control; Control::COUNT] = [
        Control::Contrast,
        Control::Brightness,
        Control::Saturation,
        Control::Sharpness,
        Control::Denoise,
        Control::GainCeiling,
        Control::Quality,
        Control::Colorbar,
        Control::Whitebal,
        Control::GainCtrl,
        Control::ExposureCtrl,
        Control::Hmirror,
        Control::Vflip,
        Control::Aec2,
        Control::AwbGain,
        Control::AgcGain,
        Control::AecValue,
        Control::SpecialEffect,
        Control::WbMode,
        Control::AeLevel,
        Control::Dcw,
        Control::Bpc,
        Control::Wpc,
        Control::RawGma,
        Control::Lenc,
    ];

    /// Field name used on the wire
    pub fn name(self) -> &'static str {
        match self {
            Control::Contrast => "contrast",
            Control::Brightness => "brightness",
            Control::Saturation => "saturation",
            Control::Sharpness => "sharpness",
            Control::Denoise => "denoise",
            Control::GainCeiling => "gainceiling",
            Control::Quality => "quality",
            Control::Colorbar => "colorbar",
            Control::Whitebal => "whitebal",
            Control::GainCtrl => "gain_ctrl",
            Control::ExposureCtrl => "exposure_ctrl",
            Control::Hmirror => "hmirror",
            Control::Vflip => "vflip",
            Control::Aec2 => "aec2",
            Control::AwbGain => "awb_gain",
            Control::AgcGain => "agc_gain",
            Control::AecValue => "aec_value",
            Control::SpecialEffect => "special_effect",
            Control::WbMode => "wb_mode",
            Control::AeLevel => "ae_level",
            Control::Dcw => "dcw",
            Control::Bpc => "bpc",
            Control::Wpc => "wpc",
            Control::RawGma => "raw_gma",
            Control::Lenc => "lenc",
        }
    }

    /// Inclusive range accepted by the driver
    pub fn range(self) -> (i32, i32) {
        match self {
            Control::Contrast
            | Control::Brightness
            | Control::Saturation
            | Control::Sharpness
            | Control::AeLevel => (-2, 2),
            Control::Denoise => (0, 8),
            Control::GainCeiling => (0, 6),
            Control::Quality => (0, 63),
            Control::AgcGain => (0, 30),
            Control::AecValue => (0, 1200),
            Control::SpecialEffect => (0, 6),
            Control::WbMode => (0, 4),
            _ => (0, 1),
        }
    }

    pub fn is_bool(self) -> bool {
        matches!(
            self,
            Control::Colorbar
                | Control::Whitebal
                | Control::GainCtrl
                | Control::ExposureCtrl
                | Control::Hmirror
                | Control::Vflip
                | Control::Aec2
                | Control::AwbGain
                | Control::Dcw
                | Control::Bpc
                | Control::Wpc
                | Control::RawGma
                | Control::Lenc
        )
    }

    pub fn accepts(self, value: i32) -> bool {
        let (min, max) = self.range();
        (min..=max).contains(&value)
    }

    /// Power-on value of the OV2640 status block
    pub fn default_value(self) -> i32 {
        match self {
            Control::Quality => 12,
            Control::Whitebal
            | Control::GainCtrl
            | Control::ExposureCtrl
            | Control::AwbGain
            | Control::Dcw
            | Control::Bpc
            | Control::Wpc
            | Control::RawGma
            | Control::Lenc => 1,
            Control::AecValue => 300,
            _ => 0,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Last accepted value of every tunable.
///
/// The adapter keeps this copy so values survive deinit and pipeline
/// reinitialization, and can be read while the device is down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorSettings {
    values: [i32; Control::COUNT],
}

impl Default for SensorSettings {
    fn default() -> Self {
        let mut values = [0; Control::COUNT];
        for control in Control::ALL {
            values[control.slot()] = control.default_value();
        }
        Self { values }
    }
}

impl SensorSettings {
    pub fn get(&self, control: Control) -> i32 {
        self.values[control.slot()]
    }

    pub fn set(&mut self, control: Control, value: i32) {
        self.values[control.slot()] = value;
    }

    pub fn flag(&self, control: Control) -> bool {
        self.get(control) != 0
    }

    /// Every (control, value) pair, in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (Control, i32)> + '_ {
        Control::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}
