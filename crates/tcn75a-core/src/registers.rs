//! TCN75A register map and the pure conversions between register bytes and
//! semantic values.
//!
//! Temperatures and limits share one fixed-point encoding: the first byte is
//! the integer part and the second byte holds the fraction in 1/256 steps.
//! The configuration register packs six independent fields into one byte and
//! is always updated by read-modify-write through [`apply_field`].

/// Register pointer values understood by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    /// Ambient temperature (read-only, 2 bytes)
    Temperature = 0x00,
    /// Sensor configuration (1 byte)
    Config = 0x01,
    /// Lower alert limit, T_HYST (2 bytes)
    Hysteresis = 0x02,
    /// Upper alert limit, T_SET (2 bytes)
    Set = 0x03,
}

impl Register {
    /// Pointer byte sent ahead of every transaction.
    pub const fn pointer(self) -> u8 {
        self as u8
    }

    /// Number of data bytes this register holds.
    pub const fn width(self) -> usize {
        match self {
            Self::Config => 1,
            Self::Temperature | Self::Hysteresis | Self::Set => 2,
        }
    }

    /// Register selected by a pointer byte. Only the two low bits are decoded.
    pub const fn from_pointer(pointer: u8) -> Self {
        match pointer & 0b11 {
            0x00 => Self::Temperature,
            0x01 => Self::Config,
            0x02 => Self::Hysteresis,
            _ => Self::Set,
        }
    }
}

/// Which of the two alert limit registers to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitRegister {
    /// Lower bound (T_HYST)
    Hysteresis,
    /// Upper bound (T_SET)
    Set,
}

impl LimitRegister {
    pub const fn register(self) -> Register {
        match self {
            Self::Hysteresis => Register::Hysteresis,
            Self::Set => Register::Set,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Hysteresis => "MIN",
            Self::Set => "MAX",
        }
    }
}

/// Decode a fixed-point temperature pair into degrees Celsius.
pub fn decode_temperature(integer: u8, fraction: u8) -> f32 {
    let fixed = u16::from_be_bytes([integer, fraction]);
    f32::from(fixed) / 256.0
}

/// Encode a limit with half-degree granularity.
pub const fn encode_limit(whole_degrees: u8, half: bool) -> [u8; 2] {
    [whole_degrees, if half { 0x80 } else { 0x00 }]
}

/// Replace the bits selected by `mask` with the matching bits of `value`.
pub const fn apply_field(register: u8, mask: u8, value: u8) -> u8 {
    (register & !mask) | (value & mask)
}

/// A temperature reading in degrees Celsius.
///
/// Fahrenheit is derived on demand from this value and never stored.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Celsius(pub f32);

impl Celsius {
    pub fn from_raw(bytes: [u8; 2]) -> Self {
        Self(decode_temperature(bytes[0], bytes[1]))
    }

    pub const fn degrees(self) -> f32 {
        self.0
    }

    pub fn fahrenheit(self) -> f32 {
        self.0 * 9.0 / 5.0 + 32.0
    }
}

/// Bitfields of the configuration register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    Shutdown,
    AlertMode,
    AlertPolarity,
    FaultQueue,
    Resolution,
    OneShot,
}

impl ConfigField {
    pub const ALL: [ConfigField; 6] = [
        Self::Shutdown,
        Self::AlertMode,
        Self::AlertPolarity,
        Self::FaultQueue,
        Self::Resolution,
        Self::OneShot,
    ];

    pub const fn mask(self) -> u8 {
        match self {
            Self::Shutdown => 0b0000_0001,
            Self::AlertMode => 0b0000_0010,
            Self::AlertPolarity => 0b0000_0100,
            Self::FaultQueue => 0b0001_1000,
            Self::Resolution => 0b0110_0000,
            Self::OneShot => 0b1000_0000,
        }
    }

    pub const fn shift(self) -> u8 {
        self.mask().trailing_zeros() as u8
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Shutdown => "SHUTDOWN",
            Self::AlertMode => "COMP/INT",
            Self::AlertPolarity => "ALERT POLARITY",
            Self::FaultQueue => "FAULT QUEUE",
            Self::Resolution => "ADC RESOLUTION",
            Self::OneShot => "ONE-SHOT",
        }
    }
}

/// A typed value for one configuration field.
///
/// `bits()` returns the value already shifted into the field's position, so
/// it can be passed straight to [`apply_field`] together with `FIELD.mask()`.
pub trait FieldSetting: Copy {
    const FIELD: ConfigField;

    fn bits(self) -> u8;

    /// Decode the field from a full configuration byte.
    fn from_register(register: u8) -> Self;

    /// Setting selected by a menu digit.
    fn from_choice(choice: char) -> Option<Self>;

    fn describe(self) -> &'static str;
}

macro_rules! field_setting {
    (
        $(#[$meta:meta])*
        $name:ident, $field:ident {
            $($(#[$vmeta:meta])* $variant:ident = $bits:expr, $choice:literal, $text:literal;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl FieldSetting for $name {
            const FIELD: ConfigField = ConfigField::$field;

            fn bits(self) -> u8 {
                let raw: u8 = match self {
                    $(Self::$variant => $bits,)+
                };
                raw << Self::FIELD.shift()
            }

            fn from_register(register: u8) -> Self {
                let raw = (register & Self::FIELD.mask()) >> Self::FIELD.shift();
                $(if raw == $bits {
                    return Self::$variant;
                })+
                unreachable!("every bit pattern of the field is covered")
            }

            fn from_choice(choice: char) -> Option<Self> {
                match choice {
                    $($choice => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn describe(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }
    };
}

field_setting! {
    /// Shutdown bit: conversions stop while set.
    ShutdownMode, Shutdown {
        Active = 0, '0', "Shutdown disabled";
        Shutdown = 1, '1', "Shutdown enabled";
    }
}

field_setting! {
    /// Alert output behaviour.
    AlertMode, AlertMode {
        /// Level-driven, clears on its own once back in range
        Comparator = 0, '0', "Comparator mode";
        /// Edge-latched, cleared by reading any register
        Interrupt = 1, '1', "Interrupt mode";
    }
}

field_setting! {
    AlertPolarity, AlertPolarity {
        ActiveLow = 0, '0', "Alert active-low";
        ActiveHigh = 1, '1', "Alert active-high";
    }
}

field_setting! {
    /// Consecutive out-of-limit conversions needed before the alert asserts.
    FaultQueue, FaultQueue {
        One = 0b00, '0', "Fault queue: 1";
        Two = 0b01, '1', "Fault queue: 2";
        Four = 0b10, '2', "Fault queue: 4";
        Six = 0b11, '3', "Fault queue: 6";
    }
}

field_setting! {
    /// ADC conversion resolution.
    Resolution, Resolution {
        /// 0.5 °C steps
        Bits9 = 0b00, '0', "Resolution: 9 bits";
        /// 0.25 °C steps
        Bits10 = 0b01, '1', "Resolution: 10 bits";
        /// 0.125 °C steps
        Bits11 = 0b10, '2', "Resolution: 11 bits";
        /// 0.0625 °C steps
        Bits12 = 0b11, '3', "Resolution: 12 bits";
    }
}

field_setting! {
    OneShot, OneShot {
        Continuous = 0, '0', "One-shot disabled";
        Single = 1, '1', "One-shot enabled";
    }
}

impl FaultQueue {
    pub const fn count(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
            Self::Six => 6,
        }
    }
}

impl Resolution {
    pub const fn bits_of_precision(self) -> u8 {
        match self {
            Self::Bits9 => 9,
            Self::Bits10 => 10,
            Self::Bits11 => 11,
            Self::Bits12 => 12,
        }
    }

    /// Mask over the low byte of the temperature register for this resolution.
    pub const fn fraction_mask(self) -> u8 {
        match self {
            Self::Bits9 => 0x80,
            Self::Bits10 => 0xC0,
            Self::Bits11 => 0xE0,
            Self::Bits12 => 0xF0,
        }
    }
}

/// Decoded view of the configuration register byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigRegister(pub u8);

impl ConfigRegister {
    pub const fn raw(self) -> u8 {
        self.0
    }

    pub fn get<S: FieldSetting>(self) -> S {
        S::from_register(self.0)
    }

    pub fn with<S: FieldSetting>(self, setting: S) -> Self {
        Self(apply_field(self.0, S::FIELD.mask(), setting.bits()))
    }

    pub fn shutdown(self) -> ShutdownMode {
        self.get()
    }

    pub fn alert_mode(self) -> AlertMode {
        self.get()
    }

    pub fn alert_polarity(self) -> AlertPolarity {
        self.get()
    }

    pub fn fault_queue(self) -> FaultQueue {
        self.get()
    }

    pub fn resolution(self) -> Resolution {
        self.get()
    }

    pub fn one_shot(self) -> OneShot {
        self.get()
    }
}
