use std::path::PathBuf;
use std::time::Duration;

/// A type that can be read from, and rendered back to, a property value
pub trait ConfigValue: Sized {
    /// Parse `value`; the error describes what was expected
    fn parse_value(value: &str) -> Result<Self, String>;

    /// Render for the configuration report; `None` means unset
    fn render_value(&self) -> Option<String>;
}

impl ConfigValue for String {
    fn parse_value(value: &str) -> Result<Self, String> {
        Ok(value.to_string())
    }

    fn render_value(&self) -> Option<String> {
        Some(self.clone())
    }
}

impl ConfigValue for bool {
    fn parse_value(value: &str) -> Result<Self, String> {
        if value.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if value.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err("true or false".to_string())
        }
    }

    fn render_value(&self) -> Option<String> {
        Some(self.to_string())
    }
}

macro_rules! numeric_config_value {
    ($($ty:ty),*) => {
        $(
            impl ConfigValue for $ty {
                fn parse_value(value: &str) -> Result<Self, String> {
                    value
                        .trim()
                        .parse::<$ty>()
                        .map_err(|_| stringify!($ty).to_string())
                }

                fn render_value(&self) -> Option<String> {
                    Some(self.to_string())
                }
            }
        )*
    };
}

numeric_config_value!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64);

impl ConfigValue for PathBuf {
    fn parse_value(value: &str) -> Result<Self, String> {
        Ok(PathBuf::from(value))
    }

    fn render_value(&self) -> Option<String> {
        Some(self.display().to_string())
    }
}

const DURATION_UNITS: [(&str, u64); 7] = [
    ("ns", 1),
    ("us", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60_000_000_000),
    ("h", 3_600_000_000_000),
    ("d", 86_400_000_000_000),
];

/// Durations are written as a number followed by a unit: `ns`, `us`, `ms`,
/// `s`, `m`, `h` or `d` (e.g. `250ms`, `1.5s`, `10m`)
impl ConfigValue for Duration {
    fn parse_value(value: &str) -> Result<Self, String> {
        const EXPECTED: &str = "duration such as 10s or 250ms";

        let value = value.trim();
        let split = value
            .find(|c: char| c.is_ascii_alphabetic())
            .ok_or_else(|| EXPECTED.to_string())?;
        let (amount, unit) = value.split_at(split);
        let amount: f64 = amount.trim().parse().map_err(|_| EXPECTED.to_string())?;
        let unit_nanos = DURATION_UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, nanos)| *nanos)
            .ok_or_else(|| EXPECTED.to_string())?;

        let nanos = (amount * unit_nanos as f64).round();
        if !nanos.is_finite() || nanos < 0.0 || nanos > u64::MAX as f64 {
            return Err(EXPECTED.to_string());
        }
        Ok(Duration::from_nanos(nanos as u64))
    }

    fn render_value(&self) -> Option<String> {
        let nanos = self.as_nanos();
        let rendered = DURATION_UNITS
            .iter()
            .rev()
            .map(|(name, unit)| (name, u128::from(*unit)))
            .find(|(_, unit)| nanos != 0 && nanos % unit == 0)
            .map(|(name, unit)| format!("{}{}", nanos / unit, name))
            .unwrap_or_else(|| format!("{}ns", nanos));
        Some(rendered)
    }
}

impl<T: ConfigValue> ConfigValue for Option<T> {
    fn parse_value(value: &str) -> Result<Self, String> {
        T::parse_value(value).map(Some)
    }

    fn render_value(&self) -> Option<String> {
        self.as_ref().and_then(ConfigValue::render_value)
    }
}
