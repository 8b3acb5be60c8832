pub const RATE_ENV: &str = "MIXOUT_RATE";
pub const CHANNELS_ENV: &str = "MIXOUT_CHANNELS";

/// Snapshot of the environment overrides. Overrides beat autodetected
/// hardware values but never beat an explicit non-zero caller request.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub rate: Option<u32>,
    pub channels: Option<u16>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self {
            rate: env_positive(RATE_ENV),
            channels: env_positive(CHANNELS_ENV).and_then(|v| u16::try_from(v).ok()),
        }
    }
}

fn env_positive(key: &str) -> Option<u32> {
    std::env::var(key)
        .ok()?
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides_from_env() {
        // Single test so parallel test threads never race on process env.
        unsafe {
            std::env::set_var(RATE_ENV, "44100");
            std::env::set_var(CHANNELS_ENV, "0");
        }
        let overrides = Overrides::from_env();
        assert_eq!(overrides.rate, Some(44100));
        assert_eq!(overrides.channels, None, "zero must read as unset");

        unsafe {
            std::env::set_var(RATE_ENV, "not a number");
            std::env::set_var(CHANNELS_ENV, " 6 ");
        }
        let overrides = Overrides::from_env();
        assert_eq!(overrides.rate, None);
        assert_eq!(overrides.channels, Some(6), "whitespace is trimmed");

        unsafe {
            std::env::remove_var(RATE_ENV);
            std::env::remove_var(CHANNELS_ENV);
        }
        let overrides = Overrides::from_env();
        assert_eq!(overrides.rate, None);
        assert_eq!(overrides.channels, None);
    }
}
