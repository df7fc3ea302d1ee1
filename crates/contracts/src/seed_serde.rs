//! Seeds travel as strings so JavaScript callers do not lose precision above
//! 2^53. Deserialization also accepts plain numbers and `0x` hex strings.

use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};

use crate::error::ConfigError;

pub fn parse_seed(raw: &str) -> Result<u64, ConfigError> {
    let trimmed = raw.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|err| ConfigError::Seed {
        raw: raw.to_string(),
        reason: err.to_string(),
    })
}

pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SeedInput {
        Text(String),
        Number(u64),
    }

    match SeedInput::deserialize(deserializer)? {
        SeedInput::Text(raw) => parse_seed(&raw).map_err(D::Error::custom),
        SeedInput::Number(value) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
    struct Wrapper {
        #[serde(with = "super")]
        seed: u64,
    }

    #[test]
    fn seed_is_written_as_string() {
        let encoded = serde_json::to_string(&Wrapper { seed: u64::MAX }).expect("serialize");
        assert_eq!(encoded, r#"{"seed":"18446744073709551615"}"#);
    }

    #[test]
    fn accepts_string_number_and_hex() {
        for raw in [r#"{"seed":"1337"}"#, r#"{"seed":1337}"#, r#"{"seed":"0x539"}"#] {
            let parsed: Wrapper = serde_json::from_str(raw).expect("seed parses");
            assert_eq!(parsed.seed, 1337, "input {raw}");
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_str::<Wrapper>(r#"{"seed":"twelve"}"#).is_err());
        assert!(super::parse_seed("-4").is_err());
    }
}
