//! Building descriptors from caller input
//!
//! [`CredentialRequest`] holds a credential the way a caller writes it down:
//! an encoded certificate or a plain secret, optional RFC 3339 dates and an
//! optional relative lifetime such as `240h`. [`CredentialRequest::into_descriptor`]
//! validates it and produces a [`CredentialDescriptor`] ready to attach.

use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{
    CredentialDescriptor, CredentialError, CredentialKind, KeyCredentialType, KeyId, SecretValue,
};

/// Encoding of a certificate value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueEncoding {
    /// PEM armour around base64 DER
    #[default]
    Pem,
    /// Base64 DER
    Base64,
    /// Hexadecimal DER
    Hex,
}

impl ValueEncoding {
    /// Lower-case name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pem => "pem",
            Self::Base64 => "base64",
            Self::Hex => "hex",
        }
    }

    /// Decode `value` to raw bytes.
    pub fn decode(&self, value: &str) -> Result<Vec<u8>, CredentialError> {
        let invalid = |reason: String| CredentialError::InvalidValue {
            encoding: self.as_str(),
            reason,
        };

        match self {
            Self::Pem => pem::parse(value)
                .map(pem::Pem::into_contents)
                .map_err(|e| invalid(format!("Failed to parse PEM: {e}"))),
            Self::Base64 => STANDARD
                .decode(strip_whitespace(value))
                .map_err(|e| invalid(e.to_string())),
            Self::Hex => hex::decode(strip_whitespace(value)).map_err(|e| invalid(e.to_string())),
        }
    }
}

impl fmt::Display for ValueEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pem" => Ok(Self::Pem),
            "base64" => Ok(Self::Base64),
            "hex" => Ok(Self::Hex),
            other => Err(format!(
                "unknown encoding `{other}`, expected one of pem, base64, hex"
            )),
        }
    }
}

fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Credential as supplied by a caller.
#[derive(Clone, Serialize, Deserialize)]
pub struct CredentialRequest {
    /// Encoded certificate, or secret text for password credentials
    pub value: String,

    /// How `value` is encoded; ignored for passwords
    #[serde(default)]
    pub encoding: ValueEncoding,

    /// Credential type name, `AsymmetricX509Cert` when omitted
    #[serde(default = "default_type", rename = "type")]
    pub credential_type: String,

    /// Key ID to use instead of a generated one
    #[serde(default)]
    pub key_id: Option<String>,

    /// Friendly label
    #[serde(default)]
    pub display_name: Option<String>,

    /// RFC 3339 start of validity, now when omitted
    #[serde(default)]
    pub start_date: Option<String>,

    /// RFC 3339 end of validity
    #[serde(default)]
    pub end_date: Option<String>,

    /// Lifetime from the start date, e.g. `240h` or `2400h30m`
    #[serde(default)]
    pub end_date_relative: Option<String>,
}

fn default_type() -> String {
    KeyCredentialType::default().as_str().to_owned()
}

impl CredentialRequest {
    /// Certificate request with the default type and PEM encoding.
    pub fn certificate(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            encoding: ValueEncoding::Pem,
            credential_type: default_type(),
            key_id: None,
            display_name: None,
            start_date: None,
            end_date: None,
            end_date_relative: None,
        }
    }

    /// Client secret request.
    pub fn password(value: impl Into<String>) -> Self {
        Self {
            credential_type: KeyCredentialType::Password.as_str().to_owned(),
            ..Self::certificate(value)
        }
    }

    /// Set the value encoding.
    pub fn with_encoding(mut self, encoding: ValueEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the credential type.
    pub fn with_type(mut self, credential_type: KeyCredentialType) -> Self {
        self.credential_type = credential_type.as_str().to_owned();
        self
    }

    /// Use a caller-chosen key ID.
    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = Some(key_id.into());
        self
    }

    /// Set a friendly label.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Set the RFC 3339 start date.
    pub fn with_start_date(mut self, start: impl Into<String>) -> Self {
        self.start_date = Some(start.into());
        self
    }

    /// Set the RFC 3339 end date.
    pub fn with_end_date(mut self, end: impl Into<String>) -> Self {
        self.end_date = Some(end.into());
        self
    }

    /// Set the lifetime relative to the start date.
    pub fn with_end_date_relative(mut self, lifetime: impl Into<String>) -> Self {
        self.end_date_relative = Some(lifetime.into());
        self
    }

    /// Validate and build a descriptor, defaulting the start date to now.
    pub fn into_descriptor(self) -> Result<CredentialDescriptor, CredentialError> {
        self.into_descriptor_at(Utc::now())
    }

    /// Validate and build a descriptor, defaulting the start date to `now`.
    pub fn into_descriptor_at(
        self,
        now: DateTime<Utc>,
    ) -> Result<CredentialDescriptor, CredentialError> {
        let credential_type: KeyCredentialType = self
            .credential_type
            .parse()
            .map_err(CredentialError::InvalidType)?;

        let key_id = match self.key_id.as_deref() {
            Some(raw) => raw.parse::<KeyId>().map_err(CredentialError::InvalidKeyId)?,
            None => KeyId::generate(),
        };

        if self.value.trim().is_empty() {
            return Err(CredentialError::EmptyValue);
        }
        let material = match credential_type.kind() {
            CredentialKind::Password => self.value.clone().into_bytes(),
            CredentialKind::Certificate => self.encoding.decode(&self.value)?,
        };
        if material.is_empty() {
            return Err(CredentialError::EmptyValue);
        }

        let start = match self.start_date.as_deref() {
            Some(raw) => parse_date("start_date", raw)?,
            None => now,
        };

        let end = match (self.end_date.as_deref(), self.end_date_relative.as_deref()) {
            (Some(_), Some(_)) => return Err(CredentialError::ConflictingEndDate),
            (Some(raw), None) => Some(parse_date("end_date", raw)?),
            (None, Some(raw)) => Some(relative_end(start, raw)?),
            (None, None) => None,
        };

        if let Some(end) = end.filter(|end| *end < start) {
            return Err(CredentialError::InvalidDateRange { start, end });
        }

        let mut descriptor = CredentialDescriptor::new(key_id, credential_type)
            .with_start_time(start)
            .with_value(SecretValue::new(material));
        if let Some(end) = end {
            descriptor = descriptor.with_end_time(end);
        }
        if let Some(name) = self.display_name {
            descriptor = descriptor.with_display_name(name);
        }
        Ok(descriptor)
    }
}

impl fmt::Debug for CredentialRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRequest")
            .field("value", &"[REDACTED]")
            .field("encoding", &self.encoding)
            .field("credential_type", &self.credential_type)
            .field("key_id", &self.key_id)
            .field("display_name", &self.display_name)
            .field("start_date", &self.start_date)
            .field("end_date", &self.end_date)
            .field("end_date_relative", &self.end_date_relative)
            .finish()
    }
}

fn parse_date(attr: &'static str, raw: &str) -> Result<DateTime<Utc>, CredentialError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|e| CredentialError::InvalidDate {
            attr,
            value: raw.to_owned(),
            reason: e.to_string(),
        })
}

fn relative_end(start: DateTime<Utc>, raw: &str) -> Result<DateTime<Utc>, CredentialError> {
    let invalid = |reason: String| CredentialError::InvalidDuration {
        value: raw.to_owned(),
        reason,
    };

    let lifetime = humantime::parse_duration(raw).map_err(|e| invalid(e.to_string()))?;
    let lifetime = chrono::Duration::from_std(lifetime).map_err(|e| invalid(e.to_string()))?;
    start
        .checked_add_signed(lifetime)
        .ok_or_else(|| invalid("end date overflows".to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const DER: [u8; 4] = [0x30, 0x82, 0x01, 0x0a];

    fn pem() -> String {
        format!(
            "-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n",
            STANDARD.encode(DER)
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[rstest]
    #[case::pem(ValueEncoding::Pem, pem())]
    #[case::base64(ValueEncoding::Base64, STANDARD.encode(DER))]
    #[case::hex(ValueEncoding::Hex, hex::encode(DER))]
    #[case::hex_upper(ValueEncoding::Hex, hex::encode_upper(DER))]
    fn certificate_value_decodes_to_der(#[case] encoding: ValueEncoding, #[case] value: String) {
        let descriptor = CredentialRequest::certificate(value)
            .with_encoding(encoding)
            .into_descriptor_at(now())
            .unwrap();
        assert_eq!(descriptor.raw_value.unwrap().expose(), &DER);
    }

    #[rstest]
    #[case::pem_without_markers(ValueEncoding::Pem, "MIIBCgKCAQEA")]
    #[case::pem_unterminated(ValueEncoding::Pem, "-----BEGIN CERTIFICATE-----\nMIIB\n")]
    #[case::pem_bad_body(ValueEncoding::Pem, "-----BEGIN CERTIFICATE-----\n!!!\n-----END CERTIFICATE-----")]
    #[case::pem_mismatched_labels(
        ValueEncoding::Pem,
        "-----BEGIN CERTIFICATE-----\nMIIB\n-----END PRIVATE KEY-----"
    )]
    #[case::bad_base64(ValueEncoding::Base64, "not base64!")]
    #[case::bad_hex(ValueEncoding::Hex, "zz")]
    fn undecodable_values_are_rejected(#[case] encoding: ValueEncoding, #[case] value: &str) {
        let err = CredentialRequest::certificate(value)
            .with_encoding(encoding)
            .into_descriptor_at(now())
            .unwrap_err();
        assert!(matches!(err, CredentialError::InvalidValue { .. }), "{err:?}");
        assert_eq!(err.attr(), "value");
    }

    #[test]
    fn password_value_is_taken_verbatim() {
        let descriptor = CredentialRequest::password("zz not hex")
            .with_encoding(ValueEncoding::Hex)
            .into_descriptor_at(now())
            .unwrap();
        assert_eq!(descriptor.kind(), CredentialKind::Password);
        assert_eq!(descriptor.raw_value.unwrap().expose(), b"zz not hex");
    }

    #[test]
    fn defaults_fill_key_id_and_start() {
        let descriptor = CredentialRequest::certificate(pem())
            .into_descriptor_at(now())
            .unwrap();
        assert_eq!(descriptor.start_time, Some(now()));
        assert_eq!(descriptor.end_time, None);
        assert_eq!(descriptor.credential_type, KeyCredentialType::AsymmetricX509Cert);
    }

    #[test]
    fn supplied_key_id_is_kept() {
        let descriptor = CredentialRequest::certificate(pem())
            .with_key_id("AAAAAAAA-0000-0000-0000-000000000001")
            .into_descriptor_at(now())
            .unwrap();
        assert_eq!(
            descriptor.key_id.to_string(),
            "aaaaaaaa-0000-0000-0000-000000000001"
        );
    }

    #[test]
    fn relative_end_counts_from_start() {
        let descriptor = CredentialRequest::certificate(pem())
            .with_start_date("2024-01-01T00:00:00Z")
            .with_end_date_relative("240h")
            .into_descriptor_at(now())
            .unwrap();
        assert_eq!(
            descriptor.end_time,
            Some(Utc.with_ymd_and_hms(2024, 1, 11, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn absolute_and_relative_end_conflict() {
        let err = CredentialRequest::certificate(pem())
            .with_end_date("2025-01-01T00:00:00Z")
            .with_end_date_relative("240h")
            .into_descriptor_at(now())
            .unwrap_err();
        assert_eq!(err, CredentialError::ConflictingEndDate);
    }

    #[test]
    fn end_before_start_is_rejected() {
        let err = CredentialRequest::certificate(pem())
            .with_start_date("2024-06-01T00:00:00Z")
            .with_end_date("2024-05-01T00:00:00+00:00")
            .into_descriptor_at(now())
            .unwrap_err();
        assert!(matches!(err, CredentialError::InvalidDateRange { .. }));
        assert_eq!(err.attr(), "end_date");
    }

    #[rstest]
    #[case::start(CredentialRequest::certificate(pem()).with_start_date("yesterday"), "start_date")]
    #[case::end(CredentialRequest::certificate(pem()).with_end_date("2024-13-01"), "end_date")]
    #[case::relative(CredentialRequest::certificate(pem()).with_end_date_relative("ten days"), "end_date_relative")]
    #[case::key_id(CredentialRequest::certificate(pem()).with_key_id("abc"), "key_id")]
    #[case::empty(CredentialRequest::password("  "), "value")]
    fn errors_point_at_attribute(#[case] request: CredentialRequest, #[case] attr: &str) {
        let err = request.into_descriptor_at(now()).unwrap_err();
        assert_eq!(err.attr(), attr);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut request = CredentialRequest::certificate(pem());
        request.credential_type = "Kerberos".into();
        let err = request.into_descriptor_at(now()).unwrap_err();
        assert!(matches!(err, CredentialError::InvalidType(_)));
    }

    #[test]
    fn debug_hides_value() {
        let request = CredentialRequest::password("hunter2");
        assert!(!format!("{request:?}").contains("hunter2"));
    }
}
